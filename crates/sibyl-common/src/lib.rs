pub mod errors;
pub mod id;

pub use errors::{ConfigError, SibylError};
pub use id::{new_id, ThreadId};

pub type Result<T> = std::result::Result<T, SibylError>;
