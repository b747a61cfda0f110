#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credential: {var} is not set. {remediation}")]
    MissingCredential {
        var: &'static str,
        remediation: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SibylError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("{0}")]
    Other(String),
}
