use clap::Parser;

/// Sibyl — a multi-tool research assistant in your terminal.
#[derive(Parser, Debug)]
#[command(name = "sibyl", version, about)]
pub struct Args {
    /// One-shot query; omit to start an interactive session.
    pub query: Option<String>,

    /// Conversation thread identifier.
    #[arg(long, default_value = "default")]
    pub thread: String,

    /// Force a specific model instead of task-based selection.
    #[arg(long)]
    pub model: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["sibyl"]);
        assert!(args.query.is_none());
        assert_eq!(args.thread, "default");
        assert!(args.model.is_none());
    }

    #[test]
    fn one_shot_query_with_overrides() {
        let args = Args::parse_from([
            "sibyl",
            "--thread",
            "research",
            "--model",
            "llama-3.1-8b-instant",
            "Calculate 15% of 2,500",
        ]);
        assert_eq!(args.query.as_deref(), Some("Calculate 15% of 2,500"));
        assert_eq!(args.thread, "research");
        assert_eq!(args.model.as_deref(), Some("llama-3.1-8b-instant"));
    }
}
