mod cli;

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use sibyl_agent::{GroqClient, GroqConfig, ModelRegistry, SessionManager, ToolRegistry};
use sibyl_common::ThreadId;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root — two levels up from crates/sibyl-app/
        manifest_dir.join("..").join("..").join(".env"),
        // Current directory
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let log_directive = log_level.unwrap_or("sibyl=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "sibyl=info".parse().unwrap()),
            ),
        )
        .init();
}

fn print_stats(sessions: &SessionManager, thread: &ThreadId) {
    println!("total requests: {}", sessions.registry().total_requests());
    if let Some(current) = sessions.registry().current_model() {
        println!("current model:  {current}");
    }
    for stats in sessions.registry().stats() {
        println!(
            "  {:<28} ok: {:<4} failed: {:<4} {}",
            stats.name,
            stats.success_count,
            stats.failure_count,
            if stats.available { "available" } else { "cooling down" }
        );
    }
    if let Some(conv) = sessions.conversation(thread) {
        println!("summary:        {}", conv.summary());
        println!("last tool:      {}", conv.last_tool_used().unwrap_or("none"));
        println!("model switches: {}", conv.model_switch_count());
        println!("degraded turns: {}", conv.error_count());
        println!("cached results: {}", conv.cached_tool_results());
    }
}

async fn repl(sessions: &mut SessionManager, thread: &ThreadId) {
    println!("Sibyl research assistant. Type /quit to exit, /clear to reset, /stats for model stats.");
    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("sibyl: failed to read input: {e}");
                break;
            }
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/clear" => {
                sessions.clear(thread);
                println!("conversation cleared");
            }
            "/stats" => print_stats(sessions, thread),
            _ => match sessions.chat(thread, input).await {
                Ok(answer) => println!("sibyl> {answer}\n"),
                Err(e) => eprintln!("sibyl: {e}"),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment.
    load_dotenv();

    let args = cli::parse();
    init_logging(args.log_level.as_deref());

    // Missing credentials are a startup precondition failure, reported with
    // remediation rather than a panic.
    let config = match GroqConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sibyl: {e}");
            std::process::exit(1);
        }
    };

    let client = Arc::new(GroqClient::new(config));
    let registry = ModelRegistry::groq_default();
    let tools = ToolRegistry::builtin().with_search_tools();
    tracing::info!(tools = tools.len(), "initialized tool catalog");

    let mut sessions = SessionManager::new(client, registry, tools);
    if let Some(model) = args.model {
        sessions = sessions.with_forced_model(model);
    }

    let thread = ThreadId::from(args.thread);

    if let Some(query) = args.query {
        match sessions.chat(&thread, &query).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => {
                eprintln!("sibyl: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    repl(&mut sessions, &thread).await;
}
