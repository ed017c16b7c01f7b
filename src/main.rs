#![allow(clippy::multiple_crate_versions)]

use clap::{Arg, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes per the CLI contract: 0 success, 1 user error, 2 config
/// error, 3 provider unreachable.
pub const EXIT_OK: i32 = 0;
pub const EXIT_USER_ERROR: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_PROVIDER_UNREACHABLE: i32 = 3;

#[tokio::main]
async fn main() {
    let matches = Command::new("picoagent")
        .version(VERSION)
        .about("Local personal-assistant runtime with entropy-gated tool routing")
        .subcommand(Command::new("onboard").about("Create ~/.picoagent and write an initial config.json"))
        .subcommand(
            Command::new("agent")
                .about("Run one turn of the agent loop over a message")
                .arg(
                    Arg::new("message")
                        .value_name("MESSAGE")
                        .help("User message for this turn")
                        .required(true),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .value_name("SESSION_ID")
                        .help("Session id to continue (default: cli-default)")
                        .default_value("cli-default"),
                ),
        )
        .subcommand(Command::new("gateway").about("Run channel adapters (not implemented; contract-only)"))
        .subcommand(Command::new("providers").about("List configured providers and their reachability"))
        .subcommand(Command::new("tools").about("List registered tools and their schemas"))
        .subcommand(Command::new("mcp").about("Run the MCP client/server (not implemented; contract-only)"))
        .subcommand(
            Command::new("import-skills")
                .about("Copy skill Markdown files into the skills directory")
                .arg(Arg::new("path").value_name("PATH").required(true)),
        )
        .subcommand(
            Command::new("install-skill")
                .about("Install a skill from a user/repo reference (not implemented; contract-only)")
                .arg(Arg::new("repo").value_name("USER/REPO").required(true)),
        )
        .subcommand(Command::new("reload-skills").about("Force a hot-reload of the skill library"))
        .subcommand(Command::new("doctor").about("Check config, workspace, and provider health"))
        .subcommand(
            Command::new("prune-memory")
                .about("Prune old or low-scoring memory records")
                .arg(
                    Arg::new("older-than")
                        .long("older-than")
                        .value_name("DAYS")
                        .help("Prune records older than this many days"),
                )
                .arg(
                    Arg::new("min-score")
                        .long("min-score")
                        .value_name("SCORE")
                        .help("Prune records whose decayed recall score falls below this"),
                ),
        )
        .subcommand(Command::new("threshold-stats").about("Print the adaptive threshold's current state"))
        .subcommand(
            Command::new("export-session")
                .about("Write a session's state to stdout as JSON")
                .arg(Arg::new("session_id").value_name("SESSION_ID").required(true)),
        )
        .subcommand(
            Command::new("import-session")
                .about("Load a session from a JSON file")
                .arg(Arg::new("file").value_name("FILE").required(true)),
        )
        .get_matches();

    let code = match matches.subcommand() {
        Some(("onboard", _)) => commands::onboard::run().await,
        Some(("agent", sub)) => {
            let message = sub.get_one::<String>("message").expect("required").clone();
            let session = sub.get_one::<String>("session").expect("has default").clone();
            commands::agent::run(&session, &message).await
        }
        Some(("gateway", _)) => commands::gateway::run().await,
        Some(("providers", _)) => commands::providers::run().await,
        Some(("tools", _)) => commands::tools::run().await,
        Some(("mcp", _)) => commands::mcp::run().await,
        Some(("import-skills", sub)) => {
            let path = sub.get_one::<String>("path").expect("required").clone();
            commands::skills::import(&path).await
        }
        Some(("install-skill", sub)) => {
            let repo = sub.get_one::<String>("repo").expect("required").clone();
            commands::skills::install(&repo).await
        }
        Some(("reload-skills", _)) => commands::skills::reload().await,
        Some(("doctor", _)) => commands::doctor::run().await,
        Some(("prune-memory", sub)) => {
            let older_than = sub.get_one::<String>("older-than").and_then(|s| s.parse::<u64>().ok());
            let min_score = sub.get_one::<String>("min-score").and_then(|s| s.parse::<f32>().ok());
            commands::memory::prune(older_than, min_score).await
        }
        Some(("threshold-stats", _)) => commands::threshold_stats::run().await,
        Some(("export-session", sub)) => {
            let session_id = sub.get_one::<String>("session_id").expect("required").clone();
            commands::session::export(&session_id).await
        }
        Some(("import-session", sub)) => {
            let file = sub.get_one::<String>("file").expect("required").clone();
            commands::session::import(&file).await
        }
        _ => {
            println!("picoagent v{}", VERSION);
            println!("Use --help for available commands");
            EXIT_OK
        }
    };

    std::process::exit(code);
}
