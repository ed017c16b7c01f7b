use picoagent_runtime::config::{self, Config};
use picoagent_runtime::tools::DEFAULT_DENY_PATTERNS;

use crate::{EXIT_CONFIG_ERROR, EXIT_OK};

pub async fn run() -> i32 {
    let home = match config::home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    if config::config_path().map(|p| p.exists()).unwrap_or(false) {
        println!("picoagent is already onboarded ({})", home.display());
        return EXIT_OK;
    }

    let workspace_root = home.join("workspace");
    if let Err(e) = std::fs::create_dir_all(workspace_root.join("skills")) {
        eprintln!("error: could not create workspace: {e}");
        return EXIT_CONFIG_ERROR;
    }

    let config = Config {
        provider: "local".to_string(),
        chat_model: "heuristic".to_string(),
        embedding_model: "heuristic".to_string(),
        api_key_env: None,
        max_tool_chain: 3,
        tool_timeout_seconds: 30,
        tool_cache_ttl_seconds: 60,
        workspace_root,
        channels: Default::default(),
        mcp_servers: Vec::new(),
        allow_shell: false,
        allow_file_tool: true,
        restrict_to_workspace: true,
        shell_deny_patterns: DEFAULT_DENY_PATTERNS.iter().map(|s| s.to_string()).collect(),
    };

    match config::save(&config) {
        Ok(()) => {
            println!("Created {}", config::config_path().unwrap().display());
            println!("Workspace: {}", config.workspace_root.display());
            println!("Provider: local (deterministic heuristic, no network calls)");
            println!("\nEdit config.json to point at a real provider, then run: picoagent agent \"hello\"");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_CONFIG_ERROR
        }
    }
}
