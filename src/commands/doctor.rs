use picoagent_runtime::config;
use picoagent_runtime::provider::{ChatOptions, ProviderClient};
use picoagent_runtime::{ContextMessage, Role};

use super::setup::{build_provider, memory_path, skills_dir};
use crate::EXIT_USER_ERROR;

pub async fn run() -> i32 {
    println!("Checking picoagent health...\n");
    let mut all_ok = true;

    print!("• Config file... ");
    let config = match config::load() {
        Ok(config) => {
            println!("✓ loaded from {}", config::config_path().unwrap().display());
            Some(config)
        }
        Err(e) => {
            println!("✗ {e}");
            println!("  Run: picoagent onboard");
            all_ok = false;
            None
        }
    };

    let Some(config) = config else {
        return EXIT_USER_ERROR;
    };

    print!("• Workspace root... ");
    if config.workspace_root.is_dir() {
        println!("✓ {}", config.workspace_root.display());
    } else {
        println!("✗ {} does not exist", config.workspace_root.display());
        all_ok = false;
    }

    print!("• Skills directory... ");
    let skills_dir = skills_dir(&config);
    if skills_dir.is_dir() {
        let count = std::fs::read_dir(&skills_dir)
            .map(|entries| entries.filter_map(Result::ok).filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("md")).count())
            .unwrap_or(0);
        println!("✓ {count} skill(s) in {}", skills_dir.display());
    } else {
        println!("○ no skills directory yet ({})", skills_dir.display());
    }

    print!("• Vector memory... ");
    let memory_file = match config::home_dir() {
        Ok(home) => Some(memory_path(&home)),
        Err(_) => None,
    };
    match memory_file {
        Some(path) if path.exists() => println!("✓ {}", path.display()),
        Some(_) => println!("○ no memory file yet (created on first turn)"),
        None => {
            println!("✗ could not resolve ~/.picoagent");
            all_ok = false;
        }
    }

    print!("• Provider reachability ({})... ", config.provider);
    let provider = build_provider(&config).await;
    let probe = [ContextMessage {
        role: Role::User,
        content: "ping".to_string(),
    }];
    match provider.chat(&probe, &ChatOptions::default()).await {
        Ok(_) => println!("✓ reachable"),
        Err(e) => {
            println!("✗ {e}");
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All checks passed. Run: picoagent agent \"hello\"");
        0
    } else {
        println!("Some checks failed; see above.");
        EXIT_USER_ERROR
    }
}
