use picoagent_runtime::config;
use picoagent_runtime::provider::{ChatOptions, ProviderClient};
use picoagent_runtime::{ContextMessage, Role};

use super::setup::build_provider;
use crate::{EXIT_CONFIG_ERROR, EXIT_OK, EXIT_PROVIDER_UNREACHABLE};

pub async fn run() -> i32 {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let provider = build_provider(&config).await;
    println!("configured provider: {} (chat_model={})", config.provider, config.chat_model);

    let probe = [ContextMessage {
        role: Role::User,
        content: "ping".to_string(),
    }];
    match provider.chat(&probe, &ChatOptions::default()).await {
        Ok(_) => {
            println!("reachable: yes");
            EXIT_OK
        }
        Err(e) => {
            println!("reachable: no ({e})");
            EXIT_PROVIDER_UNREACHABLE
        }
    }
}
