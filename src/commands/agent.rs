use picoagent_runtime::config;
use picoagent_runtime::RuntimeError;

use super::setup::{build_agent_loop, memory_path, save_threshold};
use crate::{EXIT_CONFIG_ERROR, EXIT_OK, EXIT_PROVIDER_UNREACHABLE, EXIT_USER_ERROR};

pub async fn run(session_id: &str, message: &str) -> i32 {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let (agent_loop, home) = match build_agent_loop(config).await {
        Ok(built) => built,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let code = match agent_loop.handle_message(session_id, "cli", message).await {
        Ok(outcome) => {
            println!("{}", outcome.response);
            EXIT_OK
        }
        Err(RuntimeError::Provider(e)) => {
            eprintln!("error: provider unreachable: {e}");
            EXIT_PROVIDER_UNREACHABLE
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_USER_ERROR
        }
    };

    if let Err(e) = agent_loop.save_memory(&memory_path(&home)).await {
        tracing::warn!("could not persist memory: {e}");
    }
    if let Err(e) = save_threshold(&home, agent_loop.threshold_snapshot()) {
        tracing::warn!("could not persist adaptive threshold: {e}");
    }

    code
}
