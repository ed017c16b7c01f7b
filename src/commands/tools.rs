use picoagent_runtime::config;

use super::setup::build_agent_loop;
use crate::{EXIT_CONFIG_ERROR, EXIT_OK};

pub async fn run() -> i32 {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let (agent_loop, _home) = match build_agent_loop(config).await {
        Ok(built) => built,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let descriptors = agent_loop.tool_registry().list();
    if descriptors.is_empty() {
        println!("No tools registered (allow_shell/allow_file_tool are both false).");
        return EXIT_OK;
    }

    for tool in descriptors {
        println!("{} - {}", tool.name, tool.description);
        let mut fields: Vec<&String> = tool.schema.fields.keys().collect();
        fields.sort();
        for field in fields {
            let required = if tool.schema.required.contains(field) { " (required)" } else { "" };
            println!("    {field}{required}");
        }
    }
    EXIT_OK
}
