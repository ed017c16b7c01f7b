//! Shared wiring for the commands that need the full turn engine: resolves
//! `~/.picoagent` paths, builds the provider/memory/skills/tools stack, and
//! assembles one `AgentLoop<AnyProviderClient>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use picoagent_runtime::tools::{
    FileTool, ParamSchema, ParamType, ShellTool, ToolDescriptor, ToolRegistry, ToolSchema,
};
use picoagent_runtime::{
    AdaptiveThreshold, AgentLoop, AnyProviderClient, Config, ContextBuilder, DualMemoryStore,
    FallbackProvider, HookRegistry, HttpProviderClient, InMemoryToolRegistry, LocalHeuristicClient,
    SessionStore, SkillLibrary, ThresholdConfig, VectorMemory, VectorMemoryStore,
};

const STABLE_SYSTEM_PROMPT: &str = "You are picoagent, a local personal-assistant runtime.";
const HISTORY_WINDOW: usize = 10;

pub fn sessions_path(home: &Path) -> PathBuf {
    home.join("sessions.json")
}

pub fn memory_path(home: &Path) -> PathBuf {
    home.join("memory.bin")
}

pub fn skill_usage_path(home: &Path) -> PathBuf {
    home.join("skill_usage.jsonl")
}

pub fn threshold_path(home: &Path) -> PathBuf {
    home.join("threshold.json")
}

pub fn skills_dir(config: &Config) -> PathBuf {
    config.workspace_root.join("skills")
}

/// `config.provider == "local"` selects the dependency-free heuristic
/// client; any other value is treated as the HTTP provider's base URL
/// (`config.chat_model` names the model, `api_key_env` the secret).
pub async fn build_provider(config: &Config) -> AnyProviderClient {
    if config.provider == "local" {
        return AnyProviderClient::Local(LocalHeuristicClient);
    }
    let api_key = config
        .api_key_env
        .as_ref()
        .and_then(|var| std::env::var(var).ok());
    AnyProviderClient::Http(HttpProviderClient::new(
        config.chat_model.clone(),
        config.provider.clone(),
        api_key,
    ))
}

/// Load a previously-saved [`picoagent_runtime::ThresholdSnapshot`], or a
/// fresh [`AdaptiveThreshold`] if none exists yet.
pub fn load_threshold(home: &Path) -> AdaptiveThreshold {
    let path = threshold_path(home);
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(snapshot) => AdaptiveThreshold::from_snapshot(ThresholdConfig::default(), snapshot),
            Err(_) => AdaptiveThreshold::default(),
        },
        Err(_) => AdaptiveThreshold::default(),
    }
}

/// Persist the threshold's current state so the next CLI invocation resumes
/// adapting instead of restarting at `tau_init`.
pub fn save_threshold(home: &Path, snapshot: picoagent_runtime::ThresholdSnapshot) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(&snapshot)?;
    std::fs::write(threshold_path(home), json)
}

fn shell_descriptor() -> ToolDescriptor {
    let mut fields = HashMap::new();
    fields.insert("command".to_string(), ParamSchema::new(ParamType::String));
    ToolDescriptor {
        name: "shell".to_string(),
        description: "Execute a shell command and return its stdout.".to_string(),
        schema: ToolSchema {
            fields,
            required: vec!["command".to_string()],
            additional_properties: false,
        },
        cacheable: false,
        timeout_seconds: None,
    }
}

fn file_descriptor() -> ToolDescriptor {
    let mut fields = HashMap::new();
    fields.insert("path".to_string(), ParamSchema::new(ParamType::String));
    let mut mode = ParamSchema::new(ParamType::String);
    mode.enum_values = vec!["read".into(), "write".into()];
    fields.insert("mode".to_string(), mode);
    fields.insert("contents".to_string(), ParamSchema::new(ParamType::String));
    ToolDescriptor {
        name: "file".to_string(),
        description: "Read or write a file under the workspace root.".to_string(),
        schema: ToolSchema {
            fields,
            required: vec!["path".to_string()],
            additional_properties: false,
        },
        cacheable: false,
        timeout_seconds: None,
    }
}

fn register_builtin_tools(registry: &dyn ToolRegistry, config: &Config) {
    if config.allow_shell {
        let runner = Arc::new(ShellTool::new(config.shell_deny_patterns.clone()));
        let _ = registry.register(shell_descriptor(), runner);
    }
    if config.allow_file_tool {
        let runner = Arc::new(FileTool::new(config.workspace_root.clone(), config.restrict_to_workspace));
        let _ = registry.register(file_descriptor(), runner);
    }
}

/// Build the fully-wired turn engine. Returns the `~/.picoagent` home
/// directory alongside it so callers can persist the threshold snapshot
/// after the turn completes.
pub async fn build_agent_loop(config: Config) -> Result<(AgentLoop<AnyProviderClient>, PathBuf), String> {
    let home = picoagent_runtime::config::home_dir().map_err(|e| e.to_string())?;

    let sessions = SessionStore::load(sessions_path(&home)).await.map_err(|e| e.to_string())?;

    let memory_file = memory_path(&home);
    let memory: Arc<dyn VectorMemory> = if memory_file.exists() {
        Arc::new(
            VectorMemoryStore::load(
                &memory_file,
                None,
                picoagent_runtime::memory::DEFAULT_HALF_LIFE_SECS,
                picoagent_runtime::memory::DEFAULT_MAX_RECORDS,
            )
            .await
            .map_err(|e| e.to_string())?,
        )
    } else {
        Arc::new(VectorMemoryStore::default())
    };

    let skills = SkillLibrary::new(vec![skills_dir(&config)], skill_usage_path(&home));

    let tools: Arc<dyn ToolRegistry> = Arc::new(InMemoryToolRegistry::with_cache_config(
        Duration::from_secs(config.tool_timeout_seconds),
        Duration::from_secs(config.tool_cache_ttl_seconds),
        picoagent_runtime::tools::cache::DEFAULT_MAX_ENTRIES,
    ));
    register_builtin_tools(tools.as_ref(), &config);

    let context = ContextBuilder::new(STABLE_SYSTEM_PROMPT, HISTORY_WINDOW);
    let provider = FallbackProvider::new(build_provider(&config).await);
    let threshold = load_threshold(&home);
    let consolidation = DualMemoryStore::new(
        config.workspace_root.clone(),
        picoagent_runtime::consolidation::DEFAULT_CONSOLIDATION_K,
    );
    let hooks = HookRegistry::default();

    let agent_loop = AgentLoop::new(config, sessions, memory, skills, tools, context, provider, threshold, consolidation, hooks);
    Ok((agent_loop, home))
}
