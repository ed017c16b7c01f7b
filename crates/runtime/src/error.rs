//! Top-level error type the `AgentLoop` boundary converts everything into,
//! following the same per-component-enum-converging-on-one-type shape as the
//! teacher's `types::error::RuntimeError`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::consolidation::ConsolidationError;
use crate::hooks::HookError;
use crate::memory::MemoryError;
use crate::provider::ProviderError;
use crate::session::SessionError;
use crate::skills::SkillError;
use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("skill error: {0}")]
    Skill(#[from] SkillError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("consolidation error: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    #[error("turn deadline exceeded after {0:?}")]
    TurnDeadlineExceeded(std::time::Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_convert_via_from() {
        let config_error: RuntimeError = ConfigError::MissingRequired("provider".to_string()).into();
        assert!(matches!(config_error, RuntimeError::Config(_)));

        let tool_error: RuntimeError = ToolError::NotFound("weather".to_string()).into();
        assert!(matches!(tool_error, RuntimeError::Tool(_)));
    }
}
