//! HookRegistry: lifecycle callbacks run around each turn.
//!
//! The hook trait shape follows the teacher's `EnterpriseChannelHooks`
//! (`channel-adapter/src/traits.rs`) — a handful of named async callbacks a
//! caller implements — but hooks here are advisory: failures are logged and
//! swallowed rather than able to veto the turn.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolResult;

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-turn context passed to hooks. Intentionally a plain bag of fields
/// rather than a reference into `SessionState`, so hook implementations stay
/// decoupled from the turn engine's internal types.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub session_id: String,
    pub user_message: String,
    pub metadata: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook '{0}' failed: {1}")]
    Failed(String, String),
    #[error("hook '{0}' timed out after {1:?}")]
    TimedOut(String, Duration),
}

#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_turn_start(&self, _ctx: &HookContext) -> Result<(), String> {
        Ok(())
    }

    async fn on_tool_result(&self, _ctx: &HookContext, _result: &ToolResult) -> Result<(), String> {
        Ok(())
    }

    async fn on_turn_end(&self, _ctx: &HookContext, _response: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Runs registered hooks in registration order, each bounded by a per-hook
/// timeout. A hook failure or timeout is logged and never aborts the turn.
pub struct HookRegistry {
    hooks: Vec<Box<dyn Hook>>,
    timeout: Duration,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self {
            hooks: Vec::new(),
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }
}

impl HookRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            hooks: Vec::new(),
            timeout,
        }
    }

    pub fn register(&mut self, hook: Box<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub async fn on_turn_start(&self, ctx: &HookContext) {
        for hook in &self.hooks {
            self.run(hook.name(), hook.on_turn_start(ctx)).await;
        }
    }

    pub async fn on_tool_result(&self, ctx: &HookContext, result: &ToolResult) {
        for hook in &self.hooks {
            self.run(hook.name(), hook.on_tool_result(ctx, result)).await;
        }
    }

    pub async fn on_turn_end(&self, ctx: &HookContext, response: &str) {
        for hook in &self.hooks {
            self.run(hook.name(), hook.on_turn_end(ctx, response)).await;
        }
    }

    async fn run(&self, name: &str, fut: impl std::future::Future<Output = Result<(), String>>) {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(hook = name, error = %e, "hook failed"),
            Err(_) => tracing::warn!(hook = name, timeout = ?self.timeout, "hook timed out"),
        }
    }
}
