//! Shared types for the provider surface.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::ContextMessage;
use crate::tools::ToolDescriptor;

/// Non-negative relevance score per tool name. Uses a `BTreeMap` so the
/// entropy scheduler's deterministic-ordering requirement holds end to end.
pub type ToolScores = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
    pub stop: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// Re-exported for provider implementations that build messages.
pub type Messages = [ContextMessage];

pub struct PlanArgsRequest<'a> {
    pub user_message: &'a str,
    pub tool: &'a ToolDescriptor,
    pub context: &'a [ContextMessage],
}

pub type ToolArgs = Value;
