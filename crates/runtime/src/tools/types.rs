//! Core types for the tool registry: descriptors, parameter schemas, results.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-schema-subset type tag for a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// Constraints on a single named parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSchema {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ParamSchema {
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            enum_values: Vec::new(),
            minimum: None,
            maximum: None,
            pattern: None,
        }
    }
}

/// Structural schema for a tool's arguments: an object with named fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSchema {
    pub fields: HashMap<String, ParamSchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub additional_properties: bool,
}

/// Describes a single registrable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    #[serde(default = "default_cacheable")]
    pub cacheable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

fn default_cacheable() -> bool {
    true
}

impl ToolDescriptor {
    pub fn timeout(&self, global_timeout: Duration) -> Duration {
        match self.timeout_seconds {
            Some(secs) => Duration::from_secs(secs).min(global_timeout),
            None => global_timeout,
        }
    }
}

/// Outcome of running a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>, data: Option<Value>, latency_ms: u64) -> Self {
        Self {
            output: output.into(),
            data,
            success: true,
            error: None,
            latency_ms,
        }
    }

    pub fn failed(error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            output: String::new(),
            data: None,
            success: false,
            error: Some(error.into()),
            latency_ms,
        }
    }
}

/// Violations found while validating arguments against a [`ToolSchema`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("argument validation failed: {violations:?}")]
pub struct ValidationError {
    pub violations: Vec<String>,
}

/// Errors surfaced by the tool registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool name already registered: {0}")]
    NameConflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("tool invocation timed out after {0:?}")]
    Timeout(Duration),
}
