//! The tool registry: registration, validation, and cached/timed execution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::cache::{fingerprint, ToolCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
use super::types::{ToolDescriptor, ToolError, ToolResult};
use super::validation::validate;

/// A tool's executable behavior. Implementors should honor the passed
/// deadline cooperatively where possible; the registry also enforces a hard
/// timeout around the call.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, args: Value) -> Result<ToolResult, String>;
}

#[async_trait]
pub trait ToolRegistry: Send + Sync {
    fn register(
        &self,
        descriptor: ToolDescriptor,
        runner: Arc<dyn ToolRunner>,
    ) -> Result<(), ToolError>;

    fn list(&self) -> Vec<ToolDescriptor>;

    fn validate(&self, name: &str, args: &Value) -> Result<(), ToolError>;

    async fn run(&self, name: &str, args: Value, timeout: Duration) -> Result<ToolResult, ToolError>;
}

struct Registration {
    descriptor: ToolDescriptor,
    runner: Arc<dyn ToolRunner>,
}

/// Default in-process [`ToolRegistry`] with a shared [`ToolCache`].
pub struct InMemoryToolRegistry {
    tools: DashMap<String, Registration>,
    cache: ToolCache,
    global_timeout: Duration,
}

impl InMemoryToolRegistry {
    pub fn new(global_timeout: Duration) -> Self {
        Self {
            tools: DashMap::new(),
            cache: ToolCache::new(Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES),
            global_timeout,
        }
    }

    pub fn with_cache_config(global_timeout: Duration, ttl: Duration, max_entries: usize) -> Self {
        Self {
            tools: DashMap::new(),
            cache: ToolCache::new(ttl, max_entries),
            global_timeout,
        }
    }
}

impl Default for InMemoryToolRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl ToolRegistry for InMemoryToolRegistry {
    fn register(
        &self,
        descriptor: ToolDescriptor,
        runner: Arc<dyn ToolRunner>,
    ) -> Result<(), ToolError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(ToolError::NameConflict(descriptor.name));
        }
        self.tools
            .insert(descriptor.name.clone(), Registration { descriptor, runner });
        Ok(())
    }

    fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|e| e.descriptor.clone()).collect()
    }

    fn validate(&self, name: &str, args: &Value) -> Result<(), ToolError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        validate(&entry.descriptor.schema, args)?;
        Ok(())
    }

    async fn run(&self, name: &str, args: Value, timeout: Duration) -> Result<ToolResult, ToolError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let descriptor = entry.descriptor.clone();
        let runner = entry.runner.clone();
        drop(entry);

        validate(&descriptor.schema, &args)?;

        let key = fingerprint(name, &args);
        if descriptor.cacheable {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(cached);
            }
        }

        let bound = descriptor.timeout(self.global_timeout).min(timeout);
        let start = Instant::now();

        let outcome = tokio::time::timeout(bound, runner.run(args)).await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(message)) => ToolResult::failed(message, start.elapsed().as_millis() as u64),
            Err(_) => ToolResult::failed("timeout", start.elapsed().as_millis() as u64),
        };

        if descriptor.cacheable && result.success {
            self.cache.put(key, result.clone());
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{ParamSchema, ParamType, ToolSchema};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEcho {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolRunner for CountingEcho {
        async fn run(&self, args: Value) -> Result<ToolResult, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::ok(args["x"].as_str().unwrap_or("").to_string(), None, 1))
        }
    }

    struct SleepyTool;

    #[async_trait]
    impl ToolRunner for SleepyTool {
        async fn run(&self, _args: Value) -> Result<ToolResult, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::ok("done", None, 5000))
        }
    }

    fn echo_descriptor(cacheable: bool) -> ToolDescriptor {
        let mut fields = HashMap::new();
        fields.insert("x".to_string(), ParamSchema::new(ParamType::String));
        ToolDescriptor {
            name: "echo".into(),
            description: "echoes x".into(),
            schema: ToolSchema {
                fields,
                required: Vec::new(),
                additional_properties: false,
            },
            cacheable,
            timeout_seconds: None,
        }
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let registry = InMemoryToolRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(echo_descriptor(true), Arc::new(CountingEcho { calls: calls.clone() }))
            .unwrap();
        let err = registry
            .register(echo_descriptor(true), Arc::new(CountingEcho { calls }))
            .unwrap_err();
        assert!(matches!(err, ToolError::NameConflict(_)));
    }

    #[tokio::test]
    async fn unknown_tool_run_errors() {
        let registry = InMemoryToolRegistry::default();
        let err = registry.run("missing", json!({}), Duration::from_secs(1)).await;
        assert!(matches!(err, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn scenario_4_cache_hit_bypasses_runner() {
        let registry = InMemoryToolRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(echo_descriptor(true), Arc::new(CountingEcho { calls: calls.clone() }))
            .unwrap();

        registry
            .run("echo", json!({"x": "hi"}), Duration::from_secs(1))
            .await
            .unwrap();
        registry
            .run("echo", json!({"x": "hi"}), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scenario_5_timeout_surfaces_as_failure() {
        let registry = InMemoryToolRegistry::default();
        registry
            .register(
                ToolDescriptor {
                    timeout_seconds: Some(1),
                    ..echo_descriptor(true)
                },
                Arc::new(SleepyTool),
            )
            .unwrap();

        let result = registry
            .run("echo", json!({"x": "hi"}), Duration::from_secs(30))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn non_cacheable_tool_always_invokes_runner() {
        let registry = InMemoryToolRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(echo_descriptor(false), Arc::new(CountingEcho { calls: calls.clone() }))
            .unwrap();

        registry
            .run("echo", json!({"x": "hi"}), Duration::from_secs(1))
            .await
            .unwrap();
        registry
            .run("echo", json!({"x": "hi"}), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
