//! Deterministic, dependency-free fallback provider.
//!
//! Used automatically when the configured provider is unreachable or
//! returns something that cannot be decoded. Every operation here is a pure
//! function of its input — no network calls, no randomness.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ContextMessage;
use crate::tools::{ParamType, ToolDescriptor, ToolResult};

use super::types::{ChatOptions, PlanArgsRequest, ProviderError, ToolArgs, ToolScores};
use super::ProviderClient;

const EMBED_DIMENSION: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct LocalHeuristicClient;

impl LocalHeuristicClient {
    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }

    /// Hashing-trick bag-of-words embedding: each token hashes into one of
    /// `EMBED_DIMENSION` buckets, counts are L2-normalized.
    fn embed_one(text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; EMBED_DIMENSION];
        for token in Self::tokenize(text) {
            let bucket = (fnv1a(&token) as usize) % EMBED_DIMENSION;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl ProviderClient for LocalHeuristicClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }

    async fn chat(&self, messages: &[ContextMessage], _options: &ChatOptions) -> Result<String, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == crate::session::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(format!("I heard: {last_user}"))
    }

    async fn score_tools(
        &self,
        _system_prompt: &str,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolScores, ProviderError> {
        let query_tokens = Self::tokenize(user_message);
        let mut scores = ToolScores::new();
        for tool in tools {
            let doc = format!("{} {}", tool.name, tool.description);
            let doc_tokens = Self::tokenize(&doc);
            let overlap = query_tokens
                .iter()
                .filter(|t| doc_tokens.contains(t))
                .count() as f64;
            scores.insert(tool.name.clone(), overlap);
        }
        Ok(scores)
    }

    async fn plan_tool_args(&self, request: PlanArgsRequest<'_>) -> Result<ToolArgs, ProviderError> {
        let mut args = serde_json::Map::new();
        let schema = &request.tool.schema;
        for field_name in schema.required.iter().chain(schema.fields.keys()) {
            if args.contains_key(field_name) {
                continue;
            }
            let Some(field_schema) = schema.fields.get(field_name) else {
                continue;
            };
            let value = match field_schema.param_type {
                ParamType::String => Value::String(request.user_message.to_string()),
                ParamType::Integer => json!(0),
                ParamType::Number => json!(0.0),
                ParamType::Boolean => json!(false),
                ParamType::Array => json!([]),
                ParamType::Object => json!({}),
            };
            args.insert(field_name.clone(), value);
        }
        Ok(Value::Object(args))
    }

    async fn synthesize_response(
        &self,
        user_message: &str,
        tool_result: Option<&ToolResult>,
        memory_snippets: &[String],
    ) -> Result<String, ProviderError> {
        if let Some(result) = tool_result {
            if result.success {
                return Ok(result.output.clone());
            }
            return Ok(format!(
                "I tried to help with \"{user_message}\" but ran into an error: {}",
                result.error.clone().unwrap_or_default()
            ));
        }
        if let Some(snippet) = memory_snippets.first() {
            return Ok(format!("Based on what I remember ({snippet}), regarding \"{user_message}\": I'm not sure yet."));
        }
        Ok(format!("I'm not sure how to help with \"{user_message}\" yet."))
    }

    fn name(&self) -> &str {
        "local-heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSchema, ToolSchema};
    use std::collections::HashMap;

    #[tokio::test]
    async fn embed_is_deterministic_and_fixed_dimension() {
        let client = LocalHeuristicClient;
        let a = client.embed(&["hello world".to_string()]).await.unwrap();
        let b = client.embed(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), EMBED_DIMENSION);
    }

    #[tokio::test]
    async fn score_tools_rewards_keyword_overlap() {
        let client = LocalHeuristicClient;
        let tools = vec![
            ToolDescriptor {
                name: "weather".into(),
                description: "get the weather forecast".into(),
                schema: ToolSchema::default(),
                cacheable: true,
                timeout_seconds: None,
            },
            ToolDescriptor {
                name: "notes".into(),
                description: "take notes".into(),
                schema: ToolSchema::default(),
                cacheable: true,
                timeout_seconds: None,
            },
        ];
        let scores = client.score_tools("", "what is the weather today", &tools).await.unwrap();
        assert!(scores["weather"] > scores["notes"]);
    }

    #[tokio::test]
    async fn plan_tool_args_fills_required_string_fields() {
        let client = LocalHeuristicClient;
        let mut fields = HashMap::new();
        fields.insert("query".to_string(), ParamSchema::new(ParamType::String));
        let tool = ToolDescriptor {
            name: "search".into(),
            description: "search".into(),
            schema: ToolSchema {
                fields,
                required: vec!["query".to_string()],
                additional_properties: false,
            },
            cacheable: true,
            timeout_seconds: None,
        };
        let messages = vec![];
        let args = client
            .plan_tool_args(PlanArgsRequest {
                user_message: "find rust docs",
                tool: &tool,
                context: &messages,
            })
            .await
            .unwrap();
        assert_eq!(args["query"], "find rust docs");
    }

    #[tokio::test]
    async fn synthesize_response_echoes_tool_output_on_success() {
        let client = LocalHeuristicClient;
        let result = ToolResult::ok("42 degrees", None, 1);
        let response = client
            .synthesize_response("what's the weather", Some(&result), &[])
            .await
            .unwrap();
        assert_eq!(response, "42 degrees");
    }
}
