//! HTTP-backed [`ProviderClient`], shared across vendors via one request
//! shape: each vendor-specific client differs only in base URL and auth.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ContextMessage;
use crate::tools::{ToolDescriptor, ToolResult};

use super::types::{ChatOptions, PlanArgsRequest, ProviderError, ToolArgs, ToolScores};
use super::ProviderClient;

pub struct HttpProviderClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
    name: String,
}

impl HttpProviderClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            http: reqwest::Client::new(),
            name: name.into(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(format!("{}/{}", self.base_url.trim_end_matches('/'), path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let response = self
            .request(path)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    temperature: Option<f64>,
    max_tokens: Option<usize>,
    stop: &'a [String],
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    content: String,
}

#[derive(Serialize)]
struct ScoreToolsRequest<'a> {
    system_prompt: &'a str,
    user_message: &'a str,
    tools: &'a [ToolDescriptor],
}

#[derive(Deserialize)]
struct ScoreToolsResponse {
    scores: ToolScores,
}

#[derive(Serialize)]
struct PlanArgsWireRequest<'a> {
    user_message: &'a str,
    tool: &'a ToolDescriptor,
}

#[derive(Deserialize)]
struct PlanArgsResponse {
    args: Value,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    user_message: &'a str,
    tool_result: Option<&'a ToolResult>,
    memory_snippets: &'a [String],
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    response: String,
}

fn role_str(role: crate::session::Role) -> &'static str {
    match role {
        crate::session::Role::User => "user",
        crate::session::Role::Assistant => "assistant",
        crate::session::Role::System => "system",
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let response: EmbedResponse = self.post_json("embed", &EmbedRequest { texts }).await?;
        Ok(response.vectors)
    }

    async fn chat(&self, messages: &[ContextMessage], options: &ChatOptions) -> Result<String, ProviderError> {
        let wire_messages = messages
            .iter()
            .map(|m| WireMessage {
                role: role_str(m.role),
                content: &m.content,
            })
            .collect();
        let response: ChatResponse = self
            .post_json(
                "chat",
                &ChatRequest {
                    messages: wire_messages,
                    temperature: options.temperature,
                    max_tokens: options.max_tokens,
                    stop: &options.stop,
                },
            )
            .await?;
        Ok(response.content)
    }

    async fn score_tools(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolScores, ProviderError> {
        let response: ScoreToolsResponse = self
            .post_json(
                "score_tools",
                &ScoreToolsRequest {
                    system_prompt,
                    user_message,
                    tools,
                },
            )
            .await?;
        Ok(response.scores)
    }

    async fn plan_tool_args(&self, request: PlanArgsRequest<'_>) -> Result<ToolArgs, ProviderError> {
        let response: PlanArgsResponse = self
            .post_json(
                "plan_tool_args",
                &PlanArgsWireRequest {
                    user_message: request.user_message,
                    tool: request.tool,
                },
            )
            .await?;
        Ok(response.args)
    }

    async fn synthesize_response(
        &self,
        user_message: &str,
        tool_result: Option<&ToolResult>,
        memory_snippets: &[String],
    ) -> Result<String, ProviderError> {
        let response: SynthesizeResponse = self
            .post_json(
                "synthesize",
                &SynthesizeRequest {
                    user_message,
                    tool_result,
                    memory_snippets,
                },
            )
            .await?;
        Ok(response.response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_str_maps_all_variants() {
        assert_eq!(role_str(crate::session::Role::User), "user");
        assert_eq!(role_str(crate::session::Role::Assistant), "assistant");
        assert_eq!(role_str(crate::session::Role::System), "system");
    }

    #[test]
    fn client_carries_configured_name() {
        let client = HttpProviderClient::new("openai", "https://api.example.com", None);
        assert_eq!(client.name(), "openai");
    }
}
