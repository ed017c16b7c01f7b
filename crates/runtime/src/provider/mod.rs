//! ProviderClient: the abstract scoring/planning/chat surface over an LLM,
//! with a deterministic local-heuristic fallback.

pub mod http_client;
pub mod local_heuristic;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ContextMessage;
use crate::tools::ToolDescriptor;

pub use http_client::HttpProviderClient;
pub use local_heuristic::LocalHeuristicClient;
pub use types::{ChatOptions, PlanArgsRequest, ProviderError, ToolArgs, ToolScores};

/// The operations an implementer must provide to plug a model in.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn chat(&self, messages: &[ContextMessage], options: &ChatOptions) -> Result<String, ProviderError>;

    async fn score_tools(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolScores, ProviderError>;

    async fn plan_tool_args(&self, request: PlanArgsRequest<'_>) -> Result<ToolArgs, ProviderError>;

    async fn synthesize_response(
        &self,
        user_message: &str,
        tool_result: Option<&crate::tools::ToolResult>,
        memory_snippets: &[String],
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Picks between the configured HTTP provider and the local heuristic at
/// startup, so callers that don't know the concrete provider type ahead of
/// time (the CLI, reading `Config::provider`) can still build one
/// `AgentLoop<AnyProviderClient>` regardless of which was chosen.
pub enum AnyProviderClient {
    Http(HttpProviderClient),
    Local(LocalHeuristicClient),
}

#[async_trait]
impl ProviderClient for AnyProviderClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        match self {
            Self::Http(client) => client.embed(texts).await,
            Self::Local(client) => client.embed(texts).await,
        }
    }

    async fn chat(&self, messages: &[ContextMessage], options: &ChatOptions) -> Result<String, ProviderError> {
        match self {
            Self::Http(client) => client.chat(messages, options).await,
            Self::Local(client) => client.chat(messages, options).await,
        }
    }

    async fn score_tools(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolScores, ProviderError> {
        match self {
            Self::Http(client) => client.score_tools(system_prompt, user_message, tools).await,
            Self::Local(client) => client.score_tools(system_prompt, user_message, tools).await,
        }
    }

    async fn plan_tool_args(&self, request: PlanArgsRequest<'_>) -> Result<ToolArgs, ProviderError> {
        match self {
            Self::Http(client) => client.plan_tool_args(request).await,
            Self::Local(client) => client.plan_tool_args(request).await,
        }
    }

    async fn synthesize_response(
        &self,
        user_message: &str,
        tool_result: Option<&crate::tools::ToolResult>,
        memory_snippets: &[String],
    ) -> Result<String, ProviderError> {
        match self {
            Self::Http(client) => client.synthesize_response(user_message, tool_result, memory_snippets).await,
            Self::Local(client) => client.synthesize_response(user_message, tool_result, memory_snippets).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Http(client) => client.name(),
            Self::Local(client) => client.name(),
        }
    }
}

/// Wraps a primary provider and falls back to [`LocalHeuristicClient`]
/// automatically on transport/decode error. The fallback is never used
/// silently after a success — callers can inspect [`FallbackOutcome`] to
/// tell which path served the call.
pub struct FallbackProvider<P: ProviderClient> {
    primary: P,
    fallback: LocalHeuristicClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    Primary,
    Fallback,
}

impl<P: ProviderClient> FallbackProvider<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: LocalHeuristicClient,
        }
    }

    /// Direct access to the primary provider, for callers (subagent review,
    /// consolidation summaries) that make their own best-effort call and
    /// handle failure without a heuristic fallback.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub async fn embed(&self, texts: &[String]) -> (Vec<Vec<f32>>, FallbackOutcome) {
        match self.primary.embed(texts).await {
            Ok(vectors) => (vectors, FallbackOutcome::Primary),
            Err(e) => {
                tracing::warn!("provider embed failed, using local heuristic: {e}");
                let vectors = self
                    .fallback
                    .embed(texts)
                    .await
                    .expect("local heuristic client never fails");
                (vectors, FallbackOutcome::Fallback)
            }
        }
    }

    pub async fn score_tools(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> (ToolScores, FallbackOutcome) {
        match self.primary.score_tools(system_prompt, user_message, tools).await {
            Ok(scores) => (scores, FallbackOutcome::Primary),
            Err(e) => {
                tracing::warn!("provider score_tools failed, using local heuristic: {e}");
                let scores = self
                    .fallback
                    .score_tools(system_prompt, user_message, tools)
                    .await
                    .expect("local heuristic client never fails");
                (scores, FallbackOutcome::Fallback)
            }
        }
    }

    pub async fn plan_tool_args(&self, request: PlanArgsRequest<'_>) -> (Value, FallbackOutcome) {
        let tool = request.tool;
        let user_message = request.user_message;
        let context = request.context;
        match self
            .primary
            .plan_tool_args(PlanArgsRequest { user_message, tool, context })
            .await
        {
            Ok(args) => (args, FallbackOutcome::Primary),
            Err(e) => {
                tracing::warn!("provider plan_tool_args failed, using local heuristic: {e}");
                let args = self
                    .fallback
                    .plan_tool_args(PlanArgsRequest { user_message, tool, context })
                    .await
                    .expect("local heuristic client never fails");
                (args, FallbackOutcome::Fallback)
            }
        }
    }

    pub async fn synthesize_response(
        &self,
        user_message: &str,
        tool_result: Option<&crate::tools::ToolResult>,
        memory_snippets: &[String],
    ) -> (String, FallbackOutcome) {
        match self
            .primary
            .synthesize_response(user_message, tool_result, memory_snippets)
            .await
        {
            Ok(text) => (text, FallbackOutcome::Primary),
            Err(e) => {
                tracing::warn!("provider synthesize_response failed, using canned apology: {e}");
                let text = self
                    .fallback
                    .synthesize_response(user_message, tool_result, memory_snippets)
                    .await
                    .expect("local heuristic client never fails");
                (text, FallbackOutcome::Fallback)
            }
        }
    }
}
