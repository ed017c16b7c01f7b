//! AgentLoop: per-turn orchestration tying memory, skills, entropy gating,
//! tool execution, consolidation, subagent review, and hooks together.
//!
//! A straightforward enum/match state machine, deliberately simpler than the
//! teacher's typestate-generic `reasoning/reasoning_loop.rs` phase runner —
//! recorded as an Open Question resolution in `DESIGN.md`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::consolidation::DualMemoryStore;
use crate::context::{ContextBuilder, ContextMessage};
use crate::entropy::{Decision, EntropyScheduler};
use crate::error::RuntimeError;
use crate::hooks::{HookContext, HookRegistry};
use crate::memory::{MemoryError, MemoryRecord, VectorMemory};
use crate::provider::{FallbackProvider, ProviderClient};
use crate::session::{Role, SessionStore};
use crate::skills::{SelectionReason, SkillLibrary};
use crate::subagent::SubagentCoordinator;
use crate::threshold::{AdaptiveThreshold, ThresholdSnapshot};
use crate::tools::{ToolRegistry, ToolResult};

pub const DEFAULT_TURN_DEADLINE: Duration = Duration::from_secs(120);
pub const DEFAULT_MEMORY_RECALL_K: usize = 5;
pub const DEFAULT_CHAIN_MARGIN: f64 = 0.1;

/// The final outcome of one turn: the text sent back to the user plus
/// whatever the turn decided to do, useful for channel adapters and tests.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub acted: bool,
    pub tool_used: Option<String>,
}

pub struct AgentLoop<P: ProviderClient> {
    config: Config,
    sessions: SessionStore,
    memory: Arc<dyn VectorMemory>,
    skills: SkillLibrary,
    tools: Arc<dyn ToolRegistry>,
    context: ContextBuilder,
    provider: FallbackProvider<P>,
    threshold: AdaptiveThreshold,
    entropy: EntropyScheduler,
    consolidation: DualMemoryStore,
    subagent: SubagentCoordinator,
    hooks: HookRegistry,
    turn_deadline: Duration,
}

impl<P: ProviderClient> AgentLoop<P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        sessions: SessionStore,
        memory: Arc<dyn VectorMemory>,
        skills: SkillLibrary,
        tools: Arc<dyn ToolRegistry>,
        context: ContextBuilder,
        provider: FallbackProvider<P>,
        threshold: AdaptiveThreshold,
        consolidation: DualMemoryStore,
        hooks: HookRegistry,
    ) -> Self {
        Self {
            config,
            sessions,
            memory,
            skills,
            tools,
            context,
            provider,
            threshold,
            entropy: EntropyScheduler::new(),
            consolidation,
            subagent: SubagentCoordinator::default(),
            hooks,
            turn_deadline: DEFAULT_TURN_DEADLINE,
        }
    }

    /// Run one full turn for `session_id`/`channel`. No two turns for the
    /// same `session_id` may run concurrently — callers serialize per
    /// session (e.g. one task per session_id, or a per-session queue).
    pub async fn handle_message(
        &self,
        session_id: &str,
        channel: &str,
        user_message: &str,
    ) -> Result<TurnOutcome, RuntimeError> {
        match tokio::time::timeout(self.turn_deadline, self.run_turn(session_id, channel, user_message)).await {
            Ok(result) => result,
            Err(_) => Err(RuntimeError::TurnDeadlineExceeded(self.turn_deadline)),
        }
    }

    async fn run_turn(
        &self,
        session_id: &str,
        channel: &str,
        user_message: &str,
    ) -> Result<TurnOutcome, RuntimeError> {
        let now = MemoryRecord::now_secs();

        // 1. Receive
        let mut session = self.sessions.get_or_create(session_id, channel).await;
        session.push(Role::User, user_message, now);

        let hook_ctx = HookContext {
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            metadata: Value::Null,
        };
        self.hooks.on_turn_start(&hook_ctx).await;

        // 2. Recall
        let (query_embeddings, _) = self.provider.embed(&[user_message.to_string()]).await;
        let query_embedding = query_embeddings.into_iter().next().unwrap_or_default();
        let recalled = self.memory.recall(&query_embedding, DEFAULT_MEMORY_RECALL_K, now).await;
        let memory_snippets: Vec<String> = recalled.iter().map(|(record, _)| record.text.clone()).collect();

        // 3. Skills
        let activations = self.skills.select_for_message(user_message).unwrap_or_default();
        for activation in &activations {
            let _ = self.skills.record_use(&activation.name, session_id, now).await;
        }
        let skills_on_disk = self.skills.list().unwrap_or_default();
        let skill_prompts: Vec<String> = activations
            .iter()
            .filter_map(|a| skills_on_disk.iter().find(|s| s.name() == a.name))
            .map(|s| s.body.clone())
            .collect();

        // 4. Context
        let messages = self
            .context
            .build(&skill_prompts, &memory_snippets, &session.history, user_message);

        // 5. Score, with skill short-circuit
        let known_tools = self.tools.list();
        let short_circuit = activations.iter().find(|a| {
            a.reason == SelectionReason::ExplicitMention && known_tools.iter().any(|t| t.name == a.name)
        });

        let entropy_threshold = self.threshold.current();
        let (mut decision, mut entropy_at_decision) = if let Some(skill) = short_circuit {
            (
                Decision::Act {
                    tool: skill.name.clone(),
                    confidence: 1.0,
                },
                0.0,
            )
        } else {
            let scores = self
                .provider
                .score_tools(self.context.stable_prefix(), user_message, &known_tools)
                .await
                .0;
            let entropy = normalized_entropy(&scores);
            (self.entropy.decide(&scores, entropy_threshold), entropy)
        };

        // 6/7/8/9: decide, plan, execute, chain
        let mut chain_depth = 0usize;
        let mut last_result: Option<ToolResult> = None;
        let mut effective_user_message = user_message.to_string();

        loop {
            match &decision {
                Decision::Clarify { .. } => break,
                Decision::Act { tool, .. } => {
                    let tool_name = tool.clone();

                    let tool_descriptor = known_tools.iter().find(|t| &t.name == tool);
                    let Some(tool_descriptor) = tool_descriptor else {
                        decision = Decision::Clarify {
                            reason: "args-invalid".into(),
                            entropy: None,
                        };
                        break;
                    };

                    let plan_request = crate::provider::PlanArgsRequest {
                        user_message: &effective_user_message,
                        tool: tool_descriptor,
                        context: &messages,
                    };
                    let (args, _) = self.provider.plan_tool_args(plan_request).await;
                    let args = match self.tools.validate(&tool_name, &args) {
                        Ok(()) => args,
                        Err(_) => {
                            // Re-plan once via the local heuristic, then give up to Clarify.
                            let fallback_client = crate::provider::LocalHeuristicClient;
                            let replan_request = crate::provider::PlanArgsRequest {
                                user_message: &effective_user_message,
                                tool: tool_descriptor,
                                context: &messages,
                            };
                            let replanned = fallback_client.plan_tool_args(replan_request).await;
                            match replanned.ok().filter(|a| self.tools.validate(&tool_name, a).is_ok()) {
                                Some(valid_args) => valid_args,
                                None => {
                                    decision = Decision::Clarify {
                                        reason: "args-invalid".into(),
                                        entropy: None,
                                    };
                                    break;
                                }
                            }
                        }
                    };

                    let result = self
                        .tools
                        .run(&tool_name, args, Duration::from_secs(self.config.tool_timeout_seconds))
                        .await
                        .unwrap_or_else(|e| ToolResult::failed(e.to_string(), 0));

                    self.hooks.on_tool_result(&hook_ctx, &result).await;

                    let success = result.success;
                    last_result = Some(result.clone());

                    if !success || chain_depth + 1 >= self.config.max_tool_chain {
                        break;
                    }

                    effective_user_message = format!("{user_message}\n\n{}", result.output);
                    let (rescored, _) = self
                        .provider
                        .score_tools(self.context.stable_prefix(), &effective_user_message, &known_tools)
                        .await;
                    let next_entropy = normalized_entropy(&rescored);
                    let next_decision = self.entropy.decide(&rescored, entropy_threshold);

                    match &next_decision {
                        Decision::Act { tool: next_tool, confidence: next_confidence }
                            if next_tool != &tool_name && *next_confidence >= entropy_threshold + DEFAULT_CHAIN_MARGIN =>
                        {
                            chain_depth += 1;
                            entropy_at_decision = next_entropy;
                            decision = next_decision;
                            continue;
                        }
                        _ => break,
                    }
                }
            }
        }

        // 10. Synthesize
        let (mut response, _) = self
            .provider
            .synthesize_response(user_message, last_result.as_ref(), &memory_snippets)
            .await;

        let acted = matches!(decision, Decision::Act { .. }) && last_result.is_some();

        if acted {
            if let (Decision::Act { confidence, .. }, Some(result)) = (&decision, &last_result) {
                if self.subagent.should_review(*confidence, result) {
                    let review = self.subagent.review(self.provider.primary(), user_message, result).await;
                    response = SubagentCoordinator::with_review(response, review);
                }
            }
        }

        session.push(Role::Assistant, &response, now);

        // 11. Memory store
        let (combined_embeddings, _) = self
            .provider
            .embed(&[format!("{user_message}\n{response}")])
            .await;
        if let Some(embedding) = combined_embeddings.into_iter().next() {
            let _ = self
                .memory
                .store(
                    format!("{user_message} -> {response}"),
                    embedding,
                    now,
                    Default::default(),
                )
                .await;
        }

        // 12. Adaptive update
        let success = last_result.as_ref().map(|r| r.success).unwrap_or(true);
        self.threshold.observe(acted, success, entropy_at_decision);

        // 13. Consolidation check
        if let Some(window) = self.consolidation.try_trigger(session_id, session.history.len(), session.consolidation_offset) {
            let entries = session.history[window.offset..window.end.min(session.history.len())].to_vec();
            match self.consolidation.consolidate(self.provider.primary(), &window, &entries).await {
                Ok(new_offset) => session.advance_consolidation_offset(new_offset),
                Err(e) => tracing::warn!("consolidation failed for session {session_id}: {e}"),
            }
            self.consolidation.finish(session_id);
        }

        // 14. Persist
        let tool_used = match &decision {
            Decision::Act { tool, .. } if acted => Some(tool.clone()),
            _ => None,
        };
        self.sessions.put(session).await?;
        self.hooks.on_turn_end(&hook_ctx, &response).await;

        Ok(TurnOutcome {
            response,
            acted,
            tool_used,
        })
    }

    /// Clone of the inner messages helper, kept for `ContextMessage` users
    /// outside this module. Exposed for CLI/channel callers that need the
    /// raw context without running a turn.
    pub fn build_context(&self, skill_prompts: &[String], memory_snippets: &[String], history: &[crate::session::HistoryEntry], current: &str) -> Vec<ContextMessage> {
        self.context.build(skill_prompts, memory_snippets, history, current)
    }

    /// The adaptive threshold's current state, for `threshold-stats` and for
    /// persisting across per-invocation CLI processes.
    pub fn threshold_snapshot(&self) -> ThresholdSnapshot {
        self.threshold.snapshot()
    }

    pub fn tool_registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.tools
    }

    /// Flush the in-memory vector store to disk.
    pub async fn save_memory(&self, path: &std::path::Path) -> Result<(), MemoryError> {
        self.memory.save(path).await
    }
}

/// Shannon entropy (bits) of a tool-score distribution, normalized to sum
/// to 1. Mirrors the normalization [`EntropyScheduler::decide`] applies
/// internally, kept separate so the adaptive threshold can be fed the
/// entropy value that drove a decision regardless of which branch it took.
fn normalized_entropy(scores: &crate::provider::ToolScores) -> f64 {
    let total: f64 = scores.values().sum();
    if scores.is_empty() || total <= 0.0 {
        return 0.0;
    }
    crate::entropy::shannon_entropy(scores.values().map(|v| v / total))
}

