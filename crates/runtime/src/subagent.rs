//! SubagentCoordinator: an optional second provider call that reviews a
//! tool's output and appends its verdict to the final response.
//!
//! Grounded on the same bounded-call shape `provider::FallbackProvider` uses
//! (a single provider method call, converted into an infallible outcome for
//! the turn loop) but adds a hard wall-clock budget since review is strictly
//! additive and must never stall a turn.

use std::time::Duration;

use crate::provider::{ChatOptions, ProviderClient};
use crate::tools::ToolResult;

/// Confidence above which a reviewable tool result triggers a subagent pass.
/// Per the expanded spec's Open Question resolution, this threshold is
/// independent of [`crate::threshold::AdaptiveThreshold`] — a subagent
/// review never feeds back into the adaptive entropy gate.
pub const DEFAULT_TAU_SUB: f64 = 0.7;
pub const DEFAULT_REVIEW_BUDGET: Duration = Duration::from_secs(5);

pub struct SubagentCoordinator {
    tau_sub: f64,
    budget: Duration,
}

impl Default for SubagentCoordinator {
    fn default() -> Self {
        Self {
            tau_sub: DEFAULT_TAU_SUB,
            budget: DEFAULT_REVIEW_BUDGET,
        }
    }
}

impl SubagentCoordinator {
    pub fn new(tau_sub: f64, budget: Duration) -> Self {
        Self { tau_sub, budget }
    }

    /// Whether `confidence` and `result` together warrant a review pass. A
    /// reviewable artifact is a successful result carrying structured `data`.
    pub fn should_review(&self, confidence: f64, result: &ToolResult) -> bool {
        confidence > self.tau_sub && result.success && result.data.is_some()
    }

    /// Run the review call against `provider`, bounded by the configured
    /// budget. Returns `None` on timeout or provider error — review is
    /// best-effort and must never surface as a turn failure.
    pub async fn review<P: ProviderClient>(
        &self,
        provider: &P,
        user_message: &str,
        result: &ToolResult,
    ) -> Option<String> {
        let prompt = format!(
            "Review this tool result for the request \"{user_message}\" and note anything the user should double-check:\n\n{}",
            result.output
        );
        let messages = [crate::context::ContextMessage {
            role: crate::session::Role::User,
            content: prompt,
        }];

        match tokio::time::timeout(self.budget, provider.chat(&messages, &ChatOptions::default())).await {
            Ok(Ok(review)) => Some(review),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Append a review to the synthesized response, if one was produced.
    pub fn with_review(response: String, review: Option<String>) -> String {
        match review {
            Some(review) => format!("{response}\n\n---\nReview: {review}"),
            None => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LocalHeuristicClient;

    fn reviewable_result() -> ToolResult {
        ToolResult::ok("42 degrees", Some(serde_json::json!({"temp_f": 42})), 1)
    }

    #[test]
    fn should_review_requires_confidence_above_tau_and_data() {
        let coordinator = SubagentCoordinator::default();
        assert!(coordinator.should_review(0.8, &reviewable_result()));
        assert!(!coordinator.should_review(0.5, &reviewable_result()));

        let no_data = ToolResult::ok("done", None, 1);
        assert!(!coordinator.should_review(0.9, &no_data));
    }

    #[test]
    fn should_review_rejects_failed_results() {
        let coordinator = SubagentCoordinator::default();
        let failed = ToolResult::failed("boom", 1);
        assert!(!coordinator.should_review(0.9, &failed));
    }

    #[tokio::test]
    async fn review_returns_text_from_provider() {
        let coordinator = SubagentCoordinator::default();
        let provider = LocalHeuristicClient;
        let result = reviewable_result();
        let review = coordinator.review(&provider, "what's the weather", &result).await;
        assert!(review.is_some());
    }

    #[test]
    fn with_review_appends_only_when_present() {
        assert_eq!(SubagentCoordinator::with_review("base".to_string(), None), "base");
        assert_eq!(
            SubagentCoordinator::with_review("base".to_string(), Some("looks fine".to_string())),
            "base\n\n---\nReview: looks fine"
        );
    }
}
