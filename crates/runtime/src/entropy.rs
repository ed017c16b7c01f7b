//! EntropyScheduler: decides whether to act on a tool or ask for clarification
//! by measuring the Shannon entropy of the normalized tool-score distribution.

use std::collections::BTreeMap;

/// Outcome of [`EntropyScheduler::decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Act { tool: String, confidence: f64 },
    Clarify { reason: String, entropy: Option<f64> },
}

/// Pure, deterministic entropy-based decision gate.
///
/// `scores` uses a `BTreeMap` rather than a `HashMap` so that iteration order
/// (and therefore tie-breaking on argmax) is stable across calls, which the
/// "decision determinism" property in spec.md §8 requires.
#[derive(Debug, Clone)]
pub struct EntropyScheduler;

impl EntropyScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, scores: &BTreeMap<String, f64>, threshold: f64) -> Decision {
        if scores.is_empty() {
            return Decision::Clarify {
                reason: "no-signal".into(),
                entropy: None,
            };
        }

        let total: f64 = scores.values().sum();
        if total <= 0.0 {
            return Decision::Clarify {
                reason: "no-signal".into(),
                entropy: None,
            };
        }

        if scores.len() == 1 {
            let (name, score) = scores.iter().next().unwrap();
            return if *score > 0.0 {
                Decision::Act {
                    tool: name.clone(),
                    confidence: 1.0,
                }
            } else {
                Decision::Clarify {
                    reason: "no-signal".into(),
                    entropy: None,
                }
            };
        }

        let probs: Vec<(&String, f64)> = scores.iter().map(|(k, v)| (k, v / total)).collect();
        let entropy = shannon_entropy(probs.iter().map(|(_, p)| *p));

        if entropy >= threshold {
            return Decision::Clarify {
                reason: "entropy-above-threshold".into(),
                entropy: Some(entropy),
            };
        }

        let (top_tool, _) = probs
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("non-empty scores checked above");

        let h_max = (scores.len() as f64).log2();
        let confidence = if h_max > 0.0 { 1.0 - entropy / h_max } else { 1.0 };

        Decision::Act {
            tool: (*top_tool).clone(),
            confidence,
        }
    }
}

impl Default for EntropyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Shannon entropy in bits, with the 0*log(0) = 0 convention.
pub fn shannon_entropy(probs: impl Iterator<Item = f64>) -> f64 {
    probs
        .map(|p| if p <= 0.0 { 0.0 } else { -p * p.log2() })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn scenario_1_clarify_on_ambiguity() {
        // Tools = {A, B, C}, scores all equal, τ=1.5. H = log2(3) ≈ 1.585 ≥ τ.
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        let decision = scheduler.decide(&s, 1.5);
        match decision {
            Decision::Clarify { reason, entropy } => {
                assert_eq!(reason, "entropy-above-threshold");
                assert!((entropy.unwrap() - 3f64.log2()).abs() < 1e-9);
            }
            other => panic!("expected Clarify, got {other:?}"),
        }
    }

    #[test]
    fn scenario_2_act_on_confidence() {
        // Scores = {A: 9, B: 1}, p = {0.9, 0.1}, H ≈ 0.469 bits, τ=1.5 → Act(A).
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 9.0), ("B", 1.0)]);
        let decision = scheduler.decide(&s, 1.5);
        match decision {
            Decision::Act { tool, confidence } => {
                assert_eq!(tool, "A");
                assert!(confidence > 0.5);
            }
            other => panic!("expected Act, got {other:?}"),
        }
    }

    #[test]
    fn all_zero_scores_clarify_no_signal() {
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 0.0), ("B", 0.0)]);
        assert_eq!(
            scheduler.decide(&s, 1.5),
            Decision::Clarify {
                reason: "no-signal".into(),
                entropy: None
            }
        );
    }

    #[test]
    fn single_tool_acts_if_positive() {
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 3.0)]);
        assert_eq!(
            scheduler.decide(&s, 1.5),
            Decision::Act {
                tool: "A".into(),
                confidence: 1.0
            }
        );
    }

    #[test]
    fn single_tool_with_zero_score_clarifies() {
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 0.0)]);
        assert!(matches!(
            scheduler.decide(&s, 1.5),
            Decision::Clarify { reason, .. } if reason == "no-signal"
        ));
    }

    #[test]
    fn decision_is_deterministic() {
        let scheduler = EntropyScheduler::new();
        let s = scores(&[("A", 5.0), ("B", 2.0), ("C", 1.0)]);
        assert_eq!(scheduler.decide(&s, 1.5), scheduler.decide(&s, 1.5));
    }

    #[test]
    fn entropy_monotonicity() {
        // Adding mass to the top candidate never increases H.
        let p_before = [0.5, 0.3, 0.2];
        let p_after = [0.7, 0.2, 0.1];
        let h_before = shannon_entropy(p_before.into_iter());
        let h_after = shannon_entropy(p_after.into_iter());
        assert!(h_after <= h_before);
    }
}
