//! AdaptiveThreshold: an online-tuned entropy threshold driven by observed
//! turn outcomes.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const RING_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub tau_init: f64,
    pub tau_min: f64,
    pub tau_max: f64,
    pub tau_floor: f64,
    pub eta: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            tau_init: 1.5,
            tau_min: 0.3,
            tau_max: 3.0,
            tau_floor: 0.3,
            eta: 0.1,
        }
    }
}

// Reserved for a future windowed win-rate metric (distinct from the
// lifetime success_count/failure_count `stats()` reports today).
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
struct Outcome {
    acted: bool,
    success: bool,
}

struct State {
    tau: f64,
    success_count: u64,
    failure_count: u64,
    history: VecDeque<Outcome>,
}

/// Thread-safe, online-tuned decision threshold (entropy, in bits).
pub struct AdaptiveThreshold {
    config: ThresholdConfig,
    state: Mutex<State>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub tau: f64,
    pub win_rate: f64,
    pub sample_count: u64,
}

/// On-disk shape for `~/.picoagent/threshold.json`. The sliding-window
/// history is not persisted — only the learned `tau` and lifetime counters
/// survive a restart, so the CLI's per-invocation process keeps adapting
/// across runs instead of resetting to `tau_init` every time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub tau: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl AdaptiveThreshold {
    pub fn new(config: ThresholdConfig) -> Self {
        assert!(config.eta > 0.0 && config.eta <= 0.5, "eta must be in (0, 0.5]");
        Self {
            state: Mutex::new(State {
                tau: config.tau_init.clamp(config.tau_min, config.tau_max),
                success_count: 0,
                failure_count: 0,
                history: VecDeque::with_capacity(RING_CAPACITY),
            }),
            config,
        }
    }

    pub fn current(&self) -> f64 {
        self.state.lock().tau
    }

    /// Update τ online given the outcome of a turn.
    pub fn observe(&self, acted: bool, success: bool, entropy_at_decision: f64) {
        let mut state = self.state.lock();
        let eta = self.config.eta;

        if acted {
            if success {
                state.success_count += 1;
                state.tau += eta * (entropy_at_decision - state.tau);
            } else {
                state.failure_count += 1;
                state.tau -= eta * (state.tau - self.config.tau_min);
            }
        } else {
            state.tau -= (eta / 4.0) * (state.tau - self.config.tau_floor);
        }
        state.tau = state.tau.clamp(self.config.tau_min, self.config.tau_max);

        if state.history.len() == RING_CAPACITY {
            state.history.pop_front();
        }
        state.history.push_back(Outcome { acted, success });
    }

    pub fn snapshot(&self) -> ThresholdSnapshot {
        let state = self.state.lock();
        ThresholdSnapshot {
            tau: state.tau,
            success_count: state.success_count,
            failure_count: state.failure_count,
        }
    }

    /// Build a threshold whose `tau` and lifetime counters resume from
    /// `snapshot` rather than `config.tau_init`.
    pub fn from_snapshot(config: ThresholdConfig, snapshot: ThresholdSnapshot) -> Self {
        let threshold = Self::new(config);
        {
            let mut state = threshold.state.lock();
            state.tau = snapshot.tau.clamp(config.tau_min, config.tau_max);
            state.success_count = snapshot.success_count;
            state.failure_count = snapshot.failure_count;
        }
        threshold
    }

    pub fn stats(&self) -> ThresholdStats {
        let state = self.state.lock();
        let sample_count = state.success_count + state.failure_count;
        let win_rate = if sample_count > 0 {
            state.success_count as f64 / sample_count as f64
        } else {
            0.0
        };
        ThresholdStats {
            tau: state.tau,
            win_rate,
            sample_count,
        }
    }
}

impl Default for AdaptiveThreshold {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_configured_init() {
        let t = AdaptiveThreshold::default();
        assert_eq!(t.current(), 1.5);
    }

    #[test]
    fn success_pulls_threshold_toward_observed_entropy() {
        let t = AdaptiveThreshold::default();
        t.observe(true, true, 0.2);
        // tau moves toward 0.2 (down, since 0.2 < 1.5), still clamped above tau_min
        assert!(t.current() < 1.5);
        assert!(t.current() >= 0.3);
    }

    #[test]
    fn failure_pulls_threshold_down_toward_min() {
        let t = AdaptiveThreshold::default();
        let before = t.current();
        t.observe(true, false, 0.2);
        assert!(t.current() < before);
    }

    #[test]
    fn clarify_decays_slowly_toward_floor() {
        let t = AdaptiveThreshold::default();
        let before = t.current();
        t.observe(false, true, 0.0);
        assert!(t.current() < before);
    }

    #[test]
    fn clamp_holds_under_any_sequence() {
        let t = AdaptiveThreshold::default();
        for i in 0..1000 {
            let acted = i % 3 != 0;
            let success = i % 5 == 0;
            t.observe(acted, success, (i as f64 % 7.0) - 2.0);
            assert!(t.current() >= t.config.tau_min);
            assert!(t.current() <= t.config.tau_max);
        }
    }

    #[test]
    fn from_snapshot_resumes_tau_and_counters() {
        let t = AdaptiveThreshold::default();
        t.observe(true, true, 0.4);
        t.observe(true, false, 0.4);
        let snapshot = t.snapshot();

        let resumed = AdaptiveThreshold::from_snapshot(ThresholdConfig::default(), snapshot);
        assert_eq!(resumed.current(), snapshot.tau);
        assert_eq!(resumed.stats().sample_count, 2);
    }

    #[test]
    fn stats_reports_sample_counts_and_win_rate() {
        let t = AdaptiveThreshold::default();
        t.observe(true, true, 0.3);
        t.observe(true, false, 0.3);
        t.observe(false, true, 0.3);
        let stats = t.stats();
        assert_eq!(stats.sample_count, 2);
        assert!((stats.win_rate - 0.5).abs() < 1e-9);
    }
}
