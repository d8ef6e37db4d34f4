//! Latency history for the player's diagnostic display

use serde::{Deserialize, Serialize};

/// Diagnostic timing state of a playback session
///
/// `latency_history` keeps every sample in arrival order, duplicates
/// included. No cap is applied here; a consumer wanting a bounded view can
/// slice the tail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Most recent playback position reported by the engine (seconds)
    pub player_time: f64,
    /// Every latency sample received, oldest first (seconds)
    pub latency_history: Vec<f64>,
}

impl DebugInfo {
    /// Latest latency sample
    pub fn latest(&self) -> Option<f64> {
        self.latency_history.last().copied()
    }

    /// Mean of all samples
    pub fn mean(&self) -> Option<f64> {
        if self.latency_history.is_empty() {
            return None;
        }
        Some(self.latency_history.iter().sum::<f64>() / self.latency_history.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.latency_history.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.latency_history.iter().copied().reduce(f64::max)
    }

    /// Number of samples recorded so far
    pub fn len(&self) -> usize {
        self.latency_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latency_history.is_empty()
    }
}

/// Reducer folding engine timing samples into [`DebugInfo`]
pub struct LatencyTracker;

impl LatencyTracker {
    /// Append `sample` and replace the player time
    ///
    /// `previous` is `None` for the first sample of a session.
    pub fn record(previous: Option<&DebugInfo>, sample: f64, player_time: f64) -> DebugInfo {
        let mut latency_history = previous
            .map(|info| info.latency_history.clone())
            .unwrap_or_default();
        latency_history.push(sample);

        DebugInfo {
            player_time,
            latency_history,
        }
    }
}
