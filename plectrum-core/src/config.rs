//! Detector configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hand-off queue behavior between the capture callback and the processing
/// thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Never drop a block. The queue grows without bound if processing falls
    /// behind capture.
    Unbounded,
    /// Hold at most this many pending blocks. On overflow the newest block
    /// is dropped; the capture callback never waits for space.
    Bounded(usize),
}

/// Configuration for one [`PitchDetector`](crate::PitchDetector) session.
///
/// The defaults match a guitar setup: CD-rate stereo capture with the first
/// channel used, large blocks for low-frequency resolution, and an accepted
/// pitch range bracketing the instrument's fundamentals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Input device name. `None` selects the host's default input.
    pub device: Option<String>,
    /// Gain multiplier applied to every sample before normalization.
    pub gain: f32,
    /// Requested capture sample rate in Hz. Clamped into the device's
    /// supported range when the hardware cannot do it exactly.
    pub sample_rate: u32,
    /// Samples per analysis block. At 44100 Hz a block of 8192 covers about
    /// 186 ms, enough to resolve a low E string.
    pub block_size: usize,
    /// Preferred capture channel count. Only the first channel is analyzed.
    pub channels: u16,
    /// Lower bound of accepted pitch estimates, exclusive.
    pub min_frequency: f32,
    /// Upper bound of accepted pitch estimates, exclusive.
    pub max_frequency: f32,
    /// How long the processing thread waits for a block before re-checking
    /// the stop flag. This is the worst-case shutdown latency.
    pub poll_interval_ms: u64,
    /// Hand-off queue policy.
    pub queue: QueuePolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            device: None,
            gain: 10.0,
            sample_rate: 44100,
            block_size: 8192,
            channels: 2,
            min_frequency: 40.0,
            max_frequency: 1200.0,
            poll_interval_ms: 100,
            queue: QueuePolicy::Unbounded,
        }
    }
}

impl DetectorConfig {
    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_capture_contract() {
        let config = DetectorConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 8192);
        assert_eq!(config.channels, 2);
        assert_eq!(config.gain, 10.0);
        assert_eq!(config.queue, QueuePolicy::Unbounded);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = DetectorConfig {
            device: Some("USB Audio".into()),
            queue: QueuePolicy::Bounded(32),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.device.as_deref(), Some("USB Audio"));
        assert_eq!(back.queue, QueuePolicy::Bounded(32));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let back: DetectorConfig = serde_json::from_str(r#"{"gain": 4.0}"#).unwrap();
        assert_eq!(back.gain, 4.0);
        assert_eq!(back.sample_rate, 44100);
    }
}
