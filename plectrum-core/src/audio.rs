//! # Audio Capture Module
//!
//! Real-time audio capture using CPAL (Cross-Platform Audio Library).
//! Opens an input stream on the requested device and hands fixed-size
//! blocks of the first channel to the processing side over a channel.
//!
//! ## Real-time constraints
//! The stream callback runs on the audio driver's thread and must never
//! block. It only deinterleaves, accumulates, and `try_send`s; whether a
//! full queue drops the block is decided by how the channel was built
//! (see [`QueuePolicy`](crate::QueuePolicy)).

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Sender, TrySendError};

use crate::config::DetectorConfig;

/// One block of captured audio: mono samples plus the rate they were
/// captured at. Ownership moves capture -> queue -> processing; a block is
/// never shared between threads.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Starts audio capture on the configured device.
///
/// This function:
/// 1. Opens the named input device, or the host default when none is named
/// 2. Picks an f32 input config near the requested sample rate, preferring
///    the requested channel count
/// 3. Builds and plays a stream whose callback re-blocks the first channel
///    into `config.block_size`-sample [`AudioBlock`]s and enqueues them
///
/// # Arguments
/// * `sender` - Channel sender carrying blocks to the processing thread
/// * `config` - Capture parameters (device, rate, block size, channels)
///
/// # Returns
/// * `Ok((stream, sample_rate))` - The live stream handle and the actual
///   capture rate. Dropping the handle stops capture.
/// * `Err(e)` - No device, no suitable format, or the stream failed to
///   open; nothing is left running.
///
/// Stream errors reported after startup are logged and do not stop the
/// session.
pub fn start_capture(
    sender: Sender<AudioBlock>,
    config: &DetectorConfig,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = match &config.device {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
            .ok_or_else(|| anyhow!("input device {name:?} not found"))?,
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("no input device available"))?,
    };
    tracing::info!("using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, config.sample_rate, config.channels)
        .ok_or_else(|| anyhow!("no suitable f32 input format found"))?;

    let channels = supported.channels() as usize;
    let sample_rate = config
        .sample_rate
        .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let stream_config: cpal::StreamConfig = supported
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();
    tracing::info!(sample_rate, channels, "selected input config");

    let err_fn = |err| tracing::error!("audio stream error: {err}");

    let block_size = config.block_size;
    // Accumulates first-channel samples across callbacks until a full block
    // is available.
    let mut pending = Vec::with_capacity(block_size * 2);
    let mut dropped_blocks: u64 = 0;

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Leftmost channel of the interleaved frames.
            pending.extend(data.iter().step_by(channels).copied());

            while pending.len() >= block_size {
                let samples = pending[..block_size].to_vec();
                pending.drain(..block_size);

                match sender.try_send(AudioBlock {
                    samples,
                    sample_rate,
                }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped_blocks += 1;
                        if dropped_blocks == 1 {
                            tracing::warn!("processing is behind; dropping newest audio blocks");
                        }
                    }
                    // Processing side is gone; the stream is about to be
                    // torn down as well.
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Names of every input device the default host exposes.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(host
        .input_devices()?
        .filter_map(|device| device.name().ok())
        .collect())
}

/// Finds the best supported audio configuration for the capture contract.
///
/// Only f32 formats are considered. Configs with the requested channel count
/// rank first; ties break on distance between the requested rate and the
/// config's supported rate range (zero when the range contains it).
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
    target_channels: u16,
) -> Option<SupportedStreamConfigRange> {
    let rate_distance = |c: &SupportedStreamConfigRange| {
        if c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0 {
            return 0;
        }
        let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
        let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
        min_diff.min(max_diff)
    };

    configs
        .into_iter()
        .filter(|c| c.channels() > 0 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| (c.channels() != target_channels, rate_distance(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_channel_deinterleave() {
        // Stereo frames [L, R]; only the left channel survives.
        let data = [0.1_f32, -0.1, 0.2, -0.2, 0.3, -0.3];
        let left: Vec<f32> = data.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn reblocking_drains_whole_blocks_and_keeps_the_remainder() {
        let mut pending: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let block_size = 4;
        let mut blocks = Vec::new();
        while pending.len() >= block_size {
            blocks.push(pending[..block_size].to_vec());
            pending.drain(..block_size);
        }
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(blocks[1], vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(pending, vec![8.0, 9.0]);
    }
}
