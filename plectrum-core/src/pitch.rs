//! # Pitch Estimation Module
//!
//! Estimates the fundamental frequency of a block of audio samples using the
//! autocorrelation method: a periodic signal correlates strongly with itself
//! when shifted by one period, so the lag of the dominant autocorrelation
//! peak gives the period directly.
//!
//! ## Method
//! - DC offset removal before correlating
//! - Exact linear autocorrelation computed through an FFT
//! - The decaying zero-lag peak is skipped before searching for the period,
//!   otherwise lag 0 would always win

use rustfft::{num_complex::Complex, FftPlanner};

/// Estimates the fundamental frequency of `signal` in Hz.
///
/// The search walks the non-negative-lag autocorrelation: it skips forward to
/// the first upturn (the end of the zero-lag peak's decay), then takes the
/// lag of the global maximum from there as the period.
///
/// # Arguments
/// * `signal` - One block of mono samples
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// * `Some(frequency)` - Estimated fundamental in Hz
/// * `None` - No discernible periodicity (silence, constant input, or a
///   correlation that never turns upward)
///
/// Low-amplitude noise can still produce a spurious peak and therefore a
/// spurious frequency; callers are expected to filter estimates against a
/// plausible pitch range.
pub fn detect_pitch_autocorrelation(signal: &[f32], sample_rate: u32) -> Option<f32> {
    if signal.len() < 2 {
        return None;
    }
    let corr = autocorrelate(signal);

    // First lag where the first difference turns positive, i.e. the first
    // local minimum after the zero-lag peak.
    let start = corr.windows(2).position(|w| w[1] > w[0])?;

    // Global maximum from that lag onward.
    let mut peak = start;
    let mut peak_value = corr[start];
    for (lag, &value) in corr.iter().enumerate().skip(start + 1) {
        if value > peak_value {
            peak = lag;
            peak_value = value;
        }
    }

    // Degenerate: the search collapsed back onto zero lag.
    if peak == 0 {
        return None;
    }

    Some(sample_rate as f32 / peak as f32)
}

/// Linear autocorrelation of the de-meaned signal, non-negative lags only.
///
/// Index 0 is zero lag (total energy). Computed with the FFT: pad to at
/// least twice the input length so the circular convolution equals the
/// linear one, transform, multiply by the complex conjugate, transform back.
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let mean = signal.iter().sum::<f32>() / n as f32;

    let padded_len = (2 * n).next_power_of_two();
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex {
            re: sample - mean,
            im: 0.0,
        })
        .collect();
    buffer.resize(padded_len, Complex { re: 0.0, im: 0.0 });

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(padded_len).process(&mut buffer);
    for bin in buffer.iter_mut() {
        *bin = *bin * bin.conj();
    }
    planner.plan_fft_inverse(padded_len).process(&mut buffer);

    // rustfft leaves the inverse unscaled.
    buffer
        .iter()
        .take(n)
        .map(|c| c.re / padded_len as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_yields_no_pitch() {
        let block = vec![0.0; 8192];
        assert_eq!(detect_pitch_autocorrelation(&block, 44100), None);
    }

    #[test]
    fn constant_block_yields_no_pitch() {
        // Pure DC: nothing is left after mean removal.
        let block = vec![0.7; 8192];
        assert_eq!(detect_pitch_autocorrelation(&block, 44100), None);
    }

    #[test]
    fn degenerate_lengths_yield_no_pitch() {
        assert_eq!(detect_pitch_autocorrelation(&[], 44100), None);
        assert_eq!(detect_pitch_autocorrelation(&[0.5], 44100), None);
    }

    #[test]
    fn pure_tone_is_recovered_within_two_percent() {
        let block = sine(220.0, 44100, 8192);
        let estimate = detect_pitch_autocorrelation(&block, 44100).unwrap();
        assert!(
            (estimate - 220.0).abs() / 220.0 < 0.02,
            "estimated {} Hz",
            estimate
        );
    }

    #[test]
    fn low_e_string_is_recovered() {
        // E2 at 82.41 Hz, the lowest standard guitar fundamental.
        let block = sine(82.41, 44100, 8192);
        let estimate = detect_pitch_autocorrelation(&block, 44100).unwrap();
        assert!(
            (estimate - 82.41).abs() / 82.41 < 0.02,
            "estimated {} Hz",
            estimate
        );
    }

    #[test]
    fn estimate_tracks_the_sample_rate() {
        // The same waveform played at twice the rate is an octave up.
        let block = sine(110.0, 44100, 8192);
        let at_44100 = detect_pitch_autocorrelation(&block, 44100).unwrap();
        let at_88200 = detect_pitch_autocorrelation(&block, 88200).unwrap();
        assert!((at_88200 / at_44100 - 2.0).abs() < 0.01);
    }

    #[test]
    fn dc_offset_does_not_bias_the_estimate() {
        let block: Vec<f32> = sine(196.0, 44100, 8192).iter().map(|s| s + 0.4).collect();
        let estimate = detect_pitch_autocorrelation(&block, 44100).unwrap();
        assert!(
            (estimate - 196.0).abs() / 196.0 < 0.02,
            "estimated {} Hz",
            estimate
        );
    }
}
