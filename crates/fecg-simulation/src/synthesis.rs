//! Bench recordings synthesized from a maternal recording
//!
//! The fetal reference is the maternal ECG channel scaled down, time-compressed
//! to a faster rate and delayed. Adding it to the maternal channel gives the
//! combined recording the monitor separates again.

use fecg_core::{FecgError, FecgResult, MultiChannelBuffer, SignalSource};
use fecg_processing::FourierResampler;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters of the synthetic fetal reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Channel holding the ECG
    pub ecg_channel: usize,
    /// Fetal amplitude is the maternal amplitude divided by this
    pub amplitude_divisor: f64,
    /// Fetal heart rate as a multiple of the maternal rate
    pub rate_ratio: f64,
    /// Delay of the fetal reference in seconds
    pub time_offset_seconds: f64,
    /// Shortest allowed distance between maternal beats in seconds
    pub min_beat_interval_seconds: f64,
    /// Accepted maternal heart rate range in BPM
    pub maternal_rate_range: (f64, f64),
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            ecg_channel: 1,
            amplitude_divisor: 10.0,
            rate_ratio: 1.3,
            time_offset_seconds: 0.5,
            min_beat_interval_seconds: 0.5,
            maternal_rate_range: (60.0, 135.0),
        }
    }
}

/// Synthetic fetal ECG aligned with its maternal source
#[derive(Debug, Clone)]
pub struct FetalReference {
    /// One fetal sample per maternal sample
    pub samples: Vec<f64>,
    /// Maternal rate measured from beat intervals
    pub maternal_bpm: f64,
    /// Fetal rate implied by the compression
    pub fetal_bpm: f64,
}

/// Combined recording together with the fetal component it contains
#[derive(Debug, Clone)]
pub struct SynthesizedRecordings {
    pub combined: MultiChannelBuffer,
    pub fetal: FetalReference,
}

/// Builds fetal references and combined recordings
pub struct RecordingSynthesizer {
    config: SynthesisConfig,
    resampler: FourierResampler,
}

impl RecordingSynthesizer {
    pub fn new(config: SynthesisConfig) -> FecgResult<Self> {
        if !(config.amplitude_divisor > 0.0) || !(config.rate_ratio > 0.0) {
            return Err(FecgError::SynthesisError {
                message: "Amplitude divisor and rate ratio must be positive".to_string(),
            });
        }
        if !(config.time_offset_seconds >= 0.0) || !(config.min_beat_interval_seconds >= 0.0) {
            return Err(FecgError::SynthesisError {
                message: "Time offset and beat interval must not be negative".to_string(),
            });
        }

        Ok(RecordingSynthesizer {
            config,
            resampler: FourierResampler::new(),
        })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Maternal heart rate from the mean beat interval, checked against the accepted range
    pub fn maternal_rate(&self, maternal: &MultiChannelBuffer) -> FecgResult<f64> {
        let ecg = maternal.channel_data(self.config.ecg_channel)?;
        let min_distance =
            (self.config.min_beat_interval_seconds * maternal.scan_rate() as f64).round() as usize;

        let bpm = interval_rate_bpm(&ecg, maternal.scan_rate(), min_distance).ok_or_else(|| {
            FecgError::SynthesisError {
                message: "Fewer than two maternal beats found".to_string(),
            }
        })?;

        let (low, high) = self.config.maternal_rate_range;
        if bpm < low || bpm > high {
            return Err(FecgError::SynthesisError {
                message: format!(
                    "Maternal heart rate {:.1} BPM outside accepted range {}-{} BPM",
                    bpm, low, high
                ),
            });
        }

        debug!(bpm, "maternal rate from beat intervals");
        Ok(bpm)
    }

    /// Scaled, time-compressed and delayed maternal ECG, at its compressed length
    fn compressed_ecg(&mut self, maternal: &MultiChannelBuffer) -> FecgResult<FetalReference> {
        let maternal_bpm = self.maternal_rate(maternal)?;
        let fetal_bpm = maternal_bpm * self.config.rate_ratio;

        let scaled: Vec<f64> = maternal
            .channel(self.config.ecg_channel)?
            .iter()
            .map(|v| v / self.config.amplitude_divisor)
            .collect();

        let compressed_len = (scaled.len() as f64 * maternal_bpm / fetal_bpm) as usize;
        let compressed = self.resampler.resample(&scaled, compressed_len);

        let shift = (self.config.time_offset_seconds * maternal.scan_rate() as f64).round() as usize;
        Ok(FetalReference {
            samples: circular_shift(&compressed, shift),
            maternal_bpm,
            fetal_bpm,
        })
    }

    /// Fetal reference derived from the maternal ECG channel
    pub fn fetal_reference(&mut self, maternal: &MultiChannelBuffer) -> FecgResult<FetalReference> {
        let mut reference = self.compressed_ecg(maternal)?;
        reference.samples = fit_to_length(&reference.samples, maternal.samples_per_channel());
        Ok(reference)
    }

    /// Standalone fetal recording at the compressed length
    ///
    /// The ECG channel carries the compressed reference without padding; every
    /// other channel is linearly interpolated onto the same number of samples.
    pub fn fetal_recording(&mut self, maternal: &MultiChannelBuffer) -> FecgResult<MultiChannelBuffer> {
        let reference = self.compressed_ecg(maternal)?;
        let len = reference.samples.len();
        if len == 0 {
            return Err(FecgError::SynthesisError {
                message: "Maternal recording too short for a fetal recording".to_string(),
            });
        }

        let channels = maternal.channel_count();
        let mut columns = Vec::with_capacity(channels);
        for channel in 0..channels {
            if channel == self.config.ecg_channel {
                columns.push(reference.samples.clone());
            } else {
                columns.push(linear_resample(&maternal.channel_data(channel)?, len));
            }
        }

        let data: Vec<f64> = (0..len)
            .flat_map(|i| columns.iter().map(move |column| column[i]))
            .collect();

        info!(
            maternal_bpm = reference.maternal_bpm,
            fetal_bpm = reference.fetal_bpm,
            samples = len,
            channels,
            "synthesized fetal recording"
        );
        MultiChannelBuffer::from_interleaved(data, SignalSource::Fetal, maternal.scan_rate(), channels)
    }

    /// Combined recording: the maternal recording with the fetal reference added to its ECG channel
    pub fn combine(&mut self, maternal: &MultiChannelBuffer) -> FecgResult<SynthesizedRecordings> {
        let fetal = self.fetal_reference(maternal)?;

        let summed: Vec<f64> = maternal
            .channel(self.config.ecg_channel)?
            .iter()
            .zip(&fetal.samples)
            .map(|(m, f)| m + f)
            .collect();
        let combined = maternal.with_channel(self.config.ecg_channel, &summed, SignalSource::Combined)?;

        info!(
            maternal_bpm = fetal.maternal_bpm,
            fetal_bpm = fetal.fetal_bpm,
            samples = summed.len(),
            "synthesized combined recording"
        );

        Ok(SynthesizedRecordings { combined, fetal })
    }
}

/// Heart rate from the mean interval between beats at least `min_distance` samples apart
///
/// Beats are local maxima; where two lie closer than `min_distance` the taller
/// one is kept. Returns `None` with fewer than two beats.
pub fn interval_rate_bpm(signal: &[f64], scan_rate: u32, min_distance: usize) -> Option<f64> {
    let mut candidates: Vec<usize> = (1..signal.len().saturating_sub(1))
        .filter(|&i| signal[i] > signal[i - 1] && signal[i] > signal[i + 1])
        .collect();

    candidates.sort_by(|&a, &b| signal[b].total_cmp(&signal[a]));

    let mut beats: Vec<usize> = Vec::new();
    for candidate in candidates {
        if beats.iter().all(|&kept| kept.abs_diff(candidate) >= min_distance) {
            beats.push(candidate);
        }
    }
    beats.sort_unstable();

    if beats.len() < 2 || scan_rate == 0 {
        return None;
    }

    let span = (beats[beats.len() - 1] - beats[0]) as f64;
    let mean_interval = span / (beats.len() - 1) as f64 / scan_rate as f64;
    Some(60.0 / mean_interval)
}

/// Linear interpolation onto `len` evenly spaced points spanning the whole signal
pub fn linear_resample(signal: &[f64], len: usize) -> Vec<f64> {
    if signal.is_empty() {
        return vec![0.0; len];
    }

    let last = signal.len() - 1;
    (0..len)
        .map(|i| {
            let position = if len > 1 {
                i as f64 * last as f64 / (len - 1) as f64
            } else {
                0.0
            };
            let lower = (position.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let fraction = position - lower as f64;
            signal[lower] * (1.0 - fraction) + signal[upper] * fraction
        })
        .collect()
}

/// Rotate right by `shift` samples; the tail wraps to the front
pub fn circular_shift(signal: &[f64], shift: usize) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mut shifted = signal.to_vec();
    shifted.rotate_right(shift % signal.len());
    shifted
}

/// Trim to `len`, or pad by repeating the signal from its start
pub fn fit_to_length(signal: &[f64], len: usize) -> Vec<f64> {
    if signal.is_empty() {
        return vec![0.0; len];
    }
    signal.iter().copied().cycle().take(len).collect()
}
