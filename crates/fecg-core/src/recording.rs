//! Recording metadata and signal source classification

use serde::{Deserialize, Serialize};
use crate::error::{FecgError, FecgResult};

/// Lowest scan rate accepted for cardiac recordings
pub const MIN_SCAN_RATE: u32 = 100;
/// Highest scan rate accepted for cardiac recordings
pub const MAX_SCAN_RATE: u32 = 20_000;
/// Upper bound on interleaved channels in one recording
pub const MAX_CHANNELS: usize = 32;

/// Which cardiac source a recording holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    /// Abdominal recording with maternal and fetal activity superimposed
    Combined,
    /// Maternal activity in isolation, used as the subtraction reference
    Maternal,
    /// Fetal estimate (combined minus maternal)
    Fetal,
}

/// Recording metadata delivered alongside the raw samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Signal source of this recording
    pub source: SignalSource,
    /// Samples per second per channel
    pub scan_rate: u32,
    /// Number of interleaved channels
    pub channel_count: usize,
    /// Recording duration in seconds
    pub duration_seconds: f64,
}

impl RecordingMetadata {
    /// Create new recording metadata
    pub fn new(
        source: SignalSource,
        scan_rate: u32,
        channel_count: usize,
        duration_seconds: f64,
    ) -> FecgResult<Self> {
        Self::validate_scan_rate(scan_rate)?;
        Self::validate_channel_count(channel_count)?;

        if !(duration_seconds > 0.0) {
            return Err(FecgError::InvalidRecordingConfig {
                reason: "Duration must be positive".to_string(),
            });
        }

        Ok(RecordingMetadata {
            source,
            scan_rate,
            channel_count,
            duration_seconds,
        })
    }

    /// Validate scan rate for cardiac recordings
    pub fn validate_scan_rate(rate: u32) -> FecgResult<()> {
        if !(MIN_SCAN_RATE..=MAX_SCAN_RATE).contains(&rate) {
            Err(FecgError::InvalidScanRate {
                rate,
                valid_range: format!("{}-{}Hz", MIN_SCAN_RATE, MAX_SCAN_RATE),
            })
        } else {
            Ok(())
        }
    }

    /// Validate interleaved channel count
    pub fn validate_channel_count(count: usize) -> FecgResult<()> {
        if count == 0 || count > MAX_CHANNELS {
            Err(FecgError::InvalidChannelCount {
                count,
                max: MAX_CHANNELS,
            })
        } else {
            Ok(())
        }
    }

    /// Samples recorded per channel (`scan_rate × duration`)
    pub fn samples_per_channel(&self) -> usize {
        (self.scan_rate as f64 * self.duration_seconds).round() as usize
    }

    /// Total interleaved values expected in the raw buffer
    pub fn expected_samples(&self) -> usize {
        self.samples_per_channel() * self.channel_count
    }

    /// Same recording layout relabelled with another source
    pub fn with_source(&self, source: SignalSource) -> Self {
        RecordingMetadata {
            source,
            ..self.clone()
        }
    }
}

impl Default for RecordingMetadata {
    fn default() -> Self {
        RecordingMetadata {
            source: SignalSource::Combined,
            scan_rate: 1000,
            channel_count: 1,
            duration_seconds: 1.0,
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalSource::Combined => write!(f, "Combined"),
            SignalSource::Maternal => write!(f, "Maternal"),
            SignalSource::Fetal => write!(f, "Fetal"),
        }
    }
}
