//! Fetal signal separation by reference subtraction
//!
//! The combined abdominal recording is modelled as maternal + fetal, with the
//! maternal component linearly additive. Subtracting a separately recorded
//! maternal reference therefore approximates the fetal waveform. This is a
//! known simplification: real extraction needs adaptive cancellation, and any
//! mismatch in alignment or gain between the two recordings stays in the
//! estimate as residual maternal noise.

use fecg_core::{ChannelView, DerivedSignal, FecgError, FecgResult, MultiChannelBuffer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separates the fetal component of one channel by subtracting the maternal reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetalSeparator {
    channel: usize,
}

impl FetalSeparator {
    /// Create a separator operating on `channel` of both recordings
    pub fn new(channel: usize) -> Self {
        FetalSeparator { channel }
    }

    /// Target channel index
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Compute `combined[i, channel] - maternal[i, channel]` for every sample
    ///
    /// Fails with [`FecgError::ShapeMismatch`] when the recordings differ in
    /// sample count; no partial output is produced.
    pub fn separate(
        &self,
        combined: &MultiChannelBuffer,
        maternal: &MultiChannelBuffer,
    ) -> FecgResult<DerivedSignal> {
        if combined.scan_rate() != maternal.scan_rate() {
            return Err(FecgError::InvalidRecordingConfig {
                reason: format!(
                    "combined recording sampled at {}Hz, maternal reference at {}Hz",
                    combined.scan_rate(),
                    maternal.scan_rate()
                ),
            });
        }

        let combined_view = combined.channel(self.channel)?;
        let maternal_view = maternal.channel(self.channel)?;

        let samples = subtract_channels(&combined_view, &maternal_view)?;
        debug!(
            channel = self.channel,
            samples = samples.len(),
            "separated fetal estimate from combined recording"
        );

        Ok(DerivedSignal::from_samples(samples, combined.scan_rate()))
    }
}

/// Element-wise `combined - maternal` over two channel views
///
/// Each view addresses its own buffer with its own stride.
pub fn subtract_channels(
    combined: &ChannelView<'_>,
    maternal: &ChannelView<'_>,
) -> FecgResult<Vec<f64>> {
    if combined.len() != maternal.len() {
        return Err(FecgError::ShapeMismatch {
            combined: combined.len(),
            maternal: maternal.len(),
        });
    }

    Ok(combined
        .iter()
        .zip(maternal.iter())
        .map(|(c, m)| c - m)
        .collect())
}

/// One reading of the base unit: chest lead, abdominal lead and skin temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    /// Maternal reference lead
    pub maternal: f64,
    /// Abdominal lead carrying maternal and fetal activity
    pub combined: f64,
    /// Skin temperature in degrees Celsius
    pub temperature: f64,
}

/// Sample-wise subtraction for live readings
///
/// Same model as [`FetalSeparator`], applied to each reading as it arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingSeparator {
    samples: u64,
}

impl StreamingSeparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetal estimate of one reading
    pub fn separate(&mut self, sample: &LiveSample) -> f64 {
        self.samples += 1;
        sample.combined - sample.maternal
    }

    /// Readings separated so far
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn reset(&mut self) {
        self.samples = 0;
    }
}
