//! Heart rate estimation by thresholded peak counting with a refractory skip
//!
//! A sample is a beat when it is a strict local maximum and exceeds the
//! detection threshold. After a beat the scan jumps ahead by a 200 ms
//! refractory window so waveform shoulders and sensor noise around one R-wave
//! are not counted as a second beat.
//!
//! The threshold is signal-specific. The maternal channel is calibrated against
//! a much larger amplitude than the fetal estimate, which also carries residual
//! maternal noise after subtraction, so each signal gets its own estimator.

use fecg_core::ChannelView;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of the scan rate skipped after a detected beat (1/5 s = 200 ms)
pub const REFRACTORY_DIVISOR: u32 = 5;

/// Beats-per-minute estimate with the figures it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    /// Rounded beats per minute
    pub bpm: u32,
    /// Peaks counted over the buffer
    pub peak_count: usize,
    /// Analysed duration in seconds (`len / scan_rate`)
    pub duration_seconds: f64,
}

impl HeartRateEstimate {
    /// Degenerate result for buffers with nothing to analyse
    pub const fn zero() -> Self {
        HeartRateEstimate {
            bpm: 0,
            peak_count: 0,
            duration_seconds: 0.0,
        }
    }

    /// True when no beat was detected. Still a valid estimate.
    pub fn is_zero(&self) -> bool {
        self.bpm == 0
    }
}

impl fmt::Display for HeartRateEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Thresholded peak-counting heart rate estimator for one signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimator {
    scan_rate: u32,
    threshold: f64,
}

impl HeartRateEstimator {
    pub fn new(scan_rate: u32, threshold: f64) -> Self {
        HeartRateEstimator { scan_rate, threshold }
    }

    pub fn scan_rate(&self) -> u32 {
        self.scan_rate
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Samples skipped after each detected beat
    pub fn refractory_samples(&self) -> usize {
        (self.scan_rate / REFRACTORY_DIVISOR) as usize
    }

    /// Estimate the heart rate of one channel
    ///
    /// Never fails: fewer than three samples or a zero scan rate give 0 BPM.
    pub fn estimate(&self, signal: &ChannelView<'_>) -> HeartRateEstimate {
        let len = signal.len();
        if len < 3 || self.scan_rate == 0 {
            return HeartRateEstimate::zero();
        }

        let peak_count = self.count_peaks(signal);
        let duration_seconds = len as f64 / self.scan_rate as f64;
        let bpm = (peak_count as f64 / duration_seconds * 60.0).round() as u32;

        HeartRateEstimate {
            bpm,
            peak_count,
            duration_seconds,
        }
    }

    /// Count thresholded strict local maxima, skipping the refractory window after each
    pub fn count_peaks(&self, signal: &ChannelView<'_>) -> usize {
        let len = signal.len();
        if len < 3 {
            return 0;
        }

        let refractory = self.refractory_samples();
        let mut peaks = 0;
        let mut i = 1;

        while i < len - 1 {
            let current = signal.sample(i);
            if current > self.threshold
                && current > signal.sample(i - 1)
                && current > signal.sample(i + 1)
            {
                peaks += 1;
                i += refractory;
            }
            i += 1;
        }

        peaks
    }
}

/// Estimate beats per minute of `signal` sampled at `scan_rate` with `threshold`
pub fn estimate_bpm(signal: &ChannelView<'_>, scan_rate: u32, threshold: f64) -> u32 {
    HeartRateEstimator::new(scan_rate, threshold).estimate(signal).bpm
}
