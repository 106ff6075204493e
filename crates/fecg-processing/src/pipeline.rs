//! Monitor pipeline: separation, rate estimation and display wiring
//!
//! Separation runs once per pair of recordings. The fetal estimate is only
//! published (behind an `Arc`) after the whole element-wise pass completed, so
//! no consumer can observe a partially written signal.

use crate::config::{Calibration, DisplaySettings, MonitorConfig};
use crate::display::DisplayController;
use crate::heart_rate::{HeartRateEstimate, HeartRateEstimator};
use crate::metrics::{Stage, StageMetrics};
use crate::separator::FetalSeparator;
use fecg_core::{DerivedSignal, FecgResult, MultiChannelBuffer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Display track label of the maternal ECG channel
pub const MATERNAL_TRACK: &str = "maternal";
/// Display track label of the fetal estimate
pub const FETAL_TRACK: &str = "fetal";

/// Heart rates of both signals from one preparation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRates {
    pub maternal: HeartRateEstimate,
    pub fetal: HeartRateEstimate,
}

/// Published output of the pipeline; immutable and shareable across threads
#[derive(Debug, Clone)]
pub struct PreparedSignals {
    /// Maternal reference recording
    pub maternal: Arc<MultiChannelBuffer>,
    /// Fetal estimate
    pub fetal: Arc<DerivedSignal>,
    /// Heart rate of each signal
    pub rates: HeartRates,
    /// ECG channel of the maternal recording
    pub ecg_channel: usize,
}

/// Pipeline builder for constructing a monitor pipeline
pub struct PipelineBuilder {
    name: String,
    ecg_channel: usize,
    calibration: Calibration,
    display: DisplaySettings,
    parallel_estimation: bool,
}

/// Fetal monitor pipeline
pub struct MonitorPipeline {
    name: String,
    separator: FetalSeparator,
    calibration: Calibration,
    display: DisplaySettings,
    parallel_estimation: bool,
    stage_metrics: Vec<StageMetrics>,
}

impl PipelineBuilder {
    /// Create new pipeline builder with bench playback defaults
    pub fn new(name: &str) -> Self {
        let defaults = MonitorConfig::bench_playback();
        PipelineBuilder {
            name: name.to_string(),
            ecg_channel: defaults.recording.ecg_channel,
            calibration: defaults.calibration,
            display: defaults.display,
            parallel_estimation: defaults.parallel_estimation,
        }
    }

    /// Start from a full monitor configuration
    pub fn from_config(config: &MonitorConfig) -> Self {
        PipelineBuilder {
            name: config.name.clone(),
            ecg_channel: config.recording.ecg_channel,
            calibration: config.calibration,
            display: config.display.clone(),
            parallel_estimation: config.parallel_estimation,
        }
    }

    pub fn ecg_channel(&mut self, channel: usize) -> &mut Self {
        self.ecg_channel = channel;
        self
    }

    pub fn calibration(&mut self, calibration: Calibration) -> &mut Self {
        self.calibration = calibration;
        self
    }

    pub fn display(&mut self, display: DisplaySettings) -> &mut Self {
        self.display = display;
        self
    }

    pub fn parallel_estimation(&mut self, enabled: bool) -> &mut Self {
        self.parallel_estimation = enabled;
        self
    }

    /// Build the pipeline
    pub fn build(&self) -> MonitorPipeline {
        MonitorPipeline {
            name: self.name.clone(),
            separator: FetalSeparator::new(self.ecg_channel),
            calibration: self.calibration,
            display: self.display.clone(),
            parallel_estimation: self.parallel_estimation,
            stage_metrics: Vec::new(),
        }
    }
}

impl MonitorPipeline {
    /// Build a pipeline from a validated configuration
    pub fn from_config(config: &MonitorConfig) -> FecgResult<Self> {
        config.validate()?;
        Ok(PipelineBuilder::from_config(config).build())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Metrics of the last preparation
    pub fn stage_metrics(&self) -> &[StageMetrics] {
        &self.stage_metrics
    }

    /// Separate the fetal signal and estimate both heart rates
    pub fn prepare(
        &mut self,
        combined: &MultiChannelBuffer,
        maternal: MultiChannelBuffer,
    ) -> FecgResult<PreparedSignals> {
        self.stage_metrics.clear();

        let timer = StageMetrics::start_timing(Stage::Separation, combined.samples_per_channel());
        let fetal = match self.separator.separate(combined, &maternal) {
            Ok(fetal) => {
                self.stage_metrics.push(timer.finish());
                Arc::new(fetal)
            }
            Err(e) => {
                self.stage_metrics.push(timer.finish_with_error(&e.to_string()));
                warn!(pipeline = %self.name, error = %e, "fetal separation failed");
                return Err(e);
            }
        };

        let rates = self.estimate_rates(&maternal, &fetal)?;
        info!(
            pipeline = %self.name,
            maternal_bpm = rates.maternal.bpm,
            fetal_bpm = rates.fetal.bpm,
            "heart rates estimated"
        );

        Ok(PreparedSignals {
            maternal: Arc::new(maternal),
            fetal,
            rates,
            ecg_channel: self.separator.channel(),
        })
    }

    /// Estimate maternal and fetal heart rates with their own thresholds
    pub fn estimate_rates(
        &mut self,
        maternal: &MultiChannelBuffer,
        fetal: &DerivedSignal,
    ) -> FecgResult<HeartRates> {
        let maternal_view = maternal.channel(self.separator.channel())?;
        let fetal_view = fetal.view();

        let maternal_estimator = HeartRateEstimator::new(maternal.scan_rate(), self.calibration.maternal_threshold);
        let fetal_estimator = HeartRateEstimator::new(fetal.scan_rate(), self.calibration.fetal_threshold);

        let estimate_maternal = || {
            let timer = StageMetrics::start_timing(Stage::MaternalEstimation, maternal_view.len());
            (maternal_estimator.estimate(&maternal_view), timer.finish())
        };
        let estimate_fetal = || {
            let timer = StageMetrics::start_timing(Stage::FetalEstimation, fetal_view.len());
            (fetal_estimator.estimate(&fetal_view), timer.finish())
        };

        let ((maternal_rate, maternal_metrics), (fetal_rate, fetal_metrics)) = if self.parallel_estimation {
            std::thread::scope(|scope| {
                let maternal_handle = scope.spawn(estimate_maternal);
                let fetal_result = estimate_fetal();
                let maternal_result = maternal_handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (maternal_result, fetal_result)
            })
        } else {
            (estimate_maternal(), estimate_fetal())
        };

        for (label, rate, metrics) in [
            (MATERNAL_TRACK, &maternal_rate, &maternal_metrics),
            (FETAL_TRACK, &fetal_rate, &fetal_metrics),
        ] {
            debug!(
                signal = label,
                peaks = rate.peak_count,
                seconds = rate.duration_seconds,
                elapsed_us = metrics.processing_time_us,
                "peak scan complete"
            );
            if rate.is_zero() {
                warn!(signal = label, "no beats above threshold, reporting 0 BPM");
            }
        }

        self.stage_metrics.push(maternal_metrics);
        self.stage_metrics.push(fetal_metrics);

        Ok(HeartRates {
            maternal: maternal_rate,
            fetal: fetal_rate,
        })
    }

    /// Display controller with one track per prepared signal
    pub fn display_controller<'a>(&self, prepared: &'a PreparedSignals) -> FecgResult<DisplayController<'a>> {
        let mut controller = DisplayController::new(self.display.normalizer());
        controller
            .add_timed_track(
                MATERNAL_TRACK,
                prepared.maternal.channel(prepared.ecg_channel)?,
                prepared.maternal.scan_rate(),
                self.display.window_seconds,
            )
            .add_timed_track(
                FETAL_TRACK,
                prepared.fetal.view(),
                prepared.fetal.scan_rate(),
                self.display.window_seconds,
            );

        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fecg_core::{FecgError, SignalSource};
    use std::f64::consts::PI;

    const RATE: u32 = 1000;
    const CHANNELS: usize = 3;
    const ECG: usize = 1;

    fn sine(frequency: f64, amplitude: f64, seconds: f64) -> Vec<f64> {
        (0..(RATE as f64 * seconds) as usize)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / RATE as f64).sin())
            .collect()
    }

    fn recording(ecg: &[f64], source: SignalSource) -> MultiChannelBuffer {
        let mut data = Vec::with_capacity(ecg.len() * CHANNELS);
        for &value in ecg {
            data.extend_from_slice(&[0.0, value, 1.0]);
        }
        MultiChannelBuffer::from_interleaved(data, source, RATE, CHANNELS).unwrap()
    }

    fn recordings(seconds: f64) -> (MultiChannelBuffer, MultiChannelBuffer) {
        let maternal = sine(1.25, 5.0, seconds);
        let fetal = sine(2.0, 0.12, seconds);
        let combined: Vec<f64> = maternal.iter().zip(&fetal).map(|(m, f)| m + f).collect();
        (
            recording(&combined, SignalSource::Combined),
            recording(&maternal, SignalSource::Maternal),
        )
    }

    fn pipeline(parallel: bool) -> MonitorPipeline {
        let mut builder = PipelineBuilder::new("test");
        builder
            .ecg_channel(ECG)
            .calibration(Calibration {
                maternal_threshold: 4.5,
                fetal_threshold: 0.095,
            })
            .parallel_estimation(parallel);
        builder.build()
    }

    #[test]
    fn test_prepare_estimates_both_rates() {
        let (combined, maternal) = recordings(20.0);
        let mut pipeline = pipeline(true);

        let prepared = pipeline.prepare(&combined, maternal).unwrap();
        assert_eq!(prepared.fetal.len(), 20_000);
        assert_eq!(prepared.rates.maternal.bpm, 75);
        assert_eq!(prepared.rates.fetal.bpm, 120);
        assert_eq!(pipeline.stage_metrics().len(), 3);
        assert!(pipeline.stage_metrics().iter().all(|m| m.success));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let (combined, maternal) = recordings(12.0);
        let sequential = pipeline(false).prepare(&combined, maternal.clone()).unwrap();
        let parallel = pipeline(true).prepare(&combined, maternal).unwrap();
        assert_eq!(sequential.rates, parallel.rates);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let (combined, _) = recordings(10.0);
        let (_, short_maternal) = recordings(9.0);
        let mut pipeline = pipeline(false);

        let err = pipeline.prepare(&combined, short_maternal).unwrap_err();
        assert_eq!(err, FecgError::ShapeMismatch { combined: 10_000, maternal: 9_000 });
        assert_eq!(pipeline.stage_metrics().len(), 1);
        assert!(!pipeline.stage_metrics()[0].success);
    }

    #[test]
    fn test_display_controller_tracks_both_signals() {
        let (combined, maternal) = recordings(30.0);
        let mut pipeline = pipeline(false);
        let prepared = pipeline.prepare(&combined, maternal).unwrap();

        let mut controller = pipeline.display_controller(&prepared).unwrap();
        let frame = controller.tick();
        assert_eq!(frame.windows.len(), 2);

        let maternal_window = frame.window(MATERNAL_TRACK).unwrap();
        let fetal_window = frame.window(FETAL_TRACK).unwrap();
        assert_eq!(maternal_window.len(), 10_000);
        assert_eq!(fetal_window.len(), 10_000);
        assert!(maternal_window.max > 4.9);
        assert!(fetal_window.max < 0.13);

        assert_eq!(controller.track(MATERNAL_TRACK).unwrap().cursor().channel_count(), CHANNELS);
        assert_eq!(controller.track(FETAL_TRACK).unwrap().cursor().channel_count(), 1);
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = MonitorConfig::bench_playback();
        config.recording.ecg_channel = 9;
        assert!(MonitorPipeline::from_config(&config).is_err());
        assert!(MonitorPipeline::from_config(&MonitorConfig::simulated()).is_ok());
    }
}
