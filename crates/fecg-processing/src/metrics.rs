//! Timing metrics for pipeline stages

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pipeline stages that are timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Maternal reference subtraction
    Separation,
    /// Maternal heart rate estimation
    MaternalEstimation,
    /// Fetal heart rate estimation
    FetalEstimation,
}

/// Performance metrics for one stage run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Stage that was timed
    pub stage: Stage,
    /// Actual processing time in microseconds
    pub processing_time_us: u64,
    /// Samples the stage consumed per input channel
    pub samples: usize,
    /// Success/failure status
    pub success: bool,
    /// Error message if the stage failed
    pub error_message: Option<String>,
}

impl StageMetrics {
    /// Start timing a stage over `samples` samples
    pub fn start_timing(stage: Stage, samples: usize) -> StageTimer {
        StageTimer {
            start_time: Instant::now(),
            stage,
            samples,
        }
    }

    /// Throughput in samples per second, if the stage took measurable time
    pub fn samples_per_second(&self) -> Option<f64> {
        if self.processing_time_us == 0 {
            None
        } else {
            Some(self.samples as f64 / (self.processing_time_us as f64 / 1_000_000.0))
        }
    }
}

/// Helper for timing a stage
pub struct StageTimer {
    start_time: Instant,
    stage: Stage,
    samples: usize,
}

impl StageTimer {
    /// Finish timing and return metrics
    pub fn finish(self) -> StageMetrics {
        StageMetrics {
            stage: self.stage,
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            samples: self.samples,
            success: true,
            error_message: None,
        }
    }

    /// Finish with error
    pub fn finish_with_error(self, error: &str) -> StageMetrics {
        StageMetrics {
            success: false,
            error_message: Some(error.to_string()),
            ..self.finish()
        }
    }
}
