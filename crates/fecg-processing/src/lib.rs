//! FECG-Processing: Fetal ECG separation, heart rate estimation and display windowing
//!
//! Everything here operates on memory-resident buffers; loading recordings and
//! drawing windows are left to the host.

pub mod separator;
pub mod heart_rate;
pub mod display;
pub mod resample;
pub mod metrics;
pub mod pipeline;
pub mod config;
pub mod live;

pub use separator::{FetalSeparator, LiveSample, StreamingSeparator, subtract_channels};
pub use heart_rate::{HeartRateEstimator, HeartRateEstimate, estimate_bpm};
pub use display::{
    DisplayController, DisplayFrame, DisplayTrack, RollingTrack, ScanCursor, WindowNormalizer, WindowView,
    DEFAULT_EPSILON
};
pub use resample::{FourierResampler, resample};
pub use metrics::{Stage, StageMetrics};
pub use pipeline::*;
pub use config::{
    MonitorConfig, MonitorProfile, Calibration, DisplaySettings, LiveSettings, RecordingLayout, SourcePaths
};
pub use live::{LiveFrame, LiveMonitor, SampleSource};
