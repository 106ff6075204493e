//! FECG-Simulation: synthetic recordings for bench playback
//!
//! Generates multi-channel ECG recordings, derives fetal references from a
//! maternal recording and exports channels for arbitrary waveform generators.
//! A simulated base unit feeds live monitoring.

pub mod arb_export;
pub mod base_unit;
pub mod ecg_simulator;
pub mod synthesis;
pub mod waveforms;

pub use arb_export::*;
pub use base_unit::*;
pub use ecg_simulator::*;
pub use synthesis::*;
pub use waveforms::*;
