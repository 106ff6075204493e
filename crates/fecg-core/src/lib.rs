//! FECG-Core: Foundation types for fetal ECG monitoring
//!
//! Recording containers, channel views, metadata and the error taxonomy shared
//! by the processing, simulation and monitor crates.

pub mod buffer;
pub mod recording;
pub mod format;
pub mod error;

pub use buffer::*;
pub use recording::*;
pub use error::{FecgError, FecgResult};
