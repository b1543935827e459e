//! Funding-rate alert thresholds, cross-venue arbitrage scanning, and
//! extreme-event detection.

pub mod config;
pub mod counter;
pub mod detector;
pub mod error;
pub mod extreme;

pub use config::DetectorConfig;
pub use counter::AlertCounter;
pub use detector::{Detector, ObservationOutcome};
pub use error::{DetectorError, DetectorResult};
pub use extreme::ExtremeEventTracker;
