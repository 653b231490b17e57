//! Errors raised while preparing a deisotoping problem
use thiserror::Error;

/// An error that might occur while building a peak pool or configuring a
/// [`Deisotoper`](crate::deisotoper::Deisotoper).
///
/// The deisotoping loop itself never fails. Too few isotopic matches or a model that
/// cannot supply a ratio table are ordinary branches of the algorithm, not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeisotopingError {
    #[error("Peak {index} has a non-finite m/z {mass}")]
    NonFiniteMass { index: usize, mass: f64 },
    #[error("Peak {index} at m/z {mass} has an invalid intensity {intensity}")]
    InvalidIntensity {
        index: usize,
        mass: f64,
        intensity: f64,
    },
    #[error("The minimum isotope group size must be at least 1, got {0}")]
    InvalidGroupSize(usize),
    #[error("Charge states must be positive, got a range from {0} to {1}")]
    InvalidChargeRange(i32, i32),
    #[error("The score threshold must be a finite number, got {0}")]
    InvalidThreshold(f64),
    #[error("The isotope spacing must be a positive finite number, got {0}")]
    InvalidIsotopeSpacing(f64),
    #[error("No isotopic model was provided")]
    MissingIsotopicModel,
    #[error("Scan {0} was not found")]
    ScanNotFound(u32),
}
