//! Greedy deisotoping of centroided mass spectra.
//!
//! Peaks are consumed from a [`PeakPool`] lowest m/z first. Each seed is tested against
//! every charge state in range by walking its isotopic ladder and comparing the matched
//! intensities with an [`IsotopeRatioModel`]. The best acceptable ladder is collapsed into
//! a [`DeconvolutedPeak`] and the intensity it explains is subtracted from the pool, so
//! overlapping isotopic clusters can share peaks.
//!
//! ```rust
//! use mzdeisotope_greedy::prelude::*;
//!
//! let mut pool = PeakPool::from_pairs([(1000.0, 100.0), (1000.5, 60.0), (1001.0, 30.0)]).unwrap();
//! let model = FixedIsotopeModel::new(0.1).with_charge(2, vec![1.0, 0.6, 0.3]);
//! let peaks = deisotope_peaks(&mut pool, model, DeisotoperConfig::default()).unwrap();
//! assert_eq!(peaks[0].charge(), 2);
//! ```
pub mod api;
pub mod charge;
pub mod config;
pub mod deisotoper;
pub mod error;
pub mod isotopic_fit;
pub mod isotopic_model;
pub mod peaks;
pub mod scan;
pub mod scorer;
pub mod solution;

pub use crate::api::{deisotope_peaks, deisotope_scan};
pub use crate::config::{DeisotoperConfig, IntensityAttribution};
pub use crate::deisotoper::{Deisotoper, DeisotoperBuilder};
pub use crate::error::DeisotopingError;
pub use crate::isotopic_model::{
    AveragineRatioModel, FixedIsotopeModel, IsotopeRatioModel, IsotopicModels,
};
pub use crate::peaks::{PeakObservation, PeakPool};
pub use crate::solution::DeconvolutedPeak;

pub mod prelude {
    pub use crate::api::{deisotope_peaks, deisotope_scan};
    pub use crate::config::{DeisotoperConfig, IntensityAttribution};
    pub use crate::deisotoper::{Deisotoper, DeisotoperBuilder};
    pub use crate::isotopic_model::{
        AveragineRatioModel, FixedIsotopeModel, IsotopeRatioModel, IsotopicModels,
    };
    pub use crate::peaks::{PeakObservation, PeakPool};
    pub use crate::scan::{InMemoryScanSource, ScanHeader, ScanSource};
    pub use crate::scorer::{CosineScorer, IsotopeFitScorer, LeastSquaresScorer};
    pub use crate::solution::DeconvolutedPeak;
}
