//! Parameters controlling a deisotoping run
use mzpeaks::Tolerance;

use crate::charge::{ChargeRange, ChargeRangeIter};
use crate::error::DeisotopingError;
use crate::scorer::ScoreType;

/// How intensity is attributed to the members of an accepted isotopic cluster
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntensityAttribution {
    /// Each member gives up all of its current intensity
    Observed,
    /// The expected ratios are scaled to the observed intensities by least squares and
    /// each member gives up at most its share of that scaled pattern. The monoisotopic
    /// peak always gives up all of its current intensity.
    #[default]
    Theoretical,
}

/// The parameters of a [`Deisotoper`](crate::deisotoper::Deisotoper).
///
/// Configuration is an explicit value owned by each engine, so engines with different
/// settings can run side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeisotoperConfig {
    /// The lowest charge state to test, inclusive
    pub min_charge: i32,
    /// The highest charge state to test, inclusive
    pub max_charge: i32,
    /// The minimum number of peaks, including the monoisotopic peak, an isotopic cluster
    /// must contain to be scored
    pub min_isotope_group_size: usize,
    /// The minimum score an isotopic cluster must reach to be accepted
    pub theta: ScoreType,
    /// The scan the peaks were taken from, attached to every result
    pub scan_number: Option<u32>,
    /// Whether result annotations omit the per-isotope listing
    pub short_report: bool,
    /// The mass accuracy constraint for matching isotopic peaks
    pub error_tolerance: Tolerance,
    /// The m/z spacing between isotopic peaks at charge 1
    pub isotope_spacing: f64,
    pub attribution: IntensityAttribution,
}

impl Default for DeisotoperConfig {
    fn default() -> Self {
        Self {
            min_charge: 1,
            max_charge: 8,
            min_isotope_group_size: 2,
            theta: 0.9,
            scan_number: None,
            short_report: true,
            error_tolerance: Tolerance::Da(0.01),
            isotope_spacing: 1.0,
            attribution: IntensityAttribution::default(),
        }
    }
}

impl DeisotoperConfig {
    pub fn new(charge_range: ChargeRange, min_isotope_group_size: usize, theta: ScoreType) -> Self {
        Self {
            min_charge: charge_range.0,
            max_charge: charge_range.1,
            min_isotope_group_size,
            theta,
            ..Default::default()
        }
    }

    pub fn charge_range(&self) -> ChargeRange {
        (self.min_charge, self.max_charge)
    }

    /// Iterate over the charge states to test in ascending order
    pub fn charges(&self) -> ChargeRangeIter {
        ChargeRangeIter::from(self.charge_range())
    }

    /// The expected m/z spacing between isotopic peaks at `charge`
    #[inline]
    pub fn isotope_delta(&self, charge: i32) -> f64 {
        self.isotope_spacing / charge as f64
    }

    pub fn with_charge_range(mut self, charge_range: ChargeRange) -> Self {
        self.min_charge = charge_range.0;
        self.max_charge = charge_range.1;
        self
    }

    pub fn with_scan_number(mut self, scan_number: u32) -> Self {
        self.scan_number = Some(scan_number);
        self
    }

    pub fn with_error_tolerance(mut self, error_tolerance: Tolerance) -> Self {
        self.error_tolerance = error_tolerance;
        self
    }

    pub fn with_attribution(mut self, attribution: IntensityAttribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn with_short_report(mut self, short_report: bool) -> Self {
        self.short_report = short_report;
        self
    }

    /// Check that the configuration describes a runnable deisotoping problem.
    ///
    /// An empty charge range, where `min_charge > max_charge`, is valid and yields
    /// uncharged singletons only.
    pub fn validate(&self) -> Result<(), DeisotopingError> {
        if self.min_isotope_group_size == 0 {
            return Err(DeisotopingError::InvalidGroupSize(
                self.min_isotope_group_size,
            ));
        }
        if self.min_charge <= self.max_charge && self.min_charge <= 0 {
            return Err(DeisotopingError::InvalidChargeRange(
                self.min_charge,
                self.max_charge,
            ));
        }
        if !self.theta.is_finite() {
            return Err(DeisotopingError::InvalidThreshold(self.theta));
        }
        if !self.isotope_spacing.is_finite() || self.isotope_spacing <= 0.0 {
            return Err(DeisotopingError::InvalidIsotopeSpacing(
                self.isotope_spacing,
            ));
        }
        Ok(())
    }
}
