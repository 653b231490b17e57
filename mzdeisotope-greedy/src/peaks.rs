//! Centroid peak observations and the mutable pool they are consumed from.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;
use std::slice;

use mzpeaks::{
    prelude::*, CoordinateLike, IndexType, IndexedCoordinate, IntensityMeasurement,
    MZPeakSetType, Tolerance, MZ,
};

use crate::error::DeisotopingError;

/// Intensities below this value are treated as already exhausted.
pub const INTENSITY_GUARD: f64 = f64::MIN_POSITIVE;

/// A single centroid measurement along with the bookkeeping the deisotoping
/// process attaches to it.
///
/// Cloning a [`PeakObservation`] produces an independent copy of every field,
/// including the free text annotation.
///
/// The intensity of an observation can only go down, and only through
/// [`PeakObservation::subtract_intensity`]. The intensity it was created with is
/// kept in [`PeakObservation::original_intensity`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakObservation {
    mass: f64,
    intensity: f64,
    original_intensity: f64,
    isotope_slot: usize,
    fitted_intensity: f64,
    /// The signal-to-noise ratio reported by the peak picker, if any
    pub signal_to_noise: Option<f64>,
    /// The retention time of the scan this peak was observed in, if known
    pub retention_time: Option<f64>,
    /// Free text attached by upstream or downstream consumers
    pub annotation: Option<String>,
    index: IndexType,
}

impl PeakObservation {
    pub fn new(mass: f64, intensity: f64) -> Self {
        let intensity = if intensity > 0.0 && intensity < INTENSITY_GUARD {
            0.0
        } else {
            intensity
        };
        Self {
            mass,
            intensity,
            original_intensity: intensity,
            ..Default::default()
        }
    }

    pub fn with_retention_time(mass: f64, intensity: f64, retention_time: f64) -> Self {
        let mut inst = Self::new(mass, intensity);
        inst.retention_time = Some(retention_time);
        inst
    }

    pub fn with_signal_to_noise(mut self, signal_to_noise: f64) -> Self {
        self.signal_to_noise = Some(signal_to_noise);
        self
    }

    pub fn with_annotation<S: Into<String>>(mut self, annotation: S) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// The intensity still available for matching
    #[inline]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    #[inline]
    pub fn original_intensity(&self) -> f64 {
        self.original_intensity
    }

    /// The position of this peak in the isotopic cluster it was last assigned to,
    /// where `0` is the monoisotopic peak
    #[inline]
    pub fn isotope_slot(&self) -> usize {
        self.isotope_slot
    }

    /// The intensity attributed to this peak by the last isotopic fit that used it
    #[inline]
    pub fn fitted_intensity(&self) -> f64 {
        self.fitted_intensity
    }

    /// Whether the peak still has intensity to offer as a seed or isotopic match
    #[inline]
    pub fn is_available(&self) -> bool {
        self.intensity >= INTENSITY_GUARD
    }

    pub(crate) fn assign(&mut self, isotope_slot: usize, fitted_intensity: f64) {
        self.isotope_slot = isotope_slot;
        self.fitted_intensity = fitted_intensity;
    }

    /// Remove `amount` from this peak's intensity.
    ///
    /// If the relative difference between the current intensity and `amount` is no larger
    /// than `intensity_cv`, the remainder is indistinguishable from noise and the
    /// intensity is set to exactly zero. Otherwise `amount` is subtracted, never going
    /// below zero. An already exhausted peak is left untouched.
    ///
    /// Returns the positive remainder discarded as noise, if any.
    pub fn subtract_intensity(&mut self, amount: f64, intensity_cv: f64) -> f64 {
        if self.intensity < INTENSITY_GUARD {
            return 0.0;
        }
        let remainder = self.intensity - amount.max(0.0);
        if remainder.abs() / self.intensity > intensity_cv {
            self.intensity = remainder.max(0.0);
            0.0
        } else {
            self.intensity = 0.0;
            remainder.max(0.0)
        }
    }
}

impl PartialEq for PeakObservation {
    fn eq(&self, other: &Self) -> bool {
        self.mass == other.mass
    }
}

impl PartialOrd for PeakObservation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.mass.partial_cmp(&other.mass)
    }
}

impl CoordinateLike<MZ> for PeakObservation {
    #[inline]
    fn coordinate(&self) -> f64 {
        self.mass
    }
}

impl IndexedCoordinate<MZ> for PeakObservation {
    #[inline]
    fn get_index(&self) -> IndexType {
        self.index
    }

    #[inline]
    fn set_index(&mut self, index: IndexType) {
        self.index = index
    }
}

impl IntensityMeasurement for PeakObservation {
    #[inline]
    fn intensity(&self) -> f32 {
        self.intensity as f32
    }
}

impl From<(f64, f64)> for PeakObservation {
    fn from((mass, intensity): (f64, f64)) -> Self {
        Self::new(mass, intensity)
    }
}

impl fmt::Display for PeakObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} {:.2}", self.mass, self.intensity)
    }
}

/// The working set of peaks for a single scan, sorted by ascending m/z.
///
/// Peaks are never removed from the pool. They are consumed by subtracting intensity
/// until they reach zero, at which point they are no longer offered as seeds or
/// isotopic matches. Subtraction never moves a peak so the m/z order is stable.
#[derive(Debug, Clone)]
pub struct PeakPool {
    peaks: MZPeakSetType<PeakObservation>,
    discarded_intensity: f64,
}

impl PeakPool {
    /// Build a pool from a collection of observations, rejecting any with a non-finite
    /// m/z or a negative or non-finite intensity.
    pub fn new(peaks: Vec<PeakObservation>) -> Result<Self, DeisotopingError> {
        for (index, peak) in peaks.iter().enumerate() {
            if !peak.mass.is_finite() {
                return Err(DeisotopingError::NonFiniteMass {
                    index,
                    mass: peak.mass,
                });
            }
            if !peak.intensity.is_finite() || peak.intensity < 0.0 {
                return Err(DeisotopingError::InvalidIntensity {
                    index,
                    mass: peak.mass,
                    intensity: peak.intensity,
                });
            }
        }
        Ok(Self {
            peaks: MZPeakSetType::new(peaks),
            discarded_intensity: 0.0,
        })
    }

    /// Build a pool from `(m/z, intensity)` pairs
    pub fn from_pairs<I: IntoIterator<Item = (f64, f64)>>(
        pairs: I,
    ) -> Result<Self, DeisotopingError> {
        Self::new(pairs.into_iter().map(PeakObservation::from).collect())
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PeakObservation> {
        self.as_slice().get(index)
    }

    pub fn as_slice(&self) -> &[PeakObservation] {
        self.peaks.as_slice()
    }

    pub fn iter(&self) -> slice::Iter<'_, PeakObservation> {
        self.as_slice().iter()
    }

    /// The total intensity still available in the pool
    pub fn tic(&self) -> f64 {
        self.iter().map(|p| p.intensity).sum()
    }

    /// The total intensity the pool was created with
    pub fn original_tic(&self) -> f64 {
        self.iter().map(|p| p.original_intensity).sum()
    }

    /// The total intensity that was set to zero as noise by subtraction
    pub fn discarded_intensity(&self) -> f64 {
        self.discarded_intensity
    }

    /// The number of peaks that still have intensity available
    pub fn remaining(&self) -> usize {
        self.iter().filter(|p| p.is_available()).count()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.iter().any(|p| p.is_available())
    }

    /// Find the lowest m/z peak at or after `start` that still has intensity available
    pub fn next_seed(&self, start: usize) -> Option<usize> {
        self.as_slice()
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, p)| p.is_available())
            .map(|(i, _)| i)
    }

    /// Find the available peak closest to `mz` within `error_tolerance` whose index is
    /// strictly greater than `after`.
    pub fn find_isotope(&self, mz: f64, error_tolerance: Tolerance, after: usize) -> Option<usize> {
        self.peaks
            .all_peaks_for(mz, error_tolerance)
            .iter()
            .filter(|p| p.get_index() as usize > after && p.is_available())
            .min_by(|a, b| (a.mass - mz).abs().total_cmp(&(b.mass - mz).abs()))
            .map(|p| p.get_index() as usize)
    }

    /// Subtract `amount` from the peak at `index` following [`PeakObservation::subtract_intensity`],
    /// recording any remainder discarded as noise.
    pub fn subtract_intensity(&mut self, index: usize, amount: f64, intensity_cv: f64) -> f64 {
        let discarded = self.peaks[index].subtract_intensity(amount, intensity_cv);
        self.discarded_intensity += discarded;
        discarded
    }

    pub(crate) fn assign(&mut self, index: usize, isotope_slot: usize, fitted_intensity: f64) {
        self.peaks[index].assign(isotope_slot, fitted_intensity);
    }
}

impl Index<usize> for PeakPool {
    type Output = PeakObservation;

    fn index(&self, index: usize) -> &Self::Output {
        &self.peaks[index]
    }
}
