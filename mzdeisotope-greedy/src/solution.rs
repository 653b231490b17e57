use std::fmt::{self, Write};

use chemical_elements::neutral_mass;
use mzpeaks::{CoordinateLike, IntensityMeasurement, KnownCharge, MZ};

use crate::isotopic_model::PROTON;
use crate::peaks::PeakObservation;
use crate::scorer::ScoreType;

/// An isotopic cluster collapsed onto its monoisotopic peak.
///
/// The aggregate is read-only once emitted. Each member is a copy of the observation
/// taken when the cluster claimed it, ordered by isotope slot and carrying the intensity
/// attributed to it in [`PeakObservation::fitted_intensity`].
///
/// Equality and ordering compare the monoisotopic m/z only.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeconvolutedPeak {
    monoisotopic_mass: f64,
    total_intensity: f64,
    charge: i32,
    score: ScoreType,
    mass_residual: f64,
    members: Vec<PeakObservation>,
    scan_number: Option<u32>,
    annotation: String,
}

impl DeconvolutedPeak {
    pub(crate) fn new(
        monoisotopic_mass: f64,
        charge: i32,
        score: ScoreType,
        mass_residual: f64,
        members: Vec<PeakObservation>,
        scan_number: Option<u32>,
        short_report: bool,
    ) -> Self {
        let total_intensity = members.iter().map(|p| p.fitted_intensity()).sum();
        let mut inst = Self {
            monoisotopic_mass,
            total_intensity,
            charge,
            score,
            mass_residual,
            members,
            scan_number,
            annotation: String::new(),
        };
        inst.annotation = inst.describe(short_report);
        inst
    }

    /// The m/z of the monoisotopic peak
    #[inline]
    pub fn monoisotopic_mass(&self) -> f64 {
        self.monoisotopic_mass
    }

    /// The sum of the fitted intensities of every member
    #[inline]
    pub fn total_intensity(&self) -> f64 {
        self.total_intensity
    }

    /// The inferred charge state, `0` when no charge could be resolved
    #[inline]
    pub fn charge(&self) -> i32 {
        self.charge
    }

    #[inline]
    pub fn isotope_count(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn score(&self) -> ScoreType {
        self.score
    }

    /// The mean deviation of the observed isotopic spacing from the expected spacing
    #[inline]
    pub fn mass_residual(&self) -> f64 {
        self.mass_residual
    }

    #[inline]
    pub fn members(&self) -> &[PeakObservation] {
        &self.members
    }

    #[inline]
    pub fn scan_number(&self) -> Option<u32> {
        self.scan_number
    }

    #[inline]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Whether a charge state was resolved for this peak
    #[inline]
    pub fn is_charged(&self) -> bool {
        self.charge != 0
    }

    /// The neutral monoisotopic mass, using a proton as the charge carrier.
    ///
    /// Uncharged singletons have no meaningful neutral mass.
    pub fn neutral_mass(&self) -> Option<f64> {
        if self.charge == 0 {
            None
        } else {
            Some(neutral_mass(self.monoisotopic_mass, self.charge, PROTON))
        }
    }

    pub fn into_members(self) -> Vec<PeakObservation> {
        self.members
    }

    fn describe(&self, short_report: bool) -> String {
        let mut buf = self.to_string();
        if !short_report {
            buf.push_str(" isotopes:");
            for member in self.members.iter() {
                // Writing to a String is infallible
                let _ = write!(
                    buf,
                    " {:.4}({:.2}[{:.2}])",
                    member.mass(),
                    member.fitted_intensity(),
                    member.original_intensity()
                );
            }
        }
        buf
    }
}

impl fmt::Display for DeconvolutedPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} {:.2} {} {:.5} {:.2}",
            self.monoisotopic_mass, self.total_intensity, self.charge, self.mass_residual, self.score
        )
    }
}

impl PartialEq for DeconvolutedPeak {
    fn eq(&self, other: &Self) -> bool {
        self.monoisotopic_mass == other.monoisotopic_mass
    }
}

impl PartialOrd for DeconvolutedPeak {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.monoisotopic_mass.partial_cmp(&other.monoisotopic_mass)
    }
}

impl CoordinateLike<MZ> for DeconvolutedPeak {
    #[inline]
    fn coordinate(&self) -> f64 {
        self.monoisotopic_mass
    }
}

impl IntensityMeasurement for DeconvolutedPeak {
    #[inline]
    fn intensity(&self) -> f32 {
        self.total_intensity as f32
    }
}

impl KnownCharge for DeconvolutedPeak {
    #[inline]
    fn charge(&self) -> i32 {
        self.charge
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(mass: f64, original: f64, slot: usize, fitted: f64) -> PeakObservation {
        let mut p = PeakObservation::new(mass, original);
        p.assign(slot, fitted);
        p
    }

    #[test]
    fn test_aggregate() {
        let members = vec![
            member(1000.0, 100.0, 0, 100.0),
            member(1000.5, 60.0, 1, 60.0),
            member(1001.0, 30.0, 2, 30.0),
        ];
        let peak = DeconvolutedPeak::new(1000.0, 2, 0.99, 0.0, members, Some(7), true);
        assert_eq!(peak.isotope_count(), 3);
        assert!((peak.total_intensity() - 190.0).abs() < 1e-9);
        assert_eq!(peak.scan_number(), Some(7));
        assert!(peak.is_charged());
        assert_eq!(format!("{peak}"), "1000.0000 190.00 2 0.00000 0.99");
        assert_eq!(peak.annotation(), "1000.0000 190.00 2 0.00000 0.99");

        let expected = neutral_mass(1000.0, 2, PROTON);
        assert_eq!(peak.neutral_mass(), Some(expected));
        assert_eq!(KnownCharge::charge(&peak), 2);
        assert_eq!(CoordinateLike::<MZ>::coordinate(&peak), 1000.0);
    }

    #[test]
    fn test_long_annotation() {
        let members = vec![member(500.0, 40.0, 0, 40.0), member(501.0, 30.0, 1, 20.0)];
        let peak = DeconvolutedPeak::new(500.0, 1, 0.95, 0.001, members, None, false);
        assert_eq!(
            peak.annotation(),
            "500.0000 60.00 1 0.00100 0.95 isotopes: 500.0000(40.00[40.00]) 501.0000(20.00[30.00])"
        );
    }

    #[test]
    fn test_singleton() {
        let peak = DeconvolutedPeak::new(
            321.0,
            0,
            0.0,
            0.0,
            vec![member(321.0, 5.0, 0, 5.0)],
            None,
            true,
        );
        assert!(!peak.is_charged());
        assert_eq!(peak.neutral_mass(), None);
        assert_eq!(peak.isotope_count(), 1);
        assert_eq!(peak.into_members().len(), 1);
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        let a = DeconvolutedPeak::new(
            800.0,
            2,
            0.97,
            0.0,
            vec![member(800.0, 50.0, 0, 50.0), member(800.5, 30.0, 1, 30.0)],
            None,
            true,
        );
        let b = DeconvolutedPeak::new(800.0, 0, 0.0, 0.0, vec![member(800.0, 5.0, 0, 5.0)], None, true);
        let c = DeconvolutedPeak::new(800.5, 0, 0.0, 0.0, vec![member(800.5, 5.0, 0, 5.0)], None, true);

        assert_eq!(a.partial_cmp(&b), Some(std::cmp::Ordering::Equal));
        assert!(a == b);
        assert_eq!(a.partial_cmp(&c), Some(std::cmp::Ordering::Less));
        assert!(a != c);
        assert!(a < c && c > b);
    }
}
