/*! Description of isotopic pattern fits */
use crate::scorer::ScoreType;

/// Describes a single charge state hypothesis for a seed peak: the peaks matched to the
/// isotopic ladder and how well they agree with the isotopic model.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotopicFit {
    /// Indices of the matched peaks in the peak pool, in isotope slot order
    pub experimental: Vec<usize>,
    /// The expected intensity ratios of the matched peaks, starting at `1.0`
    pub theoretical: Vec<f64>,
    /// The index of the peak that seeded the ladder
    pub seed_peak: usize,
    /// The charge state of the isotopic pattern fitted
    pub charge: i32,
    /// The quality of the isotopic fit calculated by some algorithm
    pub score: ScoreType,
}

impl IsotopicFit {
    #[inline]
    pub fn new(
        experimental: Vec<usize>,
        theoretical: Vec<f64>,
        seed_peak: usize,
        charge: i32,
        score: ScoreType,
    ) -> Self {
        Self {
            experimental,
            theoretical,
            seed_peak,
            charge,
            score,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.experimental.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(isotope slot, pool index, expected ratio)` triples
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.experimental
            .iter()
            .zip(self.theoretical.iter())
            .enumerate()
            .map(|(slot, (i, r))| (slot, *i, *r))
    }
}
