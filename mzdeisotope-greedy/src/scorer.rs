//! Isotopic pattern evaluation tools
use crate::isotopic_fit::IsotopicFit;
use crate::isotopic_model::isclose;

pub type ScoreType = f64;

/// Scores closer than this are considered tied
pub const SCORE_TOLERANCE: ScoreType = 1e-9;

/// Compare observed isotopic peak intensities with the ratios an isotopic model expects.
///
/// Higher scores are better and a perfect fit scores exactly `1.0`. Implementations must be
/// invariant to the absolute scale of either argument.
pub trait IsotopeFitScorer {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType;
}

impl<T: IsotopeFitScorer + ?Sized> IsotopeFitScorer for &T {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        (**self).score(observed, expected)
    }
}

/// The cosine similarity between the observed intensities and the expected ratios,
/// treating both as vectors.
///
/// ```math
/// S(o, r) = \frac{\sum_i o_i r_i}{\sqrt{\sum_i o_i^2}\sqrt{\sum_i r_i^2}}
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CosineScorer {}

impl IsotopeFitScorer for CosineScorer {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        let mut dot = 0.0;
        let mut o_norm = 0.0;
        let mut e_norm = 0.0;
        for (o, e) in observed.iter().zip(expected.iter()) {
            dot += o * e;
            o_norm += o * o;
            e_norm += e * e;
        }
        if o_norm == 0.0 || e_norm == 0.0 {
            return 0.0;
        }
        (dot / (o_norm.sqrt() * e_norm.sqrt())).clamp(0.0, 1.0)
    }
}

/// A least squares fit between the sum-normalized observed intensities $`p`$ and
/// expected ratios $`q`$, rescaled so that a perfect fit is `1.0`:
///
/// ```math
/// S(p, q) = 1 - \frac{\sum_i (p_i - q_i)^2}{\sum_i p_i^2 + \sum_i q_i^2}
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeastSquaresScorer {}

impl IsotopeFitScorer for LeastSquaresScorer {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        let n = observed.len().min(expected.len());
        let o_total: f64 = observed[..n].iter().sum();
        let e_total: f64 = expected[..n].iter().sum();
        if o_total <= 0.0 || e_total <= 0.0 {
            return 0.0;
        }
        let mut err = 0.0;
        let mut p_sq = 0.0;
        let mut q_sq = 0.0;
        for (o, e) in observed[..n].iter().zip(expected[..n].iter()) {
            let p = o / o_total;
            let q = e / e_total;
            err += (p - q).powi(2);
            p_sq += p * p;
            q_sq += q * q;
        }
        (1.0 - err / (p_sq + q_sq)).clamp(0.0, 1.0)
    }
}

/// A type that selects the best [`IsotopicFit`] from a set of candidates.
pub trait IsotopicFitFilter {
    /// Get the best solution from an iterator
    fn select<I: Iterator<Item = IsotopicFit>>(&self, fits: I) -> Option<IsotopicFit>;

    /// Test if an [`IsotopicFit`] passes the required score threshold
    fn test(&self, fit: &IsotopicFit) -> bool {
        self.test_score(fit.score)
    }

    /// Test if a score is good enough to satisfy the filter.
    fn test_score(&self, score: ScoreType) -> bool;
}

/// A [`IsotopicFitFilter`] that has a minimum score threshold and prefers larger scores.
///
/// A fit of a single peak carries no evidence of its charge state, so any fit with two or
/// more isotopic peaks is preferred over it regardless of score. Otherwise, fits whose
/// scores are within [`SCORE_TOLERANCE`] of each other are tied. A tie goes to the fit
/// with more isotopic peaks, then to whichever fit came first, so feeding candidates in
/// ascending charge order prefers the lower charge.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaximizingFitFilter {
    pub threshold: ScoreType,
}

impl MaximizingFitFilter {
    pub fn new(threshold: ScoreType) -> Self {
        Self { threshold }
    }

    /// Whether `candidate` should replace `incumbent` as the best fit
    pub fn is_better(&self, candidate: &IsotopicFit, incumbent: &IsotopicFit) -> bool {
        match (candidate.len() > 1, incumbent.len() > 1) {
            (true, false) => return true,
            (false, true) => return false,
            _ => {}
        }
        if isclose(candidate.score, incumbent.score, SCORE_TOLERANCE) {
            candidate.len() > incumbent.len()
        } else {
            candidate.score > incumbent.score
        }
    }
}

impl IsotopicFitFilter for MaximizingFitFilter {
    #[inline]
    fn test_score(&self, score: ScoreType) -> bool {
        score >= self.threshold
    }

    fn select<I: Iterator<Item = IsotopicFit>>(&self, fits: I) -> Option<IsotopicFit> {
        fits.fold(None, |best: Option<IsotopicFit>, fit| match best {
            Some(incumbent) if !self.is_better(&fit, &incumbent) => Some(incumbent),
            _ => Some(fit),
        })
        .filter(|f| self.test(f))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const OBSERVED: [f64; 4] = [8356.829, 8006.456, 4970.605, 2215.961];
    const EXPECTED: [f64; 4] = [1.0, 0.969930, 0.592834, 0.270836];

    fn fit(charge: i32, n: usize, score: ScoreType) -> IsotopicFit {
        IsotopicFit::new((0..n).collect(), vec![1.0; n], 0, charge, score)
    }

    #[test]
    fn test_cosine() {
        let scorer = CosineScorer::default();
        let score = scorer.score(&OBSERVED, &EXPECTED);
        assert!(score > 0.999 && score <= 1.0, "{score}");

        let perfect = scorer.score(&[100.0, 60.0, 30.0], &[1.0, 0.6, 0.3]);
        assert!((perfect - 1.0).abs() < 1e-12);

        let bad = scorer.score(&[10.0, 100.0], &[1.0, 0.1]);
        assert!(bad < 0.5);
        assert_eq!(scorer.score(&[0.0, 0.0], &[1.0, 0.5]), 0.0);
    }

    #[test]
    fn test_least_squares() {
        let scorer = LeastSquaresScorer::default();
        let score = scorer.score(&OBSERVED, &EXPECTED);
        assert!(score > 0.99 && score <= 1.0, "{score}");

        let perfect = scorer.score(&[100.0, 60.0, 30.0], &[1.0, 0.6, 0.3]);
        assert!((perfect - 1.0).abs() < 1e-12);

        let bad = scorer.score(&[10.0, 100.0], &[1.0, 0.1]);
        assert!(bad < score);
        assert_eq!(scorer.score(&[], &[]), 0.0);
    }

    #[test]
    fn test_select_prefers_score_then_size_then_first() {
        let filter = MaximizingFitFilter::new(0.5);
        let best = filter
            .select(vec![fit(1, 2, 0.7), fit(2, 2, 0.9), fit(3, 3, 0.8)].into_iter())
            .unwrap();
        assert_eq!(best.charge, 2);

        let best = filter
            .select(vec![fit(1, 2, 0.9), fit(2, 3, 0.9), fit(3, 3, 0.9)].into_iter())
            .unwrap();
        assert_eq!(best.charge, 2);

        assert!(filter.select(vec![fit(1, 2, 0.4)].into_iter()).is_none());
        assert!(filter.select(Vec::new().into_iter()).is_none());
    }

    #[test]
    fn test_single_peak_never_outranks_envelope() {
        let filter = MaximizingFitFilter::new(0.5);
        let best = filter
            .select(vec![fit(1, 2, 0.93), fit(2, 4, 0.95), fit(3, 1, 1.0), fit(4, 1, 1.0)].into_iter())
            .unwrap();
        assert_eq!(best.charge, 2);
        assert_eq!(best.len(), 4);

        let best = filter
            .select(vec![fit(3, 1, 1.0), fit(1, 2, 0.6)].into_iter())
            .unwrap();
        assert_eq!(best.charge, 1);

        let best = filter
            .select(vec![fit(2, 1, 1.0), fit(3, 1, 1.0)].into_iter())
            .unwrap();
        assert_eq!(best.charge, 2);
    }
}
