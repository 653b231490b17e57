//! The greedy deisotoping loop
use itertools::Itertools;
use tracing::{debug, trace};

use crate::charge::ChargeRange;
use crate::config::{DeisotoperConfig, IntensityAttribution};
use crate::error::DeisotopingError;
use crate::isotopic_fit::IsotopicFit;
use crate::isotopic_model::IsotopeRatioModel;
use crate::peaks::PeakPool;
use crate::scorer::{CosineScorer, IsotopeFitScorer, IsotopicFitFilter, MaximizingFitFilter, ScoreType};
use crate::solution::DeconvolutedPeak;

use mzpeaks::Tolerance;

#[derive(Debug)]
pub struct DeisotoperBuilder<I: IsotopeRatioModel, S: IsotopeFitScorer = CosineScorer> {
    isotopic_model: Option<I>,
    scorer: Option<S>,
    config: DeisotoperConfig,
}

impl<I: IsotopeRatioModel, S: IsotopeFitScorer + Default> Default for DeisotoperBuilder<I, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: IsotopeRatioModel, S: IsotopeFitScorer + Default> DeisotoperBuilder<I, S> {
    pub fn new() -> Self {
        Self {
            isotopic_model: None,
            scorer: None,
            config: DeisotoperConfig::default(),
        }
    }

    pub fn config(mut self, value: DeisotoperConfig) -> Self {
        self.config = value;
        self
    }

    pub fn charge_range(mut self, value: ChargeRange) -> Self {
        self.config.min_charge = value.0;
        self.config.max_charge = value.1;
        self
    }

    pub fn min_isotope_group_size(mut self, value: usize) -> Self {
        self.config.min_isotope_group_size = value;
        self
    }

    pub fn theta(mut self, value: ScoreType) -> Self {
        self.config.theta = value;
        self
    }

    pub fn error_tolerance(mut self, value: Tolerance) -> Self {
        self.config.error_tolerance = value;
        self
    }

    pub fn isotope_spacing(mut self, value: f64) -> Self {
        self.config.isotope_spacing = value;
        self
    }

    pub fn scan_number(mut self, value: u32) -> Self {
        self.config.scan_number = Some(value);
        self
    }

    pub fn short_report(mut self, value: bool) -> Self {
        self.config.short_report = value;
        self
    }

    pub fn attribution(mut self, value: IntensityAttribution) -> Self {
        self.config.attribution = value;
        self
    }

    pub fn isotopic_model(mut self, value: I) -> Self {
        self.isotopic_model = Some(value);
        self
    }

    pub fn scoring(mut self, value: S) -> Self {
        self.scorer = Some(value);
        self
    }

    pub fn create(self) -> Result<Deisotoper<I, S>, DeisotopingError> {
        let isotopic_model = self
            .isotopic_model
            .ok_or(DeisotopingError::MissingIsotopicModel)?;
        Deisotoper::new(isotopic_model, self.scorer.unwrap_or_default(), self.config)
    }
}

/// Resolve the peaks of a single scan into charge-labeled isotopic clusters.
///
/// Each step takes the lowest m/z peak with intensity remaining as the monoisotopic seed,
/// walks the isotopic ladder for every charge state in the configured range, keeps the
/// best scoring ladder and subtracts the intensity it explains from the pool. A seed
/// without an acceptable ladder, or whose best ladder is the seed alone, is reported on its
/// own with charge `0`. Every step
/// exhausts its seed, so a run takes at most one step per peak.
#[derive(Debug, Clone)]
pub struct Deisotoper<I: IsotopeRatioModel, S: IsotopeFitScorer = CosineScorer> {
    pub isotopic_model: I,
    pub scorer: S,
    fit_filter: MaximizingFitFilter,
    config: DeisotoperConfig,
}

impl<I: IsotopeRatioModel, S: IsotopeFitScorer> Deisotoper<I, S> {
    pub fn new(
        isotopic_model: I,
        scorer: S,
        config: DeisotoperConfig,
    ) -> Result<Self, DeisotopingError> {
        config.validate()?;
        Ok(Self {
            isotopic_model,
            scorer,
            fit_filter: MaximizingFitFilter::new(config.theta),
            config,
        })
    }

    pub fn config(&self) -> &DeisotoperConfig {
        &self.config
    }

    /// Set the scan number attached to subsequent results
    pub fn set_scan_number(&mut self, scan_number: Option<u32>) {
        self.config.scan_number = scan_number;
    }

    /// Walk the isotopic ladder up from `seed` at `charge`, returning the pool indices
    /// of the matched peaks starting with the seed.
    ///
    /// The walk stops at the first missing isotope or when the isotopic model cannot
    /// describe a longer pattern.
    pub fn collect_ladder(&mut self, pool: &PeakPool, seed: usize, charge: i32) -> Vec<usize> {
        let mass = pool[seed].mass();
        if !self.isotopic_model.supports(mass, charge, 1) {
            return Vec::new();
        }
        let delta = self.config.isotope_delta(charge);
        let mut members = vec![seed];
        let mut last = seed;
        while self
            .isotopic_model
            .supports(mass, charge, members.len() + 1)
        {
            let target = mass + members.len() as f64 * delta;
            match pool.find_isotope(target, self.config.error_tolerance, last) {
                Some(i) => {
                    members.push(i);
                    last = i;
                }
                None => break,
            }
        }
        members
    }

    /// Build and score the isotopic cluster hypothesis for `seed` at `charge`, if the
    /// ladder is long enough to be considered
    pub fn fit_charge(&mut self, pool: &PeakPool, seed: usize, charge: i32) -> Option<IsotopicFit> {
        let members = self.collect_ladder(pool, seed, charge);
        if members.is_empty() || members.len() < self.config.min_isotope_group_size {
            return None;
        }
        let mass = pool[seed].mass();
        let expected = self.isotopic_model.ratios(mass, charge, members.len())?;
        let observed: Vec<f64> = members.iter().map(|i| pool[*i].intensity()).collect();
        let score = self.scorer.score(&observed, &expected);
        trace!(
            "Seed {mass:0.4} at charge {charge} matched {} peaks with score {score:0.4}",
            members.len()
        );
        Some(IsotopicFit::new(members, expected, seed, charge, score))
    }

    /// Find the best acceptable isotopic cluster for `seed` across all charge states
    pub fn fit_seed(&mut self, pool: &PeakPool, seed: usize) -> Option<IsotopicFit> {
        let fits: Vec<IsotopicFit> = self
            .config
            .charges()
            .filter_map(|charge| self.fit_charge(pool, seed, charge))
            .collect();
        self.fit_filter.select(fits.into_iter())
    }

    /// The intensity each member of `fit` gives up when the fit is accepted
    pub fn fitted_intensities(&self, pool: &PeakPool, fit: &IsotopicFit) -> Vec<f64> {
        let observed: Vec<f64> = fit
            .experimental
            .iter()
            .map(|i| pool[*i].intensity())
            .collect();
        match self.config.attribution {
            IntensityAttribution::Observed => observed,
            IntensityAttribution::Theoretical => {
                let numer: f64 = observed
                    .iter()
                    .zip(fit.theoretical.iter())
                    .map(|(o, r)| o * r)
                    .sum();
                let denom: f64 = fit.theoretical.iter().map(|r| r * r).sum();
                let scale = if denom > 0.0 { numer / denom } else { 0.0 };
                observed
                    .iter()
                    .zip(fit.theoretical.iter())
                    .enumerate()
                    .map(|(slot, (o, r))| {
                        if slot == 0 {
                            *o
                        } else {
                            (scale * r).min(*o).max(0.0)
                        }
                    })
                    .collect()
            }
        }
    }

    fn mass_residual(&self, pool: &PeakPool, fit: &IsotopicFit) -> f64 {
        if fit.len() < 2 {
            return 0.0;
        }
        let delta = self.config.isotope_delta(fit.charge);
        let total: f64 = fit
            .experimental
            .iter()
            .tuple_windows()
            .map(|(a, b)| (pool[*b].mass() - pool[*a].mass()) - delta)
            .sum();
        total / (fit.len() - 1) as f64
    }

    /// Accept `fit`, subtracting the intensity it explains from the pool
    pub fn consume_fit(&mut self, pool: &mut PeakPool, fit: IsotopicFit) -> DeconvolutedPeak {
        let fitted = self.fitted_intensities(pool, &fit);
        let mass_residual = self.mass_residual(pool, &fit);
        let monoisotopic_mass = pool[fit.seed_peak].mass();
        let intensity_cv = self.isotopic_model.intensity_cv(monoisotopic_mass);
        let mut members = Vec::with_capacity(fit.len());
        for ((slot, index, _), amount) in fit.iter().zip(fitted) {
            pool.assign(index, slot, amount);
            members.push(pool[index].clone());
            pool.subtract_intensity(index, amount, intensity_cv);
        }
        trace!(
            "Accepted {monoisotopic_mass:0.4} at charge {} with {} isotopic peaks",
            fit.charge,
            members.len()
        );
        DeconvolutedPeak::new(
            monoisotopic_mass,
            fit.charge,
            fit.score,
            mass_residual,
            members,
            self.config.scan_number,
            self.config.short_report,
        )
    }

    /// Report `seed` on its own without a charge state, exhausting it
    pub fn consume_singleton(&mut self, pool: &mut PeakPool, seed: usize) -> DeconvolutedPeak {
        let mass = pool[seed].mass();
        let amount = pool[seed].intensity();
        let intensity_cv = self.isotopic_model.intensity_cv(mass);
        pool.assign(seed, 0, amount);
        let member = pool[seed].clone();
        pool.subtract_intensity(seed, amount, intensity_cv);
        trace!("No isotopic cluster accepted for {mass:0.4}, reporting singleton");
        DeconvolutedPeak::new(
            mass,
            0,
            0.0,
            0.0,
            vec![member],
            self.config.scan_number,
            self.config.short_report,
        )
    }

    /// Process the lowest m/z peak at or after `start` with intensity remaining, returning
    /// its index and the resulting peak, or [`None`] if no such peak exists
    pub fn step(&mut self, pool: &mut PeakPool, start: usize) -> Option<(usize, DeconvolutedPeak)> {
        let seed = pool.next_seed(start)?;
        let peak = match self.fit_seed(pool, seed) {
            Some(fit) if fit.len() > 1 => self.consume_fit(pool, fit),
            _ => self.consume_singleton(pool, seed),
        };
        Some((seed, peak))
    }

    /// Deisotope every peak in `pool`, leaving it exhausted.
    ///
    /// Results are in ascending order of monoisotopic m/z.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, pool: &mut PeakPool) -> Vec<DeconvolutedPeak> {
        let mut results = Vec::new();
        let mut start = 0;
        while let Some((seed, peak)) = self.step(pool, start) {
            results.push(peak);
            // The seed is always exhausted and every peak below it already was
            start = seed + 1;
        }
        let n_charged = results.iter().filter(|p| p.is_charged()).count();
        debug!(
            "Deisotoped {} peaks into {} clusters, {} charged and {} singletons, discarding {:0.2} intensity as noise",
            pool.len(),
            results.len(),
            n_charged,
            results.len() - n_charged,
            pool.discarded_intensity(),
        );
        results
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isotopic_model::FixedIsotopeModel;

    fn worked_example() -> PeakPool {
        PeakPool::from_pairs([(1000.0, 100.0), (1000.5, 60.0), (1001.0, 30.0)]).unwrap()
    }

    fn charge_two_model() -> FixedIsotopeModel {
        FixedIsotopeModel::new(0.1).with_charge(2, vec![1.0, 0.6, 0.3])
    }

    #[test_log::test]
    fn test_worked_example() {
        let mut pool = worked_example();
        let mut engine = DeisotoperBuilder::<_, CosineScorer>::new()
            .isotopic_model(charge_two_model())
            .charge_range((1, 2))
            .min_isotope_group_size(2)
            .error_tolerance(Tolerance::Da(0.01))
            .create()
            .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 1);
        let peak = &peaks[0];
        assert_eq!(peak.charge(), 2);
        assert_eq!(peak.isotope_count(), 3);
        assert_eq!(peak.monoisotopic_mass(), 1000.0);
        assert!((peak.total_intensity() - 190.0).abs() < 1e-6);
        assert!((peak.score() - 1.0).abs() < 1e-9);
        assert!(peak.mass_residual().abs() < 1e-9);
        let slots: Vec<_> = peak.members().iter().map(|p| p.isotope_slot()).collect();
        assert_eq!(slots, vec![0, 1, 2]);
        assert!(pool.is_exhausted());
    }

    #[test_log::test]
    fn test_charge_preference() {
        let mut pool = worked_example();
        let model = FixedIsotopeModel::uniform(vec![1.0, 0.6, 0.3], 0.1);
        let mut engine =
            Deisotoper::new(model, CosineScorer::default(), DeisotoperConfig::new((1, 4), 2, 0.9))
                .unwrap();
        let fit = engine.fit_seed(&pool, 0).unwrap();
        assert_eq!(fit.charge, 2);
        assert_eq!(fit.len(), 3);

        let ladder = engine.collect_ladder(&pool, 0, 1);
        assert_eq!(ladder, vec![0, 2]);
        assert!(engine.fit_charge(&pool, 0, 3).is_none());

        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 1);
    }

    #[test_log::test]
    fn test_ties_prefer_longer_then_lower_charge() {
        let mut pool =
            PeakPool::from_pairs([(1000.0, 10.0), (1000.5, 10.0), (1001.0, 10.0), (1001.5, 10.0)])
                .unwrap();
        let model = FixedIsotopeModel::uniform(vec![1.0, 1.0, 1.0, 1.0], 0.1);
        let mut engine =
            Deisotoper::new(model, CosineScorer::default(), DeisotoperConfig::new((1, 2), 2, 0.9))
                .unwrap();
        let fit = engine.fit_seed(&pool, 0).unwrap();
        assert_eq!(fit.charge, 2);
        assert_eq!(fit.len(), 4);

        let mut pool = PeakPool::from_pairs([(1000.0, 10.0), (1000.5, 10.0), (1001.0, 10.0)]).unwrap();
        let model = FixedIsotopeModel::uniform(vec![1.0, 1.0], 0.1);
        let mut engine =
            Deisotoper::new(model, CosineScorer::default(), DeisotoperConfig::new((1, 2), 2, 0.9))
                .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].charge(), 1);
        assert_eq!(peaks[0].members()[1].mass(), 1001.0);
        assert_eq!(peaks[1].charge(), 0);
        assert_eq!(peaks[1].monoisotopic_mass(), 1000.5);
    }

    #[test_log::test]
    fn test_shared_peak_theoretical() {
        let mut pool = PeakPool::from_pairs([(500.0, 100.0), (501.0, 130.0), (502.0, 65.0)]).unwrap();
        let model = FixedIsotopeModel::uniform(vec![1.0, 0.5], 0.1);
        let mut engine = DeisotoperBuilder::<_, CosineScorer>::new()
            .isotopic_model(model)
            .charge_range((1, 1))
            .theta(0.8)
            .create()
            .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 3);

        assert_eq!(peaks[0].charge(), 1);
        assert!((peaks[0].total_intensity() - 166.0).abs() < 1e-6);
        assert!((peaks[0].members()[1].fitted_intensity() - 66.0).abs() < 1e-6);

        assert_eq!(peaks[1].monoisotopic_mass(), 501.0);
        assert_eq!(peaks[1].charge(), 1);
        assert!((peaks[1].total_intensity() - 102.6).abs() < 1e-6);

        assert_eq!(peaks[2].charge(), 0);
        assert!((peaks[2].total_intensity() - 26.4).abs() < 1e-6);

        let emitted: f64 = peaks.iter().map(|p| p.total_intensity()).sum();
        assert!((emitted + pool.discarded_intensity() - 295.0).abs() < 1e-6);
        assert!(pool.is_exhausted());
    }

    #[test_log::test]
    fn test_shared_peak_observed() {
        let mut pool = PeakPool::from_pairs([(500.0, 100.0), (501.0, 130.0), (502.0, 65.0)]).unwrap();
        let model = FixedIsotopeModel::uniform(vec![1.0, 0.5], 0.1);
        let mut engine = DeisotoperBuilder::<_, CosineScorer>::new()
            .isotopic_model(model)
            .charge_range((1, 1))
            .theta(0.8)
            .attribution(IntensityAttribution::Observed)
            .create()
            .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].total_intensity() - 230.0).abs() < 1e-6);
        assert_eq!(peaks[1].monoisotopic_mass(), 502.0);
        assert_eq!(peaks[1].charge(), 0);
        assert_eq!(pool.discarded_intensity(), 0.0);
    }

    #[test_log::test]
    fn test_below_theta_is_singleton() {
        let mut pool = PeakPool::from_pairs([(1000.0, 10.0), (1000.5, 100.0)]).unwrap();
        let model = FixedIsotopeModel::uniform(vec![1.0, 0.1], 0.1);
        let mut engine = Deisotoper::new(
            model,
            CosineScorer::default(),
            DeisotoperConfig::new((1, 2), 2, 0.9).with_scan_number(12),
        )
        .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 2);
        assert!(peaks.iter().all(|p| p.charge() == 0 && p.isotope_count() == 1));
        assert!(peaks.iter().all(|p| p.scan_number() == Some(12)));
        assert_eq!(peaks[0].score(), 0.0);
    }

    #[test_log::test]
    fn test_inverted_charge_range() {
        let mut pool = worked_example();
        let mut engine = Deisotoper::new(
            FixedIsotopeModel::uniform(vec![1.0, 0.6, 0.3], 0.1),
            CosineScorer::default(),
            DeisotoperConfig::new((3, 1), 2, 0.9),
        )
        .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 3);
        assert!(peaks.iter().all(|p| p.charge() == 0));
    }

    #[test_log::test]
    fn test_group_size_one() {
        let mut pool = PeakPool::from_pairs([(700.0, 50.0)]).unwrap();
        let mut engine = Deisotoper::new(
            FixedIsotopeModel::uniform(vec![1.0, 0.5], 0.1),
            CosineScorer::default(),
            DeisotoperConfig::new((1, 3), 1, 0.9),
        )
        .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].charge(), 0);
        assert_eq!(peaks[0].isotope_count(), 1);
        assert_eq!(peaks[0].score(), 0.0);
    }

    #[test_log::test]
    fn test_group_size_one_keeps_envelope() {
        let mut pool = PeakPool::from_pairs([
            (1000.0, 100.0),
            (1000.5, 70.0),
            (1001.0, 45.0),
            (1001.5, 15.0),
        ])
        .unwrap();
        let mut engine = Deisotoper::new(
            FixedIsotopeModel::uniform(vec![1.0, 0.8, 0.4, 0.15], 0.1),
            CosineScorer::default(),
            DeisotoperConfig::new((1, 4), 1, 0.9),
        )
        .unwrap();

        // Charges 3 and 4 match only the seed, which scores a perfect 1.0
        assert_eq!(engine.fit_charge(&pool, 0, 3).unwrap().len(), 1);
        let fit = engine.fit_seed(&pool, 0).unwrap();
        assert_eq!(fit.charge, 2);
        assert_eq!(fit.len(), 4);

        let peaks = engine.run(&mut pool);
        assert_eq!(peaks[0].charge(), 2);
        assert_eq!(peaks[0].isotope_count(), 4);
        assert_eq!(peaks[0].monoisotopic_mass(), 1000.0);
        assert!(peaks[1..]
            .iter()
            .all(|p| p.charge() == 0 && p.isotope_count() == 1));
        assert!(pool.is_exhausted());
    }

    #[test_log::test]
    fn test_charge_range_at_integer_limit() {
        let mut pool = worked_example();
        let mut engine = Deisotoper::new(
            FixedIsotopeModel::uniform(vec![1.0, 0.6, 0.3], 0.1),
            CosineScorer::default(),
            DeisotoperConfig::new((i32::MAX, i32::MAX), 2, 0.9),
        )
        .unwrap();
        let peaks = engine.run(&mut pool);
        assert_eq!(peaks.len(), 3);
        assert!(peaks.iter().all(|p| p.charge() == 0));
    }

    #[test]
    fn test_builder_errors() {
        let err = DeisotoperBuilder::<FixedIsotopeModel, CosineScorer>::new()
            .create()
            .unwrap_err();
        assert_eq!(err, DeisotopingError::MissingIsotopicModel);

        let err = DeisotoperBuilder::<_, CosineScorer>::new()
            .isotopic_model(charge_two_model())
            .min_isotope_group_size(0)
            .create()
            .unwrap_err();
        assert_eq!(err, DeisotopingError::InvalidGroupSize(0));
    }

    #[test_log::test]
    fn test_empty_pool() {
        let mut pool = PeakPool::from_pairs(Vec::new()).unwrap();
        let mut engine = DeisotoperBuilder::<_, CosineScorer>::new()
            .isotopic_model(charge_two_model())
            .create()
            .unwrap();
        assert!(engine.run(&mut pool).is_empty());
        assert!(engine.step(&mut pool, 0).is_none());
    }
}
