/*! Isotopic models supplying expected isotopic peak ratios */
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::hash_map::{self, HashMap};
use std::hash;

use chemical_elements::isotopic_pattern::{
    BafflingRecursiveIsotopicPatternGenerator, TheoreticalIsotopicPattern,
};

use chemical_elements::{
    neutral_mass, ChemicalComposition, ElementSpecification, PROTON as _PROTON,
};

use num_traits::Float;
use tracing::trace;

pub(crate) fn isclose<T: Float>(a: T, b: T, delta: T) -> bool {
    (a - b).abs() < delta
}

/// The mass of H+, a hydrogen atom minus an electron
pub const PROTON: f64 = _PROTON;

/// The mass difference between isotopes `C[13]` and `C[12]`. Not precisely universal, but the
/// majority of expected applications are carbon-based
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

/// The relative intensity variation below which a subtraction remainder is treated as noise
pub const DEFAULT_INTENSITY_CV: f64 = 0.1;

/// Get the m/z difference between isotopic peaks at a given charge state
#[inline(always)]
pub fn isotopic_shift(charge: i32) -> f64 {
    NEUTRON_SHIFT / charge as f64
}

/// The expected isotopic distribution for a candidate monoisotopic m/z and charge state.
///
/// A deisotoper only depends on this capability, so any supplier of these two operations
/// can stand in for another, including fixed tables in tests.
pub trait IsotopeRatioModel {
    /// Get the expected intensities of the first `count` isotopic peaks relative to the
    /// monoisotopic peak, so that the first ratio is `1.0`.
    ///
    /// Returns [`None`] when the model cannot describe that many isotopic peaks for this
    /// m/z and charge, which callers treat as the natural end of an isotopic pattern.
    fn ratios(&mut self, mz: f64, charge: i32, count: usize) -> Option<Vec<f64>>;

    /// The relative intensity variation that is considered statistically insignificant
    /// at this m/z
    fn intensity_cv(&self, mz: f64) -> f64;

    /// Check whether the model can describe `count` isotopic peaks without building them
    fn supports(&mut self, mz: f64, charge: i32, count: usize) -> bool {
        self.ratios(mz, charge, count).is_some()
    }
}

impl<T: IsotopeRatioModel + ?Sized> IsotopeRatioModel for &mut T {
    fn ratios(&mut self, mz: f64, charge: i32, count: usize) -> Option<Vec<f64>> {
        (**self).ratios(mz, charge, count)
    }

    fn intensity_cv(&self, mz: f64) -> f64 {
        (**self).intensity_cv(mz)
    }

    fn supports(&mut self, mz: f64, charge: i32, count: usize) -> bool {
        (**self).supports(mz, charge, count)
    }
}

fn normalize_ratios(mut ratios: Vec<f64>) -> Vec<f64> {
    if let Some(first) = ratios.first().copied() {
        if first > 0.0 {
            ratios.iter_mut().for_each(|r| *r /= first);
        }
    }
    ratios
}

/// An [`IsotopeRatioModel`] built from tables of ratios that do not depend on m/z.
///
/// Tables may be registered per charge state, with an optional fallback used for any
/// charge without its own table. Every table is rescaled so its first entry is `1.0`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedIsotopeModel {
    tables: BTreeMap<i32, Vec<f64>>,
    fallback: Option<Vec<f64>>,
    pub intensity_cv: f64,
}

impl Default for FixedIsotopeModel {
    fn default() -> Self {
        Self::new(DEFAULT_INTENSITY_CV)
    }
}

impl FixedIsotopeModel {
    pub fn new(intensity_cv: f64) -> Self {
        Self {
            tables: BTreeMap::new(),
            fallback: None,
            intensity_cv,
        }
    }

    /// Use `ratios` for charge states which do not have a table of their own
    pub fn uniform(ratios: Vec<f64>, intensity_cv: f64) -> Self {
        let mut inst = Self::new(intensity_cv);
        inst.fallback = Some(normalize_ratios(ratios));
        inst
    }

    pub fn with_charge(mut self, charge: i32, ratios: Vec<f64>) -> Self {
        self.insert(charge, ratios);
        self
    }

    pub fn insert(&mut self, charge: i32, ratios: Vec<f64>) -> Option<Vec<f64>> {
        self.tables.insert(charge, normalize_ratios(ratios))
    }

    fn table_for(&self, charge: i32) -> Option<&Vec<f64>> {
        self.tables.get(&charge).or(self.fallback.as_ref())
    }
}

impl IsotopeRatioModel for FixedIsotopeModel {
    fn ratios(&mut self, _mz: f64, charge: i32, count: usize) -> Option<Vec<f64>> {
        self.table_for(charge)
            .filter(|table| count > 0 && table.len() >= count)
            .map(|table| table[..count].to_vec())
    }

    fn intensity_cv(&self, _mz: f64) -> f64 {
        self.intensity_cv
    }

    fn supports(&mut self, _mz: f64, charge: i32, count: usize) -> bool {
        self.table_for(charge)
            .is_some_and(|table| count > 0 && table.len() >= count)
    }
}

/// A fractional elemental composition with non-ordinal element counts used to represent
/// "averaged" chemical compositions.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FractionalComposition<'a>(HashMap<ElementSpecification<'a>, f64>);

impl<'a> FromIterator<(ElementSpecification<'a>, f64)> for FractionalComposition<'a> {
    fn from_iter<T: IntoIterator<Item = (ElementSpecification<'a>, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FractionalComposition<'a> {
    #[inline]
    pub fn new(composition: HashMap<ElementSpecification<'a>, f64>) -> Self {
        Self(composition)
    }

    #[inline]
    pub fn get<Q>(&self, k: &Q) -> Option<&f64>
    where
        ElementSpecification<'a>: std::borrow::Borrow<Q>,
        Q: hash::Hash + Eq + ?Sized,
    {
        self.0.get(k)
    }

    #[inline]
    pub fn iter(&self) -> hash_map::Iter<'_, ElementSpecification<'a>, f64> {
        self.0.iter()
    }

    /// The monoisotopic mass of the (fractional) composition
    #[inline]
    pub fn mass(&self) -> f64 {
        self.iter()
            .map(|(e, c)| e.element.most_abundant_mass * *c)
            .sum()
    }
}

/// Parameters controlling how much of a theoretical isotopic pattern is kept
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IsotopicPatternParams {
    /// The cumulative abundance percentage of isotopic signal to retain
    pub truncate_after: f64,
    /// The minimum abundance percentage of isotopic signal a peak must have
    /// to be kept
    pub ignore_below: f64,
    /// The mass of the charge carrier, e.g. proton mass
    pub charge_carrier: f64,
}

impl Default for IsotopicPatternParams {
    fn default() -> Self {
        Self {
            truncate_after: 0.95,
            ignore_below: 0.001,
            charge_carrier: PROTON,
        }
    }
}

impl IsotopicPatternParams {
    pub fn new(truncate_after: f64, ignore_below: f64, charge_carrier: f64) -> Self {
        Self {
            truncate_after,
            ignore_below,
            charge_carrier,
        }
    }
}

/// A model for converting an m/z and a theoretical charge state into a theoretical
/// isotopic pattern based upon an "average monomer" and linear extension.
///
/// This is an implementation of Senko's Averagine [^1]
///
/// # References
/// [^1]: Senko M, Beu S, McLafferty F: Determination of Monoisotopic Masses and Ion
///       Populations for Large Biomolecules from Resolved Isotopic Distributions.
///       Journal of the American Society for Mass Spectrometry 1995, 6:229-233
///       <https://doi.org/10.1016/1044-0305(95)00017-8>
#[derive(Debug, Clone)]
pub struct IsotopicModel<'lifespan> {
    /// The "average" monomer composition
    pub base_composition: FractionalComposition<'lifespan>,
    /// The mass of the average monomer to interpolate with
    pub base_mass: f64,
    hydrogen: ElementSpecification<'lifespan>,
    generator: BafflingRecursiveIsotopicPatternGenerator<'lifespan>,
}

impl<'lifespan: 'transient, 'transient> IsotopicModel<'lifespan> {
    pub fn new(base_composition: FractionalComposition<'lifespan>) -> Self {
        Self {
            base_mass: base_composition.mass(),
            base_composition,
            hydrogen: ElementSpecification::parse("H").unwrap(),
            generator: BafflingRecursiveIsotopicPatternGenerator::new(),
        }
    }

    /// Scale the average monomer to the neutral mass implied by `mz` and `charge`,
    /// correcting the hydrogen count to absorb the rounding error.
    pub fn scale(
        &self,
        mz: f64,
        charge: i32,
        charge_carrier: f64,
    ) -> ChemicalComposition<'transient> {
        let neutral = neutral_mass(mz, charge, charge_carrier);
        let scale = neutral / self.base_mass;

        let mut scaled = ChemicalComposition::new();
        for (elt, count) in self.base_composition.iter() {
            scaled.set(*elt, (*count * scale).round() as i32);
        }
        let scaled_mass = scaled.mass();
        let delta = (scaled_mass - neutral).round() as i32;
        let hydrogens = scaled[&self.hydrogen];
        if hydrogens > delta {
            scaled[&self.hydrogen] -= delta;
        } else {
            scaled[&self.hydrogen] = 0;
        }
        scaled
    }
}

impl IsotopicModel<'_> {
    /// Generate a theoretical isotopic pattern whose first peak lies at `mz`
    pub fn isotopic_cluster(
        &mut self,
        mz: f64,
        charge: i32,
        params: IsotopicPatternParams,
    ) -> TheoreticalIsotopicPattern {
        let composition = self.scale(mz, charge, params.charge_carrier);
        let peaks =
            self.generator
                .isotopic_variants(composition, 0, charge, params.charge_carrier);
        let peaks = TheoreticalIsotopicPattern::from(peaks);
        let diff = mz - peaks.origin;
        peaks
            .truncate_after(params.truncate_after)
            .ignore_below(params.ignore_below)
            .shift(diff)
    }
}

impl<T: IntoIterator<Item = (&'static str, f64)>> From<T> for IsotopicModel<'_> {
    fn from(iter: T) -> Self {
        let f: FractionalComposition = iter
            .into_iter()
            .map(|(e, c)| (e.parse().expect("Failed to parse element specification"), c))
            .collect();
        IsotopicModel::new(f)
    }
}

/// A set of named average monomer isotopic models
/// for biomolecules. Variants convert to [`IsotopicModel`]
/// and [`AveragineRatioModel`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IsotopicModels {
    Peptide,
    Glycan,
    Glycopeptide,
    PermethylatedGlycan,
    Heparin,
    HeparanSulfate,
}

impl From<IsotopicModels> for IsotopicModel<'_> {
    fn from(source: IsotopicModels) -> IsotopicModel<'static> {
        match source {
            IsotopicModels::Peptide => vec![
                ("H", 7.7583f64),
                ("C", 4.9384),
                ("S", 0.0417),
                ("O", 1.4773),
                ("N", 1.3577),
            ],
            IsotopicModels::Glycan => vec![("H", 11.8333), ("C", 7.0), ("O", 5.16666), ("N", 0.5)],
            IsotopicModels::Glycopeptide => vec![
                ("H", 15.75),
                ("C", 10.93),
                ("S", 0.02054),
                ("O", 6.4773),
                ("N", 1.6577),
            ],
            IsotopicModels::PermethylatedGlycan => {
                vec![("C", 12.0), ("H", 21.8333), ("N", 0.5), ("O", 5.16666)]
            }
            IsotopicModels::Heparin => {
                vec![("H", 10.5), ("C", 6.0), ("S", 0.5), ("O", 5.5), ("N", 0.5)]
            }
            IsotopicModels::HeparanSulfate => vec![
                ("H", 10.667),
                ("C", 6.0),
                ("S", 1.333),
                ("O", 9.0),
                ("N", 0.667),
            ],
        }
        .into()
    }
}

/// An [`IsotopeRatioModel`] that derives ratios from an averagine [`IsotopicModel`],
/// caching the ratio table for each m/z bucket and charge state.
///
/// The m/z is rounded to the nearest multiple of `cache_truncation` before the pattern is
/// generated so that nearby queries share a table.
///
/// Ratio `k` always describes the isotope `k` neutron shifts above the monoisotopic peak.
/// When the pattern parameters drop the monoisotopic peak, as they do for large masses,
/// the table is empty and no ratios are offered for that m/z and charge.
#[derive(Debug, Clone)]
pub struct AveragineRatioModel<'lifespan> {
    inner: IsotopicModel<'lifespan>,
    pub params: IsotopicPatternParams,
    pub intensity_cv: f64,
    cache_truncation: f64,
    cache: BTreeMap<(i64, i32), Vec<f64>>,
}

impl<'lifespan> AveragineRatioModel<'lifespan> {
    pub fn new(
        inner: IsotopicModel<'lifespan>,
        params: IsotopicPatternParams,
        intensity_cv: f64,
        cache_truncation: f64,
    ) -> Self {
        Self {
            inner,
            params,
            intensity_cv,
            cache_truncation,
            cache: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Pre-compute ratio tables for every m/z bucket between `min_mz` and `max_mz`
    /// and every charge state between `min_charge` and `max_charge`, inclusive.
    pub fn populate_cache(&mut self, min_mz: f64, max_mz: f64, min_charge: i32, max_charge: i32) {
        trace!("Starting isotopic ratio cache population");
        let mut mz = min_mz;
        while mz <= max_mz {
            for charge in min_charge..=max_charge {
                self.ratio_table(mz, charge);
            }
            mz += self.cache_truncation;
        }
        trace!(
            "Finished isotopic ratio cache population, {} entries created",
            self.len()
        );
    }

    /// Get the full ratio table for `mz` and `charge`, generating it if necessary
    pub fn ratio_table(&mut self, mz: f64, charge: i32) -> &[f64] {
        let bucket = (mz / self.cache_truncation).round();
        let key = (bucket as i64, charge);
        match self.cache.entry(key) {
            Entry::Occupied(ent) => ent.into_mut(),
            Entry::Vacant(ent) => {
                let tid =
                    self.inner
                        .isotopic_cluster(bucket * self.cache_truncation, charge, self.params);
                ent.insert(slot_ratios(&tid, charge))
            }
        }
    }
}

/// Place each retained peak of `tid` at its isotope offset from the pattern origin,
/// normalized to the monoisotopic peak
fn slot_ratios(tid: &TheoreticalIsotopicPattern, charge: i32) -> Vec<f64> {
    let z = charge.unsigned_abs() as f64;
    let mut ratios: Vec<f64> = Vec::with_capacity(tid.len());
    for p in tid.iter() {
        let slot = ((p.mz - tid.origin) * z / NEUTRON_SHIFT).round();
        if slot < 0.0 {
            continue;
        }
        let slot = slot as usize;
        if ratios.len() <= slot {
            ratios.resize(slot + 1, 0.0);
        }
        ratios[slot] += p.intensity;
    }
    match ratios.first() {
        Some(mono) if *mono > 0.0 => normalize_ratios(ratios),
        _ => Vec::new(),
    }
}

impl<'a> From<IsotopicModel<'a>> for AveragineRatioModel<'a> {
    fn from(inner: IsotopicModel<'a>) -> Self {
        Self::new(
            inner,
            IsotopicPatternParams::default(),
            DEFAULT_INTENSITY_CV,
            1.0,
        )
    }
}

impl From<IsotopicModels> for AveragineRatioModel<'_> {
    fn from(source: IsotopicModels) -> AveragineRatioModel<'static> {
        let model: IsotopicModel = source.into();
        model.into()
    }
}

impl IsotopeRatioModel for AveragineRatioModel<'_> {
    fn ratios(&mut self, mz: f64, charge: i32, count: usize) -> Option<Vec<f64>> {
        if charge == 0 || count == 0 {
            return None;
        }
        let table = self.ratio_table(mz, charge);
        if table.len() >= count {
            Some(table[..count].to_vec())
        } else {
            None
        }
    }

    fn intensity_cv(&self, _mz: f64) -> f64 {
        self.intensity_cv
    }

    fn supports(&mut self, mz: f64, charge: i32, count: usize) -> bool {
        charge != 0 && count > 0 && self.ratio_table(mz, charge).len() >= count
    }
}
