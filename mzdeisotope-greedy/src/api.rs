//! High level single-shot entry points
use crate::config::DeisotoperConfig;
use crate::deisotoper::Deisotoper;
use crate::error::DeisotopingError;
use crate::isotopic_model::IsotopeRatioModel;
use crate::peaks::PeakPool;
use crate::scan::ScanSource;
use crate::scorer::CosineScorer;
use crate::solution::DeconvolutedPeak;

/// A single-shot deisotoping operation on the provided peak pool.
///
/// # Arguments
/// - `pool`: The peaks of a single scan. It is left exhausted.
/// - `isotopic_model`: The source of expected isotopic peak ratios
/// - `config`: The search and acceptance parameters
///
/// # Note
/// If you are calling this function with the same model on many scans, it may be
/// preferable to create a [`Deisotoper`] and call [`Deisotoper::run`] so that a caching
/// model like [`AveragineRatioModel`](crate::isotopic_model::AveragineRatioModel) keeps
/// its tables between scans.
pub fn deisotope_peaks<I: IsotopeRatioModel>(
    pool: &mut PeakPool,
    isotopic_model: I,
    config: DeisotoperConfig,
) -> Result<Vec<DeconvolutedPeak>, DeisotopingError> {
    let mut engine = Deisotoper::new(isotopic_model, CosineScorer::default(), config)?;
    Ok(engine.run(pool))
}

/// Read `scan_number` from `source` and deisotope it, tagging every result with the
/// scan number.
pub fn deisotope_scan<S: ScanSource, I: IsotopeRatioModel>(
    source: &mut S,
    scan_number: u32,
    isotopic_model: I,
    config: DeisotoperConfig,
) -> Result<Vec<DeconvolutedPeak>, DeisotopingError> {
    let mut engine = Deisotoper::new(
        isotopic_model,
        CosineScorer::default(),
        config.with_scan_number(scan_number),
    )?;
    let mut pool = PeakPool::from_scan(source, scan_number)?;
    Ok(engine.run(&mut pool))
}
