//! A basic demonstration of how to use [`mzdeisotope_greedy::deisotope_scan`]

use std::collections::BTreeMap;

use mzdeisotope_greedy::{
    isotopic_model::{AveragineRatioModel, IsotopeRatioModel, IsotopicModels, NEUTRON_SHIFT},
    prelude::*,
    DeisotopingError,
};
use mzpeaks::Tolerance;

fn main() -> Result<(), DeisotopingError> {
    tracing_subscriber::fmt::init();

    // Build an isotopic pattern model that follows the peptide averagine (Senko et al.)
    let mut model = AveragineRatioModel::from(IsotopicModels::Peptide);
    // Fill the ratio cache ahead of time so every scan sees the same tables
    model.populate_cache(400.0, 1500.0, 1, 4);

    // Set up for example, synthesize a scan with two overlapping peptide envelopes
    // and a little noise
    let mut peaks = Vec::new();
    for (mz, charge, scale) in [(650.3, 2, 5e4), (651.1, 3, 2e4)] {
        let ratios = model.ratios(mz, charge, 4).unwrap_or_default();
        peaks.extend(
            ratios
                .iter()
                .enumerate()
                .map(|(k, r)| (mz + k as f64 * NEUTRON_SHIFT / charge as f64, scale * r)),
        );
    }
    peaks.extend([(640.0, 150.0), (655.45, 80.0)]);
    let mut source =
        InMemoryScanSource::new().with_scan(ScanHeader::new(1, 1, 12.3), peaks);

    let config = DeisotoperConfig::default()
        .with_charge_range((1, 4))
        .with_error_tolerance(Tolerance::PPM(20.0))
        .with_short_report(false);
    let config = DeisotoperConfig {
        isotope_spacing: NEUTRON_SHIFT,
        ..config
    };

    let deconv_peaks = deisotope_scan(&mut source, 1, model, config)?;

    // Let's count some charge states to prove something happened
    let mut table: BTreeMap<i32, usize> = BTreeMap::new();
    for peak in deconv_peaks.iter() {
        *table.entry(peak.charge()).or_default() += 1;
        println!("{}", peak.annotation());
    }
    println!("{table:?}");
    Ok(())
}
