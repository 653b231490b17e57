//! Access to the centroided peak lists of individual scans
use std::collections::BTreeMap;

use crate::error::DeisotopingError;
use crate::peaks::{PeakObservation, PeakPool};

/// Descriptive metadata for a single scan
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanHeader {
    pub scan_number: u32,
    pub ms_level: u8,
    /// The retention time in minutes
    pub retention_time: f64,
}

impl ScanHeader {
    pub fn new(scan_number: u32, ms_level: u8, retention_time: f64) -> Self {
        Self {
            scan_number,
            ms_level,
            retention_time,
        }
    }
}

/// A source of centroided scans addressed by scan number, such as an indexed
/// spectrum file reader.
pub trait ScanSource {
    /// Read the `(m/z, intensity)` pairs of a scan
    fn peak_list(&mut self, scan_number: u32) -> Result<Vec<(f64, f64)>, DeisotopingError>;

    fn scan_header(&mut self, scan_number: u32) -> Result<ScanHeader, DeisotopingError>;
}

impl<T: ScanSource + ?Sized> ScanSource for &mut T {
    fn peak_list(&mut self, scan_number: u32) -> Result<Vec<(f64, f64)>, DeisotopingError> {
        (**self).peak_list(scan_number)
    }

    fn scan_header(&mut self, scan_number: u32) -> Result<ScanHeader, DeisotopingError> {
        (**self).scan_header(scan_number)
    }
}

/// A [`ScanSource`] over scans held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryScanSource {
    scans: BTreeMap<u32, (ScanHeader, Vec<(f64, f64)>)>,
}

impl InMemoryScanSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scan, replacing any scan with the same number
    pub fn insert(&mut self, header: ScanHeader, peaks: Vec<(f64, f64)>) {
        self.scans.insert(header.scan_number, (header, peaks));
    }

    pub fn with_scan(mut self, header: ScanHeader, peaks: Vec<(f64, f64)>) -> Self {
        self.insert(header, peaks);
        self
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Iterate over the scan numbers in ascending order
    pub fn scan_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.scans.keys().copied()
    }
}

impl ScanSource for InMemoryScanSource {
    fn peak_list(&mut self, scan_number: u32) -> Result<Vec<(f64, f64)>, DeisotopingError> {
        self.scans
            .get(&scan_number)
            .map(|(_, peaks)| peaks.clone())
            .ok_or(DeisotopingError::ScanNotFound(scan_number))
    }

    fn scan_header(&mut self, scan_number: u32) -> Result<ScanHeader, DeisotopingError> {
        self.scans
            .get(&scan_number)
            .map(|(header, _)| *header)
            .ok_or(DeisotopingError::ScanNotFound(scan_number))
    }
}

impl PeakPool {
    /// Read a scan from `source` into a validated pool, tagging every observation with
    /// the scan's retention time.
    pub fn from_scan<S: ScanSource>(
        source: &mut S,
        scan_number: u32,
    ) -> Result<Self, DeisotopingError> {
        let header = source.scan_header(scan_number)?;
        let peaks = source
            .peak_list(scan_number)?
            .into_iter()
            .map(|(mz, intensity)| {
                PeakObservation::with_retention_time(mz, intensity, header.retention_time)
            })
            .collect();
        Self::new(peaks)
    }
}
