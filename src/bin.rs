use std::collections::HashMap;

use derive_new::new;

/// A genomic window with an associated read count and GC percentage.
///
/// Coordinates are 0-based half-open. Bin sequences are expected to be sorted
/// by chromosome then by `start`, with no overlap within a chromosome.
#[derive(Debug, Clone, PartialEq, new)]
pub struct GenomicBin {
    pub chromosome: String,
    /// 0-based inclusive start.
    pub start: u64,
    /// 0-based exclusive stop.
    pub stop: u64,
    /// GC content percentage, always in `0..=100`.
    pub gc: usize,
    /// Read count; never negative.
    pub count: f64,
    /// Local-noise annotation set by the local-SD estimator.
    #[new(default)]
    pub mad_of_diffs: f64,
}

impl GenomicBin {
    pub fn size(&self) -> u64 {
        self.stop - self.start
    }
}

/// A targeted-sequencing manifest region with 1-based inclusive coordinates.
///
/// Regions for a chromosome are non-overlapping and sorted by `start`.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ManifestRegion {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

/// Pre-parsed manifest: chromosome -> sorted region list.
pub type ManifestRegions = HashMap<String, Vec<ManifestRegion>>;

/// Whether a chromosome name refers to an autosome (`chr1`..`chr22`, `1`..`22`).
pub fn is_autosome(chromosome: &str) -> bool {
    let name = chromosome.strip_prefix("chr").unwrap_or(chromosome);
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}
