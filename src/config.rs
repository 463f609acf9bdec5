use std::path::PathBuf;

use bon::Builder;

use crate::bin::ManifestRegions;

/// Default minimum number of observations a GC bucket needs before its
/// statistics are trusted directly.
pub const DEFAULT_MIN_BINS_PER_GC_BUCKET: usize = 100;

/// Default local-SD removal threshold, doubled at comparison time. Separates
/// fresh-frozen from noisy FFPE samples on the original training set.
pub const DEFAULT_FFPE_LOCAL_SD_THRESHOLD: f64 = 20.0;

/// Configuration for a [`BinCleaner`](crate::BinCleaner) run.
///
/// Every threshold the pipeline consults lives here; stages never share
/// mutable globals.
#[derive(Debug, Clone, Builder)]
pub struct CleanConfig {
    /// Apply GC-bias normalization (simple, plus variance stabilization on
    /// large bin sets).
    #[builder(default = false)]
    pub perform_gc_normalization: bool,
    /// Drop genomically large bins (centromeres and similar regions).
    #[builder(default = false)]
    pub filter_large_bins: bool,
    /// Drop chi-squared point outliers.
    #[builder(default = false)]
    pub remove_outliers: bool,
    /// Where to write the local-SD average; enables FFPE artifact filtering.
    pub ffpe_output_path: Option<PathBuf>,
    /// Pre-parsed manifest restricting normalization statistics to on-target
    /// bins.
    pub manifest_regions: Option<ManifestRegions>,
    /// Minimum observations per GC bucket for direct statistics.
    #[builder(default = DEFAULT_MIN_BINS_PER_GC_BUCKET)]
    pub min_bins_per_gc_bucket: usize,
    /// Local-SD removal threshold.
    #[builder(default = DEFAULT_FFPE_LOCAL_SD_THRESHOLD)]
    pub ffpe_local_sd_threshold: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
