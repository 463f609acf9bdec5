//! The cleaning pipeline driver.
//!
//! Stages run in a fixed order, each independently toggled by the
//! configuration: point-outlier removal, big-bin removal, local-SD estimation
//! and removal, then GC normalization. Every stage consumes the bin vector by
//! value and hands a new one onward; statistic failures degrade to a warning
//! and a skipped stage, while missing or unwritable files are hard errors.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::bin::GenomicBin;
use crate::config::CleanConfig;
use crate::gc::remove_low_support_gc_bins;
use crate::io;
use crate::normalize::{normalize_by_gc, normalize_variance_by_gc};
use crate::outliers::{
    estimate_local_sd, remove_big_bins, remove_extreme_local_sd, remove_point_outliers,
};

/// Below this many bins the windowed local-SD estimator has too little signal
/// (targeted and low-coverage data).
pub const MIN_BINS_FOR_LOCAL_SD: usize = 50_000;

/// Variance stabilization is only worthwhile on large exome panels and whole
/// genomes.
pub const MIN_BINS_FOR_VARIANCE_NORMALIZATION: usize = 500_000;

/// Outcome of one optional cleaning stage.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage ran and produced a (possibly shorter or mutated) bin set.
    Applied(Vec<GenomicBin>),
    /// The stage could not run; the input passes through untouched.
    Skipped {
        bins: Vec<GenomicBin>,
        reason: String,
    },
}

impl StageOutcome {
    /// Unwraps the bin set, logging a warning for skipped stages.
    pub fn into_bins(self) -> Vec<GenomicBin> {
        match self {
            StageOutcome::Applied(bins) => bins,
            StageOutcome::Skipped { bins, reason } => {
                warn!("stage skipped: {reason}");
                bins
            }
        }
    }
}

/// What a [`BinCleaner`] run did, for reporting.
#[derive(Debug, Clone, Default)]
pub struct CleanSummary {
    pub input_bins: usize,
    pub output_bins: usize,
    pub outliers_removed: usize,
    pub big_bins_removed: usize,
    pub ffpe_bins_removed: usize,
    pub low_gc_support_removed: usize,
    /// Genome-wide average window SD, when the estimator ran.
    pub local_sd_average: Option<f64>,
    /// Whether variance stabilization compressed any bin.
    pub variance_stabilized: bool,
}

/// Applies the configured cleaning stages to a bin set.
pub struct BinCleaner {
    config: CleanConfig,
}

impl BinCleaner {
    pub fn new(config: CleanConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline over `bins`, returning the cleaned set and a summary.
    ///
    /// The input must be sorted by chromosome then start, with non-overlapping
    /// bins per chromosome.
    pub fn run(&self, bins: Vec<GenomicBin>) -> Result<(Vec<GenomicBin>, CleanSummary)> {
        let mut summary = CleanSummary {
            input_bins: bins.len(),
            ..Default::default()
        };
        let mut bins = bins;

        if self.config.remove_outliers {
            let before = bins.len();
            bins = remove_point_outliers(bins);
            summary.outliers_removed = before - bins.len();
            info!("removed {} point outliers", summary.outliers_removed);
        }

        if self.config.filter_large_bins {
            let before = bins.len();
            bins = remove_big_bins(bins).into_bins();
            summary.big_bins_removed = before - bins.len();
            info!("removed {} oversized bins", summary.big_bins_removed);
        }

        if let Some(path) = &self.config.ffpe_output_path {
            if bins.len() < MIN_BINS_FOR_LOCAL_SD {
                info!(
                    "{} bins is too few for local-SD estimation; skipping FFPE filtering",
                    bins.len()
                );
            } else if let Some(average) = estimate_local_sd(&mut bins) {
                io::write_local_sd(path, average)
                    .with_context(|| format!("failed to write local-SD average to {}", path.display()))?;
                summary.local_sd_average = Some(average);

                let before = bins.len();
                bins = remove_extreme_local_sd(bins, average, self.config.ffpe_local_sd_threshold);
                summary.ffpe_bins_removed = before - bins.len();
                info!(
                    "local SD average {average:.3}; removed {} noisy bins",
                    summary.ffpe_bins_removed
                );
            }
        }

        if self.config.perform_gc_normalization {
            bins = self.normalize(bins, &mut summary);
        }

        summary.output_bins = bins.len();
        Ok((bins, summary))
    }

    fn normalize(&self, bins: Vec<GenomicBin>, summary: &mut CleanSummary) -> Vec<GenomicBin> {
        let manifest = self.config.manifest_regions.as_ref();
        let min_samples = self.config.min_bins_per_gc_bucket;

        let before = bins.len();
        let stripped = match remove_low_support_gc_bins(bins, min_samples, manifest) {
            StageOutcome::Skipped { bins, reason } => {
                warn!("{reason}; proceeding without GC correction");
                return bins;
            }
            StageOutcome::Applied(stripped) => stripped,
        };
        let mut bins = stripped;
        summary.low_gc_support_removed = before - bins.len();

        normalize_by_gc(&mut bins, manifest, min_samples);

        if bins.len() > MIN_BINS_FOR_VARIANCE_NORMALIZATION
            && normalize_variance_by_gc(&mut bins, manifest, min_samples)
        {
            summary.variance_stabilized = true;
            // Compression shifts the mean; re-center with a second simple pass.
            normalize_by_gc(&mut bins, manifest, min_samples);
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn uniform_bins(chromosomes: &[&str], per_chromosome: usize) -> Vec<GenomicBin> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut bins = Vec::with_capacity(chromosomes.len() * per_chromosome);
        for chromosome in chromosomes {
            for index in 0..per_chromosome {
                let gc = 30 + index % 41;
                let count = if gc == 50 {
                    // Deliberately noisy bucket, IQR several times the global.
                    rng.gen_range(50.0..150.0)
                } else {
                    rng.gen_range(90.0..110.0)
                };
                let start = index as u64 * 100;
                bins.push(GenomicBin::new(
                    chromosome.to_string(),
                    start,
                    start + 100,
                    gc,
                    count,
                ));
            }
        }
        bins
    }

    #[test]
    fn test_large_set_triggers_variance_stabilization() {
        let bins = uniform_bins(&["chr1", "chr2", "chr3"], 200_001);
        let input_len = bins.len();
        let spread_before = noisy_bucket_iqr(&bins);

        let config = CleanConfig::builder().perform_gc_normalization(true).build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        assert!(summary.variance_stabilized);
        assert_eq!(cleaned.len(), input_len);
        assert_eq!(summary.low_gc_support_removed, 0);
        assert!(cleaned.iter().all(|bin| bin.count >= 0.0));

        let spread_after = noisy_bucket_iqr(&cleaned);
        assert!(spread_after < spread_before / 2.0);
    }

    #[test]
    fn test_small_set_skips_variance_stabilization() {
        let bins = uniform_bins(&["chr1"], 50_000);
        let config = CleanConfig::builder().perform_gc_normalization(true).build();
        let (_, summary) = BinCleaner::new(config).run(bins).unwrap();
        assert!(!summary.variance_stabilized);
    }

    #[test]
    fn test_sparse_input_passes_through_gc_stage_unchanged() {
        let bins = uniform_bins(&["chr1"], 50);
        let counts_before: Vec<f64> = bins.iter().map(|b| b.count).collect();

        let config = CleanConfig::builder().perform_gc_normalization(true).build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        let counts_after: Vec<f64> = cleaned.iter().map(|b| b.count).collect();
        assert_eq!(counts_before, counts_after);
        assert_eq!(summary.low_gc_support_removed, 0);
    }

    #[test]
    fn test_local_sd_skipped_below_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let sd_path = dir.path().join("local_sd.txt");
        let bins = uniform_bins(&["chr1"], 1_000);

        let config = CleanConfig::builder()
            .ffpe_output_path(sd_path.clone())
            .build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        assert!(summary.local_sd_average.is_none());
        assert!(!sd_path.exists());
        assert_eq!(cleaned.len(), 1_000);
    }

    #[test]
    fn test_local_sd_average_persisted_even_when_nothing_removed() {
        let dir = tempfile::tempdir().unwrap();
        let sd_path = dir.path().join("local_sd.txt");
        // Quiet sample: the average is recorded but removal never activates.
        let bins: Vec<_> = (0..60_000)
            .map(|i| {
                GenomicBin::new("chr1".to_string(), i * 100, (i + 1) * 100, 50, 100.0)
            })
            .collect();

        let config = CleanConfig::builder()
            .ffpe_output_path(sd_path.clone())
            .ffpe_local_sd_threshold(0.0)
            .build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        assert_eq!(summary.local_sd_average, Some(0.0));
        assert!(sd_path.exists());
        assert_eq!(summary.ffpe_bins_removed, 0);
        assert_eq!(cleaned.len(), 60_000);
    }

    #[test]
    fn test_noisy_region_removed_before_gc_support_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let sd_path = dir.path().join("local_sd.txt");

        // 30,000 quiet bins (350 at GC 70, the rest at GC 60) followed by a
        // 30,000-bin noisy stretch at GC 40. The local-SD filter drops the
        // noisy stretch first, so the per-bucket support cap is computed from
        // the ~30,000 survivors (cap 297) and the 350-bin GC-70 bucket clears
        // it. Normalizing before the removal would cap at 400 and strip it.
        let mut bins = Vec::with_capacity(60_000);
        for i in 0u64..30_000 {
            let gc = if i < 350 { 70 } else { 60 };
            bins.push(GenomicBin::new(
                "chr1".to_string(),
                i * 100,
                (i + 1) * 100,
                gc,
                100.0,
            ));
        }
        for i in 30_000u64..60_000 {
            let count = if i % 2 == 0 { 0.0 } else { 1_000.0 };
            bins.push(GenomicBin::new(
                "chr1".to_string(),
                i * 100,
                (i + 1) * 100,
                40,
                count,
            ));
        }

        let config = CleanConfig::builder()
            .perform_gc_normalization(true)
            .ffpe_output_path(sd_path)
            .min_bins_per_gc_bucket(400)
            .build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        assert_eq!(summary.ffpe_bins_removed, 29_980);
        // The trailing noisy bins fall outside the last full window, survive
        // the local-SD filter, and fail the GC support threshold instead.
        assert_eq!(summary.low_gc_support_removed, 20);
        assert_eq!(cleaned.iter().filter(|bin| bin.gc == 70).count(), 350);
        assert_eq!(cleaned.len(), 30_000);
    }

    #[test]
    fn test_stage_counters_reported() {
        let mut bins = uniform_bins(&["chr1"], 10_000);
        // One oversized bin at the end of the chromosome.
        bins.push(GenomicBin::new(
            "chr1".to_string(),
            10_000 * 100,
            10_000 * 100 + 1_000_000,
            50,
            100.0,
        ));

        let config = CleanConfig::builder().filter_large_bins(true).build();
        let (cleaned, summary) = BinCleaner::new(config).run(bins).unwrap();

        assert_eq!(summary.input_bins, 10_001);
        assert_eq!(summary.big_bins_removed, 1);
        assert_eq!(summary.output_bins, cleaned.len());
        assert!(cleaned.iter().all(|bin| bin.size() == 100));
    }

    fn noisy_bucket_iqr(bins: &[GenomicBin]) -> f64 {
        let counts: Vec<f64> = bins
            .iter()
            .filter(|bin| bin.gc == 50)
            .map(|bin| bin.count)
            .collect();
        crate::math::quartiles(&counts).unwrap().iqr()
    }
}
