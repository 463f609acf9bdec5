//! GC-bias normalization of bin counts.
//!
//! Statistics are always computed from the autosomal (and, when a manifest is
//! supplied, on-target) sample but applied to every bin in the set.

use log::warn;

use crate::bin::{GenomicBin, ManifestRegions};
use crate::gc::{GcBuckets, NUM_GC_BUCKETS};

/// Empirically tuned damping applied to the IQR-ratio compression factor.
/// Inherited from the training data behind the variance stabilization; not
/// derived from first principles.
pub const VARIANCE_COMPRESSION_FACTOR: f64 = 0.8;

/// A bucket is IQR-significant when its IQR exceeds this multiple of the
/// genome-wide IQR.
pub const SIGNIFICANT_IQR_RATIO: f64 = 2.0;

/// GC range checked for IQR significance; extreme GC values are too
/// unreliable to vote.
const SIGNIFICANCE_GC_RANGE: std::ops::Range<usize> = 10..90;

/// Simple multiplicative GC bias correction.
///
/// Rescales every bin count by `global_median / bucket_median` whenever the
/// bucket median is positive; buckets with no usable median are left
/// untouched. Returns whether the correction was applied at all.
pub fn normalize_by_gc(
    bins: &mut [GenomicBin],
    manifest: Option<&ManifestRegions>,
    min_samples: usize,
) -> bool {
    let buckets = GcBuckets::from_bins(bins, manifest);
    let Some(global_median) = buckets.global_median() else {
        warn!("no autosomal counts available; skipping GC normalization");
        return false;
    };

    let medians: Vec<Option<f64>> = (0..NUM_GC_BUCKETS)
        .map(|gc| buckets.bucket_median(gc, min_samples))
        .collect();

    for bin in bins.iter_mut() {
        if let Some(median) = medians[bin.gc] {
            if median > 0.0 {
                bin.count = global_median * bin.count / median;
            }
        }
    }
    true
}

/// Variance stabilization across GC buckets.
///
/// When at least one bucket in the 10-89 GC range has an IQR exceeding
/// [`SIGNIFICANT_IQR_RATIO`] times the global IQR, every bin whose bucket IQR
/// exceeds [`VARIANCE_COMPRESSION_FACTOR`] times the global IQR has its
/// deviation from the bucket median divided by
/// `(bucket_iqr / global_iqr) * VARIANCE_COMPRESSION_FACTOR`, preserving the
/// deviation's sign. Returns whether any bin was compressed; compression
/// shifts the mean, so callers re-run [`normalize_by_gc`] afterwards.
pub fn normalize_variance_by_gc(
    bins: &mut [GenomicBin],
    manifest: Option<&ManifestRegions>,
    min_samples: usize,
) -> bool {
    let buckets = GcBuckets::from_bins(bins, manifest);
    let Some(global) = buckets.global_quartiles() else {
        warn!("no autosomal counts available; skipping variance stabilization");
        return false;
    };
    let global_iqr = global.iqr();
    if global_iqr <= 0.0 {
        warn!("degenerate global IQR; skipping variance stabilization");
        return false;
    }

    let bucket_stats: Vec<_> = (0..NUM_GC_BUCKETS)
        .map(|gc| buckets.bucket_quartiles(gc, min_samples))
        .collect();

    let significant_buckets = SIGNIFICANCE_GC_RANGE
        .filter(|&gc| {
            bucket_stats[gc]
                .as_ref()
                .is_some_and(|stats| stats.iqr() > SIGNIFICANT_IQR_RATIO * global_iqr)
        })
        .count();
    if significant_buckets == 0 {
        return false;
    }

    let mut compressed = false;
    for bin in bins.iter_mut() {
        let Some(stats) = &bucket_stats[bin.gc] else {
            continue;
        };
        let bucket_iqr = stats.iqr();
        if bucket_iqr > VARIANCE_COMPRESSION_FACTOR * global_iqr {
            let factor = (bucket_iqr / global_iqr) * VARIANCE_COMPRESSION_FACTOR;
            let deviation = bin.count - stats.median;
            bin.count = (stats.median + deviation / factor).max(0.0);
            compressed = true;
        }
    }
    compressed
}
