//! Grouping of bin counts into 101 integer GC-content buckets and the robust
//! per-bucket statistics used by the normalizers.

use crate::bin::{is_autosome, GenomicBin, ManifestRegions};
use crate::config::DEFAULT_MIN_BINS_PER_GC_BUCKET;
use crate::intersect::on_target_bins;
use crate::math::{self, Quartiles};
use crate::pipeline::StageOutcome;

/// Number of integer GC-content classes (0-100).
pub const NUM_GC_BUCKETS: usize = 101;

/// Counts of autosomal bins grouped by integer GC content.
///
/// When a manifest is supplied the sample is further restricted to on-target
/// bins; statistics are computed from this restricted sample but applied to
/// every bin by the normalizers.
pub struct GcBuckets {
    by_gc: Vec<Vec<f64>>,
    all: Vec<f64>,
}

impl GcBuckets {
    pub fn from_bins(bins: &[GenomicBin], manifest: Option<&ManifestRegions>) -> Self {
        let mut by_gc = vec![Vec::new(); NUM_GC_BUCKETS];
        let mut all = Vec::with_capacity(bins.len());
        {
            let mut add = |bin: &GenomicBin| {
                if !is_autosome(&bin.chromosome) {
                    return;
                }
                by_gc[bin.gc].push(bin.count);
                all.push(bin.count);
            };
            match manifest {
                Some(regions) => on_target_bins(bins, regions).for_each(&mut add),
                None => bins.iter().for_each(&mut add),
            }
        }
        Self { by_gc, all }
    }

    pub fn global_median(&self) -> Option<f64> {
        math::median(&self.all)
    }

    pub fn global_quartiles(&self) -> Option<Quartiles> {
        math::quartiles(&self.all)
    }

    pub fn bucket_len(&self, gc: usize) -> usize {
        self.by_gc[gc].len()
    }

    /// Weighted sample for an under-populated bucket.
    ///
    /// Expands a symmetric window of neighboring buckets outward one step at a
    /// time until at least `min_samples` values are gathered or the window
    /// covers the whole valid GC range. The target bucket and its immediate
    /// neighbors carry weight 1; each further step outward halves the weight.
    /// This deliberately blends neighboring-GC behavior into the estimate.
    pub fn weighted_counts(&self, gc: usize, min_samples: usize) -> Vec<(f64, f64)> {
        let mut weighted = Vec::new();
        let mut radius = 0usize;
        let mut weight = 1.0;
        loop {
            let upper = gc + radius;
            let lower = gc as isize - radius as isize;
            if lower < 0 && upper >= NUM_GC_BUCKETS {
                break;
            }
            if upper < NUM_GC_BUCKETS {
                weighted.extend(self.by_gc[upper].iter().map(|&count| (count, weight)));
            }
            if lower >= 0 && lower as usize != upper {
                weighted.extend(self.by_gc[lower as usize].iter().map(|&count| (count, weight)));
            }
            if weighted.len() >= min_samples {
                break;
            }
            radius += 1;
            if radius > 1 {
                weight /= 2.0;
            }
        }
        weighted
    }

    /// Median count of a bucket, falling back to the weighted estimator when
    /// the bucket holds fewer than `min_samples` values. `None` only if no
    /// bucket anywhere has data.
    pub fn bucket_median(&self, gc: usize, min_samples: usize) -> Option<f64> {
        if self.by_gc[gc].len() >= min_samples {
            math::median(&self.by_gc[gc])
        } else {
            math::weighted_median(&self.weighted_counts(gc, min_samples))
        }
    }

    /// Quartiles of a bucket, weighted-quantile based below `min_samples`.
    pub fn bucket_quartiles(&self, gc: usize, min_samples: usize) -> Option<Quartiles> {
        if self.by_gc[gc].len() >= min_samples {
            math::quartiles(&self.by_gc[gc])
        } else {
            let weighted = self.weighted_counts(gc, min_samples);
            Some(Quartiles {
                q1: math::weighted_quantile(&weighted, 0.25)?,
                median: math::weighted_quantile(&weighted, 0.5)?,
                q3: math::weighted_quantile(&weighted, 0.75)?,
            })
        }
    }
}

/// Removes bins whose GC bucket is too sparsely populated for a stable
/// normalization constant.
///
/// The threshold is capped by the average per-bucket population (floored at
/// [`DEFAULT_MIN_BINS_PER_GC_BUCKET`]) so that low-coverage samples are not
/// stripped wholesale. Returns `Skipped` with the input untouched when no bin
/// would survive.
pub fn remove_low_support_gc_bins(
    bins: Vec<GenomicBin>,
    threshold: usize,
    manifest: Option<&ManifestRegions>,
) -> StageOutcome {
    let mut populations = [0usize; NUM_GC_BUCKETS];
    let mut total = 0usize;
    {
        let mut tally = |bin: &GenomicBin| {
            // Only autosomal bins feed the normalization statistics, so only
            // they count toward bucket support.
            if is_autosome(&bin.chromosome) {
                populations[bin.gc] += 1;
                total += 1;
            }
        };
        match manifest {
            Some(regions) => on_target_bins(&bins, regions).for_each(&mut tally),
            None => bins.iter().for_each(&mut tally),
        }
    }

    let average_per_bucket = (total / NUM_GC_BUCKETS).max(DEFAULT_MIN_BINS_PER_GC_BUCKET);
    let threshold = threshold.min(average_per_bucket);

    let surviving = bins
        .iter()
        .filter(|bin| populations[bin.gc] >= threshold)
        .count();
    if surviving == 0 {
        return StageOutcome::Skipped {
            bins,
            reason: "coverage too low to perform GC correction".to_string(),
        };
    }
    StageOutcome::Applied(
        bins.into_iter()
            .filter(|bin| populations[bin.gc] >= threshold)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bins_at_gc(gc: usize, counts: &[f64]) -> Vec<GenomicBin> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                GenomicBin::new("chr1".to_string(), i as u64 * 100, (i as u64 + 1) * 100, gc, count)
            })
            .collect()
    }

    #[test]
    fn test_bucket_median_direct() {
        let bins = bins_at_gc(40, &[1., 2., 3., 4., 5.]);
        let buckets = GcBuckets::from_bins(&bins, None);
        assert_relative_eq!(buckets.bucket_median(40, 5).unwrap(), 3.0);
    }

    #[test]
    fn test_empty_bucket_falls_back_to_neighbors() {
        // Bucket 50 has no direct samples; radius-1 neighbors supply them.
        let mut bins = bins_at_gc(49, &[10., 10., 10.]);
        bins.extend(bins_at_gc(51, &[10., 10., 10.]));
        let buckets = GcBuckets::from_bins(&bins, None);

        let median = buckets.bucket_median(50, 4).unwrap();
        assert!(median.is_finite());
        assert_relative_eq!(median, 10.0);
    }

    #[test]
    fn test_weighted_window_halves_beyond_radius_one() {
        // Two samples at radius 1, one more needed: radius 2 contributes with
        // half weight.
        let mut bins = bins_at_gc(49, &[5.0, 5.0]);
        bins.extend(bins_at_gc(48, &[7.0]));
        let buckets = GcBuckets::from_bins(&bins, None);

        let mut weighted = buckets.weighted_counts(50, 3);
        weighted.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        assert_eq!(weighted.len(), 3);
        assert_relative_eq!(weighted[0].0, 5.0);
        assert_relative_eq!(weighted[0].1, 1.0);
        assert_relative_eq!(weighted[2].0, 7.0);
        assert_relative_eq!(weighted[2].1, 0.5);
    }

    #[test]
    fn test_weighted_window_stops_at_bucket_range() {
        let bins = bins_at_gc(40, &[1.0]);
        let buckets = GcBuckets::from_bins(&bins, None);
        // Never reaches 1000 samples but must terminate once the window spans
        // the full 0-100 range.
        let weighted = buckets.weighted_counts(0, 1000);
        assert_eq!(weighted.len(), 1);
    }

    #[test]
    fn test_non_autosomal_bins_excluded_from_sample() {
        let mut bins = bins_at_gc(40, &[10., 10., 10.]);
        bins.push(GenomicBin::new("chrX".to_string(), 0, 100, 40, 9999.0));
        let buckets = GcBuckets::from_bins(&bins, None);
        assert_eq!(buckets.bucket_len(40), 3);
        assert_relative_eq!(buckets.global_median().unwrap(), 10.0);
    }

    #[test]
    fn test_remove_low_support_strips_rare_buckets() {
        let mut bins = bins_at_gc(40, &[1.0; 10]);
        bins.extend(bins_at_gc(90, &[1.0; 2]));
        // Cap brings the effective threshold down to the default floor; every
        // bucket is below it, so nothing survives and the stage is skipped.
        match remove_low_support_gc_bins(bins.clone(), 100, None) {
            StageOutcome::Skipped { bins: untouched, .. } => {
                assert_eq!(untouched.len(), 12);
            }
            StageOutcome::Applied(_) => panic!("expected skip on sparse input"),
        }
    }

    #[test]
    fn test_remove_low_support_keeps_populated_buckets() {
        let mut bins = bins_at_gc(40, &[1.0; 150]);
        bins.extend(bins_at_gc(90, &[1.0; 2]));
        match remove_low_support_gc_bins(bins, 100, None) {
            StageOutcome::Applied(kept) => {
                assert_eq!(kept.len(), 150);
                assert!(kept.iter().all(|bin| bin.gc == 40));
            }
            StageOutcome::Skipped { .. } => panic!("expected stripping to apply"),
        }
    }
}
