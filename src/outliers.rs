//! Point-outlier, size, and local-noise bin filters.

use itertools::Itertools;

use crate::bin::GenomicBin;
use crate::math::{arithmetic_mean, standard_deviation};
use crate::pipeline::StageOutcome;

/// 99th percentile of the chi-squared distribution with 1 degree of freedom.
pub const CHI_SQUARED_99TH_1DF: f64 = 6.635;

/// Bins larger than this size percentile are considered degenerate
/// (centromeres and similar regions).
pub const BIG_BIN_PERCENTILE: f64 = 0.98;

/// Number of consecutive-count differences per local-SD window.
pub const LOCAL_SD_WINDOW: usize = 20;

/// Local-SD removal only activates when the genome-wide average window SD
/// exceeds this value; fresh-frozen samples sit well below it.
pub const LOCAL_SD_ACTIVATION_AVERAGE: f64 = 5.0;

/// Whether two Poisson counts are unlikely to come from the same distribution,
/// judged by a chi-squared statistic against [`CHI_SQUARED_99TH_1DF`].
pub fn significantly_different(a: f64, b: f64) -> bool {
    if a + b == 0.0 {
        return false;
    }
    let mu = (a + b) / 2.0;
    let da = a - mu;
    let db = b - mu;
    (da * da + db * db) / mu > CHI_SQUARED_99TH_1DF
}

/// Removes point outliers by comparing each bin to its immediate neighbors.
///
/// A bin is kept when it agrees (not significantly different) with at least
/// one existing same-chromosome neighbor, or when it is the only bin in the
/// set. A bin flanked by a different chromosome on both sides is dropped.
/// Neighbors are always taken from the input sequence, not the filtered one.
pub fn remove_point_outliers(bins: Vec<GenomicBin>) -> Vec<GenomicBin> {
    let mut kept = Vec::with_capacity(bins.len());
    for index in 0..bins.len() {
        let previous = index.checked_sub(1).map(|i| &bins[i]);
        let next = bins.get(index + 1);
        let current = &bins[index];

        let same_previous = previous.is_some_and(|p| p.chromosome == current.chromosome);
        let same_next = next.is_some_and(|n| n.chromosome == current.chromosome);

        if previous.is_some() && next.is_some() && !same_previous && !same_next {
            continue;
        }
        let agrees_previous = same_previous
            && !significantly_different(current.count, bins[index - 1].count);
        let agrees_next =
            same_next && !significantly_different(current.count, bins[index + 1].count);
        if agrees_previous || agrees_next || (previous.is_none() && next.is_none()) {
            kept.push(current.clone());
        }
    }
    kept
}

/// Removes bins larger than the [`BIG_BIN_PERCENTILE`] size order statistic.
///
/// Skips with the input untouched when the set is too small to support the
/// percentile cut.
pub fn remove_big_bins(bins: Vec<GenomicBin>) -> StageOutcome {
    let mut sizes: Vec<u64> = bins.iter().map(GenomicBin::size).collect();
    sizes.sort_unstable();

    let rank = (BIG_BIN_PERCENTILE * bins.len() as f64) as usize;
    let Some(index) = rank.checked_sub(1) else {
        return StageOutcome::Skipped {
            bins,
            reason: "too few bins for size-percentile filtering".to_string(),
        };
    };
    let threshold = sizes[index];
    StageOutcome::Applied(bins.into_iter().filter(|bin| bin.size() <= threshold).collect())
}

/// Estimates local noise from the consecutive-count difference series.
///
/// The difference series is split into contiguous windows of
/// [`LOCAL_SD_WINDOW`] diffs; every bin in a window is annotated with that
/// window's standard deviation (`mad_of_diffs`). Window SDs are averaged per
/// chromosome (a window belongs to its first bin's chromosome), and those
/// per-chromosome averages are averaged genome-wide. Returns `None` when the
/// set is too small to form a single window.
pub fn estimate_local_sd(bins: &mut [GenomicBin]) -> Option<f64> {
    if bins.len() < LOCAL_SD_WINDOW + 1 {
        return None;
    }
    let diffs: Vec<f64> = bins.windows(2).map(|w| w[1].count - w[0].count).collect();

    let n_windows = diffs.len() / LOCAL_SD_WINDOW;
    let mut window_sds = Vec::with_capacity(n_windows);
    let mut window_chroms = Vec::with_capacity(n_windows);
    for window in 0..n_windows {
        let start = window * LOCAL_SD_WINDOW;
        let sd = standard_deviation(&diffs[start..start + LOCAL_SD_WINDOW]);
        window_chroms.push(bins[start].chromosome.clone());
        window_sds.push(sd);
        for bin in &mut bins[start..start + LOCAL_SD_WINDOW] {
            bin.mad_of_diffs = sd;
        }
    }

    let chrom_means: Vec<f64> = window_chroms
        .into_iter()
        .zip(window_sds)
        .into_group_map()
        .values()
        .map(|sds| arithmetic_mean(sds))
        .collect();
    Some(arithmetic_mean(&chrom_means))
}

/// Drops bins whose window SD exceeds twice the threshold, but only for
/// samples whose average local SD marks them as noisy (FFPE-like).
pub fn remove_extreme_local_sd(
    bins: Vec<GenomicBin>,
    local_sd_average: f64,
    threshold: f64,
) -> Vec<GenomicBin> {
    if local_sd_average <= LOCAL_SD_ACTIVATION_AVERAGE {
        return bins;
    }
    bins.into_iter()
        .filter(|bin| bin.mad_of_diffs <= threshold * 2.0)
        .collect()
}
