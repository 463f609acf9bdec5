//! Merge-join intersection of sorted bin sequences with sorted manifest regions.
//!
//! Both operations assume genome-sorted, mutually non-overlapping bins and
//! chromosome-sorted, non-overlapping regions. The region cursor only ever
//! advances within a chromosome and resets to zero when the chromosome
//! changes, so a full pass is O(bins + regions).

use crate::bin::{GenomicBin, ManifestRegion, ManifestRegions};

/// Lazily yields the bins that overlap at least one manifest region on their
/// chromosome, preserving input order. All other bins are dropped.
pub fn on_target_bins<'a>(
    bins: &'a [GenomicBin],
    regions_by_chrom: &'a ManifestRegions,
) -> impl Iterator<Item = &'a GenomicBin> + 'a {
    let mut curr_chrom: Option<&'a str> = None;
    let mut regions: Option<&'a [ManifestRegion]> = None;
    let mut region_index = 0usize;

    bins.iter().filter(move |bin| {
        if curr_chrom != Some(bin.chromosome.as_str()) {
            curr_chrom = Some(bin.chromosome.as_str());
            regions = regions_by_chrom.get(&bin.chromosome).map(Vec::as_slice);
            region_index = 0;
        }
        let Some(regions) = regions else {
            return false;
        };
        // Regions are 1-based inclusive, bins 0-based half-open; a region
        // ending before position `start + 1` lies entirely before the bin.
        while region_index < regions.len() && regions[region_index].end < bin.start + 1 {
            region_index += 1;
        }
        region_index < regions.len() && regions[region_index].start <= bin.stop
    })
}

/// Intersects each bin with the manifest, emitting one record per overlapping
/// region with the interval clipped to the overlap (0-based half-open), in
/// region order. Bins overlapping no region are dropped entirely.
pub fn intersect_with_manifest(
    bins: &[GenomicBin],
    regions_by_chrom: &ManifestRegions,
) -> Vec<GenomicBin> {
    let mut out = Vec::new();
    let mut curr_chrom: Option<&str> = None;
    let mut regions: Option<&[ManifestRegion]> = None;
    let mut cursor = 0usize;

    for bin in bins {
        if curr_chrom != Some(bin.chromosome.as_str()) {
            curr_chrom = Some(bin.chromosome.as_str());
            regions = regions_by_chrom.get(&bin.chromosome).map(Vec::as_slice);
            cursor = 0;
        }
        let Some(regions) = regions else {
            continue;
        };
        while cursor < regions.len() && regions[cursor].end < bin.start + 1 {
            cursor += 1;
        }
        // A region may span several bins, so scan ahead without moving the
        // cursor itself.
        let mut index = cursor;
        while index < regions.len() && regions[index].start <= bin.stop {
            let start = bin.start.max(regions[index].start - 1);
            let stop = bin.stop.min(regions[index].end);
            out.push(GenomicBin::new(
                bin.chromosome.clone(),
                start,
                stop,
                bin.gc,
                bin.count,
            ));
            index += 1;
        }
    }
    out
}
