//! binclean: bias correction and cleaning of genomic read-count bins
//!
//! This library takes raw per-window read counts ("bins") across a genome and
//! produces a cleaned, bias-corrected bin set suitable for downstream
//! segmentation and copy-number calling.
//!
//! The main components of this library are:
//! - `BinCleaner`: the pipeline driver applying the cleaning stages in order
//! - `CleanConfig`: stage toggles and decision thresholds
//! - `GenomicBin` / `ManifestRegion`: the bin and target-region records
//! - `on_target_bins` / `intersect_with_manifest`: sorted-sequence
//!   intersection of bins with manifest regions
//! - `io`: tab-delimited (optionally gzipped) bin readers and writers

mod bin;
mod config;
mod gc;
mod intersect;
pub mod io;
mod math;
mod normalize;
mod outliers;
mod pipeline;

pub use bin::{is_autosome, GenomicBin, ManifestRegion, ManifestRegions};
pub use config::{CleanConfig, DEFAULT_FFPE_LOCAL_SD_THRESHOLD, DEFAULT_MIN_BINS_PER_GC_BUCKET};
pub use intersect::{intersect_with_manifest, on_target_bins};
pub use pipeline::{BinCleaner, CleanSummary, StageOutcome};
