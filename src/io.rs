//! Reading and writing of bin records.
//!
//! Records are tab-delimited, one bin per line: `chromosome`, 0-based
//! inclusive `start`, 0-based exclusive `stop`, integer `gc` (0-100), float
//! `count`. Files ending in `.gz` are transparently (de)compressed. Lines
//! starting with `#` are ignored on input.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::bin::GenomicBin;

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Reads a bin file; a missing or malformed file is a hard error.
pub fn read_bins(path: &Path) -> Result<Vec<GenomicBin>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open bin file {}", path.display()))?;
    let reader: Box<dyn BufRead> = if is_gzipped(path) {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut bins = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bin = parse_bin(&line).with_context(|| {
            format!("malformed bin record at {}:{}", path.display(), line_number + 1)
        })?;
        bins.push(bin);
    }
    Ok(bins)
}

fn parse_bin(line: &str) -> Result<GenomicBin> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [chromosome, start, stop, gc, count] = fields.as_slice() else {
        bail!("expected 5 tab-delimited fields, found {}", fields.len());
    };
    let start: u64 = start.parse().context("invalid start coordinate")?;
    let stop: u64 = stop.parse().context("invalid stop coordinate")?;
    if stop <= start {
        bail!("stop must be greater than start");
    }
    let gc: usize = gc.parse().context("invalid GC value")?;
    if gc > 100 {
        bail!("GC percentage {gc} out of range 0-100");
    }
    let count: f64 = count.parse().context("invalid count")?;
    if !count.is_finite() || count < 0.0 {
        bail!("count must be a non-negative finite number");
    }
    Ok(GenomicBin::new(
        chromosome.to_string(),
        start,
        stop,
        gc,
        count,
    ))
}

/// Writes a bin file, gzip-compressed when the path ends in `.gz`.
pub fn write_bins(path: &Path, bins: &[GenomicBin]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create bin file {}", path.display()))?;
    let mut writer: Box<dyn Write> = if is_gzipped(path) {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };
    for bin in bins {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            bin.chromosome, bin.start, bin.stop, bin.gc, bin.count
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the single-value local-SD average companion file.
pub fn write_local_sd(path: &Path, local_sd_average: f64) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create local-SD file {}", path.display()))?;
    writeln!(file, "{local_sd_average}")?;
    Ok(())
}
