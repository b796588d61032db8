use anyhow::{Context, Result};
use nanoqc::core::FeatureTable;
use nanoqc::core::metrics::{HistogramBin, length_histogram, phred_histogram, quality_by_hour};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const QUALITY_HEADER: &str = "flag\thour\treads\tmean\tmin\tmedian\tmax";
const HISTOGRAM_HEADER: &str = "metric\tflag\tlower\tupper\tcount";

pub fn write_quality_by_hour(path: &Path, table: &FeatureTable) -> Result<()> {
    with_file(path, |w| quality_by_hour_to(w, table))
}

pub fn write_histograms(path: &Path, table: &FeatureTable) -> Result<()> {
    with_file(path, |w| histograms_to(w, table))
}

fn with_file<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(path).with_context(|| format!("create {} failed", path.display()))?;
    let mut w = BufWriter::new(file);
    f(&mut w)?;
    w.flush()?;
    Ok(())
}

pub fn quality_by_hour_to<W: Write>(w: &mut W, table: &FeatureTable) -> Result<()> {
    writeln!(w, "{}", QUALITY_HEADER)?;
    for b in quality_by_hour(table) {
        writeln!(
            w,
            "{}\t{}\t{}\t{:.2}\t{:.1}\t{:.2}\t{:.1}",
            b.flag.as_str_lower(),
            b.hour,
            b.reads,
            b.mean,
            b.min,
            b.median,
            b.max
        )?;
    }
    Ok(())
}

/// Phred bins first, then read length bins.
pub fn histograms_to<W: Write>(w: &mut W, table: &FeatureTable) -> Result<()> {
    writeln!(w, "{}", HISTOGRAM_HEADER)?;
    write_bins(w, "phred", &phred_histogram(table))?;
    write_bins(w, "length", &length_histogram(table))?;
    Ok(())
}

fn write_bins<W: Write>(w: &mut W, metric: &str, bins: &[HistogramBin]) -> Result<()> {
    for b in bins {
        writeln!(
            w,
            "{}\t{}\t{:.1}\t{:.1}\t{}",
            metric,
            b.flag.as_str_lower(),
            b.lower,
            b.upper,
            b.count
        )?;
    }
    Ok(())
}
