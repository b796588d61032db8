use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use nanoqc::core::metrics::{GroupStats, RunSummary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: &str = "group\tname\treads\tbases\tmean_length\tmin_length\tmax_length\tn50\tmean_quality\tmean_gc\tfirst_read\tlast_read\tspan_hours";

pub fn write(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {} failed", path.display()))?;
    let mut w = BufWriter::new(file);
    write_to(&mut w, summary)?;
    w.flush()?;
    Ok(())
}

pub fn write_to<W: Write>(w: &mut W, summary: &RunSummary) -> Result<()> {
    writeln!(w, "{}", HEADER)?;
    write_row(w, "total", "all", &summary.total)?;
    for (flag, stats) in &summary.by_flag {
        write_row(w, "flag", flag.as_str_lower(), stats)?;
    }
    for (sample, stats) in &summary.by_sample {
        write_row(w, "sample", sample, stats)?;
    }
    Ok(())
}

fn write_row<W: Write>(w: &mut W, group: &str, name: &str, s: &GroupStats) -> Result<()> {
    let min_len = if s.reads == 0 { 0 } else { s.min_len };
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{:.1}\t{}\t{}\t{}\t{:.2}\t{:.1}\t{}\t{}\t{:.2}",
        group,
        name,
        s.reads,
        s.bases,
        s.mean_length(),
        min_len,
        s.max_len,
        s.n50(),
        s.mean_quality(),
        s.mean_gc(),
        fmt_time(s.first),
        fmt_time(s.last),
        s.span_hours()
    )?;
    Ok(())
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "NA".to_string())
}
