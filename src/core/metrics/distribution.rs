use crate::core::model::{FeatureRecord, Flag};
use crate::core::table::FeatureTable;
use std::collections::BTreeMap;

/// Per-read quality of one flag within one hour of the run.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityBin {
    pub flag: Flag,
    /// Hours since the earliest read of the run, rounded half to even.
    pub hour: i64,
    pub reads: u64,
    pub mean: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Read count in `[lower, upper)`; the last bin of a series also holds `upper`.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBin {
    pub flag: Flag,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Mean quality rounded to one decimal, ties to even.
fn rounded_quality(q: f64) -> f64 {
    (q * 10.0).round_ties_even() / 10.0
}

/// Quality of every read grouped by flag and run hour. The time origin is
/// the earliest read over both flags.
pub fn quality_by_hour(table: &FeatureTable) -> Vec<QualityBin> {
    let Some(t0) = table.records().map(|r| r.timestamp).min() else {
        return Vec::new();
    };
    let mut groups: BTreeMap<(Flag, i64), Vec<f64>> = BTreeMap::new();
    for r in table.records() {
        let hour = ((r.timestamp - t0).num_seconds() as f64 / 3600.0).round_ties_even() as i64;
        groups
            .entry((r.flag, hour))
            .or_default()
            .push(rounded_quality(r.mean_quality));
    }

    groups
        .into_iter()
        .map(|((flag, hour), mut q)| {
            q.sort_unstable_by(f64::total_cmp);
            let n = q.len();
            let median = if n % 2 == 1 {
                q[n / 2]
            } else {
                (q[n / 2 - 1] + q[n / 2]) / 2.0
            };
            QualityBin {
                flag,
                hour,
                reads: n as u64,
                mean: q.iter().sum::<f64>() / n as f64,
                min: q[0],
                median,
                max: q[n - 1],
            }
        })
        .collect()
}

/// Unit-wide bins of rounded mean quality, starting at the lowest value
/// seen over both flags.
pub fn phred_histogram(table: &FeatureTable) -> Vec<HistogramBin> {
    let values: Vec<(Flag, f64)> = table
        .records()
        .map(|r| (r.flag, rounded_quality(r.mean_quality)))
        .collect();
    let Some((lo, hi)) = bounds(values.iter().map(|v| v.1)) else {
        return Vec::new();
    };
    let n = ((hi - lo).floor() as usize + 1).max(1);
    let edges: Vec<f64> = (0..=n).map(|i| lo + i as f64).collect();
    count_bins(&values, &edges)
}

/// Log-spaced length bins between the shortest and longest read, about ten
/// per decade of the length range.
pub fn length_histogram(table: &FeatureTable) -> Vec<HistogramBin> {
    let values: Vec<(Flag, f64)> = table
        .records()
        .map(|r| (r.flag, r.length as f64))
        .collect();
    let Some((lo, hi)) = bounds(values.iter().map(|v| v.1)) else {
        return Vec::new();
    };
    let points = if hi > lo {
        ((10.0 * (hi - lo).log10()).round_ties_even() as usize).max(2)
    } else {
        2
    };
    let edges = log_edges(lo.max(1.0), hi.max(1.0), points);
    count_bins(&values, &edges)
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn log_edges(lo: f64, hi: f64, points: usize) -> Vec<f64> {
    let (a, b) = (lo.log10(), hi.log10());
    let step = (b - a) / (points - 1) as f64;
    let mut edges: Vec<f64> = (0..points)
        .map(|i| 10f64.powf(a + step * i as f64))
        .collect();
    // exact ends, so min and max land inside
    edges[0] = lo;
    edges[points - 1] = hi;
    edges
}

/// Counts `values` into the bins delimited by `edges`, per flag; empty bins
/// are kept so both series share the same axis.
fn count_bins(values: &[(Flag, f64)], edges: &[f64]) -> Vec<HistogramBin> {
    let nbins = edges.len() - 1;
    let mut counts: BTreeMap<Flag, Vec<u64>> = BTreeMap::new();
    for &(flag, v) in values {
        let idx = edges[1..]
            .partition_point(|&e| e <= v)
            .min(nbins - 1);
        counts.entry(flag).or_insert_with(|| vec![0; nbins])[idx] += 1;
    }
    counts
        .into_iter()
        .flat_map(|(flag, bins)| {
            bins.into_iter().enumerate().map(move |(i, count)| HistogramBin {
                flag,
                lower: edges[i],
                upper: edges[i + 1],
                count,
            })
        })
        .collect()
}

/// Pass reads of one sample, for per-sample yield series.
pub fn pass_sample<'a>(sample: &'a str) -> impl FnMut(&FeatureRecord) -> bool + 'a {
    move |r| r.flag == Flag::Pass && &*r.sample_name == sample
}
