use crate::core::model::{FeatureRecord, Flag};
use crate::core::table::FeatureTable;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

mod distribution;
mod yield_curve;

pub use distribution::{
    HistogramBin, QualityBin, length_histogram, pass_sample, phred_histogram, quality_by_hour,
};
pub use yield_curve::{YieldPoint, yield_over_time};

/// Aggregates over a set of reads.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupStats {
    pub reads: u64,
    pub bases: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    quality_sum: f64,
    gc_sum: u64,
    lengths: Vec<usize>,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStats {
    pub fn new() -> Self {
        Self {
            reads: 0,
            bases: 0,
            min_len: usize::MAX,
            max_len: 0,
            first: None,
            last: None,
            quality_sum: 0.0,
            gc_sum: 0,
            lengths: Vec::new(),
        }
    }

    pub fn update(&mut self, record: &FeatureRecord) {
        self.reads += 1;
        self.bases += record.length as u64;
        self.min_len = self.min_len.min(record.length);
        self.max_len = self.max_len.max(record.length);
        self.quality_sum += record.mean_quality;
        self.gc_sum += record.gc_percent as u64;
        self.lengths.push(record.length);
        self.first = Some(self.first.map_or(record.timestamp, |t| t.min(record.timestamp)));
        self.last = Some(self.last.map_or(record.timestamp, |t| t.max(record.timestamp)));
    }

    pub fn merge(&mut self, other: &GroupStats) {
        self.reads += other.reads;
        self.bases += other.bases;
        self.min_len = self.min_len.min(other.min_len);
        self.max_len = self.max_len.max(other.max_len);
        self.quality_sum += other.quality_sum;
        self.gc_sum += other.gc_sum;
        self.lengths.extend_from_slice(&other.lengths);
        self.first = match (self.first, other.first) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last = match (self.last, other.last) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn mean_length(&self) -> f64 {
        if self.reads == 0 {
            return 0.0;
        }
        self.bases as f64 / self.reads as f64
    }

    /// Mean of the per-read mean qualities.
    pub fn mean_quality(&self) -> f64 {
        if self.reads == 0 {
            return 0.0;
        }
        self.quality_sum / self.reads as f64
    }

    pub fn mean_gc(&self) -> f64 {
        if self.reads == 0 {
            return 0.0;
        }
        self.gc_sum as f64 / self.reads as f64
    }

    /// Length L such that reads of length >= L hold at least half the bases.
    pub fn n50(&self) -> usize {
        let mut lengths = self.lengths.clone();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        let half = self.bases.div_ceil(2);
        let mut acc = 0u64;
        for len in lengths {
            acc += len as u64;
            if acc >= half {
                return len;
            }
        }
        0
    }

    /// Hours between the first and last read, whole seconds only.
    pub fn span_hours(&self) -> f64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => (last - first).num_seconds() as f64 / 3600.0,
            _ => 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub total: GroupStats,
    pub by_flag: BTreeMap<Flag, GroupStats>,
    /// Pass reads only.
    pub by_sample: BTreeMap<String, GroupStats>,
}

impl RunSummary {
    pub fn from_table(table: &FeatureTable) -> Self {
        // fixed visiting order keeps the float sums reproducible
        let mut records: Vec<&FeatureRecord> = table.records().collect();
        records.sort_unstable_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.read_id.cmp(&b.read_id))
        });

        let mut by_flag: BTreeMap<Flag, GroupStats> = BTreeMap::new();
        let mut by_sample: BTreeMap<String, GroupStats> = BTreeMap::new();
        for record in records {
            by_flag.entry(record.flag).or_default().update(record);
            if record.flag == Flag::Pass {
                by_sample
                    .entry(record.sample_name.to_string())
                    .or_default()
                    .update(record);
            }
        }

        let mut total = GroupStats::new();
        for stats in by_flag.values() {
            total.merge(stats);
        }
        Self {
            total,
            by_flag,
            by_sample,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::Path;
    use std::sync::Arc;

    pub(crate) fn rec(
        id: &str,
        sample: &str,
        flag: Flag,
        length: usize,
        minute: u32,
    ) -> FeatureRecord {
        FeatureRecord {
            read_id: id.to_string(),
            sample_name: Arc::from(sample),
            flag,
            length,
            mean_quality: 10.0,
            gc_percent: 50,
            timestamp: Utc.with_ymd_and_hms(2020, 2, 2, 10, minute, 0).unwrap(),
            source: Arc::from(Path::new("/run/x.fastq")),
        }
    }

    pub(crate) fn table(records: Vec<FeatureRecord>) -> FeatureTable {
        let mut t = FeatureTable::new();
        t.insert_many(records).unwrap();
        t
    }

    #[test]
    fn groups_by_flag_and_pass_sample() {
        let t = table(vec![
            rec("a", "bc01", Flag::Pass, 100, 0),
            rec("b", "bc01", Flag::Pass, 300, 30),
            rec("c", "bc02", Flag::Pass, 50, 10),
            rec("d", "bc02", Flag::Fail, 1000, 45),
        ]);
        let s = RunSummary::from_table(&t);
        assert_eq!(s.total.reads, 4);
        assert_eq!(s.total.bases, 1450);
        assert_eq!(s.by_flag[&Flag::Pass].reads, 3);
        assert_eq!(s.by_flag[&Flag::Fail].bases, 1000);
        assert_eq!(s.by_sample["bc01"].reads, 2);
        assert_eq!(s.by_sample["bc02"].reads, 1);
        assert_eq!(s.total.min_len, 50);
        assert_eq!(s.total.max_len, 1000);
        assert!((s.total.span_hours() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn n50_of_known_lengths() {
        let t = table(vec![
            rec("a", "s", Flag::Pass, 2, 0),
            rec("b", "s", Flag::Pass, 3, 0),
            rec("c", "s", Flag::Pass, 4, 0),
            rec("d", "s", Flag::Pass, 5, 0),
            rec("e", "s", Flag::Pass, 6, 0),
        ]);
        // 20 bases, half is 10: 6 + 5 = 11
        assert_eq!(RunSummary::from_table(&t).total.n50(), 5);
    }

    #[test]
    fn empty_group_means_are_zero() {
        let g = GroupStats::new();
        assert_eq!(g.mean_length(), 0.0);
        assert_eq!(g.mean_quality(), 0.0);
        assert_eq!(g.n50(), 0);
        assert_eq!(g.span_hours(), 0.0);
    }
}
