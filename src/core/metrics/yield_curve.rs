use crate::core::model::FeatureRecord;
use crate::core::table::FeatureTable;

/// Cumulative yield at one read's acquisition time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YieldPoint {
    /// Whole seconds since the earliest selected read, in hours.
    pub hours: f64,
    pub reads: u64,
    pub bases: u64,
}

/// One point per selected read, in time order, with running read and base
/// totals. This is the series behind reads-vs-time and yield-vs-time plots.
pub fn yield_over_time<F>(table: &FeatureTable, mut select: F) -> Vec<YieldPoint>
where
    F: FnMut(&FeatureRecord) -> bool,
{
    let mut records: Vec<&FeatureRecord> = table.records().filter(|r| select(r)).collect();
    records.sort_unstable_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.read_id.cmp(&b.read_id))
    });
    let Some(t0) = records.first().map(|r| r.timestamp) else {
        return Vec::new();
    };

    let mut reads = 0u64;
    let mut bases = 0u64;
    records
        .into_iter()
        .map(|r| {
            reads += 1;
            bases += r.length as u64;
            YieldPoint {
                hours: (r.timestamp - t0).num_seconds() as f64 / 3600.0,
                reads,
                bases,
            }
        })
        .collect()
}
