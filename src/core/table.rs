use crate::core::error::{Error, Result};
use crate::core::model::FeatureRecord;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Write-once map from read id to record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureTable {
    records: HashMap<String, FeatureRecord>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, read_id: &str) -> Option<&FeatureRecord> {
        self.records.get(read_id)
    }

    pub fn contains(&self, read_id: &str) -> bool {
        self.records.contains_key(read_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn records(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.values()
    }

    pub fn into_records(self) -> impl Iterator<Item = FeatureRecord> {
        self.records.into_values()
    }

    /// Adds records to a fragment. A repeated id is a `DuplicateReadId`; the
    /// records inserted before it stay in place, the table is expected to be
    /// dropped along with the error.
    pub fn insert_many<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = FeatureRecord>,
    {
        for record in records {
            match self.records.entry(record.read_id.clone()) {
                Entry::Occupied(existing) => return Err(duplicate(existing.get(), &record)),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        Ok(())
    }

    /// Unions `fragment` into `self`. Any shared id fails the merge before a
    /// single record moves; with several collisions the smallest id is
    /// reported.
    pub fn merge(&mut self, fragment: FeatureTable) -> Result<()> {
        let collision = fragment
            .records
            .iter()
            .filter(|(id, _)| self.records.contains_key(*id))
            .min_by(|a, b| a.0.cmp(b.0));
        if let Some((id, incoming)) = collision {
            return Err(duplicate(&self.records[id], incoming));
        }
        self.records.reserve(fragment.records.len());
        self.records.extend(fragment.records);
        Ok(())
    }
}

fn duplicate(first: &FeatureRecord, second: &FeatureRecord) -> Error {
    Error::DuplicateReadId {
        read_id: second.read_id.clone(),
        first: first.source.to_path_buf(),
        second: second.source.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Flag;
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use std::sync::Arc;

    fn rec(id: &str, source: &str) -> FeatureRecord {
        FeatureRecord {
            read_id: id.to_string(),
            sample_name: Arc::from("barcode01"),
            flag: Flag::Pass,
            length: 10,
            mean_quality: 12.5,
            gc_percent: 40,
            timestamp: Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
            source: Arc::from(Path::new(source)),
        }
    }

    fn fragment(prefix: &str, n: usize, source: &str) -> FeatureTable {
        let mut t = FeatureTable::new();
        t.insert_many((0..n).map(|i| rec(&format!("{prefix}{i}"), source)))
            .unwrap();
        t
    }

    #[test]
    fn insert_many_counts_records() {
        let t = fragment("r", 25, "/a.fastq");
        assert_eq!(t.len(), 25);
        assert!(t.contains("r0"));
        assert_eq!(t.get("r24").unwrap().length, 10);
        assert!(t.get("r25").is_none());
    }

    #[test]
    fn insert_many_rejects_repeat_within_file() {
        let mut t = FeatureTable::new();
        let err = t
            .insert_many([rec("x", "/a.fastq"), rec("x", "/a.fastq")])
            .unwrap_err();
        match err {
            Error::DuplicateReadId {
                read_id,
                first,
                second,
            } => {
                assert_eq!(read_id, "x");
                assert_eq!(first, second);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_of_disjoint_fragments_adds_sizes() {
        let mut master = FeatureTable::new();
        master.merge(fragment("a", 7, "/a.fastq")).unwrap();
        master.merge(fragment("b", 11, "/b.fastq")).unwrap();
        assert_eq!(master.len(), 18);
    }

    #[test]
    fn merge_collision_names_both_files_and_leaves_master_untouched() {
        let mut master = fragment("a", 3, "/run/a.fastq");
        let mut other = fragment("b", 3, "/run/b.fastq");
        other.insert_many([rec("a1", "/run/b.fastq")]).unwrap();
        let before = master.clone();

        let err = master.merge(other).unwrap_err();
        match err {
            Error::DuplicateReadId {
                read_id,
                first,
                second,
            } => {
                assert_eq!(read_id, "a1");
                assert_eq!(first, Path::new("/run/a.fastq"));
                assert_eq!(second, Path::new("/run/b.fastq"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(master, before);
    }

    #[test]
    fn merge_reports_smallest_colliding_id() {
        let mut master = fragment("k", 10, "/a.fastq");
        let other = fragment("k", 10, "/b.fastq");
        match master.merge(other).unwrap_err() {
            Error::DuplicateReadId { read_id, .. } => assert_eq!(read_id, "k0"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
