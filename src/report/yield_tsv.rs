use anyhow::{Context, Result};
use nanoqc::core::metrics::{YieldPoint, pass_sample, yield_over_time};
use nanoqc::core::{FeatureTable, Flag};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: &str = "group\tname\thours\treads\tbases";

pub fn write(path: &Path, table: &FeatureTable) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {} failed", path.display()))?;
    let mut w = BufWriter::new(file);
    write_to(&mut w, table)?;
    w.flush()?;
    Ok(())
}

/// Cumulative reads and bases over time: one block per flag, then one per
/// sample over its pass reads, samples in name order.
pub fn write_to<W: Write>(w: &mut W, table: &FeatureTable) -> Result<()> {
    writeln!(w, "{}", HEADER)?;
    for flag in [Flag::Pass, Flag::Fail] {
        let points = yield_over_time(table, |r| r.flag == flag);
        write_points(w, "flag", flag.as_str_lower(), &points)?;
    }

    let samples: BTreeSet<&str> = table
        .records()
        .filter(|r| r.flag == Flag::Pass)
        .map(|r| &*r.sample_name)
        .collect();
    for sample in samples {
        let points = yield_over_time(table, pass_sample(sample));
        write_points(w, "sample", sample, &points)?;
    }
    Ok(())
}

fn write_points<W: Write>(w: &mut W, group: &str, name: &str, points: &[YieldPoint]) -> Result<()> {
    for p in points {
        writeln!(w, "{}\t{}\t{:.4}\t{}\t{}", group, name, p.hours, p.reads, p.bases)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nanoqc::core::FeatureRecord;
    use std::path::Path;
    use std::sync::Arc;

    fn rec(id: &str, sample: &str, flag: Flag, length: usize, minute: u32) -> FeatureRecord {
        FeatureRecord {
            read_id: id.to_string(),
            sample_name: Arc::from(sample),
            flag,
            length,
            mean_quality: 9.0,
            gc_percent: 41,
            timestamp: Utc.with_ymd_and_hms(2022, 8, 1, 6, minute, 0).unwrap(),
            source: Arc::from(Path::new("/runs/y/x_0.fastq")),
        }
    }

    #[test]
    fn flag_blocks_then_pass_samples() {
        let mut t = FeatureTable::new();
        t.insert_many([
            rec("b", "bc02", Flag::Pass, 200, 30),
            rec("a", "bc01", Flag::Pass, 100, 0),
            rec("c", "bc02", Flag::Pass, 25, 45),
            rec("z", "bc03", Flag::Fail, 50, 15),
        ])
        .unwrap();
        let mut buf = Vec::new();
        write_to(&mut buf, &t).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                HEADER,
                "flag\tpass\t0.0000\t1\t100",
                "flag\tpass\t0.5000\t2\t300",
                "flag\tpass\t0.7500\t3\t325",
                "flag\tfail\t0.0000\t1\t50",
                "sample\tbc01\t0.0000\t1\t100",
                "sample\tbc02\t0.0000\t1\t200",
                "sample\tbc02\t0.2500\t2\t225",
            ]
        );
    }
}
