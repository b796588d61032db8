use crate::core::error::{Error, Result};
use crate::core::fastq::RawRecord;
use crate::core::model::{FeatureRecord, FileContext};
use crate::simd;
use chrono::{DateTime, NaiveDateTime, Utc};

pub const PHRED_OFFSET: u8 = 33;

const HEADER_TIMESTAMP_FIELD: usize = 4;

/// Turns one raw group into a feature record. Checks run in a fixed order
/// (header, timestamp, sequence, quality) and the first failure is returned.
pub fn decode(raw: &RawRecord, ctx: &FileContext) -> Result<FeatureRecord> {
    let line = raw.line;
    let (read_id, ts_text) = split_header(&raw.header, line)?;
    let timestamp = parse_timestamp(ts_text).map_err(|source| Error::TimestampParse {
        line,
        text: String::from_utf8_lossy(ts_text).into_owned(),
        source,
    })?;

    let length = raw.seq.len();
    if length == 0 {
        return Err(Error::EmptyRecord {
            line,
            field: "sequence",
        });
    }
    if raw.qual.is_empty() {
        return Err(Error::EmptyRecord {
            line,
            field: "quality",
        });
    }
    if raw.qual.len() != length {
        return Err(Error::QualityLengthMismatch {
            line,
            seq_len: length,
            qual_len: raw.qual.len(),
        });
    }

    Ok(FeatureRecord {
        read_id: String::from_utf8_lossy(read_id).into_owned(),
        sample_name: ctx.sample_name.clone(),
        flag: ctx.flag,
        length,
        mean_quality: mean_quality(&raw.qual),
        gc_percent: gc_percent(&raw.seq),
        timestamp,
        source: ctx.path.clone(),
    })
}

fn split_header(header: &[u8], line: u64) -> Result<(&[u8], &[u8])> {
    let mut tokens = header
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty());
    let first = tokens.next().unwrap_or_default();
    let Some(ts_token) = tokens.nth(HEADER_TIMESTAMP_FIELD - 1) else {
        return Err(Error::MalformedHeader {
            line,
            reason: "fewer than 5 fields",
        });
    };
    let read_id = first.get(1..).unwrap_or_default();
    if read_id.is_empty() {
        return Err(Error::MalformedHeader {
            line,
            reason: "empty read id",
        });
    }
    let Some(eq) = ts_token.iter().position(|&b| b == b'=') else {
        return Err(Error::MalformedHeader {
            line,
            reason: "field 5 is not key=value",
        });
    };
    Ok((read_id, &ts_token[eq + 1..]))
}

/// RFC 3339 first, then ISO 8601 with a `+hhmm` offset; a value without an
/// offset is taken as UTC.
pub fn parse_timestamp(text: &[u8]) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    let text = String::from_utf8_lossy(text);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
}

/// Mean of (byte - 33). Caller guarantees `qual` is non-empty.
pub fn mean_quality(qual: &[u8]) -> f64 {
    simd::sum_bytes(qual) as f64 / qual.len() as f64 - PHRED_OFFSET as f64
}

/// round(100 * (G + C) / len), ties to even. Caller guarantees `seq` is
/// non-empty.
pub fn gc_percent(seq: &[u8]) -> u8 {
    let gc = simd::count_gc(seq) as f64;
    (gc / seq.len() as f64 * 100.0).round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Flag;
    use chrono::TimeZone;
    use std::path::Path;

    fn ctx() -> FileContext {
        FileContext::from_path(Path::new("/run/pass/barcode01_0.fastq"))
    }

    fn raw(header: &str, seq: &str, qual: &str) -> RawRecord {
        RawRecord {
            line: 13,
            header: header.as_bytes().to_vec(),
            seq: seq.as_bytes().to_vec(),
            sep: b"+".to_vec(),
            qual: qual.as_bytes().to_vec(),
        }
    }

    const HEADER: &str =
        "@0a1b2c3d runid=f00 read=42 ch=311 start_time=2017-10-19T15:42:17Z flow_cell_id=FAH1";

    #[test]
    fn decodes_all_fields() {
        let rec = decode(&raw(HEADER, "GGCCAT", "?AC?AC"), &ctx()).unwrap();
        assert_eq!(rec.read_id, "0a1b2c3d");
        assert_eq!(&*rec.sample_name, "barcode01");
        assert_eq!(rec.flag, Flag::Pass);
        assert_eq!(rec.length, 6);
        assert_eq!(rec.gc_percent, 67);
        assert!((rec.mean_quality - 32.0).abs() < 1e-12);
        assert_eq!(
            rec.timestamp,
            Utc.with_ymd_and_hms(2017, 10, 19, 15, 42, 17).unwrap()
        );
        assert_eq!(&*rec.source, Path::new("/run/pass/barcode01_0.fastq"));
    }

    #[test]
    fn mean_quality_is_phred33_mean() {
        // scores 30, 32, 34
        assert!((mean_quality(b"?AC") - 32.0).abs() < 1e-12);
        assert!((mean_quality(b"!!") - 0.0).abs() < 1e-12);
        assert!((mean_quality(b"I#") - 21.0).abs() < 1e-12);
    }

    #[test]
    fn gc_percent_rounds_half_to_even() {
        assert_eq!(gc_percent(b"GGCCAT"), 67);
        assert_eq!(gc_percent(b"GCGC"), 100);
        assert_eq!(gc_percent(b"ATAT"), 0);
        // 1/8 = 12.5 -> 12
        assert_eq!(gc_percent(b"GAAAAAAA"), 12);
        // 3/8 = 37.5 -> 38
        assert_eq!(gc_percent(b"GGGAAAAA"), 38);
        assert_eq!(gc_percent(b"gcgcAT"), 0);
    }

    #[test]
    fn timestamp_formats() {
        let want = Utc.with_ymd_and_hms(2018, 3, 1, 8, 0, 5).unwrap();
        assert_eq!(parse_timestamp(b"2018-03-01T08:00:05Z").unwrap(), want);
        assert_eq!(parse_timestamp(b"2018-03-01T10:00:05+02:00").unwrap(), want);
        assert_eq!(parse_timestamp(b"2018-03-01T08:00:05").unwrap(), want);
        assert_eq!(parse_timestamp(b"2018-03-01 08:00:05").unwrap(), want);
        assert!(parse_timestamp(b"2018-03-01T08:00:05.250Z").is_ok());
        assert!(parse_timestamp(b"yesterday").is_err());
    }

    #[test]
    fn offset_without_colon() {
        let want = Utc.with_ymd_and_hms(2017, 10, 19, 15, 42, 17).unwrap();
        assert_eq!(parse_timestamp(b"2017-10-19T15:42:17+0000").unwrap(), want);
        assert_eq!(parse_timestamp(b"2017-10-19T17:12:17+0130").unwrap(), want);
        assert_eq!(parse_timestamp(b"2017-10-19T15:42:17.000-0000").unwrap(), want);
    }

    #[test]
    fn short_header_is_rejected() {
        let err = decode(&raw("@r1 a b start_time=2018-01-01T00:00:00Z", "A", "I"), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { line: 13, .. }));
    }

    #[test]
    fn fifth_field_needs_equals_sign() {
        let err = decode(&raw("@r1 a b c 2018-01-01T00:00:00Z", "A", "I"), &ctx()).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let err = decode(&raw("@r1 a b c start_time=soon", "A", "I"), &ctx()).unwrap_err();
        match err {
            Error::TimestampParse { text, line, .. } => {
                assert_eq!(text, "soon");
                assert_eq!(line, 13);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_sequence_or_quality_is_fatal() {
        let err = decode(&raw(HEADER, "", ""), &ctx()).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyRecord {
                field: "sequence",
                ..
            }
        ));
        let err = decode(&raw(HEADER, "ACGT", ""), &ctx()).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyRecord {
                field: "quality",
                ..
            }
        ));
    }

    #[test]
    fn quality_length_must_match_sequence() {
        let err = decode(&raw(HEADER, "ACGT", "III"), &ctx()).unwrap_err();
        assert!(matches!(
            err,
            Error::QualityLengthMismatch {
                seq_len: 4,
                qual_len: 3,
                ..
            }
        ));
    }
}
