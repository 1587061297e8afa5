//! CSV input.
//!
//! Expected header (order free, names case-insensitive):
//! `timestamp,value,new_cp,is_anomaly`. Only `value` is required; without
//! `timestamp` samples are one second apart from the Unix epoch, without
//! `new_cp` the series is one segment, and without `is_anomaly` it carries
//! no ground truth.

use crate::core::{LabeledSeries, SegmentBoundaries, Series};
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

struct Columns {
    timestamp: Option<usize>,
    value: usize,
    new_cp: Option<usize>,
    is_anomaly: Option<usize>,
    width: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<String> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
            .collect();
        let find = |name: &str| names.iter().position(|c| c == name);
        let value = find("value")
            .ok_or_else(|| AnomalyError::Parse("missing 'value' column".to_string()))?;
        Ok(Self {
            timestamp: find("timestamp"),
            value,
            new_cp: find("new_cp"),
            is_anomaly: find("is_anomaly"),
            width: names.len(),
        })
    }
}

/// Parse an integer/fractional Unix-seconds, RFC 3339, `%Y-%m-%d %H:%M:%S`
/// or `%Y-%m-%d` timestamp.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim().trim_matches('"');
    if let Ok(secs) = text.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| AnomalyError::Parse(format!("timestamp out of range: {}", text)));
    }
    if let Ok(secs) = text.parse::<f64>() {
        if secs.is_finite() {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
            return DateTime::from_timestamp(whole as i64, nanos)
                .ok_or_else(|| AnomalyError::Parse(format!("timestamp out of range: {}", text)));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| AnomalyError::Parse(format!("unrecognized timestamp '{}'", text)))
}

fn parse_number(text: &str, column: &str, line: usize) -> Result<f64> {
    let text = text.trim().trim_matches('"');
    if text.is_empty() {
        return Ok(0.0);
    }
    match text.to_ascii_lowercase().as_str() {
        "true" => return Ok(1.0),
        "false" => return Ok(0.0),
        _ => {}
    }
    text.parse::<f64>().map_err(|_| {
        AnomalyError::Parse(format!("line {}: invalid {} '{}'", line, column, text))
    })
}

/// Parse a labelled series from CSV text.
pub fn parse_series_csv(id: impl Into<String>, reader: impl BufRead) -> Result<LabeledSeries> {
    let id = id.into();
    let mut lines = reader.lines().enumerate();
    let columns = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break Columns::from_header(&line)?;
                }
            }
            None => return Err(AnomalyError::EmptyData),
        }
    };

    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut flags = Vec::new();
    let mut labels = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() < columns.width {
            return Err(AnomalyError::Parse(format!(
                "line {}: expected {} fields, found {}",
                line_no,
                columns.width,
                cells.len()
            )));
        }

        let value_text = cells[columns.value].trim().trim_matches('"');
        let value: f64 = value_text.parse().map_err(|_| {
            AnomalyError::Parse(format!("line {}: invalid value '{}'", line_no, value_text))
        })?;
        values.push(value);
        if let Some(c) = columns.timestamp {
            timestamps.push(
                parse_timestamp(cells[c])
                    .map_err(|e| AnomalyError::Parse(format!("line {}: {}", line_no, e)))?,
            );
        }
        if let Some(c) = columns.new_cp {
            flags.push(parse_number(cells[c], "new_cp", line_no)?);
        }
        if let Some(c) = columns.is_anomaly {
            labels.push(parse_number(cells[c], "is_anomaly", line_no)? != 0.0);
        }
    }

    let series = match columns.timestamp {
        Some(_) => Series::new(id, timestamps, values)?,
        None => Series::from_values(id, values)?,
    };
    let boundaries = match columns.new_cp {
        Some(_) => SegmentBoundaries::from_indicator(&flags),
        None => SegmentBoundaries::single(series.len()),
    };
    let ground_truth = columns.is_anomaly.map(|_| labels);
    debug!(
        series = series.id(),
        len = series.len(),
        segments = boundaries.n_segments(),
        "parsed series"
    );
    LabeledSeries::new(series, boundaries, ground_truth)
}

/// Read a labelled series from a CSV file; the id is the file stem.
pub fn read_series_csv(path: impl AsRef<Path>) -> Result<LabeledSeries> {
    let path = path.as_ref();
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path)
        .map_err(|e| AnomalyError::Io(format!("{}: {}", path.display(), e)))?;
    parse_series_csv(id, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_full_table() {
        let csv = "timestamp,value,new_cp,is_anomaly\n\
                   2024-01-01 00:00:00,1.5,0,0\n\
                   2024-01-01 00:01:00,2.5,0,1\n\
                   2024-01-01 00:02:00,3.5,1,0\n";
        let s = parse_series_csv("t", Cursor::new(csv)).unwrap();
        assert_eq!(s.series().values(), &[1.5, 2.5, 3.5]);
        assert_eq!(s.boundaries().starts(), &[0, 2]);
        assert_eq!(s.ground_truth(), Some(&[false, true, false][..]));
        assert_eq!(
            s.series().timestamps()[1],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn optional_columns_may_be_missing() {
        let csv = "Value\n1\n2\n\n3\n";
        let s = parse_series_csv("v", Cursor::new(csv)).unwrap();
        assert_eq!(s.series().len(), 3);
        assert_eq!(s.boundaries().n_segments(), 1);
        assert!(s.ground_truth().is_none());
    }

    #[test]
    fn column_order_is_free() {
        let csv = "is_anomaly,value,timestamp\ntrue,4.0,10\nfalse,5.0,11\n";
        let s = parse_series_csv("o", Cursor::new(csv)).unwrap();
        assert_eq!(s.series().values(), &[4.0, 5.0]);
        assert_eq!(s.anomaly_count(), 1);
        assert_eq!(s.series().timestamps()[0].timestamp(), 10);
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp("2023-05-06T07:08:09Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2023-05-06 07:08:09").unwrap(), expected);
        assert_eq!(parse_timestamp(&expected.timestamp().to_string()).unwrap(), expected);
        assert_eq!(
            parse_timestamp("2023-05-06").unwrap(),
            Utc.with_ymd_and_hms(2023, 5, 6, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn reports_bad_rows() {
        let err = parse_series_csv("b", Cursor::new("timestamp,value\n1,abc\n")).unwrap_err();
        assert_eq!(err, AnomalyError::Parse("line 2: invalid value 'abc'".to_string()));
        let err = parse_series_csv("b", Cursor::new("timestamp,value\n1\n")).unwrap_err();
        assert!(matches!(err, AnomalyError::Parse(_)));
        assert!(matches!(
            parse_series_csv("b", Cursor::new("timestamp\n1\n")),
            Err(AnomalyError::Parse(_))
        ));
        assert_eq!(
            parse_series_csv("b", Cursor::new("")).unwrap_err(),
            AnomalyError::EmptyData
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            read_series_csv("/nonexistent/series.csv"),
            Err(AnomalyError::Io(_))
        ));
    }
}
