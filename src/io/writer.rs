//! CSV output tables.

use crate::core::LabeledSeries;
use crate::error::{AnomalyError, Result};
use crate::evaluation::StrategySummary;
use crate::pipeline::GridCell;
use crate::scoring::ScoreStream;
use chrono::SecondsFormat;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the per-series score table: timestamp, value, is_anomaly and one
/// `anomalyscore_<feature>` column per stream. Undefined scores and missing
/// labels are empty cells.
pub fn write_score_table<W: Write>(
    writer: &mut W,
    input: &LabeledSeries,
    scores: &[ScoreStream],
) -> Result<()> {
    let series = input.series();
    if let Some(bad) = scores.iter().find(|s| s.len() != series.len()) {
        return Err(AnomalyError::DimensionMismatch {
            expected: series.len(),
            got: bad.len(),
        });
    }

    write!(writer, "timestamp,value,is_anomaly")?;
    for stream in scores {
        write!(writer, ",{}", stream.column_name())?;
    }
    writeln!(writer)?;

    let truth = input.ground_truth();
    for (t, (ts, value)) in series.timestamps().iter().zip(series.values()).enumerate() {
        write!(
            writer,
            "{},{},",
            ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            value
        )?;
        if let Some(truth) = truth {
            write!(writer, "{}", u8::from(truth[t]))?;
        }
        for stream in scores {
            match stream.get(t) {
                Some(score) => write!(writer, ",{}", score)?,
                None => write!(writer, ",")?,
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write one strategy's summary rows, best F1 first.
pub fn write_summary_table<W: Write>(writer: &mut W, summary: &StrategySummary) -> Result<()> {
    writeln!(writer, "feature,f1,precision,recall,tp,fn,fp,total_predicted")?;
    for row in summary.rows() {
        let m = &row.metrics;
        writeln!(
            writer,
            "{},{:.6},{:.6},{:.6},{},{},{},{}",
            row.feature,
            m.f1,
            m.precision,
            m.recall,
            m.true_positives,
            m.false_negatives,
            m.false_positives,
            m.total_predicted
        )?;
    }
    Ok(())
}

/// Write grid cells with a caller-formatted parameter column.
pub fn write_grid_table<W: Write, P>(
    writer: &mut W,
    header: &str,
    cells: &[GridCell<P>],
    format_params: impl Fn(&P) -> String,
) -> Result<()> {
    writeln!(writer, "{},f1,precision,recall,tp,fn,fp,total_predicted", header)?;
    for cell in cells {
        let m = &cell.metrics;
        writeln!(
            writer,
            "{},{:.6},{:.6},{:.6},{},{},{},{}",
            format_params(&cell.params),
            m.f1,
            m.precision,
            m.recall,
            m.true_positives,
            m.false_negatives,
            m.false_positives,
            m.total_predicted
        )?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AnomalyError::Io(format!("{}: {}", path.display(), e)))
}

/// [`write_score_table`] into a new file at `path`.
pub fn write_score_file(
    path: impl AsRef<Path>,
    input: &LabeledSeries,
    scores: &[ScoreStream],
) -> Result<()> {
    let mut writer = create(path.as_ref())?;
    write_score_table(&mut writer, input, scores)?;
    writer.flush()?;
    Ok(())
}

/// [`write_summary_table`] into a new file at `path`.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &StrategySummary) -> Result<()> {
    let mut writer = create(path.as_ref())?;
    write_summary_table(&mut writer, summary)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SegmentBoundaries, Series};
    use crate::evaluation::{Evaluator, ResultRow};
    use crate::io::parse_series_csv;
    use crate::topology::ShapeFeature;
    use std::io::Cursor;

    #[test]
    fn score_table_layout() {
        let series = Series::from_values("s", vec![1.0, 2.5, 3.0]).unwrap();
        let input = LabeledSeries::new(
            series,
            SegmentBoundaries::single(3),
            Some(vec![false, false, true]),
        )
        .unwrap();
        let scores = vec![ScoreStream::new(
            ShapeFeature::L2Norm,
            vec![None, None, Some(-0.5)],
        )];
        let mut out = Vec::new();
        write_score_table(&mut out, &input, &scores).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,value,is_anomaly,anomalyscore_l2norm");
        assert_eq!(lines[1], "1970-01-01T00:00:00Z,1,0,");
        assert_eq!(lines[3], "1970-01-01T00:00:02Z,3,1,-0.5");
    }

    #[test]
    fn score_table_keeps_fractional_seconds() {
        let csv = "timestamp,value\n1.5,2.0\n2.25,3.0\n";
        let input = parse_series_csv("f", Cursor::new(csv)).unwrap();
        let mut out = Vec::new();
        write_score_table(&mut out, &input, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "1970-01-01T00:00:01.500Z,2,");
        assert_eq!(lines[2], "1970-01-01T00:00:02.250Z,3,");
    }

    #[test]
    fn score_table_rejects_misaligned_streams() {
        let input = LabeledSeries::unlabeled(Series::from_values("s", vec![1.0, 2.0]).unwrap());
        let scores = vec![ScoreStream::new(ShapeFeature::Auc, vec![None])];
        let mut out = Vec::new();
        assert!(write_score_table(&mut out, &input, &scores).is_err());
    }

    #[test]
    fn summary_table_rows() {
        let truth = [false, true, false];
        let metrics = Evaluator::new(0).evaluate(&truth, &truth).unwrap();
        let summary = StrategySummary::new("EVT", vec![ResultRow::new("gini", metrics)]);
        let mut out = Vec::new();
        write_summary_table(&mut out, &summary).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "feature,f1,precision,recall,tp,fn,fp,total_predicted\n\
             gini,1.000000,1.000000,1.000000,1,0,0,1\n"
        );
    }
}
