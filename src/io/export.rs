//! Export test-window predictions to CSV.
//!
//! One row per test-partition row, in split order: the bookkeeping columns,
//! the observed delay, every feature column, then `Prediction`.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::PipelineError;
use crate::features::{EncodedRow, FeatureSchema};

/// Write predictions for the `test` rows to `path`, creating parent directories.
pub fn write_predictions_csv(
    path: &Path,
    schema: &FeatureSchema,
    test: &[EncodedRow],
    predictions: &[f64],
) -> Result<(), PipelineError> {
    let fail = |e: &dyn std::fmt::Display| PipelineError::Export {
        what: "predictions CSV",
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| fail(&e))?;
    }
    let file = File::create(path).map_err(|e| fail(&e))?;
    write_predictions(file, schema, test, predictions).map_err(|e| match e {
        PipelineError::Export { message, .. } => fail(&message),
        other => other,
    })
}

/// Write predictions as CSV to any writer.
pub fn write_predictions<W: Write>(
    writer: W,
    schema: &FeatureSchema,
    test: &[EncodedRow],
    predictions: &[f64],
) -> Result<(), PipelineError> {
    if predictions.len() != test.len() {
        return Err(PipelineError::Training(format!(
            "{} predictions for {} test rows",
            predictions.len(),
            test.len()
        )));
    }

    let fail = |e: csv::Error| PipelineError::Export {
        what: "predictions CSV",
        path: String::new(),
        message: e.to_string(),
    };

    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["Date_time".to_string(), "Date".to_string(), "Delay".to_string()];
    header.extend(schema.names.iter().cloned());
    header.push("Prediction".to_string());
    out.write_record(&header).map_err(fail)?;

    for (enc, pred) in test.iter().zip(predictions) {
        let mut record = Vec::with_capacity(header.len());
        record.push(enc.row.date_time.format("%Y-%m-%d %H:%M:%S").to_string());
        record.push(enc.row.date.to_string());
        record.push(enc.row.delay.to_string());
        record.extend(enc.features.iter().map(|v| v.to_string()));
        record.push(format!("{pred:.6}"));
        out.write_record(&record).map_err(fail)?;
    }

    out.flush().map_err(|e| PipelineError::Export {
        what: "predictions CSV",
        path: String::new(),
        message: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{CalendarFeatures, JoinedRow};
    use crate::features::build_feature_table;
    use crate::split::split_by_date;

    #[test]
    fn writes_one_line_per_test_row() {
        let day = |d| NaiveDate::from_ymd_opt(2018, 8, d).unwrap();
        let rows = (24..26)
            .flat_map(|d| {
                (0..2).map(move |h| JoinedRow {
                    date_time: day(d).and_hms_opt(h, 15, 0).unwrap(),
                    date: day(d),
                    hour_of_day: h,
                    delay: 12.5,
                    calendar: CalendarFeatures::from_date(day(d)),
                    exch_rate: 1.3,
                    holiday_bc: None,
                    holiday_wa: (d == 25).then(|| "Labor Day".to_string()),
                })
            })
            .collect();
        let table = build_feature_table(rows).unwrap();
        let split = split_by_date(&table, day(25), day(25)).unwrap();
        let test: Vec<EncodedRow> = split.test.rows.into_iter().cloned().collect();

        let mut buf = Vec::new();
        write_predictions(&mut buf, &table.schema, &test, &[1.0, -0.5]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Date_time,Date,Delay,HourOfDay,Year,Month,DayOfMonth,DayOfWeek,ExchRate,Holiday_wa_Labor Day,Prediction"
        );
        assert_eq!(lines[1], "2018-08-25 00:15:00,2018-08-25,12.5,0,2018,8,25,5,1.3,1,1.000000");
        assert!(lines[2].ends_with(",-0.500000"));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let day = NaiveDate::from_ymd_opt(2018, 8, 1).unwrap();
        let rows = [day, day.succ_opt().unwrap()]
            .into_iter()
            .map(|d| JoinedRow {
                date_time: d.and_hms_opt(0, 0, 0).unwrap(),
                date: d,
                hour_of_day: 0,
                delay: 0.0,
                calendar: CalendarFeatures::from_date(d),
                exch_rate: 1.0,
                holiday_bc: None,
                holiday_wa: None,
            })
            .collect();
        let table = build_feature_table(rows).unwrap();
        let split = split_by_date(&table, day.succ_opt().unwrap(), day.succ_opt().unwrap()).unwrap();
        let test: Vec<EncodedRow> = split.test.rows.into_iter().cloned().collect();
        assert!(write_predictions(Vec::new(), &table.schema, &test, &[]).is_err());
    }
}
