//! Formatted terminal output for `bwt train` and `bwt explore`.
//!
//! Every function returns a `String`; callers decide where it is printed.

use crate::domain::PipelineConfig;
use crate::features::FeatureSchema;
use crate::forecast::model::RankedFeature;
use crate::forecast::{Convergence, TrainingReport};
use crate::io::ingest::IngestSummary;
use crate::join::JoinStats;
use crate::report::{DelayProfile, TestMetrics, YearlyRate};
use crate::split::SplitSummary;

/// Sources, join and feature layout.
pub fn format_data_summary(ingest: &IngestSummary, join: &JoinStats, schema: &FeatureSchema) -> String {
    let mut out = String::new();

    out.push_str("=== bwt - Peace Arch southbound wait-time forecast ===\n");
    out.push_str(&format!(
        "Wait times: {} rows read | {} kept | {} outside window | {} missing delay (as 0) | {} negative\n",
        ingest.wait_rows_read,
        ingest.wait_observations,
        ingest.wait_outside_window,
        ingest.wait_missing_delay,
        ingest.wait_negative_delay
    ));
    out.push_str(&format!(
        "Exchange rate: {} days | {} placeholders\n",
        ingest.rate_rows, ingest.rate_placeholders
    ));
    out.push_str(&format!(
        "Holidays: BC {} | WA {}\n",
        ingest.holidays_bc, ingest.holidays_wa
    ));
    out.push_str(&format!(
        "Joined: {} hourly rows from {} observations | {} rows with filled rate | holiday rows BC {} WA {}\n",
        join.rows, join.observations, join.rate_filled, join.holiday_rows_bc, join.holiday_rows_wa
    ));
    out.push_str(&format!(
        "Features: {} columns ({} BC holidays, {} WA holidays)\n",
        schema.len(),
        schema.vocabulary.bc.len(),
        schema.vocabulary.wa.len()
    ));

    out
}

/// Delay profile tables.
pub fn format_profiles(profiles: &[DelayProfile], yearly: &[YearlyRate]) -> String {
    let mut out = String::new();

    for profile in profiles {
        out.push_str(&format!("\nMean delay by {}:\n", profile.dimension.label()));
        out.push_str(&format!("{:>10} {:>10} {:>8}\n", profile.dimension.label(), "delay", "rows"));
        for p in &profile.points {
            out.push_str(&format!("{:>10} {:>10.2} {:>8}\n", p.key, p.mean_delay, p.rows));
        }
    }

    if !yearly.is_empty() {
        out.push_str("\nYearly delay vs exchange rate:\n");
        out.push_str(&format!("{:>10} {:>10} {:>10}\n", "Year", "delay", "USD/CAD"));
        for y in yearly {
            out.push_str(&format!("{:>10} {:>10.2} {:>10.4}\n", y.year, y.mean_delay, y.mean_rate));
        }
    }

    out
}

/// Split, training outcome and test-window metrics.
pub fn format_training_summary(
    config: &PipelineConfig,
    split: &SplitSummary,
    report: &TrainingReport,
    metrics: &TestMetrics,
) -> String {
    let mut out = String::new();
    let p = &config.booster;

    out.push_str("\nSplit:\n");
    out.push_str(&format!(
        "- train: {} rows{}\n",
        split.train_rows,
        fmt_range(split.train_range)
    ));
    out.push_str(&format!(
        "- test : {} rows{} (window {}..{})\n",
        split.test_rows,
        fmt_range(split.test_range),
        config.window.test_start,
        config.window.test_end
    ));
    if split.dropped > 0 {
        out.push_str(&format!("- {} rows after the test window ignored\n", split.dropped));
    }

    out.push_str("\nBooster:\n");
    out.push_str(&format!(
        "- eta={} depth={} subsample={} colsample={} lambda={} gamma={} min_child_weight={} seed={}\n",
        p.learning_rate,
        p.max_depth,
        p.subsample,
        p.colsample_bytree,
        p.reg_lambda,
        p.min_split_gain,
        p.min_child_weight,
        p.seed
    ));
    let outcome = match report.convergence {
        Convergence::EarlyStopped => format!("early stopped after {} rounds", report.rounds_run),
        Convergence::RoundCap => format!(
            "WARNING: hit the {}-round cap before early stopping",
            config.stopping.max_rounds
        ),
    };
    out.push_str(&format!("- {outcome}\n"));
    out.push_str(&format!(
        "- best round: {} | eval RMSE {:.4}",
        report.best_round, report.best_eval_rmse
    ));
    if let Some(best) = report.best() {
        out.push_str(&format!(" | train RMSE {:.4}", best.train_rmse));
    }
    out.push('\n');

    out.push_str("\nTest window:\n");
    out.push_str(&format!(
        "- rows={} RMSE={:.3} MAE={:.3} mean actual={:.2} mean predicted={:.2}\n",
        metrics.rows, metrics.rmse, metrics.mae, metrics.mean_actual, metrics.mean_predicted
    ));

    if !split.test_only_holidays.is_empty() {
        out.push_str(&format!(
            "\nNote: holiday vocabulary spans train and test; {} column(s) occur only in the test window: {}\n",
            split.test_only_holidays.len(),
            split.test_only_holidays.join(", ")
        ));
    }

    out
}

/// Top features by total split gain.
pub fn format_importance(ranked: &[RankedFeature], top_n: usize) -> String {
    let mut out = String::new();
    out.push_str("\nFeature importance (total gain):\n");
    out.push_str(&format!("{:<32} {:>8} {:>14}\n", "feature", "splits", "gain").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<32} {:-<8} {:-<14}\n", "", "", "").trim_end());
    out.push('\n');
    for f in ranked.iter().take(top_n) {
        out.push_str(&format!(
            "{:<32} {:>8} {:>14.3}\n",
            truncate(&f.name, 32),
            f.splits,
            f.total_gain
        ));
    }
    if ranked.is_empty() {
        out.push_str("(no splits)\n");
    }
    out
}

fn fmt_range(range: Option<(chrono::NaiveDate, chrono::NaiveDate)>) -> String {
    range.map(|(a, b)| format!(" [{a}..{b}]")).unwrap_or_default()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_table_truncates_long_names() {
        let ranked = vec![
            RankedFeature {
                name: "HourOfDay".to_string(),
                splits: 12,
                total_gain: 1500.25,
            },
            RankedFeature {
                name: "Holiday_wa_Thanksgiving Day and Day After".to_string(),
                splits: 1,
                total_gain: 3.0,
            },
        ];
        let txt = format_importance(&ranked, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[1], "Feature importance (total gain):");
        assert!(lines[2].starts_with("feature") && lines[2].ends_with("gain"));
        assert!(lines[4].starts_with("HourOfDay"));
        assert!(lines[4].ends_with("1500.250"));
        assert!(lines[5].starts_with("Holiday_wa_Thanksgiving Day and."));

        assert!(format_importance(&[], 5).contains("(no splits)"));
    }

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("ExchRate", 32), "ExchRate");
        assert_eq!(truncate("abcdef", 4), "abc.");
    }
}
