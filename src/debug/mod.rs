//! Debug bundle writer for inspecting a training run.
//!
//! `bwt train --debug` drops one markdown file under `debug/` with the full
//! configuration, source counters, the holiday vocabulary, the per-round RMSE
//! history and every test-window prediction.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::{HolidayRegion, PipelineConfig};
use crate::error::AppError;

pub fn write_debug_bundle(run: &RunOutput, config: &PipelineConfig) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), run, config)
}

fn write_debug_bundle_in(dir: &Path, run: &RunOutput, config: &PipelineConfig) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "bwt_debug_{}_{}_seed{}_{ts}.md",
        config.window.test_start.format("%Y%m%d"),
        config.window.test_end.format("%Y%m%d"),
        config.booster.seed
    ));

    let file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    let mut out = BufWriter::new(file);
    write_bundle(&mut out, run, config).map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;

    Ok(path)
}

fn write_bundle<W: Write>(out: &mut W, run: &RunOutput, config: &PipelineConfig) -> std::io::Result<()> {
    let w = &config.window;
    let p = &config.booster;

    writeln!(out, "# bwt debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- window: {}..{} | test {}..{}", w.begin, w.end, w.test_start, w.test_end)?;
    writeln!(out, "- wait_times: {}", config.paths.wait_times.display())?;
    writeln!(out, "- exchange_rates: {}", config.paths.exchange_rates.display())?;
    writeln!(out, "- holidays_bc: {}", config.paths.holidays_bc.display())?;
    writeln!(out, "- holidays_wa: {}", config.paths.holidays_wa.display())?;
    writeln!(
        out,
        "- booster: eta={} depth={} subsample={} colsample={} lambda={} gamma={} min_child_weight={} base_score={} seed={}",
        p.learning_rate,
        p.max_depth,
        p.subsample,
        p.colsample_bytree,
        p.reg_lambda,
        p.min_split_gain,
        p.min_child_weight,
        p.base_score,
        p.seed
    )?;
    writeln!(
        out,
        "- stopping: patience={} max_rounds={}",
        config.stopping.patience, config.stopping.max_rounds
    )?;

    let i = &run.ingest;
    writeln!(out, "\n## Sources")?;
    writeln!(out, "| source | rows | note |")?;
    writeln!(out, "| - | - | - |")?;
    writeln!(
        out,
        "| wait times | {} | kept {}, outside window {}, missing delay {}, negative {} |",
        i.wait_rows_read, i.wait_observations, i.wait_outside_window, i.wait_missing_delay, i.wait_negative_delay
    )?;
    writeln!(out, "| exchange rate | {} | placeholders {} |", i.rate_rows, i.rate_placeholders)?;
    writeln!(out, "| holidays BC | {} | |", i.holidays_bc)?;
    writeln!(out, "| holidays WA | {} | |", i.holidays_wa)?;

    let j = &run.join;
    writeln!(out, "\n## Join")?;
    writeln!(
        out,
        "- rows={} observations={} rate_filled={} holiday_rows_bc={} holiday_rows_wa={}",
        j.rows, j.observations, j.rate_filled, j.holiday_rows_bc, j.holiday_rows_wa
    )?;

    writeln!(out, "\n## Holiday vocabulary")?;
    for region in HolidayRegion::ALL {
        let names = run.schema.vocabulary.names(region);
        writeln!(out, "- {} ({}): {}", region.display_name(), names.len(), names.join(", "))?;
    }
    if !run.split.test_only_holidays.is_empty() {
        writeln!(out, "- test-only columns: {}", run.split.test_only_holidays.join(", "))?;
    }

    writeln!(out, "\n## Rounds")?;
    writeln!(
        out,
        "best round {} | eval RMSE {:.6} | {:?}",
        run.report.best_round, run.report.best_eval_rmse, run.report.convergence
    )?;
    writeln!(out, "| round | train_rmse | eval_rmse |")?;
    writeln!(out, "| - | - | - |")?;
    for m in &run.report.history {
        let mark = if m.round == run.report.best_round { " *" } else { "" };
        writeln!(out, "| {}{mark} | {:.6} | {:.6} |", m.round, m.train_rmse, m.eval_rmse)?;
    }

    writeln!(out, "\n## Feature importance")?;
    writeln!(out, "| feature | splits | gain |")?;
    writeln!(out, "| - | - | - |")?;
    for f in &run.ranked {
        writeln!(out, "| {} | {} | {:.4} |", f.name, f.splits, f.total_gain)?;
    }

    writeln!(out, "\n## Test predictions")?;
    writeln!(out, "| date_time | delay | prediction |")?;
    writeln!(out, "| - | - | - |")?;
    for (r, pred) in run.test_rows.iter().zip(&run.predictions) {
        writeln!(out, "| {} | {:.3} | {:.3} |", r.row.date_time, r.row.delay, pred)?;
    }

    Ok(())
}
