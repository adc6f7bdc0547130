//! Command dispatch for the `bwt` binary.
//!
//! `train` runs the full pipeline and prints reports and plots. `explore` stops
//! after the join. `fetch-rates` refreshes the exchange-rate CSV from FRED.

use clap::Parser;

use crate::boost::BoosterParams;
use crate::cli::{Command, FetchArgs, TrainArgs};
use crate::domain::{DataPaths, DateWindow, PipelineConfig, StoppingRule, WaitTimeColumns};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `bwt` binary.
pub fn run() -> Result<(), AppError> {
    // `bwt` and `bwt --seed 3` behave like `bwt train ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Explore(args) => handle_explore(args),
        Command::FetchRates(args) => handle_fetch_rates(args),
    }
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;

    println!(
        "{}",
        crate::report::format_data_summary(&run.ingest, &run.join, &run.schema)
    );
    println!("{}", crate::report::format_profiles(&run.profiles, &run.yearly));
    println!(
        "{}",
        crate::report::format_training_summary(&config, &run.split, &run.report, &run.metrics)
    );
    println!("{}", crate::report::format_importance(&run.ranked, config.top_features));

    if config.plot {
        print_profile_plots(&run.profiles, &run.yearly, &config);
        for day in &run.days {
            println!(
                "{}",
                crate::plot::render_day(day, config.plot_width, config.plot_height)
            );
        }
    }

    println!("Model written to {}", config.model_out.display());
    println!("Predictions written to {}", config.predictions_out.display());

    if config.debug {
        let path = crate::debug::write_debug_bundle(&run, &config)?;
        println!("Debug bundle written to {}", path.display());
    }

    Ok(())
}

fn handle_explore(args: TrainArgs) -> Result<(), AppError> {
    let config = config_from_args(&args);
    let dataset = pipeline::load_dataset(&config)?;
    let profiles = dataset.profiles();
    let yearly = dataset.yearly();

    println!(
        "{}",
        crate::report::format_data_summary(&dataset.ingest, &dataset.join, &dataset.table.schema)
    );
    println!("{}", crate::report::format_profiles(&profiles, &yearly));

    if config.plot {
        print_profile_plots(&profiles, &yearly, &config);
    }
    Ok(())
}

fn handle_fetch_rates(args: FetchArgs) -> Result<(), AppError> {
    if args.start > args.end {
        return Err(AppError::new(
            2,
            format!("start {} is after end {}", args.start, args.end),
        ));
    }
    let client = crate::data::FredClient::from_env()?;
    let rows = crate::data::download_rates(&client, &args.series, args.start, args.end, &args.out)?;
    println!("Wrote {rows} {} observations to {}", args.series, args.out.display());
    Ok(())
}

fn print_profile_plots(
    profiles: &[crate::report::DelayProfile],
    yearly: &[crate::report::YearlyRate],
    config: &PipelineConfig,
) {
    for profile in profiles {
        println!(
            "{}",
            crate::plot::render_profile(profile, config.plot_width, config.plot_height)
        );
    }
    if !yearly.is_empty() {
        println!(
            "{}",
            crate::plot::render_yearly_rate(yearly, config.plot_width, config.plot_height)
        );
    }
}

pub fn config_from_args(args: &TrainArgs) -> PipelineConfig {
    PipelineConfig {
        paths: DataPaths {
            wait_times: args.data.wait_times.clone(),
            exchange_rates: args.data.exchange_rates.clone(),
            holidays_bc: args.data.holidays_bc.clone(),
            holidays_wa: args.data.holidays_wa.clone(),
        },
        columns: WaitTimeColumns {
            date_time: args.data.time_column.clone(),
            delay: args.data.delay_column.clone(),
        },
        window: DateWindow {
            begin: args.begin_date,
            end: args.end_date,
            test_start: args.test_start,
            test_end: args.test_end,
        },
        booster: BoosterParams {
            learning_rate: args.learning_rate,
            max_depth: args.max_depth,
            subsample: args.subsample,
            colsample_bytree: args.colsample,
            reg_lambda: args.lambda,
            min_split_gain: args.gamma,
            min_child_weight: args.min_child_weight,
            base_score: args.base_score,
            seed: args.seed,
        },
        stopping: StoppingRule {
            patience: args.early_stopping,
            max_rounds: args.max_rounds,
        },
        model_out: args.model_out.clone(),
        predictions_out: args.predictions_out.clone(),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        top_features: args.top,
        debug: args.debug,
    }
}

/// Rewrite argv so `bwt` defaults to `bwt train`.
///
/// Rules:
/// - `bwt`                       -> `bwt train`
/// - `bwt --seed 3 ...`          -> `bwt train --seed 3 ...`
/// - `bwt --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("train".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "train" | "explore" | "fetch-rates");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "train flags".
    if arg1.starts_with('-') {
        argv.insert(1, "train".to_string());
        return argv;
    }

    argv
}
