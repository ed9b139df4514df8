// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;

use crycheckr::cli::{
    collect_audio_files, format_failure, format_json, format_report, format_summary, Args,
    OutputFormat, Summary,
};
use crycheckr::{AnalysisReport, CryAnalyzer, ModelBundle};

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let config = args.pipeline_config().context("Invalid configuration")?;
    let models_dir = args.models_dir();
    let models = ModelBundle::load(&models_dir)
        .with_context(|| format!("Failed to load models from {}", models_dir.display()))?;

    let analyzer = CryAnalyzer::builder()
        .config(config)
        .models(models)
        .include_features(args.features)
        .build()?;

    let files = collect_audio_files(&args.inputs);
    if files.is_empty() {
        eprintln!("{}", "No audio files found!".red());
        std::process::exit(1);
    }

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {elapsed}")
            .context("Invalid progress template")?,
    );

    let results: Vec<(PathBuf, Result<AnalysisReport>)> = files
        .par_iter()
        .progress_with(bar.clone())
        .map(|path| {
            let result = analyzer
                .analyze_path(path)
                .with_context(|| format!("Failed to analyze {}", path.display()));
            (path.clone(), result)
        })
        .collect();
    bar.finish_and_clear();

    let mut summary = Summary::default();
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for (path, result) in results {
        match result {
            Ok(report) => {
                summary.record(Some(&report));
                if args.format == OutputFormat::Text {
                    println!("{}", format_report(&report, args.verbose > 0));
                }
                reports.push(report);
            }
            Err(e) => {
                summary.record(None);
                if args.format == OutputFormat::Text {
                    eprintln!("{}", format_failure(&path, &e));
                }
                failures.push((path.display().to_string(), format!("{:#}", e)));
            }
        }
    }

    match args.format {
        OutputFormat::Text => println!("{}", format_summary(&summary)),
        OutputFormat::Json => println!("{}", format_json(&reports, &failures, &summary)?),
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
