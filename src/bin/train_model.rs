//! Training utility for Pulmoscreen models.
//!
//! Reads a labeled survey CSV, runs the full training pipeline, prints the
//! evaluation report, and writes `model.json`, `feature_columns.json` and
//! `manifest.json` into the output directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin train_model -- <dataset.csv> [--out <dir>] [--seed <u64>] [--folds <k>] [--threads <n>]
//! ```
//!
//! Flags override `PULMOSCREEN_SEED`, `PULMOSCREEN_CV_FOLDS` and
//! `PULMOSCREEN_THREADS`; the output directory defaults to
//! `PULMOSCREEN_MODEL_PATH` or `models`.

#![allow(non_snake_case)]

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use Pulmoscreen::adapters::sanitize::SanitizingMakeWriter;
use Pulmoscreen::adapters::survey_csv::read_survey;
use Pulmoscreen::adapters::JsonArtifactStore;
use Pulmoscreen::application::{Trainer, TrainingConfig};
use Pulmoscreen::ports::ArtifactStore;

const THREADS_ENV: &str = "PULMOSCREEN_THREADS";

#[derive(Debug, Default)]
struct Args {
    dataset: PathBuf,
    out: Option<PathBuf>,
    seed: Option<u64>,
    folds: Option<usize>,
    threads: Option<usize>,
}

fn usage() -> anyhow::Error {
    anyhow!(
        "Usage: train_model <dataset.csv> [--out <dir>] [--seed <u64>] [--folds <k>] [--threads <n>]"
    )
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let value = value.ok_or_else(usage)?;
    value
        .parse()
        .map_err(|_| anyhow!("Invalid value for {flag}: {value:?}"))
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut dataset: Option<PathBuf> = None;
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => parsed.out = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            "--seed" => parsed.seed = Some(parse_value("--seed", args.next())?),
            "--folds" => parsed.folds = Some(parse_value("--folds", args.next())?),
            "--threads" => parsed.threads = Some(parse_value("--threads", args.next())?),
            "-h" | "--help" => return Err(usage()),
            _ if arg.starts_with('-') => return Err(usage()),
            _ => {
                if dataset.is_some() {
                    return Err(usage());
                }
                dataset = Some(PathBuf::from(arg));
            }
        }
    }

    parsed.dataset = dataset.ok_or_else(usage)?;
    Ok(parsed)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(std::io::stderr)))
        .init();

    let args = parse_args()?;

    let mut config = TrainingConfig::from_env()?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(folds) = args.folds {
        config.cv_folds = folds;
    }
    config.validate()?;

    let threads = match args.threads {
        Some(n) => Some(n),
        None => env::var(THREADS_ENV)
            .ok()
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow!("{THREADS_ENV}={raw:?} is not a valid thread count"))
            })
            .transpose()?,
    };
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to configure thread pool")?;
        tracing::info!("Using {} worker threads", n);
    }

    let table = read_survey(&args.dataset)
        .with_context(|| format!("Failed to read dataset {:?}", args.dataset))?;

    let outcome = Trainer::new(config).train(&table)?;
    println!("{}", outcome.report);

    let store = args
        .out
        .map_or_else(JsonArtifactStore::from_env, JsonArtifactStore::new);
    store
        .save(&outcome.bundle)
        .with_context(|| format!("Failed to write artifacts to {:?}", store.dir()))?;

    println!("Artifacts written to {}", store.dir().display());
    Ok(())
}
