//! bcdx - Tumor Diagnosis Form
//!
//! Collects thirty tumor measurements, runs them through a fitted scaler and a
//! trained classifier, and reports a Malignant/Benign label with its probability.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bcdx_core::constants::CONFIG_ENV_VAR;
use bcdx_core::record::FeatureRecord;
use bcdx_gateway::collector::{self, PresetValues, TerminalPrompt};
use bcdx_gateway::config::AppConfig;
use bcdx_gateway::metrics::MetricsRegistry;
use bcdx_gateway::server::{start_server, AppStatus, ServerState};
use bcdx_model::artifacts::{Artifacts, Diagnosis, ModelFormat};

/// bcdx Tumor Diagnosis
#[derive(Parser, Debug)]
#[command(name = "bcdx")]
#[command(author = "bcdx Contributors")]
#[command(version)]
#[command(about = "Breast tumor diagnosis from thirty cell-nucleus measurements", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Fitted scaler artifact (overrides config)
    #[arg(long)]
    scaler: Option<PathBuf>,

    /// Trained classifier artifact (overrides config)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Classifier format: dense-json or onnx (overrides config)
    #[arg(long)]
    format: Option<ModelFormat>,

    /// Read the measurements from a JSON file
    #[arg(short, long, conflicts_with = "serve")]
    input: Option<PathBuf>,

    /// Set one measurement, e.g. --set radius_mean=17.99 (repeatable)
    #[arg(short, long = "set", value_name = "NAME=VALUE", conflicts_with = "serve")]
    set: Vec<String>,

    /// Use reference defaults for measurements not given instead of prompting
    #[arg(short, long)]
    defaults: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Serve predictions over HTTP
    #[arg(long)]
    serve: bool,

    /// HTTP port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, config_missing) = match &args.config {
        Some(path) if path.exists() => (
            AppConfig::load(path)
                .with_context(|| format!("invalid configuration {}", path.display()))?,
            false,
        ),
        Some(_) => (AppConfig::default(), true),
        None => (AppConfig::default(), false),
    };

    // Initialize logging; stdout carries results, so logs go to stderr
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Starting {} v{}", config.name, env!("CARGO_PKG_VERSION"));
    if config_missing {
        tracing::warn!("Config file not found, using defaults");
    }

    let scaler_path = args
        .scaler
        .clone()
        .unwrap_or_else(|| config.artifacts.scaler_path.clone());
    let model_path = args
        .model
        .clone()
        .unwrap_or_else(|| config.artifacts.model_path.clone());
    let format = args.format.unwrap_or(config.artifacts.model_format);

    // Artifacts are loaded before anything is served
    let artifacts = Arc::new(
        Artifacts::load(&scaler_path, &model_path, format).context("failed to load artifacts")?,
    );

    if args.serve {
        let port = args.port.unwrap_or(config.http_port);
        return serve(artifacts, port).await;
    }

    if let Some(path) = &args.input {
        let record = collector::load_record(path, args.defaults)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return report(&artifacts, &record, args.json);
    }

    if args.defaults || !args.set.is_empty() {
        let mut presets = PresetValues::parse(&args.set)?;
        let record = collector::collect(&mut presets)?;
        return report(&artifacts, &record, args.json);
    }

    run_interactive(&artifacts, args.json)
}

/// Predict once and print the result
fn report(artifacts: &Artifacts, record: &FeatureRecord, json: bool) -> anyhow::Result<()> {
    let diagnosis = artifacts.diagnose(record)?;
    print_diagnosis(&diagnosis, json)
}

fn print_diagnosis(diagnosis: &Diagnosis, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(diagnosis)?);
    } else {
        println!("{}", diagnosis.decision);
    }
    Ok(())
}

/// Prompt for every field, predict, and repeat while the user asks to
fn run_interactive(artifacts: &Artifacts, json: bool) -> anyhow::Result<()> {
    println!("Tumor Diagnosis");
    println!("Enter the tumor feature values (Enter keeps the default).\n");

    let mut prompt = TerminalPrompt::new();
    loop {
        let record = collector::collect(&mut prompt)?;

        match artifacts.diagnose(&record) {
            Ok(diagnosis) => print_diagnosis(&diagnosis, json)?,
            Err(e) => eprintln!("Prediction failed: {e}"),
        }

        let again = Confirm::new()
            .with_prompt("Predict another?")
            .default(false)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}

/// Serve predictions until the process is stopped
async fn serve(artifacts: Arc<Artifacts>, port: u16) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRegistry::new());
    let state = Arc::new(ServerState::new(artifacts, metrics));

    tokio::select! {
        result = start_server(state.clone(), port) => {
            if let Err(e) = &result {
                tracing::error!("HTTP server error: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            state.set_status(AppStatus::ShuttingDown).await;
        }
    }

    state.set_status(AppStatus::Stopped).await;
    tracing::info!(
        predictions = state.artifacts.stats().inference_count(),
        errors = state.artifacts.stats().error_count(),
        avg_latency_ns = state.artifacts.stats().avg_latency_ns(),
        "bcdx shutdown complete"
    );
    Ok(())
}
