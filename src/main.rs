//! wbal - Critical Power and Reserve Balance Modeling
//!
//! Usage:
//! ```bash
//! # Fit CP / W' from a rate,duration table
//! wbal fit --trials trials.csv
//!
//! # Fit CMR / M' from inline trials
//! wbal fit --kind oxygenation --trial 7200:-0.019 --trial 1200:-0.22
//!
//! # W' balance over a time,power workout with a known model
//! wbal balance --samples power.csv --asymptote 270 --capacity 18500 --output wbal.csv
//!
//! # M' balance over an SmO2 export, fitting the model first
//! wbal balance --kind oxygenation --samples O2.csv --trials cmr_trials.csv
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wbal::metrics::analytics::{DepletionComparator, FittedModel, HyperbolicFit, ModelKind, Trial};
use wbal::metrics::smoothing::SmoothingStage;
use wbal::recording::{
    export_balance_csv, export_balance_csv_to_file, import_samples_from_file,
    import_trials_from_file,
};
use wbal::storage::config::{load_config, load_config_from};
use wbal::{AppConfig, BalancePipeline};

#[derive(Parser)]
#[command(
    name = "wbal",
    version,
    about = "Critical power / W' fitting and reserve balance modeling",
    long_about = "Fit the hyperbolic rate-duration model to exhaustion trials and simulate W' or M' balance over a workout"
)]
struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit asymptote and capacity to exhaustion trials
    Fit(FitArgs),
    /// Simulate reserve balance over a workout
    Balance(BalanceArgs),
}

#[derive(Args)]
struct TrialSource {
    /// CSV file of rate,duration rows
    #[arg(long, conflicts_with = "trial")]
    trials: Option<PathBuf>,

    /// Inline trial as DURATION:RATE (repeatable)
    #[arg(long = "trial", value_parser = parse_trial, allow_hyphen_values = true)]
    trial: Vec<Trial>,
}

impl TrialSource {
    fn load(&self) -> Result<Option<Vec<Trial>>> {
        if let Some(path) = &self.trials {
            let trials = import_trials_from_file(path)
                .with_context(|| format!("reading trials from {}", path.display()))?;
            return Ok(Some(trials));
        }
        if self.trial.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.trial.clone()))
    }
}

#[derive(Args)]
struct FitArgs {
    /// Signal the trials were measured on
    #[arg(long, default_value = "power")]
    kind: ModelKind,

    #[command(flatten)]
    source: TrialSource,

    /// Print the fit as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BalanceArgs {
    /// Signal the workout was recorded on
    #[arg(long, default_value = "power")]
    kind: ModelKind,

    /// Workout CSV (time in column 0)
    #[arg(long)]
    samples: PathBuf,

    /// Zero-based column holding the rate (default depends on kind)
    #[arg(long)]
    column: Option<usize>,

    #[command(flatten)]
    source: TrialSource,

    /// Threshold rate, used with --capacity instead of fitting
    #[arg(long, requires = "capacity", allow_hyphen_values = true)]
    asymptote: Option<f64>,

    /// Reserve capacity, used with --asymptote instead of fitting
    #[arg(long, requires = "asymptote", allow_hyphen_values = true)]
    capacity: Option<f64>,

    /// Recovery time constant in seconds
    #[arg(long)]
    tau: Option<f64>,

    /// Depletion comparator: greater-than or less-than
    #[arg(long)]
    comparator: Option<DepletionComparator>,

    /// Rolling window for smoothing, in samples
    #[arg(long, conflicts_with = "no_smooth")]
    window: Option<usize>,

    /// Skip smoothing
    #[arg(long)]
    no_smooth: bool,

    /// Output CSV (stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

fn parse_trial(s: &str) -> Result<Trial, String> {
    let (duration, rate) = s
        .split_once(':')
        .ok_or_else(|| format!("expected DURATION:RATE, got {s:?}"))?;
    let duration = duration
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid duration {duration:?}: {e}"))?;
    let rate = rate
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid rate {rate:?}: {e}"))?;
    Ok(Trial::new(duration, rate))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("loading configuration")?;

    match cli.command {
        Command::Fit(args) => run_fit(&config, args),
        Command::Balance(args) => run_balance(config, args),
    }
}

fn fit_trials(config: &AppConfig, kind: ModelKind, trials: &[Trial]) -> Result<HyperbolicFit> {
    let fit = config
        .fitter()
        .fit(trials)
        .with_context(|| format!("fitting {} model to {} trials", kind, trials.len()))?;

    info!(
        "{} = {:.5} {}, {} = {:.5} {} (R² {:.4}, {} iterations)",
        kind.asymptote_label(),
        fit.model.asymptote,
        kind.rate_unit(),
        kind.capacity_label(),
        fit.model.capacity,
        kind.capacity_unit(),
        fit.r_squared,
        fit.iterations
    );
    Ok(fit)
}

fn run_fit(config: &AppConfig, args: FitArgs) -> Result<()> {
    let Some(trials) = args.source.load()? else {
        bail!("no trials given; use --trials FILE or --trial DURATION:RATE");
    };
    let fit = fit_trials(config, args.kind, &trials)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fit)?);
        return Ok(());
    }

    let kind = args.kind;
    println!(
        "Estimated {}: {:.5} {}",
        kind.asymptote_label(),
        fit.model.asymptote,
        kind.rate_unit()
    );
    println!(
        "Estimated {}: {:.5} {}",
        kind.capacity_label(),
        fit.model.capacity,
        kind.capacity_unit()
    );
    if let Some((se_asymptote, se_capacity)) = fit.standard_errors() {
        println!(
            "Standard errors: {} ±{:.5}, {} ±{:.5}",
            kind.asymptote_label(),
            se_asymptote,
            kind.capacity_label(),
            se_capacity
        );
    }
    println!("R²: {:.4}", fit.r_squared);
    Ok(())
}

fn resolve_model(config: &AppConfig, args: &BalanceArgs) -> Result<FittedModel> {
    if let (Some(asymptote), Some(capacity)) = (args.asymptote, args.capacity) {
        return Ok(FittedModel::new(asymptote, capacity));
    }
    if let Some(trials) = args.source.load()? {
        return Ok(fit_trials(config, args.kind, &trials)?.model);
    }
    if let Some(model) = config.manual_model(args.kind) {
        info!(kind = %args.kind, "using model parameters from configuration");
        return Ok(model);
    }
    bail!(
        "no {} model: pass --asymptote/--capacity, --trials, or set [model.{}] in the config",
        args.kind,
        args.kind
    )
}

fn run_balance(mut config: AppConfig, args: BalanceArgs) -> Result<()> {
    if let Some(tau) = args.tau {
        config.simulation.tau_secs = tau;
    }
    if let Some(comparator) = args.comparator {
        config.simulation.comparator = Some(comparator);
    }

    let model = resolve_model(&config, &args)?;

    let column = args.column.unwrap_or_else(|| args.kind.default_rate_column());
    let samples = import_samples_from_file(&args.samples, column)
        .with_context(|| format!("reading samples from {}", args.samples.display()))?;

    let smoothing = if args.no_smooth {
        None
    } else if let Some(window) = args.window {
        Some(SmoothingStage::new(window))
    } else {
        config.smoothing_for(args.kind)
    };

    let pipeline = BalancePipeline::from_config(&config, args.kind, model)?.with_smoothing(smoothing);
    let output = pipeline.run(&samples)?;

    match &args.output {
        Some(path) => {
            export_balance_csv_to_file(&samples, &output.series, output.smoothed, path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), rows = samples.len(), "balance written");
        }
        None => print!(
            "{}",
            export_balance_csv(&samples, &output.series, output.smoothed)?
        ),
    }

    Ok(())
}
