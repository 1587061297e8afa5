//! # topo-vaad
//!
//! Command-line driver: score CSV series and evaluate decision strategies.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use topo_vaad::error::AnomalyError;
use topo_vaad::io::{read_series_csv, write_grid_table, write_score_file, write_summary_file};
use topo_vaad::pipeline::{
    ensure_unique_ids, evt_grid, evt_grid_search, AnalysisConfig, Detector, DEFAULT_EVT_GATES,
    DEFAULT_EVT_TARGETS,
};
use topo_vaad::topology::ShapeFeature;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "topo-vaad")]
#[command(version, about = "Topological shape anomaly detection for time series", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score series and evaluate every strategy
    Analyze {
        /// Input CSV files (timestamp,value,new_cp,is_anomaly)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for score and summary tables
        #[arg(short, long, default_value = "results")]
        out_dir: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Grid search EVT gate and final quantiles on one series
    Grid {
        /// Input CSV file with an is_anomaly column
        input: PathBuf,

        /// Feature to score
        #[arg(short, long, default_value = "l2norm")]
        feature: String,

        /// Gate quantiles
        #[arg(long, value_delimiter = ',')]
        gates: Vec<f64>,

        /// Final quantiles
        #[arg(long, value_delimiter = ',')]
        targets: Vec<f64>,

        /// Print only the best N cells
        #[arg(long)]
        top: Option<usize>,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Parameters shared by all commands. Flags override the config file.
#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window length W
    #[arg(long)]
    window: Option<usize>,

    /// Embedding dimension d
    #[arg(long)]
    dimension: Option<usize>,

    /// Embedding delay tau
    #[arg(long)]
    delay: Option<usize>,

    /// Velocity gain k_v
    #[arg(long)]
    velocity_gain: Option<f64>,

    /// Acceleration gain k_a
    #[arg(long)]
    acceleration_gain: Option<f64>,

    /// EVT gate quantile g
    #[arg(long)]
    evt_gate: Option<f64>,

    /// EVT final quantile f
    #[arg(long)]
    evt_target: Option<f64>,

    /// POT prominence multiplier K
    #[arg(long)]
    pot_k: Option<f64>,

    /// Evaluation tolerance NTOL
    #[arg(long)]
    tolerance: Option<usize>,

    /// Disable the TopK oracle
    #[arg(long)]
    no_topk: bool,

    /// Restrict scoring to these features
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,
}

impl ConfigArgs {
    fn resolve(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field {
                    config.$field = v;
                })*
            };
        }
        apply!(
            window,
            dimension,
            delay,
            velocity_gain,
            acceleration_gain,
            evt_gate,
            evt_target,
            pot_k,
            tolerance
        );
        if self.no_topk {
            config.topk_oracle = false;
        }
        if !self.features.is_empty() {
            config.features = self
                .features
                .iter()
                .map(|f| f.parse::<ShapeFeature>())
                .collect::<Result<_, _>>()?;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "topo_vaad=debug"
    } else {
        "topo_vaad=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            inputs,
            out_dir,
            config,
        } => cmd_analyze(&inputs, &out_dir, &config.resolve()?),
        Commands::Grid {
            input,
            feature,
            gates,
            targets,
            top,
            config,
        } => {
            let feature: ShapeFeature = feature.parse()?;
            cmd_grid(&input, feature, &gates, &targets, top, config.resolve()?)
        }
    }
}

fn cmd_analyze(inputs: &[PathBuf], out_dir: &Path, config: &AnalysisConfig) -> anyhow::Result<()> {
    let series = inputs
        .iter()
        .map(|path| read_series_csv(path).with_context(|| format!("reading {}", path.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;
    ensure_unique_ids(&series)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let detector = Detector::new(config)?;
    let reports = detector.analyze_batch(&series);

    let mut failures = 0;
    for (input, report) in series.iter().zip(reports) {
        let report = match report {
            Ok(report) => report,
            Err(_) => {
                failures += 1;
                continue;
            }
        };
        let id = &report.series_id;
        write_score_file(out_dir.join(format!("{}_scores.csv", id)), input, &report.scores)?;
        for summary in &report.summaries {
            let name = format!("{}_{}_summary.csv", id, summary.strategy.to_lowercase());
            write_summary_file(out_dir.join(name), summary)?;
            if let Some(best) = summary.best() {
                println!(
                    "{:<24} {:<9} best {:<22} f1 {:.4}",
                    id, summary.strategy, best.feature, best.metrics.f1
                );
            }
        }
    }
    info!(
        written = series.len() - failures,
        out_dir = %out_dir.display(),
        "analysis tables written"
    );
    if failures > 0 {
        bail!("{} of {} series failed", failures, series.len());
    }
    Ok(())
}

fn cmd_grid(
    input: &Path,
    feature: ShapeFeature,
    gates: &[f64],
    targets: &[f64],
    top: Option<usize>,
    mut config: AnalysisConfig,
) -> anyhow::Result<()> {
    let series =
        read_series_csv(input).with_context(|| format!("reading {}", input.display()))?;
    let truth = series
        .ground_truth()
        .ok_or(AnomalyError::MissingGroundTruth)
        .context("grid search needs an is_anomaly column")?;

    config.features = vec![feature];
    let detector = Detector::new(&config)?;
    let scores = detector.score(&series)?;
    let Some(stream) = scores.first() else {
        bail!("no score stream for {}", feature);
    };

    let gates = if gates.is_empty() { &DEFAULT_EVT_GATES[..] } else { gates };
    let targets = if targets.is_empty() {
        &DEFAULT_EVT_TARGETS[..]
    } else {
        targets
    };
    let grid = evt_grid(gates, targets);
    let cells = evt_grid_search(
        &grid,
        config.evt_min_tail,
        stream,
        series.boundaries(),
        truth,
        &config.evaluator(),
    )?;
    let shown = &cells[..top.unwrap_or(cells.len()).min(cells.len())];

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_grid_table(&mut out, "gate,target", shown, |p| {
        format!("{},{}", p.gate, p.target)
    })?;
    Ok(())
}
