mod metrics;
mod output;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use captionmate_core::{
    create_semantic_provider, load_config, load_default_config, validate_config, Config,
    EngineError, ExecutionReport, FileOperator, FsOperator, LocalScanner, MatchEngine, MatchMode,
    MatchReport, SanitizedConfig, Scanner,
};

use output::DirectoryOutput;

/// Pair video files with their subtitles and rename the subtitles into place.
#[derive(Debug, Parser)]
#[command(name = "caption-mate", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CAPTION_MATE_CONFIG")]
    config: Option<PathBuf>,

    /// Matching mode: ai, regex or both
    #[arg(short, long)]
    mode: Option<MatchMode>,

    /// Minimum score for a pair to be renamed (0.0 to 1.0)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Replace subtitles that already belong to a video
    #[arg(long)]
    force: bool,

    /// Execute the rename entries instead of only printing the plan
    #[arg(long)]
    apply: bool,

    /// Descend into subdirectories (`--recursive false` to disable)
    #[arg(short, long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    recursive: Option<bool>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Dump metrics in Prometheus text format to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Directories to match
    #[arg(required = true, value_name = "DIR")]
    directories: Vec<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load default configuration")?,
    };

    if let Some(mode) = cli.mode {
        config.matching.mode = mode;
    }
    if let Some(threshold) = cli.threshold {
        config.matching.threshold = threshold;
    }
    if cli.force {
        config.matching.force = true;
    }
    if let Some(recursive) = cli.recursive {
        config.scan.recursive = recursive;
    }

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn build_engine(config: &Config) -> Result<MatchEngine> {
    let engine = MatchEngine::from_config(config).context("Failed to create matching engine")?;

    if !config.matching.mode.can_use_ai() {
        return Ok(engine);
    }
    match &config.llm {
        Some(llm) => match create_semantic_provider(llm) {
            Ok(provider) => {
                info!("Using semantic provider: {} ({})", llm.provider.as_str(), llm.model);
                Ok(engine.with_semantic_provider(provider))
            }
            Err(e) => {
                error!("Failed to create semantic provider: {}", e);
                Ok(engine)
            }
        },
        None => {
            info!("No semantic provider configured");
            Ok(engine)
        }
    }
}

/// Cancel planning on Ctrl+C.
fn spawn_cancel_on_interrupt() -> (watch::Receiver<bool>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling planning");
                let _ = tx.send(true);
            }
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    });
    (rx, handle)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load(&cli)?;
    info!(
        "Configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    let engine = build_engine(&config)?;

    let scanner = LocalScanner::new(config.scan.clone());
    let mut listings = Vec::new();
    for directory in &cli.directories {
        let found = scanner
            .scan(directory)
            .await
            .with_context(|| format!("Failed to scan {:?}", directory))?;
        if found.is_empty() {
            warn!("No videos found under {:?}", directory);
        }
        listings.extend(found);
    }
    info!("Planning {} directories", listings.len());

    let (cancel, interrupt_handle) = spawn_cancel_on_interrupt();
    let results = engine.plan_directories(&listings, Some(cancel)).await;

    let mut reports: Vec<MatchReport> = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(EngineError::Cancelled) => bail!("Planning cancelled"),
            Err(e) => return Err(e).context("Planning failed"),
        }
    }
    interrupt_handle.abort();

    let apply = cli.apply || !config.executor.dry_run;
    let mut executions: Vec<Option<ExecutionReport>> = Vec::with_capacity(reports.len());
    if apply {
        let operator = FsOperator::new(config.executor.clone().with_dry_run(false));
        for report in &reports {
            executions.push(Some(operator.execute(&report.plan).await));
        }
    } else {
        executions.resize(reports.len(), None);
    }

    if cli.json {
        let outputs: Vec<DirectoryOutput<'_>> = reports
            .iter()
            .zip(&executions)
            .map(|(report, execution)| DirectoryOutput {
                report,
                execution: execution.as_ref(),
            })
            .collect();
        println!("{}", output::render_json(&outputs).context("Failed to encode plan")?);
    } else {
        for (report, execution) in reports.iter().zip(&executions) {
            print!("{}", output::render_report(report));
            if let Some(execution) = execution {
                print!("{}", output::render_execution(execution));
            }
            println!();
        }
        if !apply {
            println!("Dry run: nothing was renamed. Pass --apply to execute the plan.");
        }
    }

    if cli.metrics {
        eprint!("{}", metrics::encode_metrics().context("Failed to encode metrics")?);
    }

    let failed: usize = executions
        .iter()
        .flatten()
        .map(|execution| execution.failures().count())
        .sum();
    if failed > 0 {
        bail!("{} file operations failed", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "caption-mate",
            "--mode",
            "regex",
            "--threshold",
            "0.7",
            "--recursive",
            "false",
            "--apply",
            "/tv",
        ])
        .unwrap();

        assert_eq!(cli.mode, Some(MatchMode::Regex));
        assert_eq!(cli.threshold, Some(0.7));
        assert_eq!(cli.recursive, Some(false));
        assert!(cli.apply);
        assert!(!cli.force);
        assert_eq!(cli.directories, vec![PathBuf::from("/tv")]);
    }

    #[test]
    fn test_bare_recursive_flag() {
        let cli = Cli::try_parse_from(["caption-mate", "/tv", "--recursive"]).unwrap();
        assert_eq!(cli.recursive, Some(true));
    }

    #[test]
    fn test_directory_required() {
        assert!(Cli::try_parse_from(["caption-mate", "--json"]).is_err());
        assert!(Cli::try_parse_from(["caption-mate", "--mode", "fuzzy", "/tv"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "caption-mate",
            "--mode",
            "regex",
            "--threshold",
            "0.5",
            "--force",
            "/tv",
        ])
        .unwrap();

        let config = load(&cli).unwrap();
        assert_eq!(config.matching.mode, MatchMode::Regex);
        assert_eq!(config.matching.threshold, 0.5);
        assert!(config.matching.force);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let cli = Cli::try_parse_from(["caption-mate", "--threshold", "1.5", "/tv"]).unwrap();
        assert!(load(&cli).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("caption-mate.toml");
        std::fs::write(&path, "[matching]\nmode = \"regex\"\nthreshold = 0.6\n").unwrap();

        let cli = Cli::try_parse_from(["caption-mate", "--config", path.to_str().unwrap(), "/tv"])
            .unwrap();
        let config = load(&cli).unwrap();
        assert_eq!(config.matching.threshold, 0.6);

        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.config().mode, MatchMode::Regex);
    }
}
