use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use refine_analyzer::{AnalysisStats, Pipeline};
use refine_finding_cache::{CacheStore, DiskCache, MemoryCache};
use refine_inference::{HttpProvider, ModelProvider};
use refine_protocol::{AnalysisConfig, AnalysisFocus, AnalysisResult, Severity};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod report;

/// Default cache entry lifetime: 24 hours
const CACHE_TTL_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Parser)]
#[command(name = "refine")]
#[command(about = "Model-assisted source analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Cache directory
    #[arg(long, global = true, default_value = ".refine/cache")]
    cache_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file or a project directory
    Analyze(AnalyzeArgs),

    /// Inspect or clear the finding cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// File or directory to analyze
    path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    format: OutputFormat,

    /// Analysis focus (overrides the config file)
    #[arg(long, value_enum)]
    focus: Option<FocusArg>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the persistent cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Maximum concurrent model calls
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-unit wall-clock budget in milliseconds
    #[arg(long)]
    unit_budget_ms: Option<u64>,

    /// Maximum findings reported per unit
    #[arg(long)]
    max_findings: Option<usize>,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Print entry count and size on disk
    Stats,
    /// Remove every cached entry
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Console,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FocusArg {
    Comprehensive,
    Security,
    Performance,
}

impl From<FocusArg> for AnalysisFocus {
    fn from(value: FocusArg) -> Self {
        match value {
            FocusArg::Comprehensive => Self::Comprehensive,
            FocusArg::Security => Self::Security,
            FocusArg::Performance => Self::Performance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args, &cli.cache_dir).await,
        Commands::Cache { command } => run_cache(command, &cli.cache_dir).await,
    }
}

async fn run_analyze(args: AnalyzeArgs, cache_dir: &PathBuf) -> Result<()> {
    let config = load_config(&args)?;
    let provider = build_provider()?;

    let cache: Arc<dyn CacheStore> = if args.no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(DiskCache::with_ttl(cache_dir, CACHE_TTL_MS))
    };

    let pipeline = Arc::new(Pipeline::new(provider, cache, config)?);

    let started = std::time::Instant::now();
    let results = if args.path.is_dir() {
        let progress = ProgressBar::new_spinner();
        progress.enable_steady_tick(Duration::from_millis(120));
        let results = pipeline
            .analyze_project_with(&args.path, |result: &AnalysisResult| {
                progress.inc(1);
                progress.set_message(result.unit.clone());
            })
            .await?;
        progress.finish_and_clear();
        results
    } else {
        vec![pipeline.analyze_path(&args.path).await]
    };

    let mut stats = AnalysisStats::new();
    for result in &results {
        stats.record(result);
    }
    stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let dispatch = pipeline.dispatch_stats();
    log::info!(
        "run finished: {} model calls, {} cache hits, {} retries",
        dispatch.model_calls,
        dispatch.cache_hits,
        dispatch.retries
    );

    match args.format {
        OutputFormat::Console => report::render_console(&results, &stats),
        OutputFormat::Json => println!("{}", report::render_json(&results, &stats)?),
    }

    if matches!(
        stats.worst_severity(),
        Some(Severity::Critical | Severity::High)
    ) {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_cache(command: CacheCommands, cache_dir: &PathBuf) -> Result<()> {
    let cache = DiskCache::new(cache_dir);
    match command {
        CacheCommands::Stats => {
            let stats = cache.stats().await;
            println!(
                "{} entries, {} bytes in {}",
                stats.entries,
                stats.total_bytes,
                cache_dir.display()
            );
        }
        CacheCommands::Clear => {
            let before = cache.stats().await;
            cache.clear().await.context("failed to clear cache")?;
            println!("removed {} cached entries", before.entries);
        }
    }
    Ok(())
}

fn load_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(focus) = args.focus {
        config.focus = focus.into();
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(budget) = args.unit_budget_ms {
        config.unit_budget_ms = Some(budget);
    }
    if let Some(max_findings) = args.max_findings {
        config.max_findings_per_unit = max_findings;
    }
    Ok(config)
}

fn build_provider() -> Result<Arc<dyn ModelProvider>> {
    let Ok(endpoint) = std::env::var("REFINE_ENDPOINT") else {
        bail!(
            "no inference backend configured: set REFINE_ENDPOINT to your \
             inference server URL (and REFINE_API_TOKEN if it requires auth)"
        );
    };
    let model = std::env::var("REFINE_MODEL").unwrap_or_else(|_| "default".to_string());

    let mut provider = HttpProvider::new(endpoint, model);
    if let Ok(token) = std::env::var("REFINE_API_TOKEN") {
        provider = provider.with_token(token);
    }
    Ok(Arc::new(provider))
}
