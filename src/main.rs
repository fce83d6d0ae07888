//! Energy Index CLI
//!
//! Command-line interface over a snapshot file:
//! - Import meter exports
//! - Sum, average, search and compare over time ranges
//! - Show index status
//! - Run the interactive menu

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use energy_index::config::{generate_default_config, Config, ConfigDiscovery, LoggingConfig};
use energy_index::storage::snapshot;
use energy_index::{Analyzer, EnergyIndex, Field, SearchHit, Shell, TimeRange, Timestamp};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "energy-index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Time-indexed store for energy meter readings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: user config dir, /etc/energy-index, ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot file (overrides [storage].data_file)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// A field and an inclusive time range
#[derive(Args)]
pub struct RangeArgs {
    /// Field: auto, export, import, consumption, production
    #[arg(long)]
    pub field: Field,
    /// Range start (YYYY-MM-DD [HH:MM[:SS]])
    #[arg(long)]
    pub from: Timestamp,
    /// Range end, inclusive (a bare date means midnight)
    #[arg(long)]
    pub to: Timestamp,
}

impl RangeArgs {
    fn range(&self) -> TimeRange {
        TimeRange::between(&self.from, &self.to)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a CSV meter export into the snapshot
    Import {
        /// Path to CSV file
        path: PathBuf,
        /// Start from an empty index instead of the existing snapshot
        #[arg(long)]
        replace: bool,
        /// Dry run (don't write the snapshot)
        #[arg(long)]
        dry_run: bool,
    },

    /// Sum a field over a time range
    Sum(RangeArgs),

    /// Average a field over a time range
    Avg(RangeArgs),

    /// Find readings whose field is within a tolerance of a target
    Search {
        #[command(flatten)]
        range: RangeArgs,
        /// Target value
        #[arg(long, allow_negative_numbers = true)]
        target: f64,
        /// Allowed distance from the target (negative matches nothing)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        tolerance: f64,
    },

    /// Compare the sums of a field over two periods
    Compare {
        /// Field: auto, export, import, consumption, production
        #[arg(long)]
        field: Field,
        #[arg(long)]
        from1: Timestamp,
        #[arg(long)]
        to1: Timestamp,
        #[arg(long)]
        from2: Timestamp,
        #[arg(long)]
        to2: Timestamp,
    },

    /// Show index statistics
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive menu
    Shell,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let discovery = match &cli.config {
        Some(path) => ConfigDiscovery::explicit(
            Config::load_with_env(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            path,
        ),
        None => Config::load_default(),
    };
    init_logging(&discovery.config.logging)?;
    discovery.log();
    let config = discovery.config;

    let data_file = cli
        .data
        .clone()
        .unwrap_or_else(|| config.storage.data_path());
    tracing::debug!("Snapshot file: {:?}", data_file);

    match cli.command {
        Commands::Import {
            path,
            replace,
            dry_run,
        } => {
            let mut index = if replace {
                EnergyIndex::new()
            } else {
                open_index(&data_file)?
            };

            let report = config
                .import
                .importer()
                .import(&path, &mut index)
                .with_context(|| format!("Failed to import {:?}", path))?;

            if !dry_run {
                let written = snapshot::save(&index, &data_file)
                    .with_context(|| format!("Failed to save snapshot {:?}", data_file))?;
                tracing::info!("Snapshot now holds {} measurements", written);
            }

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    println!("Import results:");
                    println!("  Accepted: {}", report.accepted);
                    println!("  Rejected: {}", report.rejected);
                    println!("  Duplicates: {}", report.duplicates);
                    println!("  Total in index: {}", index.len());

                    if !report.errors.is_empty() {
                        println!();
                        println!("Errors (first 10):");
                        for error in report.errors.iter().take(10) {
                            println!("  {}", error);
                        }
                    }

                    if let Some(log) = &report.log_file {
                        println!();
                        println!("Log written to {:?}", log);
                    }
                    if let Some(log) = &report.errors_log_file {
                        println!("Rejected lines in {:?}", log);
                    }

                    if dry_run {
                        println!();
                        println!("(Dry run - snapshot not written)");
                    }
                }
            }
        }

        Commands::Sum(args) => {
            let index = open_index(&data_file)?;
            let analyzer = Analyzer::new(&index);
            let range = args.range();
            let value = analyzer.sum(range, args.field);
            print_aggregate(cli.format, "sum", &args, value, analyzer.count(range))?;
        }

        Commands::Avg(args) => {
            let index = open_index(&data_file)?;
            let analyzer = Analyzer::new(&index);
            let range = args.range();
            let value = analyzer.average(range, args.field);
            print_aggregate(cli.format, "average", &args, value, analyzer.count(range))?;
        }

        Commands::Search {
            range,
            target,
            tolerance,
        } => {
            let index = open_index(&data_file)?;
            let mut hits: Vec<SearchHit> = Vec::new();
            Analyzer::new(&index).search(range.field, target, tolerance, range.range(), |hit| {
                hits.push(*hit)
            });

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
                OutputFormat::Text => {
                    for hit in &hits {
                        println!("{}", hit);
                    }
                    println!("Matches: {}", hits.len());
                }
            }
        }

        Commands::Compare {
            field,
            from1,
            to1,
            from2,
            to2,
        } => {
            let index = open_index(&data_file)?;
            let comparison = Analyzer::new(&index).compare(
                TimeRange::between(&from1, &to1),
                TimeRange::between(&from2, &to2),
                field,
            );

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
                OutputFormat::Text => println!("{}", comparison),
            }
        }

        Commands::Status => {
            let index = open_index(&data_file)?;
            let stats = index.stats();

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Text => {
                    println!("Energy Index v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("Snapshot: {}", data_file.display());
                    println!("  Measurements: {}", stats.measurements);
                    println!("  Years: {}", stats.years);
                    println!("  Months: {}", stats.months);
                    println!("  Days: {}", stats.days);
                    println!("  Buckets: {}", stats.buckets);
                    if let (Some(first), Some(last)) = (stats.first, stats.last) {
                        println!("  First: {}", first);
                        println!("  Last: {}", last);
                    }
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }

        Commands::Shell => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let mut shell = Shell::new(
                stdin.lock(),
                stdout.lock(),
                data_file,
                config.import.importer(),
            );
            shell.run()?;
        }
    }

    Ok(())
}

/// Load the snapshot if it exists, otherwise start empty
fn open_index(path: &Path) -> anyhow::Result<EnergyIndex> {
    let mut index = EnergyIndex::new();

    if path.exists() {
        let summary = snapshot::load(&mut index, path)
            .with_context(|| format!("Failed to load snapshot {:?}", path))?;
        if summary.duplicates > 0 {
            tracing::warn!("Snapshot contained {} duplicate records", summary.duplicates);
        }
    } else {
        tracing::info!("No snapshot at {:?}, starting empty", path);
    }

    Ok(index)
}

fn print_aggregate(
    format: OutputFormat,
    kind: &str,
    args: &RangeArgs,
    value: f64,
    count: usize,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "aggregate": kind,
                "field": args.field,
                "from": args.from,
                "to": args.to,
                "count": count,
                "value": value,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!(
                "{} of {} from {} to {} ({} readings): {:.2}",
                kind, args.field, args.from, args.to, count, value
            );
        }
    }
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("energy_index={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let ansi = config.file.is_none();

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(ansi).with_writer(writer))
            .init();
    }

    Ok(())
}
