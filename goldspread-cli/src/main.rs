//! GoldSpread CLI: show, watch and export the certificate vs physical gold spread.
//!
//! Commands:
//! - `show` prints the table for one window
//! - `watch` re-reads the cache on a timer and prints the latest point
//! - `export` writes a window's table as Parquet
//! - `windows` lists the window codes and their upstream parameters
//! - `config` prints the default configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use goldspread_core::export::write_parquet;
use goldspread_core::{
    Clock, GoldSpreadConfig, MarketDataSource, OfflineSource, ResilientDataService,
    SystemClock, TimeSeriesTable, WindowCache, WindowLabel, YahooSource,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

type Cache = WindowCache<ResilientDataService<Box<dyn MarketDataSource>>>;

#[derive(Parser)]
#[command(
    name = "goldspread",
    version,
    about = "Gold certificate vs physical gold spread monitor"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never call the upstream; every window is simulated.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Debug logging on stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the spread table for a window.
    Show {
        /// Window code: 1S, 24S, 1H, 1A, 3A, 1Y.
        #[arg(long, default_value = "24S")]
        window: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Only the most recent N points.
        #[arg(long)]
        last: Option<usize>,
    },
    /// Refresh on a timer and print the latest point with its change.
    Watch {
        #[arg(long, default_value = "24S")]
        window: String,

        #[arg(long, default_value_t = 60)]
        interval_secs: u64,

        /// Stop after this many refreshes. Runs until interrupted otherwise.
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Write a window's table to a Parquet file.
    Export {
        #[arg(long, default_value = "24S")]
        window: String,

        #[arg(long)]
        out: PathBuf,
    },
    /// List window codes and their upstream parameters.
    Windows,
    /// Print the default configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Show {
            window,
            format,
            last,
        } => run_show(&cli, window, *format, *last),
        Commands::Watch {
            window,
            interval_secs,
            ticks,
        } => run_watch(&cli, window, *interval_secs, *ticks),
        Commands::Export { window, out } => run_export(&cli, window, out),
        Commands::Windows => {
            run_windows();
            Ok(())
        }
        Commands::Config => {
            print!("{}", GoldSpreadConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GoldSpreadConfig> {
    match path {
        Some(p) => GoldSpreadConfig::from_file(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(GoldSpreadConfig::default()),
    }
}

fn build_cache(cli: &Cli) -> Result<Cache> {
    let config = load_config(cli.config.as_deref())?;
    let source: Box<dyn MarketDataSource> = if cli.offline {
        Box::new(OfflineSource)
    } else {
        Box::new(YahooSource::new(&config.upstream).context("building upstream client")?)
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = ResilientDataService::new(source, &config, Arc::clone(&clock));
    Ok(WindowCache::new(service, config.cache.ttl(), clock))
}

fn resolve_window(code: &str) -> WindowLabel {
    WindowLabel::parse(code).unwrap_or_else(|| {
        let fallback = WindowLabel::default();
        warn!(code, fallback = %fallback, "unknown window code, using default");
        fallback
    })
}

fn run_show(cli: &Cli, window: &str, format: OutputFormat, last: Option<usize>) -> Result<()> {
    let cache = build_cache(cli)?;
    let table = cache.get_or_compute(resolve_window(window));
    let table = match last {
        Some(n) => table.tail(n),
        None => (*table).clone(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => print_table(&mut out, &table)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, table.points())?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for point in table.points() {
                writer.serialize(point)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn print_table(out: &mut impl Write, table: &TimeSeriesTable) -> Result<()> {
    writeln!(
        out,
        "{:<20} {:>14} {:>14} {:>10}",
        "timestamp (UTC)", "certificate", "physical", "spread"
    )?;
    for p in table.points() {
        writeln!(
            out,
            "{:<20} {:>14.2} {:>14.2} {:>10.2}",
            p.timestamp.format("%Y-%m-%d %H:%M"),
            p.certificate_price,
            p.physical_price,
            p.spread
        )?;
    }
    Ok(())
}

fn run_watch(cli: &Cli, window: &str, interval_secs: u64, ticks: Option<u64>) -> Result<()> {
    let cache = build_cache(cli)?;
    let label = resolve_window(window);
    let interval = Duration::from_secs(interval_secs.max(1));

    let mut tick = 0u64;
    loop {
        let table = cache.get_or_compute(label);
        let latest = table.last();
        let points = table.points();
        let delta = |f: fn(&goldspread_core::TimeSeriesPoint) -> f64| {
            points
                .len()
                .checked_sub(2)
                .map(|i| f(latest) - f(&points[i]))
                .unwrap_or(0.0)
        };

        println!(
            "[{}] {}  certificate {:.2} ({:+.2})  physical {:.2} ({:+.2})  spread {:.2} ({:+.2})",
            latest.timestamp.format("%Y-%m-%d %H:%M"),
            label,
            latest.certificate_price,
            delta(|p| p.certificate_price),
            latest.physical_price,
            delta(|p| p.physical_price),
            latest.spread,
            delta(|p| p.spread),
        );

        tick += 1;
        if ticks.is_some_and(|limit| tick >= limit) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn run_export(cli: &Cli, window: &str, out: &Path) -> Result<()> {
    let cache = build_cache(cli)?;
    let label = resolve_window(window);
    let table = cache.get_or_compute(label);
    write_parquet(&table, out).with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {} points for {} to {}", table.len(), label, out.display());
    Ok(())
}

fn run_windows() {
    println!(
        "{:<6} {:>8} {:>10} {:>14}",
        "code", "period", "interval", "trim (min)"
    );
    for label in WindowLabel::ALL {
        let spec = label.spec();
        let marker = if label == WindowLabel::default() { " (default)" } else { "" };
        println!(
            "{:<6} {:>8} {:>10} {:>14}{}",
            label.code(),
            spec.upstream_period,
            spec.upstream_interval,
            spec.trim_duration.num_minutes(),
            marker
        );
    }
}
