use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replaybook::app;
use replaybook::clock::SystemClock;
use replaybook::config::{default_config_path, ResolvedConfig};
use replaybook::diagnostics::Issue;
use replaybook::portfolio::Granularity;
use replaybook::reports::{valuation_rows, write_csv, write_csv_file};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "replaybook")]
#[command(about = "Rebuild holdings, cash and portfolio value history from a broker ledger")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Skip market-data fetches; unpriced holdings are valued at zero.
    #[arg(long, global = true)]
    offline: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Write the CSV here instead of the configured output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the CSV to stdout.
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Valuation timeline (cash, assets, total, deposits, gain)
    History {
        #[command(flatten)]
        out: OutputArgs,

        /// One end-of-day point per day instead of the configured hours.
        #[arg(long)]
        eod: bool,
    },
    /// Per-day value of every held position
    Positions {
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Trades and cash movements
    Transactions {
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Cost breakdown per broker order
    Orders {
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Show current configuration
    Config,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }
}

fn emit<T: Serialize>(
    rows: &[T],
    out: &OutputArgs,
    config: &ResolvedConfig,
    default_name: &str,
) -> Result<()> {
    if out.stdout {
        return write_csv(rows, std::io::stdout().lock());
    }
    let path = out
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.join(default_name));
    write_csv_file(rows, &path)?;
    info!(rows = rows.len(), path = %path.display(), "report written");
    Ok(())
}

fn report_issues(issues: &[Issue]) {
    if !issues.is_empty() {
        warn!(count = issues.len(), "completed with degraded input, see warnings above");
    }
}

fn load_config(path: &Path) -> Result<ResolvedConfig> {
    ResolvedConfig::load_or_default(path)
        .with_context(|| format!("Failed to load replaybook config: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(&cli.config)?;
    let source = app::market_source(&config, cli.offline);

    match cli.command {
        Command::History { out, eod } => {
            let granularity = if eod {
                Granularity::EndOfDay
            } else {
                config.timeline.granularity()
            };
            let history =
                app::portfolio_history(&config, source, &SystemClock, &granularity).await?;
            emit(
                &valuation_rows(&history.points),
                &out,
                &config,
                "valuation_history.csv",
            )?;
            if let Some(summary) = &history.summary {
                info!(
                    as_of = %summary.as_of,
                    total = %summary.total_value,
                    deposits = %summary.total_deposits,
                    gain_percent = %summary.gain_percent,
                    currency = %history.currency,
                    "portfolio summary"
                );
            }
            report_issues(&history.issues);
        }
        Command::Positions { out } => {
            let report = app::position_report(&config, source, &SystemClock).await?;
            emit(&report.rows, &out, &config, "portfolio_history.csv")?;
            report_issues(&report.issues);
        }
        Command::Transactions { out } => {
            let report = app::transaction_report(&config, source).await?;
            emit(&report.rows, &out, &config, "portfolio_daily_eod.csv")?;
            report_issues(&report.issues);
        }
        Command::Orders { out } => {
            let report = app::order_report(&config, source).await?;
            emit(&report.rows, &out, &config, "orders_summary.csv")?;
            report_issues(&report.issues);
        }
        Command::Config => {
            let output = app::config_output(&cli.config, &config);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
