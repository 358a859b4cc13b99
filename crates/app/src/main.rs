use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use busticket_config::Config;
use busticket_flow::{BookingFlow, ViewState};
use busticket_qr::{PngRenderer, QrRenderer, RenderOptions, parse_color, render_terminal};
use busticket_store::Store;
use chrono::Local;
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::OffsetTime;

mod receipt;
mod server;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("BUSTICKET_GIT_HASH");

fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH})")
}

// --- CLI definition ---

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "busticket")]
#[command(about = "Book a bus ticket and show it as a receipt or QR code")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUSTICKET_GIT_HASH"), ")"))]
struct Cli {
    /// Log level (default: from config, else info)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    /// Display log timestamps in UTC (default: local time)
    #[arg(long, global = true)]
    utc: bool,

    /// Directory holding booking and ticket data
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Book a ticket. Omitted fields come from the saved form.
    Book {
        /// Starting stop
        #[arg(long)]
        from: Option<String>,
        /// Ending stop
        #[arg(long)]
        to: Option<String>,
        /// Bus route (e.g. "120")
        #[arg(long)]
        route: Option<String>,
        /// Number of tickets (1-5)
        #[arg(long)]
        tickets: Option<u32>,
        /// Fare in rupees
        #[arg(long)]
        fare: Option<f64>,
    },
    /// Show the ticket for the last booking
    Ticket,
    /// Show the QR code of the last issued ticket
    Qr {
        /// Write a PNG to this path instead of printing to the terminal
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the PNG as a data URL
        #[arg(long)]
        data_url: bool,
        /// Use the smaller pop-up size
        #[arg(long)]
        compact: bool,
    },
    /// Print the saved booking form
    Draft,
    /// Forget the last booking and ticket
    Clear,
    /// Start the HTTP API
    Serve {
        /// Port to listen on (default: from config, else 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// --- Logging ---

fn init_logging(level: &str, utc: bool) {
    let filter = EnvFilter::new(level);

    if utc {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(OffsetTime::new(
                time::UtcOffset::UTC,
                time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                ),
            ))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTimer)
            .init();
    }
}

struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// --- Wiring ---

/// Fold CLI flags over the loaded config.
fn merge_cli(mut config: Config, cli: &Cli) -> Config {
    if let Some(level) = &cli.log_level { config.log_level = level.to_string(); }
    if cli.utc { config.utc = true; }
    if let Some(dir) = &cli.storage_dir { config.storage_dir = dir.clone(); }
    if let Commands::Serve { port: Some(port) } = cli.command { config.port = port; }
    config
}

fn build_flow(config: &Config) -> anyhow::Result<BookingFlow> {
    let store = Store::open(&config.storage_dir)?;
    let timezone: Tz = config
        .timezone
        .parse()
        .map_err(|e| anyhow!("unknown timezone {:?}: {e}", config.timezone))?;
    BookingFlow::new(store).with_time_format(timezone, &config.booking_time_format)
}

fn qr_options(config: &Config, compact: bool) -> anyhow::Result<RenderOptions> {
    let base = if compact {
        RenderOptions::compact()
    } else {
        RenderOptions {
            pixel_width: config.qr_width,
            margin_modules: config.qr_margin,
            ..RenderOptions::page()
        }
    };
    let options = RenderOptions {
        foreground: parse_color(&config.qr_foreground)?,
        background: parse_color(&config.qr_background)?,
        ..base
    };
    options.validate()?;
    Ok(options)
}

fn show_ticket(flow: &BookingFlow, navigation: Option<busticket_models::BookingRecord>) -> anyhow::Result<()> {
    match flow.activate_ticket_view(navigation) {
        ViewState::Resolved { data, source } => {
            debug!("Showing ticket from {source:?}");
            println!("{}", receipt::render(&data.ticket));
            println!("\nRun `busticket qr` to show the QR code.");
            Ok(())
        }
        other => bail!("ticket view did not resolve: {other:?}"),
    }
}

fn show_qr(flow: &BookingFlow, options: &RenderOptions, out: Option<PathBuf>, data_url: bool) -> anyhow::Result<()> {
    let payload = match flow.activate_qr_view(None) {
        ViewState::Resolved { data, .. } => data,
        ViewState::Redirect(_) | ViewState::AwaitingInput => {
            bail!("no ticket to show; book one with `busticket book`")
        }
    };

    if out.is_none() && !data_url {
        match render_terminal(&payload) {
            Ok(art) => println!("{art}"),
            Err(e) => error!("QR encoding failed: {e}"),
        }
        return Ok(());
    }

    let image = match PngRenderer.render(&payload, options) {
        Ok(image) => image,
        Err(e) => {
            error!("QR encoding failed: {e}");
            return Ok(());
        }
    };
    if let Some(path) = out {
        std::fs::write(&path, image.png()).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {}x{} QR code to {}", image.width(), image.width(), path.display());
    }
    if data_url {
        println!("{}", image.data_url());
    }
    Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = merge_cli(Config::load(), &cli);
    init_logging(&config.log_level, config.utc);

    let flow = build_flow(&config)?;

    match cli.command {
        Commands::Book { from, to, route, tickets, fare } => {
            let mut draft = flow.load_draft();
            if let Some(v) = from { draft.from = v; }
            if let Some(v) = to { draft.to = v; }
            if let Some(v) = route { draft.route = v; }
            if let Some(v) = tickets { draft.tickets = v; }
            if let Some(v) = fare { draft.fare = v; }
            flow.save_draft(&draft)?;

            let booking = draft.validate()?;
            let record = flow.submit(booking)?;
            show_ticket(&flow, Some(record))?;
        }
        Commands::Ticket => {
            show_ticket(&flow, None)?;
        }
        Commands::Qr { out, data_url, compact } => {
            let options = qr_options(&config, compact)?;
            show_qr(&flow, &options, out, data_url)?;
        }
        Commands::Draft => {
            println!("{}", serde_json::to_string_pretty(&flow.load_draft())?);
        }
        Commands::Clear => {
            flow.store().clear()?;
            println!("Booking and ticket data cleared.");
        }
        Commands::Serve { .. } => {
            let options = qr_options(&config, false)?;
            server::run(config.port, flow, options).await?;
        }
    }

    Ok(())
}
