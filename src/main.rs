//! ClimateBox command-line client.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │  TcpConnector   LogEventSink   TickLogWriter   report    │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ─────────────────  │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  Monitor: ChamberSession · sensors · Interlock     │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use climatebox::adapters::log_sink::LogEventSink;
use climatebox::adapters::status_report;
use climatebox::adapters::tcp_connector::TcpConnector;
use climatebox::adapters::tick_log::TickLogWriter;
use climatebox::app::monitor::{Monitor, RunBudget};
use climatebox::chamber::ChamberSession;
use climatebox::config::ClimateBoxConfig;
use climatebox::protocol::transport::TcpTransport;
use climatebox::sensors;

/// Climate chamber client with condensation interlock
#[derive(Parser)]
#[command(name = "climatebox", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CLIMATEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Chamber host (overrides the configuration file)
    #[arg(long, env = "CLIMATEBOX_HOST")]
    host: Option<String>,

    /// Chamber TCP port (overrides the configuration file)
    #[arg(long, env = "CLIMATEBOX_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not ask for confirmation before writing to the chamber
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the chamber, log every tick and run the condensation interlock
    Monitor {
        /// Stop after this many seconds (0: no limit)
        #[arg(short = 't', long)]
        duration: Option<u64>,
        /// Stop after this many samples (0: no limit)
        #[arg(short = 'n', long)]
        samples: Option<u64>,
        /// Seconds between samples
        #[arg(short, long)]
        step: Option<u64>,
        /// Tick log file (appended)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the current chamber status
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Stop the manual run without warming up
    Stop,
    /// Force a warm-up in manual mode with compressed air and dryer on
    WarmUp {
        /// Target temperature (°C)
        #[arg(short = 'T', long)]
        target: Option<f64>,
        /// Gradient (K/min)
        #[arg(short, long)]
        gradient: Option<f64>,
    },
    /// Change the temperature setpoint
    Setpoint {
        /// New setpoint (°C)
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// List active alarms and warnings
    Warnings,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,climatebox=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClimateBoxConfig> {
    let mut config = match &cli.config {
        Some(path) => ClimateBoxConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClimateBoxConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.connection.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.connection.port = port;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn connect(config: &ClimateBoxConfig) -> anyhow::Result<ChamberSession<TcpTransport>> {
    let c = &config.connection;
    info!("Connecting to climate chamber at {}:{}", c.host, c.port);
    let mut session = ChamberSession::connect(c)
        .with_context(|| format!("connecting to {}:{}", c.host, c.port))?;
    match session.info() {
        Ok(fields) => info!("Chamber: {}", fields.join(" ")),
        Err(e) => warn!("Chamber identification unavailable: {e}"),
    }
    Ok(session)
}

/// Ask the operator on stdin. Anything but y/yes declines.
fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let yes = cli.yes;

    match cli.command {
        Command::Monitor {
            duration,
            samples,
            step,
            output,
        } => cmd_monitor(config, duration, samples, step, output),
        Command::Status { json } => cmd_status(&config, json),
        Command::Stop => {
            if !yes && !confirm("Stop the chamber without warm-up?")? {
                info!("Aborted");
                return Ok(());
            }
            let mut session = connect(&config)?;
            session.stop().context("stopping chamber")?;
            session.disconnect()?;
            Ok(())
        }
        Command::WarmUp { target, gradient } => {
            let target = target.unwrap_or(config.interlock.target_c);
            let gradient = gradient.unwrap_or(config.interlock.gradient_k_per_min);
            let question =
                format!("Force warm-up to {target:.1} \u{00b0}C at {gradient:.1} K/min?");
            if !yes && !confirm(&question)? {
                info!("Aborted");
                return Ok(());
            }
            let mut session = connect(&config)?;
            session
                .force_warm_up(target, gradient)
                .context("forcing warm-up")?;
            session.disconnect()?;
            Ok(())
        }
        Command::Setpoint { value } => {
            let mut session = connect(&config)?;
            session
                .set_control_setpoint(value)
                .context("setting setpoint")?;
            info!("Setpoint set to {value:.3} \u{00b0}C");
            session.disconnect()?;
            Ok(())
        }
        Command::Warnings => {
            let mut session = connect(&config)?;
            let messages = session.active_messages().context("reading messages")?;
            println!("{}", status_report::render_warnings(&messages));
            session.disconnect()?;
            Ok(())
        }
    }
}

fn cmd_status(config: &ClimateBoxConfig, json: bool) -> anyhow::Result<()> {
    let mut session = match connect(config) {
        Ok(s) => s,
        Err(e) if !json => {
            warn!("{e:#}");
            println!("{}", status_report::render_text(None));
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let snapshot = session.snapshot().context("reading chamber status")?;
    if json {
        println!("{}", status_report::render_json(&snapshot)?);
    } else {
        println!("{}", status_report::render_text(Some(&snapshot)));
    }
    session.disconnect()?;
    Ok(())
}

fn cmd_monitor(
    mut config: ClimateBoxConfig,
    duration: Option<u64>,
    samples: Option<u64>,
    step: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(step) = step {
        if step == 0 {
            bail!("step must be at least one second");
        }
        config.monitor.step_secs = step;
    }
    let step = Duration::from_secs(config.monitor.step_secs);
    let budget = RunBudget::new(samples, duration.map(Duration::from_secs), step);
    let output = output.unwrap_or_else(|| PathBuf::from(&config.monitor.output));

    let tick_log = TickLogWriter::append(&output)
        .with_context(|| format!("opening {}", output.display()))?;
    info!("Logging ticks to {}", output.display());

    let mut monitor = Monitor::new(
        TcpConnector::new(config.connection.clone()),
        sensors::from_config(&config.sensors),
        &config.interlock,
    )?;
    let mut sink = (LogEventSink::new(), tick_log);
    let summary = monitor.run(budget, step, &mut sink, std::thread::sleep);
    monitor.shutdown()?;
    let summary = summary?;
    info!(
        "Done: {} samples, {} abandoned",
        summary.ticks, summary.failed_ticks
    );
    Ok(())
}
