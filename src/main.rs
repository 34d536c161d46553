/*!
 * Lifeline CLI - Command Line Interface
 *
 * `lifeline run` starts the crisis monitor (when a probe is configured) and
 * the periodic cycle and status triggers, then waits for Ctrl+C.
 */

use clap::{Parser, Subcommand, ValueEnum};
use lifeline::{
    cli_style::{
        cycle_table, print_error, print_info, print_success, print_warning, section_header, Icons,
    },
    commands,
    config::{LifelineConfig, LogLevel},
    error::{LifelineError, Result, EXIT_SUCCESS},
    logging, Lifeline, SentinelError,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lifeline")]
#[command(version, about = "Crisis monitor and remediation orchestrator for business subsystems", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.lifeline/lifeline.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor and the scheduler until Ctrl+C
    Run,

    /// Run one remediation cycle and print the result as JSON
    Cycle {
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },

    /// Take one reading from the configured probe
    Probe,

    /// Show the roster, the policies and the schedule
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a starter configuration file
    InitConfig {
        /// Target path (default: ~/.lifeline/lifeline.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,

        /// Write the demo preset (short intervals, threshold 0)
        #[arg(long)]
        demo: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            print_error(&e.to_string(), hint_for(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { ref path, force, demo } = cli.command {
        commands::init::run_init(path.clone(), force, demo)?;
        return Ok(());
    }

    let config = load_config(&cli)?;
    logging::init_logging(&config)?;

    let lifeline = Lifeline::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run => runtime.block_on(run_service(&lifeline)),
        Commands::Cycle { table } => runtime.block_on(run_cycle(&lifeline, table)),
        Commands::Probe => runtime.block_on(run_probe(&lifeline)),
        Commands::Status { json } => commands::status::run_status(&lifeline, json),
        Commands::InitConfig { .. } => Ok(()),
    }
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<LifelineConfig> {
    let mut config = match cli.config {
        Some(ref path) => LifelineConfig::from_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => LifelineConfig::from_file(&path)?,
            _ => LifelineConfig::default(),
        },
    };

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    config.verbose |= cli.verbose;

    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lifeline").join("lifeline.toml"))
}

async fn run_service(lifeline: &Lifeline) -> Result<()> {
    if lifeline.monitor().is_some() {
        lifeline.start_monitoring()?;
    } else {
        print_warning("No probe configured; the crisis monitor is off");
    }

    let summary = lifeline.start_configured_scheduler();
    print_success(&summary.summary());
    print_info("Press Ctrl+C to stop");

    let signal = tokio::signal::ctrl_c().await;
    info!("🛑 Shutdown requested");
    lifeline.shutdown().await;

    signal?;
    Ok(())
}

async fn run_cycle(lifeline: &Lifeline, table: bool) -> Result<()> {
    let result = lifeline.activate_all().await?;

    if table {
        section_header(&format!("{} Remediation Cycle", Icons::SATELLITE));
        println!("{}", cycle_table(&result));
        println!("  {}", result.summary());
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if result.failure_count > 0 {
        return Err(LifelineError::Partial(format!(
            "{} of {} subsystems failed",
            result.failure_count,
            result.tasks.len()
        )));
    }
    Ok(())
}

async fn run_probe(lifeline: &Lifeline) -> Result<()> {
    let reading = lifeline.probe().await?;
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

fn hint_for(error: &LifelineError) -> Option<&'static str> {
    match error {
        LifelineError::Config(_) => {
            Some("run `lifeline init-config` to write a valid starter file")
        }
        LifelineError::Sentinel(SentinelError::NotConfigured(_)) => {
            Some("set monitor.probe_url in the config file")
        }
        _ => None,
    }
}
