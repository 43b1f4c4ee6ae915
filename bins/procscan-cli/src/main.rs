use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, info};

use procscan::{find_process, kill, list_processes, Process};

mod config;

use config::{CliConfig, OutputFormat};

/// Inspect and terminate operating system processes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every running process
    List {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Look up a single process by pid
    Find {
        pid: u32,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Forcefully terminate a process
    Kill { pid: u32 },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Resolve owner and command line as well
    #[arg(short, long)]
    full: bool,

    /// Output format (overrides config)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

impl OutputArgs {
    fn full_info(&self, config: &CliConfig) -> bool {
        self.full || config.default_full_info
    }

    fn format(&self, config: &CliConfig) -> OutputFormat {
        self.format.unwrap_or(config.output_format)
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CliConfig::load_from_file(path)?,
        None => CliConfig::default(),
    };

    initialize_logging(args.debug, &config.log_level)?;
    debug!(?config, "configuration loaded");

    let mut stdout = std::io::stdout().lock();

    match args.command {
        Command::List { output } => {
            let processes = list_processes(output.full_info(&config))?;
            write_processes(&mut stdout, &processes, output.format(&config))?;
        }
        Command::Find { pid, output } => match find_process(pid, output.full_info(&config))? {
            Some(process) => write_processes(&mut stdout, &[process], output.format(&config))?,
            None => {
                writeln!(stdout, "not found")?;
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Kill { pid } => {
            kill(pid).with_context(|| format!("Failed to kill process {pid}"))?;
            info!(pid, "termination requested");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn initialize_logging(debug: bool, configured_level: &str) -> Result<()> {
    let level = if debug { "debug" } else { configured_level };

    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_lowercase())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn write_processes(out: &mut impl Write, processes: &[Process], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, processes).context("Failed to encode JSON")?;
            writeln!(out)?;
        }
        OutputFormat::Table => write_table(out, processes)?,
    }
    Ok(())
}

fn write_table(out: &mut impl Write, processes: &[Process]) -> Result<()> {
    let owner_width = processes
        .iter()
        .filter_map(|p| p.owner())
        .map(str::len)
        .chain(std::iter::once("OWNER".len()))
        .max()
        .unwrap_or(0);

    writeln!(out, "{:>8} {:>8} {:<owner_width$} {:<8} COMMAND", "PID", "PPID", "OWNER", "ARCH")?;

    for process in processes {
        let command = if process.cmd_line().is_empty() {
            process.executable().to_string()
        } else {
            process.cmd_line().join(" ")
        };
        writeln!(
            out,
            "{:>8} {:>8} {:<owner_width$} {:<8} {}",
            process.pid(),
            process.ppid(),
            process.owner().unwrap_or("-"),
            process.architecture().map(|a| a.as_str()).unwrap_or("-"),
            command,
        )?;
    }
    Ok(())
}
