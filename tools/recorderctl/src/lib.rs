pub mod commands;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod logging;
pub mod recorder;
pub mod render;
pub mod runtime;
pub mod types;

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use config::{load_config, CliOverrides, EnvMap};
use daemon::DaemonClient;
use errors::RecorderctlError;
use logging::{append_run_log, init_run_logger, JsonlLogger};
use runtime::ProductionRuntime;
use serde_json::json;
use types::OutputFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "recorderctl", version)]
#[command(about = "Inspect packet-capture recorders realized by the network-control daemon")]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
    /// Daemon API base url, e.g. http://127.0.0.1:9234
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,
    /// Append a JSONL run log to this file
    #[arg(long, global = true)]
    pub log_file: Option<std::path::PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Introspect pcap recorders
    #[command(subcommand)]
    Recorder(RecorderCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum RecorderCommand {
    /// List current pcap recorders
    #[command(visible_alias = "ls")]
    List(OutputArgs),
    /// Display a single pcap recorder
    Get {
        id: u64,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// json emits the daemon's records instead of the table
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<CliOutput>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliOutput {
    Table,
    Json,
}

impl From<CliOutput> for OutputFormat {
    fn from(value: CliOutput) -> Self {
        match value {
            CliOutput::Table => OutputFormat::Table,
            CliOutput::Json => OutputFormat::Json,
        }
    }
}

impl Command {
    fn output(&self) -> Option<OutputFormat> {
        match self {
            Command::Recorder(RecorderCommand::List(args))
            | Command::Recorder(RecorderCommand::Get { output: args, .. }) => {
                args.output.map(Into::into)
            }
        }
    }
}

pub fn run() -> Result<i32, RecorderctlError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let env = std::env::vars_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &env, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    env: &[(std::ffi::OsString, std::ffi::OsString)],
    runtime: &ProductionRuntime,
) -> Result<i32, RecorderctlError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                runtime.terminal.write_stdout(&error.to_string())?;
                return Ok(0);
            }
            _ => return Err(RecorderctlError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        host: cli.host.clone(),
        output: cli.command.output(),
        log_file: cli.log_file.clone(),
    };
    let resolved = load_config(&overrides, &env_to_map(env), runtime.file_system.as_ref())?;
    let cfg = resolved.config;

    if let Some(logger) = JsonlLogger::from_config(&cfg.logging) {
        init_run_logger(logger);
    }
    append_run_log(
        "info",
        "config.resolved",
        json!({
            "host": cfg.daemon.host,
            "host_source": resolved.host_source.as_str(),
            "timeout_seconds": cfg.daemon.timeout_seconds,
            "format": cfg.output.format.as_str(),
        }),
    );

    let client = DaemonClient::new(runtime.transport.as_ref(), &cfg.daemon);
    let terminal = runtime.terminal.as_ref();
    match cli.command {
        Command::Recorder(RecorderCommand::List(_)) => {
            commands::list_recorders(&client, cfg.output.format, terminal)?
        }
        Command::Recorder(RecorderCommand::Get { id, .. }) => {
            commands::get_recorder(&client, id, cfg.output.format, terminal)?
        }
    }

    Ok(0)
}

pub fn render_help() -> String {
    Cli::command().render_long_help().to_string()
}

fn env_to_map(env: &[(std::ffi::OsString, std::ffi::OsString)]) -> EnvMap {
    let mut map = EnvMap::new();
    for (key, value) in env {
        if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}
