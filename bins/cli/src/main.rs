//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use bundle_sync_infra::{ConfigOutputFormat, ErrorEnvelope, collect_scoped_env, redact_if_secret};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{
    SyncCommandInput, run_config_print, run_decode_path, run_encode_path, run_hash, run_sync,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode, pretty_json_line};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Env var holding the `tracing` filter for diagnostic output.
const LOG_FILTER_ENV: &str = "BUNDLE_SYNC_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "bundle-sync",
    version,
    about = "Content-addressed bundle sync client",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload a directory to the remote bundle store.
    Sync {
        /// Directory to upload.
        #[arg(long)]
        root: PathBuf,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Organization sent with every request.
        #[arg(long)]
        org: Option<String>,
        /// Code API base URL override.
        #[arg(long)]
        base_url: Option<String>,
        /// File to report as changed (repeatable).
        #[arg(long = "changed", value_name = "PATH")]
        changed: Vec<PathBuf>,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print the content hash of a file.
    Hash {
        /// File to hash.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Encode a relative path as a bundle key.
    EncodePath {
        /// Path to encode.
        #[arg(value_name = "PATH")]
        path: String,
        /// Resolve `PATH` against this root first.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Decode a bundle key back to a relative path.
    DecodePath {
        /// Bundle key to decode.
        #[arg(value_name = "PATH")]
        path: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective config after env and file overrides.
    Print {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Serialization of the printed config.
        #[arg(long, value_enum, default_value_t = ConfigFormatArg::Json)]
        format: ConfigFormatArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigFormatArg {
    Json,
    Toml,
}

impl From<ConfigFormatArg> for ConfigOutputFormat {
    fn from(value: ConfigFormatArg) -> Self {
        match value {
            ConfigFormatArg::Json => Self::Json,
            ConfigFormatArg::Toml => Self::Toml,
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(mode, &error),
        },
        Err(error) => exit_with_error(mode, &error),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_with_error(mode: OutputMode, error: &CliError) -> std::process::ExitCode {
    if mode.is_json()
        && let Ok(payload) = format_error_json(error)
    {
        let _ = io::stdout().write_all(payload.as_bytes());
    }
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Sync {
            root,
            config,
            org,
            base_url,
            changed,
        } => run_sync(
            mode,
            &SyncCommandInput {
                config_path: config.as_deref(),
                organization: org.as_deref(),
                base_url: base_url.as_deref(),
                root,
                changed,
            },
        ),
        Commands::Config { command } => match command {
            ConfigCommands::Print { config, format } => {
                let env = collect_scoped_env();
                run_config_print(&env, config.as_deref(), (*format).into())
            },
        },
        Commands::Hash { file } => run_hash(mode, file),
        Commands::EncodePath { path, root } => run_encode_path(mode, path, root.as_deref()),
        Commands::DecodePath { path } => run_decode_path(mode, path),
    }
}

fn format_error_json(error: &CliError) -> Result<String, serde_json::Error> {
    let payload = match error {
        CliError::Envelope(envelope) => serde_json::json!({
            "status": "error",
            "error": envelope_payload(envelope),
        }),
        other => serde_json::json!({
            "status": "error",
            "error": { "message": other.to_string() },
        }),
    };
    pretty_json_line(&payload)
}

fn envelope_payload(envelope: &ErrorEnvelope) -> serde_json::Value {
    let metadata: serde_json::Map<String, serde_json::Value> = envelope
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), redact_if_secret(key, value).into()))
        .collect();
    serde_json::json!({
        "code": envelope.code.to_string(),
        "message": envelope.message,
        "kind": envelope.kind.to_string(),
        "metadata": metadata,
    })
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
