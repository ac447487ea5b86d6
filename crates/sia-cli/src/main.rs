// crates/sia-cli/src/main.rs
// ============================================================================
// Module: SIA Options CLI Entry Point
// Description: Command dispatcher for options resolution and run-as checks.
// Purpose: Resolve agent options on a host and print them as JSON.
// Dependencies: clap, serde, serde_json, sia-config, sia-options, thiserror
// ============================================================================

//! ## Overview
//! `sia-options resolve` runs the same bootstrap the agent runs at startup
//! and prints the resolved options. `sia-options runs-as` prints the
//! privilege decision derived from them. Any resolution failure exits
//! non-zero with the error on stderr; audit events go to stderr or to the
//! file named by `--audit-log`.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use sia_config::EnvSnapshot;
use sia_config::build_env_config;
use sia_options::DEFAULT_ROLE_SUFFIX;
use sia_options::FileAuditSink;
use sia_options::HttpMetadataClient;
use sia_options::IdentityLookup;
use sia_options::MetadataClientConfig;
use sia_options::Options;
use sia_options::OsIdentityLookup;
use sia_options::PrivilegeDrop;
use sia_options::ResolutionAuditEvent;
use sia_options::ResolutionAuditSink;
use sia_options::ResolutionStage;
use sia_options::RegionSettings;
use sia_options::ResolveRequest;
use sia_options::StderrAuditSink;
use sia_options::apply_region;
use sia_options::load_access_profile;
use sia_options::load_account_config;
use sia_options::metadata::DEFAULT_METADATA_ENDPOINT;
use sia_options::resolve_options;
use sia_options::runs_as;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config file location.
const DEFAULT_CONFIG_PATH: &str = "/etc/sia/sia_config";
/// Default agent working directory.
const DEFAULT_SIA_DIR: &str = "/var/lib/sia";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sia-options", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve options and print them as JSON.
    Resolve(SourceArgs),
    /// Resolve options and print the run-as decision.
    RunsAs(SourceArgs),
}

/// Configuration source arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Config file path.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Access-profile file path; no profile is loaded when omitted.
    #[arg(long = "profile-config", value_name = "PATH")]
    profile_config: Option<PathBuf>,
    /// Build the config from `ATHENZ_SIA_*` variables instead of the file.
    #[arg(long = "from-env", action = ArgAction::SetTrue)]
    from_env: bool,
    /// Agent working directory.
    #[arg(long = "sia-dir", value_name = "DIR", default_value = DEFAULT_SIA_DIR)]
    sia_dir: PathBuf,
    /// Instance metadata endpoint.
    #[arg(long = "meta-endpoint", value_name = "URL", default_value = DEFAULT_METADATA_ENDPOINT)]
    meta_endpoint: String,
    /// Enable regional STS regardless of the config.
    #[arg(long = "regional-sts", action = ArgAction::SetTrue)]
    regional_sts: bool,
    /// Host region used as the ZTS region under regional STS.
    #[arg(long, value_name = "REGION")]
    region: Option<String>,
    /// Suffix trimmed from instance profile role names.
    #[arg(long = "role-suffix", value_name = "SUFFIX", default_value = DEFAULT_ROLE_SUFFIX)]
    role_suffix: String,
    /// Append audit events to this file instead of stderr.
    #[arg(long = "audit-log", value_name = "PATH")]
    audit_log: Option<PathBuf>,
}

/// Run-as command output.
#[derive(Debug, Serialize)]
struct RunsAsOutput {
    /// Privilege decision.
    decision: PrivilegeDrop,
    /// Raw uid, `-1` when privileges are retained.
    uid: i64,
    /// Raw gid, `-1` when privileges are retained.
    gid: i64,
}

impl From<PrivilegeDrop> for RunsAsOutput {
    fn from(decision: PrivilegeDrop) -> Self {
        let (uid, gid) = decision.as_raw_pair();
        Self {
            decision,
            uid,
            gid,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Resolve(args) => {
            let options = load_options(&args, &OsIdentityLookup)?;
            write_json(&options)?;
        }
        Commands::RunsAs(args) => {
            let options = load_options(&args, &OsIdentityLookup)?;
            write_json(&RunsAsOutput::from(runs_as(&options)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Runs the bootstrap and resolves options for the given sources.
fn load_options(args: &SourceArgs, identity: &dyn IdentityLookup) -> CliResult<Options> {
    let audit = build_audit_sink(args)?;
    let metadata = HttpMetadataClient::new(MetadataClientConfig {
        endpoint: args.meta_endpoint.clone(),
        ..MetadataClientConfig::default()
    })
    .map_err(|err| CliError::new(err.to_string()))?;
    let region = RegionSettings {
        use_regional_sts: args.regional_sts,
        region: args.region.as_deref(),
    };

    let (config, account) = if args.from_env {
        let (mut config, account) = build_env_config(&EnvSnapshot::capture(), None)
            .map_err(|err| {
                reject(audit.as_ref(), ResolutionStage::AccountConfig, &err.to_string())
            })?;
        apply_region(&mut config, region);
        (Some(config), account)
    } else {
        load_account_config(&args.config, &metadata, region, &args.role_suffix, audit.as_ref())
            .map_err(|err| CliError::new(err.to_string()))?
    };

    let profile = match &args.profile_config {
        Some(path) => load_access_profile(path, &metadata, &args.role_suffix, audit.as_ref())
            .map_err(|err| CliError::new(err.to_string()))?,
        None => None,
    };

    let request = ResolveRequest {
        config: config.as_ref(),
        account: &account,
        profile: profile.as_ref(),
        sia_dir: &args.sia_dir,
        version: env!("CARGO_PKG_VERSION"),
    };
    let options = resolve_options(&request, identity)
        .map_err(|err| reject(audit.as_ref(), ResolutionStage::Options, &err.to_string()))?;
    audit.record(&ResolutionAuditEvent::options_resolved(options.name.clone()));
    Ok(options)
}

/// Selects the audit sink for the run.
fn build_audit_sink(args: &SourceArgs) -> CliResult<Box<dyn ResolutionAuditSink>> {
    match &args.audit_log {
        Some(path) => {
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(format!("unable to open audit log {}: {err}", path.display()))
            })?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(StderrAuditSink)),
    }
}

/// Records a rejection and wraps it as a CLI error.
fn reject(audit: &dyn ResolutionAuditSink, stage: ResolutionStage, detail: &str) -> CliError {
    audit.record(&ResolutionAuditEvent::options_rejected(stage, detail));
    CliError::new(detail.to_string())
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a value to stdout as pretty JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("unable to encode output: {err}")))?;
    write_stdout_line(&payload)
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
