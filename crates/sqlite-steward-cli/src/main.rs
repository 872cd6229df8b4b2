// crates/sqlite-steward-cli/src/main.rs
// ============================================================================
// Module: SQLite Steward CLI Entry Point
// Description: Command dispatcher for SQLite stewardship operations.
// Purpose: Map declarative options onto core requests and emit JSON result
//          records for the invoking framework.
// Dependencies: clap, serde, serde_json, sqlite-steward-core, thiserror
// ============================================================================

//! ## Overview
//! The SQLite Steward CLI exposes the core operations as subcommands. Each
//! subcommand parses declarative options into a core request, runs it, and
//! prints one JSON result record on stdout. Any failure surfaces as a
//! single normalized message on stderr with a failure exit code; no
//! stack-trace-shaped detail crosses the boundary. All user-facing strings
//! are routed through the i18n catalog to prepare for future localization.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlite_steward_cli::i18n::Locale;
use sqlite_steward_cli::i18n::set_locale;
use sqlite_steward_cli::t;
use sqlite_steward_core::BackupOperation;
use sqlite_steward_core::BackupRequest;
use sqlite_steward_core::ColumnSpec;
use sqlite_steward_core::DatabaseRequest;
use sqlite_steward_core::FetchMode;
use sqlite_steward_core::MaintenanceOptions;
use sqlite_steward_core::PerformanceOptions;
use sqlite_steward_core::QueryRequest;
use sqlite_steward_core::RotationPolicy;
use sqlite_steward_core::TableRequest;
use sqlite_steward_core::TargetState;
use sqlite_steward_core::TimeoutPolicy;
use sqlite_steward_core::execute_query;
use sqlite_steward_core::manage_database;
use sqlite_steward_core::manage_table;
use sqlite_steward_core::run_backup;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "SQLITE_STEWARD_LANG";
/// Default execution deadline in seconds for the query subcommand.
const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sqlite-steward", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `SQLITE_STEWARD_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute SQL statements against a database file.
    Query(QueryCommand),
    /// Create, remove, or tune a database file.
    Db(DbCommand),
    /// Create, drop, or inspect a table.
    Table(TableCommand),
    /// Back up, restore, or verify a database file.
    Backup(BackupCommand),
}

/// Locale values accepted by `--lang`.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Fetch policies accepted by `--fetch`.
#[derive(ValueEnum, Copy, Clone, Debug, Default)]
enum FetchArg {
    /// Fetch every row.
    #[default]
    All,
    /// Fetch a single row when present.
    One,
    /// Fetch nothing.
    None,
}

impl From<FetchArg> for FetchMode {
    fn from(value: FetchArg) -> Self {
        match value {
            FetchArg::All => Self::All,
            FetchArg::One => Self::One,
            FetchArg::None => Self::None,
        }
    }
}

/// Presence states accepted by `--state`.
#[derive(ValueEnum, Copy, Clone, Debug, Default)]
enum StateArg {
    /// The entity should exist.
    #[default]
    Present,
    /// The entity should not exist.
    Absent,
}

impl From<StateArg> for TargetState {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
        }
    }
}

/// Backup operations accepted by `--operation`.
#[derive(ValueEnum, Copy, Clone, Debug, Default)]
enum OperationArg {
    /// Copy the source database to the destination.
    #[default]
    Backup,
    /// Copy a backup file back into place.
    Restore,
    /// Integrity-check the source file.
    Verify,
}

impl From<OperationArg> for BackupOperation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Backup => Self::Backup,
            OperationArg::Restore => Self::Restore,
            OperationArg::Verify => Self::Verify,
        }
    }
}

/// Arguments for the `query` subcommand.
#[derive(Args, Debug)]
struct QueryCommand {
    /// Path to the SQLite database file.
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
    /// SQL text to execute; semicolons separate multiple statements.
    #[arg(long, value_name = "SQL")]
    query: String,
    /// Positional bind parameter, JSON-interpreted with a plain-string
    /// fallback. Repeatable; not allowed with multiple statements.
    #[arg(long = "param", value_name = "VALUE")]
    params: Vec<String>,
    /// Row-fetch policy for result sets.
    #[arg(long, value_enum, default_value_t = FetchArg::All)]
    fetch: FetchArg,
    /// Execute without a wrapping transaction.
    #[arg(long, action = ArgAction::SetTrue)]
    no_transaction: bool,
    /// Execution deadline in seconds (0 = unbounded).
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: f64,
    /// Pragma override applied at connection setup. Repeatable.
    #[arg(long = "pragma", value_name = "NAME=VALUE")]
    pragmas: Vec<String>,
}

/// Arguments for the `db` subcommand.
#[derive(Args, Debug)]
struct DbCommand {
    /// Path to the SQLite database file.
    #[arg(long, value_name = "PATH")]
    path: PathBuf,
    /// Whether the database file should exist.
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    state: StateArg,
    /// File permission bits as an octal string (e.g. 0640).
    #[arg(long, value_name = "OCTAL")]
    mode: Option<String>,
    /// Create a timestamped backup before making changes.
    #[arg(long, action = ArgAction::SetTrue)]
    backup: bool,
    /// Run VACUUM to reclaim space.
    #[arg(long, action = ArgAction::SetTrue)]
    vacuum: bool,
    /// Run ANALYZE to refresh query planner statistics.
    #[arg(long, action = ArgAction::SetTrue)]
    analyze: bool,
    /// Run the integrity-check pragma.
    #[arg(long, action = ArgAction::SetTrue)]
    integrity_check: bool,
    /// Journal mode (DELETE, TRUNCATE, PERSIST, MEMORY, WAL, OFF).
    #[arg(long, value_name = "MODE")]
    journal_mode: Option<String>,
    /// Synchronous mode (0=OFF, 1=NORMAL, 2=FULL, 3=EXTRA).
    #[arg(long, value_name = "LEVEL")]
    synchronous: Option<u8>,
    /// Cache size (negative for KiB, positive for pages).
    #[arg(long, value_name = "SIZE", allow_hyphen_values = true)]
    cache_size: Option<i64>,
    /// Temp store mode (0=DEFAULT, 1=FILE, 2=MEMORY).
    #[arg(long, value_name = "MODE")]
    temp_store: Option<u8>,
    /// Disable foreign-key constraint enforcement.
    #[arg(long, action = ArgAction::SetTrue)]
    no_foreign_keys: bool,
    /// Report the would-be change without applying it.
    #[arg(long, action = ArgAction::SetTrue)]
    check: bool,
}

/// Arguments for the `table` subcommand.
#[derive(Args, Debug)]
struct TableCommand {
    /// Path to the SQLite database file.
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
    /// Name of the table to manage.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Whether the table should exist.
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    state: StateArg,
    /// Column definition as NAME:TYPE[:CONSTRAINTS]. Repeatable.
    #[arg(long = "column", value_name = "SPEC")]
    columns: Vec<String>,
    /// Create without IF NOT EXISTS.
    #[arg(long, action = ArgAction::SetTrue)]
    no_if_not_exists: bool,
    /// Gather column metadata, row count, and schema text.
    #[arg(long, action = ArgAction::SetTrue)]
    gather_info: bool,
    /// Report the would-be change without applying it.
    #[arg(long, action = ArgAction::SetTrue)]
    check: bool,
}

/// Arguments for the `backup` subcommand.
#[derive(Args, Debug)]
struct BackupCommand {
    /// Source file path.
    #[arg(long, value_name = "PATH")]
    src: PathBuf,
    /// Destination file path.
    #[arg(long, value_name = "PATH")]
    dest: PathBuf,
    /// Operation to perform.
    #[arg(long, value_enum, default_value_t = OperationArg::Backup)]
    operation: OperationArg,
    /// Gzip-compress the backup.
    #[arg(long, action = ArgAction::SetTrue)]
    compress: bool,
    /// Overwrite an existing destination file.
    #[arg(long, action = ArgAction::SetTrue)]
    overwrite: bool,
    /// Skip post-backup verification.
    #[arg(long, action = ArgAction::SetTrue)]
    no_verify: bool,
    /// Use the engine's online backup API instead of a file copy.
    #[arg(long, action = ArgAction::SetTrue)]
    incremental: bool,
    /// Directory plus file-name prefix identifying rotatable backups.
    #[arg(long, value_name = "PATTERN")]
    rotate_pattern: Option<String>,
    /// Number of matching backups to keep during rotation.
    #[arg(long, value_name = "COUNT")]
    rotate_keep: Option<usize>,
    /// Record a SHA-256 checksum of the destination.
    #[arg(long, action = ArgAction::SetTrue)]
    checksum: bool,
    /// Report the would-be change without applying it.
    #[arg(long, action = ArgAction::SetTrue)]
    check: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Query(command) => command_query(command),
        Commands::Db(command) => command_db(command),
        Commands::Table(command) => command_table(command),
        Commands::Backup(command) => command_backup(command),
    }
}

/// Resolves the output locale from the CLI flag and the environment.
fn resolve_locale(flag: Option<LangArg>, env_value: Option<&str>) -> CliResult<Locale> {
    if let Some(flag) = flag {
        return Ok(flag.into());
    }
    let Some(value) = env_value else {
        return Ok(Locale::En);
    };
    Locale::parse(value).ok_or_else(|| {
        CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
    })
}

/// Prints top-level CLI help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Query Command
// ============================================================================

/// Executes the `query` subcommand.
fn command_query(command: QueryCommand) -> CliResult<ExitCode> {
    let mut request = QueryRequest::new(command.db, command.query);
    request.parameters = command.params.iter().map(|value| parse_param(value)).collect();
    request.fetch = command.fetch.into();
    request.transaction = !command.no_transaction;
    request.timeout = parse_timeout(command.timeout)?;
    for value in &command.pragmas {
        let (name, pragma_value) = parse_pragma_override(value)?;
        request.settings.override_pragma(name, pragma_value);
    }
    let outcome = execute_query(&request).map_err(|err| CliError::new(err.to_string()))?;
    emit_json(&outcome)?;
    Ok(ExitCode::SUCCESS)
}

/// Interprets one `--param` value as JSON, falling back to a plain string.
fn parse_param(value: &str) -> JsonValue {
    serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()))
}

/// Parses one `--pragma NAME=VALUE` override.
fn parse_pragma_override(value: &str) -> CliResult<(String, String)> {
    let invalid = || CliError::new(t!("query.pragma.invalid", value = value));
    let (name, pragma_value) = value.split_once('=').ok_or_else(invalid)?;
    if name.trim().is_empty() || pragma_value.trim().is_empty() {
        return Err(invalid());
    }
    Ok((name.trim().to_string(), pragma_value.trim().to_string()))
}

/// Converts the `--timeout` seconds value into a deadline policy.
fn parse_timeout(seconds: f64) -> CliResult<TimeoutPolicy> {
    Duration::try_from_secs_f64(seconds)
        .map(TimeoutPolicy::new)
        .map_err(|_| CliError::new(t!("query.timeout.invalid", value = seconds)))
}

// ============================================================================
// SECTION: Db Command
// ============================================================================

/// Executes the `db` subcommand.
fn command_db(command: DbCommand) -> CliResult<ExitCode> {
    let mut request = DatabaseRequest::new(command.path);
    request.state = command.state.into();
    request.mode = command.mode.as_deref().map(parse_mode).transpose()?;
    request.backup_before = command.backup;
    request.maintenance = MaintenanceOptions {
        vacuum: command.vacuum,
        analyze: command.analyze,
        integrity_check: command.integrity_check,
    };
    request.performance = PerformanceOptions {
        journal_mode: command.journal_mode,
        synchronous: command.synchronous,
        cache_size: command.cache_size,
        temp_store: command.temp_store,
    };
    request.foreign_keys = !command.no_foreign_keys;
    request.check_mode = command.check;
    let report = manage_database(&request).map_err(|err| CliError::new(err.to_string()))?;
    emit_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses an octal file mode string such as `0640`.
fn parse_mode(value: &str) -> CliResult<u32> {
    let trimmed = value.trim().trim_start_matches("0o");
    u32::from_str_radix(trimmed, 8)
        .map_err(|_| CliError::new(t!("db.mode.invalid", value = value)))
}

// ============================================================================
// SECTION: Table Command
// ============================================================================

/// Executes the `table` subcommand.
fn command_table(command: TableCommand) -> CliResult<ExitCode> {
    let mut request = TableRequest::new(command.db, command.name);
    request.state = command.state.into();
    request.columns = command
        .columns
        .iter()
        .map(|spec| parse_column_spec(spec))
        .collect::<CliResult<Vec<_>>>()?;
    request.if_not_exists = !command.no_if_not_exists;
    request.gather_info = command.gather_info;
    request.check_mode = command.check;
    let report = manage_table(&request).map_err(|err| CliError::new(err.to_string()))?;
    emit_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses one `--column NAME:TYPE[:CONSTRAINTS]` definition.
fn parse_column_spec(value: &str) -> CliResult<ColumnSpec> {
    let invalid = || CliError::new(t!("table.column.invalid", value = value));
    let mut parts = value.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim();
    let column_type = parts.next().unwrap_or("").trim();
    if name.is_empty() || column_type.is_empty() {
        return Err(invalid());
    }
    let constraints = parts.next().map(str::trim).filter(|text| !text.is_empty());
    Ok(ColumnSpec {
        name: name.to_string(),
        column_type: column_type.to_string(),
        constraints: constraints.map(ToString::to_string),
    })
}

// ============================================================================
// SECTION: Backup Command
// ============================================================================

/// Executes the `backup` subcommand.
fn command_backup(command: BackupCommand) -> CliResult<ExitCode> {
    let mut request = BackupRequest::new(command.src, command.dest);
    request.operation = command.operation.into();
    request.compress = command.compress;
    request.overwrite = command.overwrite;
    request.verify_backup = !command.no_verify;
    request.incremental = command.incremental;
    request.rotation = parse_rotation(command.rotate_pattern, command.rotate_keep)?;
    request.checksum = command.checksum;
    request.check_mode = command.check;
    let report = run_backup(&request).map_err(|err| CliError::new(err.to_string()))?;
    emit_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the rotation policy from the paired rotation flags.
fn parse_rotation(
    pattern: Option<String>,
    keep: Option<usize>,
) -> CliResult<Option<RotationPolicy>> {
    let Some(pattern) = pattern else {
        if keep.is_some() {
            return Err(CliError::new(t!("backup.rotate.pattern_required")));
        }
        return Ok(None);
    };
    let keep_count = keep.unwrap_or(5);
    if keep_count == 0 {
        return Err(CliError::new(t!("backup.rotate.keep_invalid")));
    }
    Ok(Some(RotationPolicy {
        keep_count,
        pattern,
    }))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Serializes a result record to a single JSON line on stdout.
fn emit_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
