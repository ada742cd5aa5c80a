//! Replay CLI - Command-line interface for collab-replay
//!
//! Commands:
//! - report: Load a session and print its task timing report
//! - validate: Load a session and summarise what ingestion found

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use collab_replay::config::{SessionRegistry, DEFAULT_REGISTRY_FILE};
use collab_replay::eventlog::IngestSummary;
use collab_replay::pipeline::SessionLoader;
use collab_replay::report::SessionReport;
use collab_replay::session::{Session, Tolerances};
use collab_replay::{AnalysisError, REPLAY_VERSION};

/// Replay - post-process collaborative design experiment sessions
#[derive(Parser)]
#[command(name = "replay")]
#[command(version = REPLAY_VERSION)]
#[command(about = "Derive task timing metrics from design experiment logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the task timing report for a session
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, default_value = "table")]
        format: ReportFormat,
    },

    /// Load a session and summarise its tasks and log
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Experiment root file path
    #[arg(short, long, requires = "session")]
    root: Option<PathBuf>,

    /// Experiment session name
    #[arg(short, long, requires = "root")]
    session: Option<String>,

    /// Session registry file
    #[arg(long, default_value = DEFAULT_REGISTRY_FILE)]
    config: PathBuf,

    /// Experiment json file path
    #[arg(short, long, conflicts_with = "root", requires = "log")]
    json: Option<PathBuf>,

    /// Experiment log file path (use - for stdin)
    #[arg(short, long, conflicts_with = "root", requires = "json")]
    log: Option<PathBuf>,

    /// Error tolerance, used when the problem file sets none
    #[arg(short = 'e', long)]
    err_tol: Option<f64>,

    /// Numerical tolerance, used when the problem file sets none
    #[arg(short = 'n', long)]
    num_tol: Option<f64>,

    /// Require every channel to be assigned to exactly one designer
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    /// Fixed-width table
    Table,
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("collab_replay=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ReplayCliError> {
    match cli.command {
        Commands::Report { source, format } => cmd_report(&source, format),
        Commands::Validate { source, json } => cmd_validate(&source, json),
    }
}

fn cmd_report(source: &SourceArgs, format: ReportFormat) -> Result<(), ReplayCliError> {
    let (session, _) = load_session(source)?;
    let report = SessionReport::build(&session)?;

    let output = match format {
        ReportFormat::Table => report.to_table(),
        ReportFormat::Json => report.to_json(false)? + "\n",
        ReportFormat::JsonPretty => report.to_json(true)? + "\n",
    };
    print!("{}", output);
    Ok(())
}

fn cmd_validate(source: &SourceArgs, json: bool) -> Result<(), ReplayCliError> {
    let (session, ingest) = load_session(source)?;

    let summary = ValidationSummary {
        session: session.name().to_string(),
        err_tolerance: session.tolerances().err,
        num_tolerance: session.tolerances().num,
        training_tasks: session.training_tasks().len(),
        experiment_tasks: session.tasks().len(),
        unsolved_tasks: session
            .all_tasks()
            .filter(|task| task.solved_at() == 0)
            .map(|task| task.problem().name().to_string())
            .collect(),
        ingest,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Session: {}", summary.session);
        println!(
            "Tolerances: err={} num={}",
            summary.err_tolerance, summary.num_tolerance
        );
        println!(
            "Tasks: {} training, {} experimental",
            summary.training_tasks, summary.experiment_tasks
        );
        println!(
            "Log: {} events, {} actions, {} skipped, {} ignored",
            summary.ingest.events,
            summary.ingest.actions,
            summary.ingest.skipped,
            summary.ingest.ignored
        );
        for name in &summary.unsolved_tasks {
            println!("  no solved event: {}", name);
        }
    }
    Ok(())
}

fn load_session(source: &SourceArgs) -> Result<(Session, IngestSummary), ReplayCliError> {
    let defaults = Tolerances::default();
    let tolerances = Tolerances::new(
        source.err_tol.unwrap_or(defaults.err),
        source.num_tol.unwrap_or(defaults.num),
    )?;
    let loader = SessionLoader::new()
        .with_tolerances(tolerances)
        .strict(source.strict);

    match (&source.root, &source.session, &source.json, &source.log) {
        (Some(root), Some(session), _, _) => {
            let registry = SessionRegistry::load(&source.config)?;
            Ok(loader.load_registered(&registry, root, session)?)
        }
        (_, _, Some(json), Some(log)) if log.as_path() == Path::new("-") => {
            let problem_json = std::fs::read_to_string(json)?;
            Ok(loader.load_str_with_summary(&problem_json, &read_stdin()?)?)
        }
        (_, _, Some(json), Some(log)) => Ok(loader.load_files_with_summary(json, log)?),
        _ => Err(ReplayCliError::MissingSource),
    }
}

fn read_stdin() -> Result<String, ReplayCliError> {
    if atty::is(atty::Stream::Stdin) {
        warn!("reading experiment log from terminal; end input with Ctrl-D");
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

// Error types

#[derive(Debug)]
enum ReplayCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    MissingSource,
}

impl From<io::Error> for ReplayCliError {
    fn from(e: io::Error) -> Self {
        ReplayCliError::Io(e)
    }
}

impl From<AnalysisError> for ReplayCliError {
    fn from(e: AnalysisError) -> Self {
        ReplayCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for ReplayCliError {
    fn from(e: serde_json::Error) -> Self {
        ReplayCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ReplayCliError> for CliError {
    fn from(e: ReplayCliError) -> Self {
        match e {
            ReplayCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ReplayCliError::Analysis(e) => {
                let (code, hint) = analysis_code(&e);
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            ReplayCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ReplayCliError::MissingSource => CliError {
                code: "MISSING_SOURCE".to_string(),
                message: "No session given".to_string(),
                hint: Some("Pass --root and --session, or --json and --log".to_string()),
            },
        }
    }
}

fn analysis_code(e: &AnalysisError) -> (&'static str, Option<&'static str>) {
    match e {
        AnalysisError::MalformedProblem { .. } => (
            "MALFORMED_PROBLEM",
            Some("Check matrix, target and index dimensions in the problem file"),
        ),
        AnalysisError::SessionMismatch { .. } => (
            "SESSION_MISMATCH",
            Some("The log was recorded for a different session"),
        ),
        AnalysisError::UnknownProblem(_) => (
            "UNKNOWN_PROBLEM",
            Some("The log initializes a problem missing from the problem file"),
        ),
        AnalysisError::TaskNotInitialized { .. } => ("TASK_NOT_INITIALIZED", None),
        AnalysisError::NoInitialAction { .. } => (
            "NO_INITIAL_ACTION",
            Some("Omit the task in the session registry if it was never worked"),
        ),
        AnalysisError::InvalidTolerance(_) => (
            "INVALID_TOLERANCE",
            Some("Tolerances must be finite and non-negative"),
        ),
        AnalysisError::LogParse { .. } => ("LOG_PARSE_ERROR", Some("Check the log file format")),
        AnalysisError::UnknownSession(_) => (
            "UNKNOWN_SESSION",
            Some("Check the session name against the registry file"),
        ),
        AnalysisError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
        AnalysisError::IoError(_) => ("IO_ERROR", Some("Check file paths and permissions")),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationSummary {
    session: String,
    err_tolerance: f64,
    num_tolerance: f64,
    training_tasks: usize,
    experiment_tasks: usize,
    unsolved_tasks: Vec<String>,
    ingest: IngestSummary,
}
