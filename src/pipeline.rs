//! Pipeline orchestration
//!
//! This module provides the public API for loading a session. It parses the
//! problem-definition file into tasks and then replays the event log into
//! them:
//!
//! 1. Session definition → [`Session`] with training and experimental tasks
//! 2. Optional strict validation of channel assignments
//! 3. Log text → [`LogEvent`]s
//! 4. Ingestion → actions and task timestamps
//! 5. Registry omissions (registered sessions only)

use crate::config::SessionRegistry;
use crate::error::AnalysisError;
use crate::eventlog::{ingest, parse_log, IngestSummary, LogEvent};
use crate::session::{Session, Tolerances};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load a session from a problem file and a log file with default settings.
///
/// # Example
/// ```ignore
/// let session = analyze_files("experiment.json".as_ref(), "session.log".as_ref())?;
/// for task in session.tasks() {
///     println!("{}: {:?}", task.order(), task.elapsed_time(session.tolerances(), None));
/// }
/// ```
pub fn analyze_files(json_path: &Path, log_path: &Path) -> Result<Session, AnalysisError> {
    SessionLoader::new().load_files(json_path, log_path)
}

/// Configurable session loader
#[derive(Debug, Clone, Default)]
pub struct SessionLoader {
    tolerances: Tolerances,
    strict: bool,
}

impl SessionLoader {
    /// Create a loader with default tolerances and lenient validation
    pub fn new() -> Self {
        Self::default()
    }

    /// Tolerances used when the problem file does not set its own
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Reject problems whose channels are not each assigned to exactly one
    /// designer
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load from in-memory problem JSON and log text
    pub fn load_str(&self, problem_json: &str, log_text: &str) -> Result<Session, AnalysisError> {
        self.load_str_with_summary(problem_json, log_text)
            .map(|(session, _)| session)
    }

    /// Like [`SessionLoader::load_str`], also returning ingestion counts
    pub fn load_str_with_summary(
        &self,
        problem_json: &str,
        log_text: &str,
    ) -> Result<(Session, IngestSummary), AnalysisError> {
        let mut session = Session::from_json(problem_json, self.tolerances)?;
        if self.strict {
            session.validate_assignments()?;
        }
        debug!(
            session = session.name(),
            training = session.training_tasks().len(),
            experiment = session.tasks().len(),
            "parsed problem definitions"
        );

        let events: Vec<LogEvent> = parse_log(log_text)?;
        let summary = ingest(&mut session, &events)?;
        Ok((session, summary))
    }

    /// Load from a problem file and a log file
    pub fn load_files(&self, json_path: &Path, log_path: &Path) -> Result<Session, AnalysisError> {
        self.load_files_with_summary(json_path, log_path)
            .map(|(session, _)| session)
    }

    pub fn load_files_with_summary(
        &self,
        json_path: &Path,
        log_path: &Path,
    ) -> Result<(Session, IngestSummary), AnalysisError> {
        debug!(json = %json_path.display(), log = %log_path.display(), "loading session files");
        let problem_json = fs::read_to_string(json_path)?;
        let log_text = fs::read_to_string(log_path)?;
        self.load_str_with_summary(&problem_json, &log_text)
    }

    /// Load a session registered under `name`, resolving its files under
    /// `<root>/<name>/` and dropping its omitted experimental tasks.
    ///
    /// Registry tolerances replace this loader's defaults.
    pub fn load_registered(
        &self,
        registry: &SessionRegistry,
        root: &Path,
        name: &str,
    ) -> Result<(Session, IngestSummary), AnalysisError> {
        let entry = registry.find(name)?;
        let loader = self
            .clone()
            .with_tolerances(entry.tolerances(self.tolerances)?);

        let (mut session, summary) =
            loader.load_files_with_summary(&entry.json_path(root), &entry.log_path(root))?;
        let omitted = session.omit_tasks(&entry.omitted_tasks);
        if omitted > 0 {
            info!(session = name, omitted, "omitted registered tasks");
        }
        Ok((session, summary))
    }
}
