//! Error types for collab-replay

use thiserror::Error;

/// Errors that abort loading or analysing a session
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed problem '{problem}': {reason}")]
    MalformedProblem { problem: String, reason: String },

    #[error("Mis-matched sessions (log: {logged}, loaded: {loaded})")]
    SessionMismatch { logged: String, loaded: String },

    #[error("Missing task problem: {0}")]
    UnknownProblem(String),

    #[error("Task not initialized at time {time}")]
    TaskNotInitialized { time: i64 },

    #[error("No initial action for problem '{problem}' (designer {designer})")]
    NoInitialAction { problem: String, designer: String },

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(f64),

    #[error("Failed to parse log line {line}: {reason}")]
    LogParse { line: usize, reason: String },

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn malformed(problem: &str, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedProblem {
            problem: problem.to_string(),
            reason: reason.into(),
        }
    }
}
