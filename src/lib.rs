//! collab-replay - Post-processing for collaborative design experiments
//!
//! Reconstructs what happened in an experiment session from two artifacts:
//! the problem-definition file the manager loaded, and the event log it wrote.
//! The pipeline is: problem definitions → tasks → log replay → per-task
//! initial, completion and elapsed times, individually or per team.
//!
//! ## Modules
//!
//! - **Model**: [`problem`], [`action`], [`task`], [`session`]
//! - **Ingestion**: [`eventlog`] parses the log and replays it into tasks
//! - **Loading**: [`pipeline`] and the [`config`] session registry
//! - **Reporting**: [`report`] renders timing tables and JSON

pub mod action;
pub mod config;
pub mod error;
pub mod eventlog;
pub mod pipeline;
pub mod problem;
pub mod report;
pub mod session;
pub mod task;

pub use action::Action;
pub use error::AnalysisError;
pub use pipeline::{analyze_files, SessionLoader};
pub use problem::{DesignerId, Problem, ProblemDefinition, ProblemKind};
pub use report::{SessionReport, TaskReportRow};
pub use session::{Session, SessionDefinition, Tolerances};
pub use task::Task;

/// Crate version reported by the CLI
pub const REPLAY_VERSION: &str = env!("CARGO_PKG_VERSION");
