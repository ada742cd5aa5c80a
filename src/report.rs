//! Session reports
//!
//! One row per experimental task with its coupling, problem size, team size
//! and elapsed times: a single team time for team problems, or one time per
//! designer for individual problems. Rendered either as the fixed-width table
//! researchers paste into spreadsheets or as JSON.

use crate::error::AnalysisError;
use crate::problem::ProblemKind;
use crate::session::Session;
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Column labels for designers 0, 1 and 2
pub const DESIGNER_LABELS: [&str; 3] = ["Red", "Green", "Blue"];

/// Report row for one experimental task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReportRow {
    pub order: usize,
    pub problem: String,
    pub kind: ProblemKind,
    pub coupled: bool,
    pub problem_size: usize,
    pub team_size: usize,
    /// Elapsed time (ms) for team problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_elapsed_ms: Option<i64>,
    /// Elapsed time (ms) per designer for individual problems
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub designer_elapsed_ms: Vec<i64>,
    /// Error norm of the last recorded action
    pub final_error_norm: Option<f64>,
}

impl TaskReportRow {
    pub fn build(session: &Session, task: &Task) -> Result<Self, AnalysisError> {
        let problem = task.problem();
        let tolerances = session.tolerances();

        let (team_elapsed_ms, designer_elapsed_ms) = if problem.is_team() {
            (Some(task.elapsed_time(tolerances, None)?), Vec::new())
        } else {
            let per_designer = (0..DESIGNER_LABELS.len())
                .map(|designer| task.elapsed_time(tolerances, Some(designer)))
                .collect::<Result<Vec<_>, _>>()?;
            (None, per_designer)
        };

        Ok(Self {
            order: task.order(),
            problem: problem.name().to_string(),
            kind: problem.kind(),
            coupled: problem.is_coupled(),
            problem_size: problem.problem_size(),
            team_size: problem.team_size(),
            team_elapsed_ms,
            designer_elapsed_ms,
            final_error_norm: task.final_error_norm(),
        })
    }
}

/// Timing report for a whole session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session: String,
    pub opened_at: Option<DateTime<Utc>>,
    pub err_tolerance: f64,
    pub num_tolerance: f64,
    pub rows: Vec<TaskReportRow>,
}

impl SessionReport {
    /// Build rows for every experimental task
    pub fn build(session: &Session) -> Result<Self, AnalysisError> {
        let rows = session
            .tasks()
            .iter()
            .map(|task| TaskReportRow::build(session, task))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            session: session.name().to_string(),
            opened_at: session
                .opened_at()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            err_tolerance: session.tolerances().err,
            num_tolerance: session.tolerances().num,
            rows,
        })
    }

    /// Fixed-width table; elapsed times in seconds
    pub fn to_table(&self) -> String {
        let mut lines = vec![self.session.clone()];
        if let Some(opened_at) = self.opened_at {
            lines.push(format!("opened = {}", opened_at.to_rfc3339()));
        }
        lines.push(format!("epsilon = {:3.2}", self.err_tolerance));
        lines.push(format!(
            "{:>3} {:>3} {:>3} {:>3} {:>10} {:>10} {:>10} {:>10}",
            "O",
            "C/U",
            "N",
            "n",
            "Team (s)",
            format!("{} (s)", DESIGNER_LABELS[0]),
            format!("{} (s)", DESIGNER_LABELS[1]),
            format!("{} (s)", DESIGNER_LABELS[2]),
        ));

        for row in &self.rows {
            let team = row.team_elapsed_ms.map(seconds).unwrap_or_default();
            let designer = |i: usize| {
                row.designer_elapsed_ms
                    .get(i)
                    .copied()
                    .map(seconds)
                    .unwrap_or_default()
            };
            lines.push(format!(
                "{:>3} {:>3} {:>3} {:>3} {:>10} {:>10} {:>10} {:>10}",
                row.order,
                if row.coupled { "C" } else { "U" },
                row.problem_size,
                row.team_size,
                team,
                designer(0),
                designer(1),
                designer(2),
            ));
        }

        let mut table = lines.join("\n");
        table.push('\n');
        table
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, AnalysisError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

fn seconds(ms: i64) -> String {
    format!("{:10.2}", ms as f64 / 1000.0)
}
