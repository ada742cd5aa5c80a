//! Experiment log lines
//!
//! The experiment manager appends one `time,eventType,content` line per event.
//! `initialized` and `updated` events carry structured content:
//!
//! ```text
//! 1005,initialized,name="P1"; target={1.00000; 2.00000}
//! 1010,updated,input={1.00; 1.00}; output={1.00000; 2.00000}
//! ```

use crate::error::AnalysisError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;

/// Event types written by the experiment manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Opened,
    Initialized,
    Updated,
    Solved,
    /// Any other label (e.g. `comment`), ignored by ingestion
    #[serde(untagged)]
    Other(String),
}

impl EventKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "opened" => EventKind::Opened,
            "initialized" => EventKind::Initialized,
            "updated" => EventKind::Updated,
            "solved" => EventKind::Solved,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Opened => "opened",
            EventKind::Initialized => "initialized",
            EventKind::Updated => "updated",
            EventKind::Solved => "solved",
            EventKind::Other(label) => label.as_str(),
        }
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Timestamp (milliseconds)
    pub time: i64,
    pub kind: EventKind,
    /// Raw content field, may be empty
    pub content: String,
}

impl LogEvent {
    pub fn new(time: i64, kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            content: content.into(),
        }
    }

    /// Parse one line; blank lines yield `None`.
    ///
    /// `line_number` is 1-based and only used for error reporting.
    pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Self>, AnalysisError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let mut fields = line.splitn(3, ',');
        let time_field = fields.next().unwrap_or_default();
        let time = time_field
            .trim()
            .parse::<i64>()
            .map_err(|e| AnalysisError::LogParse {
                line: line_number,
                reason: format!("invalid time '{}': {}", time_field, e),
            })?;
        let kind = match fields.next() {
            Some(label) => EventKind::from_label(label.trim()),
            None => {
                return Err(AnalysisError::LogParse {
                    line: line_number,
                    reason: "missing event type".to_string(),
                })
            }
        };
        let content = fields.next().unwrap_or_default();

        Ok(Some(Self::new(time, kind, content)))
    }

    /// Content of an `initialized` event, if it matches the expected pattern
    pub fn initialization(&self) -> Option<Initialization> {
        let captures = initialized_pattern().captures(&self.content)?;
        let target = parse_vector(&captures["target"]).or_else(|| {
            warn!(time = self.time, content = %self.content, "non-numeric target vector");
            None
        })?;
        Some(Initialization {
            name: captures["name"].to_string(),
            target,
        })
    }

    /// Content of an `updated` event, if it matches the expected pattern
    pub fn update(&self) -> Option<Update> {
        let captures = updated_pattern().captures(&self.content)?;
        match (
            parse_vector(&captures["input"]),
            parse_vector(&captures["output"]),
        ) {
            (Some(input), Some(output)) => Some(Update { input, output }),
            _ => {
                warn!(time = self.time, content = %self.content, "non-numeric design vector");
                None
            }
        }
    }
}

/// `name="<name>"; target={<values>}`
#[derive(Debug, Clone, PartialEq)]
pub struct Initialization {
    pub name: String,
    pub target: Vec<f64>,
}

/// `input={<values>}; output={<values>}`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

/// Parse a whole log, skipping blank lines
pub fn parse_log(text: &str) -> Result<Vec<LogEvent>, AnalysisError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some(event) = LogEvent::parse_line(line, index + 1)? {
            events.push(event);
        }
    }
    Ok(events)
}

fn initialized_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^name="(?P<name>.+)"; target=\{(?P<target>.+)\}"#)
            .expect("initialized pattern is valid")
    })
}

fn updated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^input=\{(?P<input>.+)\}; output=\{(?P<output>.+)\}")
            .expect("updated pattern is valid")
    })
}

/// Parse `;`-separated floats; `None` if any entry is not a number
fn parse_vector(values: &str) -> Option<Vec<f64>> {
    values
        .split(';')
        .map(|value| value.trim().parse::<f64>().ok())
        .collect()
}
