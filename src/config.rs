//! Session registry
//!
//! A registry file (by default `config.json`) maps each session name to the
//! problem and log files recorded for it, the tolerances to analyse it with,
//! and the experimental tasks to leave out of the analysis.

use crate::error::AnalysisError;
use crate::session::Tolerances;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default registry file name
pub const DEFAULT_REGISTRY_FILE: &str = "config.json";

/// One registered session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub name: String,
    /// Problem-definition file, relative to `<root>/<name>/`
    pub json_file: PathBuf,
    /// Event log file, relative to `<root>/<name>/`
    pub log_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tolerance: Option<f64>,
    /// Orders of experimental tasks to drop after ingestion
    #[serde(default)]
    pub omitted_tasks: Vec<usize>,
}

impl SessionEntry {
    pub fn json_path(&self, root: &Path) -> PathBuf {
        root.join(&self.name).join(&self.json_file)
    }

    pub fn log_path(&self, root: &Path) -> PathBuf {
        root.join(&self.name).join(&self.log_file)
    }

    /// Registered tolerances, falling back to `defaults` where unset
    pub fn tolerances(&self, defaults: Tolerances) -> Result<Tolerances, AnalysisError> {
        Tolerances::new(
            self.err_tolerance.unwrap_or(defaults.err),
            self.num_tolerance.unwrap_or(defaults.num),
        )
    }
}

/// All registered sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRegistry {
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

impl SessionRegistry {
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Look up a session by name
    pub fn find(&self, name: &str) -> Result<&SessionEntry, AnalysisError> {
        self.sessions
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| AnalysisError::UnknownSession(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn registry_json() -> &'static str {
        r#"{
            "sessions": [{
                "name": "S1",
                "jsonFile": "experiment.json",
                "logFile": "2016-03-01_10-00.log",
                "errTolerance": 0.1,
                "numTolerance": 0.0,
                "omittedTasks": [3, 5]
            }, {
                "name": "S2",
                "jsonFile": "experiment.json",
                "logFile": "run.log"
            }]
        }"#
    }

    #[test]
    fn test_find_entry() {
        let registry = SessionRegistry::from_json(registry_json()).unwrap();
        let entry = registry.find("S1").unwrap();

        assert_eq!(entry.omitted_tasks, vec![3, 5]);
        assert_eq!(
            entry.log_path(Path::new("/data")),
            PathBuf::from("/data/S1/2016-03-01_10-00.log")
        );
        assert_eq!(
            entry.json_path(Path::new("/data")),
            PathBuf::from("/data/S1/experiment.json")
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let registry = SessionRegistry::from_json(registry_json()).unwrap();
        let entry = registry.find("S2").unwrap();

        assert!(entry.omitted_tasks.is_empty());
        assert_eq!(
            entry.tolerances(Tolerances::default()).unwrap(),
            Tolerances::default()
        );

        let s1 = registry.find("S1").unwrap();
        assert_eq!(
            s1.tolerances(Tolerances::default()).unwrap(),
            Tolerances::new(0.1, 0.0).unwrap()
        );
    }

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::from_json(registry_json()).unwrap();
        assert!(matches!(
            registry.find("S9"),
            Err(AnalysisError::UnknownSession(name)) if name == "S9"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(registry_json().as_bytes()).unwrap();

        let registry = SessionRegistry::load(file.path()).unwrap();
        assert_eq!(registry.sessions.len(), 2);
    }
}
