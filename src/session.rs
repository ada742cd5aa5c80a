//! Experimental sessions
//!
//! A session holds the solved-threshold tolerances and the training and
//! experimental task collections parsed from one problem-definition file.

use crate::error::AnalysisError;
use crate::problem::ProblemDefinition;
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Default error tolerance for solutions
pub const DEFAULT_ERR_TOLERANCE: f64 = 0.05;

/// Default numerical tolerance for solution checking
pub const DEFAULT_NUM_TOLERANCE: f64 = 0.005;

/// Additive thresholds defining a solved output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Error tolerance for solutions
    pub err: f64,
    /// Numerical tolerance for solution checking
    pub num: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            err: DEFAULT_ERR_TOLERANCE,
            num: DEFAULT_NUM_TOLERANCE,
        }
    }
}

impl Tolerances {
    /// Create tolerances, rejecting negative or non-finite values
    pub fn new(err: f64, num: f64) -> Result<Self, AnalysisError> {
        for value in [err, num] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidTolerance(value));
            }
        }
        Ok(Self { err, num })
    }

    /// Absolute error must stay strictly below this to count as solved
    pub fn threshold(&self) -> f64 {
        self.err + self.num
    }
}

/// Problem-definition file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tolerance: Option<f64>,
    #[serde(default)]
    pub training_models: Vec<ProblemDefinition>,
    #[serde(default)]
    pub experiment_models: Vec<ProblemDefinition>,
}

/// Which task collection a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Training,
    Experiment,
}

/// Position of a task within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    pub collection: Collection,
    pub index: usize,
}

/// Root aggregate for one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    name: String,
    tolerances: Tolerances,
    training_tasks: Vec<Task>,
    tasks: Vec<Task>,
    /// Time of the first `opened` event, once ingested
    opened_at: Option<i64>,
}

impl Session {
    /// Empty session with fresh task collections
    pub fn new(name: impl Into<String>, tolerances: Tolerances) -> Self {
        Self {
            name: name.into(),
            tolerances,
            training_tasks: Vec::new(),
            tasks: Vec::new(),
            opened_at: None,
        }
    }

    /// Build a session from its definition.
    ///
    /// Tolerances in the definition take precedence over `fallback`.
    pub fn from_definition(
        definition: SessionDefinition,
        fallback: Tolerances,
    ) -> Result<Self, AnalysisError> {
        let tolerances = Tolerances::new(
            definition.err_tolerance.unwrap_or(fallback.err),
            definition.num_tolerance.unwrap_or(fallback.num),
        )?;

        let mut session = Self::new(definition.name, tolerances);
        session.training_tasks = parse_tasks(definition.training_models)?;
        session.tasks = parse_tasks(definition.experiment_models)?;
        Ok(session)
    }

    /// Parse a problem-definition JSON document
    pub fn from_json(json: &str, fallback: Tolerances) -> Result<Self, AnalysisError> {
        let definition: SessionDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition, fallback)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn training_tasks(&self) -> &[Task] {
        &self.training_tasks
    }

    /// Experimental tasks
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn opened_at(&self) -> Option<i64> {
        self.opened_at
    }

    /// Record the session open time; later opens keep the first time
    pub fn mark_opened(&mut self, time: i64) {
        self.opened_at.get_or_insert(time);
    }

    /// Training tasks followed by experimental tasks
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.training_tasks.iter().chain(self.tasks.iter())
    }

    /// Locate the first task (training before experimental) whose problem
    /// has the given name
    pub fn find_task(&self, problem_name: &str) -> Option<TaskRef> {
        let lookup = |tasks: &[Task]| {
            tasks
                .iter()
                .position(|task| task.problem().name() == problem_name)
        };
        lookup(&self.training_tasks)
            .map(|index| TaskRef {
                collection: Collection::Training,
                index,
            })
            .or_else(|| {
                lookup(&self.tasks).map(|index| TaskRef {
                    collection: Collection::Experiment,
                    index,
                })
            })
    }

    pub fn task_mut(&mut self, task_ref: TaskRef) -> Option<&mut Task> {
        match task_ref.collection {
            Collection::Training => self.training_tasks.get_mut(task_ref.index),
            Collection::Experiment => self.tasks.get_mut(task_ref.index),
        }
    }

    /// Drop experimental tasks whose order is listed; returns how many went
    pub fn omit_tasks(&mut self, orders: &[usize]) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !orders.contains(&task.order()));
        before - self.tasks.len()
    }

    /// Apply strict channel-assignment validation to every problem
    pub fn validate_assignments(&self) -> Result<(), AnalysisError> {
        self.all_tasks()
            .try_for_each(|task| task.problem().validate_assignments())
    }
}

fn parse_tasks(models: Vec<ProblemDefinition>) -> Result<Vec<Task>, AnalysisError> {
    models
        .into_iter()
        .enumerate()
        .map(|(i, model)| Task::parse(model, i + 1))
        .collect()
}
