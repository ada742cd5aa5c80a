//! Experimental tasks
//!
//! A task pairs one problem with the ordered history of actions taken on it
//! and derives the initial, completion and elapsed times reported per task
//! and per designer.

use crate::action::Action;
use crate::error::AnalysisError;
use crate::problem::{DesignerId, Problem, ProblemDefinition};
use crate::session::Tolerances;
use serde::Serialize;

/// Offset (ms) before the initial time used as the completion time of an
/// individual task that was never numerically solved
pub const UNSOLVED_OFFSET_MS: i64 = 1000;

/// One problem worked during a session, with its action history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    problem: Problem,
    /// 1-indexed position within its collection
    order: usize,
    actions: Vec<Action>,
    /// Time of the task's `initialized` event
    initialized_at: i64,
    /// Time of the task's `solved` event, 0 if never logged
    solved_at: i64,
}

impl Task {
    pub fn new(problem: Problem, order: usize) -> Self {
        Self {
            problem,
            order,
            actions: Vec::new(),
            initialized_at: 0,
            solved_at: 0,
        }
    }

    /// Parse the problem record and wrap it in a task at position `order`
    pub fn parse(definition: ProblemDefinition, order: usize) -> Result<Self, AnalysisError> {
        Ok(Self::new(Problem::parse(definition)?, order))
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn initialized_at(&self) -> i64 {
        self.initialized_at
    }

    /// Logged `solved` time, 0 when the log never recorded one
    pub fn solved_at(&self) -> i64 {
        self.solved_at
    }

    /// Mark the task initialized and record its all-zero starting action
    pub fn start(&mut self, time: i64, channels: usize) {
        self.initialized_at = time;
        self.actions.push(Action::zeroed(time, channels));
    }

    /// Append an action to the history
    pub fn record(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn mark_solved(&mut self, time: i64) {
        self.solved_at = time;
    }

    /// Time of the first action with a non-zero input.
    ///
    /// - no designer: any input channel counts
    /// - designer without input channels: the initialization time
    /// - individual problem: only that designer's channels count
    /// - team problem: same as no designer
    pub fn initial_time(&self, designer: Option<DesignerId>) -> Result<i64, AnalysisError> {
        let filter = match designer {
            None => None,
            Some(d) if !self.problem.has_input_designer(d) => return Ok(self.initialized_at),
            Some(d) if !self.problem.is_team() => Some(d),
            Some(_) => None,
        };

        self.actions
            .iter()
            .find(|action| action.has_input(self, filter))
            .map(Action::time)
            .ok_or_else(|| AnalysisError::NoInitialAction {
                problem: self.problem.name().to_string(),
                designer: designer_label(designer),
            })
    }

    /// Time of the first action that solves the task.
    ///
    /// Falls back to the logged `solved` time for team problems (possibly 0),
    /// and to [`UNSOLVED_OFFSET_MS`] before the initial time otherwise.
    pub fn completion_time(
        &self,
        tolerances: &Tolerances,
        designer: Option<DesignerId>,
    ) -> Result<i64, AnalysisError> {
        if let Some(action) = self
            .actions
            .iter()
            .find(|action| action.is_solved(tolerances, self, designer))
        {
            return Ok(action.time());
        }

        if self.problem.is_team() {
            Ok(self.solved_at)
        } else {
            Ok(self.initial_time(designer)? - UNSOLVED_OFFSET_MS)
        }
    }

    /// Completion minus initial time; negative for unsolved individual tasks
    pub fn elapsed_time(
        &self,
        tolerances: &Tolerances,
        designer: Option<DesignerId>,
    ) -> Result<i64, AnalysisError> {
        Ok(self.completion_time(tolerances, designer)? - self.initial_time(designer)?)
    }

    /// Error norm of the most recent action over all channels
    pub fn final_error_norm(&self) -> Option<f64> {
        self.actions
            .last()
            .map(|action| action.error_norm(self, None))
    }
}

fn designer_label(designer: Option<DesignerId>) -> String {
    match designer {
        Some(d) => d.to_string(),
        None => "any".to_string(),
    }
}
