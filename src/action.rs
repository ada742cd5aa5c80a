//! Design actions
//!
//! An action is one timestamped sample of a task's design state: the full
//! input vector a team has set and the output vector it produced.

use crate::error::AnalysisError;
use crate::problem::{filter_channels, DesignerId};
use crate::session::Tolerances;
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// One sample of a task's design state. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Log timestamp (milliseconds)
    time: i64,
    /// Input vector across all channels
    input: Vec<f64>,
    /// Output vector across all channels
    output: Vec<f64>,
}

impl Action {
    pub fn new(time: i64, input: Vec<f64>, output: Vec<f64>) -> Self {
        Self {
            time,
            input,
            output,
        }
    }

    /// All-zero action recorded when a task is initialized
    pub fn zeroed(time: i64, channels: usize) -> Self {
        Self::new(time, vec![0.0; channels], vec![0.0; channels])
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    /// Input vector, restricted to the channels `designer` owns when given
    pub fn input(&self, task: &Task, designer: Option<DesignerId>) -> Vec<f64> {
        filter_channels(&self.input, task.problem().inputs(), designer)
    }

    /// Output vector, restricted to the channels `designer` owns when given
    pub fn output(&self, task: &Task, designer: Option<DesignerId>) -> Vec<f64> {
        filter_channels(&self.output, task.problem().outputs(), designer)
    }

    /// Whether any (optionally designer-filtered) input is non-zero
    pub fn has_input(&self, task: &Task, designer: Option<DesignerId>) -> bool {
        self.input(task, designer).iter().any(|&value| value != 0.0)
    }

    /// Element-wise `output - target`
    pub fn error(&self, task: &Task, designer: Option<DesignerId>) -> Vec<f64> {
        self.output(task, designer)
            .iter()
            .zip(task.problem().target(designer))
            .map(|(output, target)| output - target)
            .collect()
    }

    /// Euclidean norm of [`Action::error`]
    pub fn error_norm(&self, task: &Task, designer: Option<DesignerId>) -> f64 {
        self.error(task, designer)
            .iter()
            .map(|e| e.abs().powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Whether every error entry is strictly below the tolerance threshold.
    ///
    /// Team problems always check the full error vector, whatever designer
    /// is passed.
    pub fn is_solved(
        &self,
        tolerances: &Tolerances,
        task: &Task,
        designer: Option<DesignerId>,
    ) -> bool {
        let designer = if task.problem().is_team() {
            None
        } else {
            designer
        };
        let threshold = tolerances.threshold();
        self.error(task, designer)
            .iter()
            .all(|e| e.abs() < threshold)
    }

    /// Time of this action relative to the task's initial time
    pub fn elapsed_time(
        &self,
        task: &Task,
        designer: Option<DesignerId>,
    ) -> Result<i64, AnalysisError> {
        Ok(self.time - task.initial_time(designer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;

    fn individual_task() -> Task {
        let problem = Problem::from_json(
            r#"{
                "name": "Individual 2x2",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [0, 0],
                "inputIndices": [[0, 1]],
                "outputIndices": [[0, 1]]
            }"#,
        )
        .unwrap();
        Task::new(problem, 1)
    }

    fn split_task(name: &str) -> Task {
        let problem = Problem::from_json(&format!(
            r#"{{
                "name": "{}",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [1.0, 2.0],
                "inputIndices": [[0], [1]],
                "outputIndices": [[0], [1]]
            }}"#,
            name
        ))
        .unwrap();
        Task::new(problem, 1)
    }

    #[test]
    fn test_filtered_vectors() {
        let task = split_task("Individual Split");
        let action = Action::new(10, vec![0.5, 0.7], vec![1.5, 1.7]);

        assert_eq!(action.input(&task, None), vec![0.5, 0.7]);
        assert_eq!(action.input(&task, Some(1)), vec![0.7]);
        assert_eq!(action.output(&task, Some(0)), vec![1.5]);
        assert!(action.output(&task, Some(4)).is_empty());
    }

    #[test]
    fn test_error_norm_is_euclidean() {
        let task = individual_task();
        let action = Action::new(10, vec![1.0, 1.0], vec![1.0, 2.0]);

        assert_eq!(action.error(&task, None), vec![1.0, 2.0]);
        assert!((action.error_norm(&task, None) - 5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_is_solved_uses_strict_threshold() {
        let task = individual_task();
        let tolerances = Tolerances::new(1.0, 0.5).unwrap();

        let at_threshold = Action::new(10, vec![1.0, 1.0], vec![1.5, 0.0]);
        assert!(!at_threshold.is_solved(&tolerances, &task, None));

        let below_threshold = Action::new(11, vec![1.0, 1.0], vec![0.5, -0.5]);
        assert!(below_threshold.is_solved(&tolerances, &task, None));
    }

    #[test]
    fn test_individual_solved_check_filters_by_designer() {
        let task = split_task("Individual Split");
        let tolerances = Tolerances::new(0.05, 0.0).unwrap();
        // designer 0 on target, designer 1 far off
        let action = Action::new(10, vec![1.0, 1.0], vec![1.0, 0.0]);

        assert!(action.is_solved(&tolerances, &task, Some(0)));
        assert!(!action.is_solved(&tolerances, &task, Some(1)));
        assert!(!action.is_solved(&tolerances, &task, None));
    }

    #[test]
    fn test_team_solved_check_ignores_designer() {
        let task = split_task("Team Split");
        assert!(task.problem().is_team());
        let tolerances = Tolerances::new(0.05, 0.0).unwrap();
        let action = Action::new(10, vec![1.0, 1.0], vec![1.0, 0.0]);

        // designer 0's own output matches, but the team check uses every output
        assert!(!action.is_solved(&tolerances, &task, Some(0)));
    }

    #[test]
    fn test_designer_without_outputs_is_trivially_solved() {
        let task = split_task("Individual Split");
        let tolerances = Tolerances::default();
        let action = Action::zeroed(10, 2);

        assert!(action.is_solved(&tolerances, &task, Some(2)));
    }

    #[test]
    fn test_elapsed_time() {
        let mut task = individual_task();
        task.start(1000, 2);
        task.record(Action::new(1500, vec![1.0, 0.0], vec![1.0, 0.0]));
        let later = Action::new(4000, vec![1.0, 1.0], vec![1.0, 1.0]);

        assert_eq!(later.elapsed_time(&task, None).unwrap(), 2500);
    }
}
