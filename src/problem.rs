//! Technical design problems
//!
//! A problem couples a target output vector with the assignment of each input
//! and output channel to a designer. Problems are read from the `trainingModels`
//! and `experimentModels` entries of a session's problem-definition file.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a designer within a problem's channel assignment
pub type DesignerId = usize;

/// Problem category, fixed once from the problem name at parse time
///
/// The "Individual" and "Team" markers are independent: the first fixes the
/// team size at one, the second makes the problem size count every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// Name contains "Individual" only
    Individual,
    /// Name contains "Team" only
    Team,
    /// Name contains both markers
    IndividualTeam,
    /// Neither marker present
    Unspecified,
}

impl ProblemKind {
    /// Classify a problem by the markers in its name
    pub fn from_name(name: &str) -> Self {
        match (name.contains("Individual"), name.contains("Team")) {
            (true, true) => ProblemKind::IndividualTeam,
            (true, false) => ProblemKind::Individual,
            (false, true) => ProblemKind::Team,
            (false, false) => ProblemKind::Unspecified,
        }
    }

    /// Name carries the "Individual" marker
    pub fn is_individual(&self) -> bool {
        matches!(self, ProblemKind::Individual | ProblemKind::IndividualTeam)
    }

    /// Name carries the "Team" marker
    pub fn is_team_marked(&self) -> bool {
        matches!(self, ProblemKind::Team | ProblemKind::IndividualTeam)
    }
}

/// Problem record as it appears in the problem-definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDefinition {
    /// Problem name (also encodes its category)
    pub name: String,
    /// Square coupling matrix (M)
    pub coupling_matrix: Vec<Vec<f64>>,
    /// Target output vector (y*)
    pub target_vector: Vec<f64>,
    /// Per designer, the input channels that designer controls
    pub input_indices: Vec<Vec<usize>>,
    /// Per designer, the output channels that designer observes
    pub output_indices: Vec<Vec<usize>>,
    /// Input labels, defaults to x_1..x_N
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_labels: Option<Vec<String>>,
    /// Output labels, defaults to y_1..y_N
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_labels: Option<Vec<String>>,
}

/// A parsed technical design problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    name: String,
    kind: ProblemKind,
    coupling: Vec<Vec<f64>>,
    target: Vec<f64>,
    /// Owning designer of each input channel
    inputs: Vec<DesignerId>,
    /// Owning designer of each output channel
    outputs: Vec<DesignerId>,
    input_labels: Vec<String>,
    output_labels: Vec<String>,
    #[serde(skip)]
    input_indices: Vec<Vec<usize>>,
    #[serde(skip)]
    output_indices: Vec<Vec<usize>>,
}

impl Problem {
    /// Parse a problem from its file record.
    ///
    /// Channels that no designer lists stay assigned to designer 0; use
    /// [`Problem::validate_assignments`] to reject them.
    pub fn parse(definition: ProblemDefinition) -> Result<Self, AnalysisError> {
        let ProblemDefinition {
            name,
            coupling_matrix,
            target_vector,
            input_indices,
            output_indices,
            input_labels,
            output_labels,
        } = definition;

        let n = target_vector.len();
        if n == 0 {
            return Err(AnalysisError::malformed(
                &name,
                "target vector must have at least one entry",
            ));
        }
        if coupling_matrix.len() != n {
            return Err(AnalysisError::malformed(
                &name,
                format!(
                    "coupling matrix has {} rows but target vector has {} entries",
                    coupling_matrix.len(),
                    n
                ),
            ));
        }
        if let Some((row, cells)) = coupling_matrix
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != n)
        {
            return Err(AnalysisError::malformed(
                &name,
                format!(
                    "coupling matrix row {} has {} columns, expected {}",
                    row,
                    cells.len(),
                    n
                ),
            ));
        }

        let input_labels = input_labels.unwrap_or_else(|| default_labels("x", n));
        let output_labels = output_labels.unwrap_or_else(|| default_labels("y", n));
        if input_labels.len() != n {
            return Err(AnalysisError::malformed(
                &name,
                format!("expected {} input labels, found {}", n, input_labels.len()),
            ));
        }
        if output_labels.len() != n {
            return Err(AnalysisError::malformed(
                &name,
                format!("expected {} output labels, found {}", n, output_labels.len()),
            ));
        }

        let inputs = assign_channels(&name, "input", &input_indices, input_labels.len())?;
        let outputs = assign_channels(&name, "output", &output_indices, output_labels.len())?;

        Ok(Self {
            kind: ProblemKind::from_name(&name),
            name,
            coupling: coupling_matrix,
            target: target_vector,
            inputs,
            outputs,
            input_labels,
            output_labels,
            input_indices,
            output_indices,
        })
    }

    /// Parse a problem from a JSON object string
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let definition: ProblemDefinition = serde_json::from_str(json)?;
        Self::parse(definition)
    }

    /// Reject channels assigned to no designer or to several designers, and
    /// designer lists that differ in length between inputs and outputs.
    pub fn validate_assignments(&self) -> Result<(), AnalysisError> {
        if self.input_indices.len() != self.output_indices.len() {
            return Err(AnalysisError::malformed(
                &self.name,
                format!(
                    "{} designers listed for inputs but {} for outputs",
                    self.input_indices.len(),
                    self.output_indices.len()
                ),
            ));
        }
        check_exclusive(&self.name, "input", &self.input_indices, self.inputs.len())?;
        check_exclusive(&self.name, "output", &self.output_indices, self.outputs.len())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProblemKind {
        self.kind
    }

    /// Owning designer of each input channel
    pub fn inputs(&self) -> &[DesignerId] {
        &self.inputs
    }

    /// Owning designer of each output channel
    pub fn outputs(&self) -> &[DesignerId] {
        &self.outputs
    }

    pub fn input_labels(&self) -> &[String] {
        &self.input_labels
    }

    pub fn output_labels(&self) -> &[String] {
        &self.output_labels
    }

    /// Target vector, restricted to the outputs owned by `designer` when given
    pub fn target(&self, designer: Option<DesignerId>) -> Vec<f64> {
        filter_channels(&self.target, &self.outputs, designer)
    }

    /// Whether `designer` owns at least one input channel
    pub fn has_input_designer(&self, designer: DesignerId) -> bool {
        self.inputs.contains(&designer)
    }

    /// True iff any off-diagonal coupling is non-zero
    pub fn is_coupled(&self) -> bool {
        self.coupling.iter().enumerate().any(|(i, row)| {
            row.iter()
                .enumerate()
                .any(|(j, &cell)| i != j && cell != 0.0)
        })
    }

    /// Number of distinct designers assigned to inputs or outputs
    pub fn designer_count(&self) -> usize {
        distinct(&self.inputs).max(distinct(&self.outputs))
    }

    pub fn team_size(&self) -> usize {
        if self.kind.is_individual() {
            1
        } else {
            self.designer_count()
        }
    }

    pub fn is_team(&self) -> bool {
        self.team_size() > 1
    }

    /// Channel count, per designer unless this is a team problem.
    ///
    /// Non-team sizes use integer division.
    pub fn problem_size(&self) -> usize {
        let channels = self.inputs.len().max(self.outputs.len());
        if self.kind.is_team_marked() {
            channels
        } else {
            channels / self.designer_count().max(1)
        }
    }
}

/// Keep the entries of `values` whose channel belongs to `designer`
pub(crate) fn filter_channels(
    values: &[f64],
    owners: &[DesignerId],
    designer: Option<DesignerId>,
) -> Vec<f64> {
    match designer {
        None => values.to_vec(),
        Some(d) => values
            .iter()
            .zip(owners)
            .filter(|&(_, &owner)| owner == d)
            .map(|(&value, _)| value)
            .collect(),
    }
}

fn default_labels(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{}_{}", prefix, i)).collect()
}

fn assign_channels(
    problem: &str,
    direction: &str,
    indices: &[Vec<usize>],
    channels: usize,
) -> Result<Vec<DesignerId>, AnalysisError> {
    let mut owners = vec![0; channels];
    for (designer, assigned) in indices.iter().enumerate() {
        for &channel in assigned {
            let slot = owners.get_mut(channel).ok_or_else(|| {
                AnalysisError::malformed(
                    problem,
                    format!(
                        "{} index {} for designer {} is out of range (0..{})",
                        direction, channel, designer, channels
                    ),
                )
            })?;
            *slot = designer;
        }
    }
    Ok(owners)
}

fn check_exclusive(
    problem: &str,
    direction: &str,
    indices: &[Vec<usize>],
    channels: usize,
) -> Result<(), AnalysisError> {
    let mut assigned = vec![false; channels];
    for &channel in indices.iter().flatten() {
        match assigned.get_mut(channel) {
            Some(seen) if *seen => {
                return Err(AnalysisError::malformed(
                    problem,
                    format!(
                        "{} index {} can only be assigned to one designer",
                        direction, channel
                    ),
                ))
            }
            Some(seen) => *seen = true,
            None => {
                return Err(AnalysisError::malformed(
                    problem,
                    format!("{} index {} is out of range", direction, channel),
                ))
            }
        }
    }
    match assigned.iter().position(|seen| !seen) {
        Some(channel) => Err(AnalysisError::malformed(
            problem,
            format!(
                "{} index {} must be assigned to a designer",
                direction, channel
            ),
        )),
        None => Ok(()),
    }
}

fn distinct(ids: &[DesignerId]) -> usize {
    ids.iter().collect::<BTreeSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_json() -> &'static str {
        r#"{
            "name": "Team 3x3 Coupled",
            "couplingMatrix": [[1, 0, 0], [0.3, 1, 0], [0, 0, 1]],
            "targetVector": [1.0, 2.0, 3.0],
            "inputIndices": [[0], [1], [2]],
            "outputIndices": [[2], [1], [0]]
        }"#
    }

    fn individual_json() -> &'static str {
        r#"{
            "name": "Individual 2x2",
            "couplingMatrix": [[1, 0], [0, 1]],
            "targetVector": [0.5, -0.5],
            "inputIndices": [[0, 1]],
            "outputIndices": [[0, 1]],
            "inputLabels": ["a", "b"],
            "outputLabels": ["c", "d"]
        }"#
    }

    #[test]
    fn test_parse_assigns_channels_to_designers() {
        let problem = Problem::from_json(team_json()).unwrap();

        assert_eq!(problem.inputs(), &[0, 1, 2]);
        assert_eq!(problem.outputs(), &[2, 1, 0]);
        assert_eq!(problem.kind(), ProblemKind::Team);
    }

    #[test]
    fn test_default_labels() {
        let problem = Problem::from_json(team_json()).unwrap();

        assert_eq!(problem.input_labels(), &["x_1", "x_2", "x_3"]);
        assert_eq!(problem.output_labels(), &["y_1", "y_2", "y_3"]);
    }

    #[test]
    fn test_explicit_labels_are_kept() {
        let problem = Problem::from_json(individual_json()).unwrap();

        assert_eq!(problem.input_labels(), &["a", "b"]);
        assert_eq!(problem.output_labels(), &["c", "d"]);
    }

    #[test]
    fn test_unreferenced_channels_default_to_designer_zero() {
        let problem = Problem::from_json(
            r#"{
                "name": "Partial",
                "couplingMatrix": [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
                "targetVector": [1, 1, 1],
                "inputIndices": [[], [2]],
                "outputIndices": [[], [2]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.inputs(), &[0, 0, 1]);
        assert!(problem.validate_assignments().is_err());
    }

    #[test]
    fn test_target_filtered_by_designer() {
        let problem = Problem::from_json(team_json()).unwrap();

        assert_eq!(problem.target(None), vec![1.0, 2.0, 3.0]);
        assert_eq!(problem.target(Some(0)), vec![3.0]);
        assert_eq!(problem.target(Some(2)), vec![1.0]);
        assert!(problem.target(Some(7)).is_empty());
    }

    #[test]
    fn test_is_coupled() {
        let coupled = Problem::from_json(team_json()).unwrap();
        let uncoupled = Problem::from_json(individual_json()).unwrap();

        assert!(coupled.is_coupled());
        assert!(!uncoupled.is_coupled());
    }

    #[test]
    fn test_two_by_two_lower_coupling() {
        let problem = Problem::from_json(
            r#"{
                "name": "Individual",
                "couplingMatrix": [[1, 0], [0.3, 1]],
                "targetVector": [0, 0],
                "inputIndices": [[0, 1]],
                "outputIndices": [[0, 1]]
            }"#,
        )
        .unwrap();

        assert!(problem.is_coupled());
    }

    #[test]
    fn test_team_size_and_problem_size() {
        let team = Problem::from_json(team_json()).unwrap();
        assert_eq!(team.team_size(), 3);
        assert!(team.is_team());
        assert_eq!(team.problem_size(), 3);

        let individual = Problem::from_json(individual_json()).unwrap();
        assert_eq!(individual.team_size(), 1);
        assert!(!individual.is_team());
        assert_eq!(individual.problem_size(), 2);
    }

    #[test]
    fn test_individual_marker_forces_team_of_one() {
        let problem = Problem::from_json(
            r#"{
                "name": "Individual Parallel",
                "couplingMatrix": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
                "targetVector": [1, 1, 1, 1],
                "inputIndices": [[0, 1], [2, 3]],
                "outputIndices": [[0, 1], [2, 3]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.team_size(), 1);
        assert!(!problem.is_team());
        // 4 channels shared by 2 designers
        assert_eq!(problem.problem_size(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = Problem::from_json(
            r#"{
                "name": "Bad",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [1, 2, 3],
                "inputIndices": [[0]],
                "outputIndices": [[0]]
            }"#,
        );

        assert!(matches!(result, Err(AnalysisError::MalformedProblem { .. })));
    }

    #[test]
    fn test_ragged_coupling_rejected() {
        let result = Problem::from_json(
            r#"{
                "name": "Ragged",
                "couplingMatrix": [[1, 0], [0]],
                "targetVector": [1, 2],
                "inputIndices": [[0, 1]],
                "outputIndices": [[0, 1]]
            }"#,
        );

        assert!(matches!(result, Err(AnalysisError::MalformedProblem { .. })));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let result = Problem::from_json(
            r#"{
                "name": "OutOfRange",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [1, 2],
                "inputIndices": [[0, 5]],
                "outputIndices": [[0, 1]]
            }"#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("input index 5"));
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let result = Problem::from_json(
            r#"{
                "name": "Labels",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [1, 2],
                "inputIndices": [[0, 1]],
                "outputIndices": [[0, 1]],
                "inputLabels": ["only one"]
            }"#,
        );

        assert!(matches!(result, Err(AnalysisError::MalformedProblem { .. })));
    }

    #[test]
    fn test_validate_assignments_rejects_double_assignment() {
        let problem = Problem::from_json(
            r#"{
                "name": "Double",
                "couplingMatrix": [[1, 0], [0, 1]],
                "targetVector": [1, 2],
                "inputIndices": [[0, 1], [1]],
                "outputIndices": [[0], [1]]
            }"#,
        )
        .unwrap();

        let err = problem.validate_assignments().unwrap_err();
        assert!(err.to_string().contains("only be assigned to one designer"));
    }

    #[test]
    fn test_validate_assignments_accepts_complete_partition() {
        let problem = Problem::from_json(team_json()).unwrap();
        assert!(problem.validate_assignments().is_ok());
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ProblemKind::from_name("Individual A"), ProblemKind::Individual);
        assert_eq!(ProblemKind::from_name("Team B"), ProblemKind::Team);
        assert_eq!(ProblemKind::from_name("Training 1"), ProblemKind::Unspecified);
        assert_eq!(
            ProblemKind::from_name("Individual Team Split"),
            ProblemKind::IndividualTeam
        );
    }

    #[test]
    fn test_both_markers_keep_both_rules() {
        let problem = Problem::from_json(
            r#"{
                "name": "Individual Team Split",
                "couplingMatrix": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
                "targetVector": [1, 1, 1, 1],
                "inputIndices": [[0, 1], [2, 3]],
                "outputIndices": [[0, 1], [2, 3]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.kind(), ProblemKind::IndividualTeam);
        assert_eq!(problem.team_size(), 1);
        assert!(!problem.is_team());
        // Team marker: every channel counts
        assert_eq!(problem.problem_size(), 4);
    }

    #[test]
    fn test_unmarked_multi_designer_problem() {
        let problem = Problem::from_json(
            r#"{
                "name": "P1",
                "couplingMatrix": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
                "targetVector": [1, 1, 1, 1],
                "inputIndices": [[0, 1], [2, 3]],
                "outputIndices": [[0, 1], [2, 3]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.kind(), ProblemKind::Unspecified);
        assert_eq!(problem.team_size(), 2);
        assert!(problem.is_team());
        assert_eq!(problem.problem_size(), 2);
    }

    #[test]
    fn test_unmarked_size_uses_integer_division() {
        let problem = Problem::from_json(
            r#"{
                "name": "P2",
                "couplingMatrix": [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
                "targetVector": [1, 1, 1],
                "inputIndices": [[0, 1], [2]],
                "outputIndices": [[0, 1], [2]]
            }"#,
        )
        .unwrap();

        assert_eq!(problem.problem_size(), 1);
    }
}
