//! Merge operators over fact-set answers.
//!
//! An [`Operator`] is invoked by a surrounding pipeline with the answers computed for
//! each of its arguments (one sequence of fact sets per argument) and a list of
//! `key=value` parameters. It returns a sequence of fact sets.
//!
//! Operators validate the shape of their input, decode every fact set into a
//! [`DecisionDiagram`], run the engine and encode the result. Engine errors are
//! reported together with the operator name and the offending argument.

use log::{debug, info};
use thiserror::Error;

use crate::config::{ConfigError, MergeConfig};
use crate::diagram::DecisionDiagram;
use crate::error::StructuralViolation;
use crate::facts::FactSet;
use crate::merge::Merger;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorError {
    #[error("operator '{operator}' expects {expected} argument(s), got {found}")]
    Arity {
        operator: String,
        expected: usize,
        found: usize,
    },

    #[error("operator '{operator}' expects exactly one answer set for argument {argument}, got {found}")]
    AnswerCount {
        operator: String,
        argument: usize,
        found: usize,
    },

    #[error("operator '{operator}': invalid parameters")]
    Config {
        operator: String,
        #[source]
        source: ConfigError,
    },

    #[error("operator '{operator}' failed{}", argument_suffix(.argument))]
    Structural {
        operator: String,
        argument: Option<usize>,
        #[source]
        source: StructuralViolation,
    },
}

fn argument_suffix(argument: &Option<usize>) -> String {
    match argument {
        Some(i) => format!(" on argument {}", i),
        None => String::new(),
    }
}

impl OperatorError {
    /// The underlying structural violation, if any.
    pub fn violation(&self) -> Option<&StructuralViolation> {
        match self {
            OperatorError::Structural { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A merge operator.
pub trait Operator {
    fn name(&self) -> &'static str;

    /// Number of arguments.
    fn arity(&self) -> usize;

    fn apply(&self, answers: &[Vec<FactSet>], params: &[(String, String)]) -> Result<Vec<FactSet>, OperatorError>;
}

/// All provided operators.
pub fn operators() -> Vec<Box<dyn Operator>> {
    vec![Box::new(Average), Box::new(Majority), Box::new(Unfold), Box::new(Normalize)]
}

/// Look up a provided operator by name.
pub fn operator(name: &str) -> Option<Box<dyn Operator>> {
    operators().into_iter().find(|op| op.name() == name)
}

fn structural(operator: &dyn Operator, argument: Option<usize>) -> impl FnOnce(StructuralViolation) -> OperatorError {
    let operator = operator.name().to_string();
    move |source| OperatorError::Structural {
        operator,
        argument,
        source,
    }
}

fn read_config(operator: &dyn Operator, params: &[(String, String)]) -> Result<MergeConfig, OperatorError> {
    MergeConfig::from_params(params).map_err(|source| OperatorError::Config {
        operator: operator.name().to_string(),
        source,
    })
}

fn check_arity(operator: &dyn Operator, answers: &[Vec<FactSet>]) -> Result<(), OperatorError> {
    if answers.len() != operator.arity() {
        return Err(OperatorError::Arity {
            operator: operator.name().to_string(),
            expected: operator.arity(),
            found: answers.len(),
        });
    }
    Ok(())
}

/// Decode the single answer set of every argument.
fn single_answers(operator: &dyn Operator, answers: &[Vec<FactSet>]) -> Result<Vec<DecisionDiagram>, OperatorError> {
    check_arity(operator, answers)?;
    answers
        .iter()
        .enumerate()
        .map(|(i, sets)| match sets.as_slice() {
            [facts] => DecisionDiagram::from_facts(facts).map_err(structural(operator, Some(i))),
            _ => Err(OperatorError::AnswerCount {
                operator: operator.name().to_string(),
                argument: i,
                found: sets.len(),
            }),
        })
        .collect()
}

/// Decode the two answer sets of a binary operator.
fn pair(operator: &dyn Operator, answers: &[Vec<FactSet>]) -> Result<(DecisionDiagram, DecisionDiagram), OperatorError> {
    let mut diagrams = single_answers(operator, answers)?.into_iter();
    match (diagrams.next(), diagrams.next(), diagrams.next()) {
        (Some(left), Some(right), None) => Ok((left, right)),
        _ => Err(OperatorError::Arity {
            operator: operator.name().to_string(),
            expected: 2,
            found: answers.len(),
        }),
    }
}

/// Binary operator averaging the thresholds of two diagrams.
///
/// Inputs are [normalized][DecisionDiagram::normalized] first unless `normalize=false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Average;

impl Operator for Average {
    fn name(&self) -> &'static str {
        "average"
    }
    fn arity(&self) -> usize {
        2
    }

    fn apply(&self, answers: &[Vec<FactSet>], params: &[(String, String)]) -> Result<Vec<FactSet>, OperatorError> {
        let config = read_config(self, params)?;
        let (mut left, mut right) = pair(self, answers)?;
        if config.normalize {
            left = left.normalized().map_err(structural(self, Some(0)))?;
            right = right.normalized().map_err(structural(self, Some(1)))?;
        }
        info!("{}: merging diagrams of {} and {} node(s)", self.name(), left.node_count(), right.node_count());
        let merged = Merger::from(&config)
            .average(&left, &right)
            .map_err(structural(self, None))?;
        Ok(vec![merged.to_facts()])
    }
}

/// Binary operator refining the first diagram by a majority vote with the second.
///
/// The `normalize` parameter is accepted but has no effect: voting works on any shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct Majority;

impl Operator for Majority {
    fn name(&self) -> &'static str {
        "majority"
    }
    fn arity(&self) -> usize {
        2
    }

    fn apply(&self, answers: &[Vec<FactSet>], params: &[(String, String)]) -> Result<Vec<FactSet>, OperatorError> {
        let config = read_config(self, params)?;
        let (left, right) = pair(self, answers)?;
        info!("{}: voting over diagrams of {} and {} node(s)", self.name(), left.node_count(), right.node_count());
        let merged = Merger::from(&config)
            .majority_voting(&left, &right)
            .map_err(structural(self, None))?;
        Ok(vec![merged.to_facts()])
    }
}

/// Unary operator turning every answer set into a tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unfold;

impl Operator for Unfold {
    fn name(&self) -> &'static str {
        "unfold"
    }
    fn arity(&self) -> usize {
        1
    }

    fn apply(&self, answers: &[Vec<FactSet>], params: &[(String, String)]) -> Result<Vec<FactSet>, OperatorError> {
        read_config(self, params)?;
        check_arity(self, answers)?;
        debug!("{}: {} answer set(s)", self.name(), answers[0].len());
        answers[0]
            .iter()
            .map(|facts| -> crate::error::Result<FactSet> {
                let dd = DecisionDiagram::from_facts(facts)?;
                let cycle = dd.contains_cycles();
                if !cycle.is_empty() {
                    return Err(StructuralViolation::Cycle(cycle));
                }
                Ok(dd.unfold()?.to_facts())
            })
            .collect::<Result<_, _>>()
            .map_err(structural(self, Some(0)))
    }
}

/// Unary operator running the full normalization pipeline on every answer set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl Operator for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }
    fn arity(&self) -> usize {
        1
    }

    fn apply(&self, answers: &[Vec<FactSet>], params: &[(String, String)]) -> Result<Vec<FactSet>, OperatorError> {
        read_config(self, params)?;
        check_arity(self, answers)?;
        debug!("{}: {} answer set(s)", self.name(), answers[0].len());
        answers[0]
            .iter()
            .map(|facts| -> crate::error::Result<FactSet> {
                Ok(DecisionDiagram::from_facts(facts)?.normalized()?.to_facts())
            })
            .collect::<Result<_, _>>()
            .map_err(structural(self, Some(0)))
    }
}
