//! Structural errors raised by the diagram engine.
//!
//! Every invariant of a [`DecisionDiagram`][crate::diagram::DecisionDiagram] is checked
//! at mutation time. A violation is reported as a [`StructuralViolation`] and is fatal
//! to the enclosing normalize or merge call: the algorithms are deterministic, so there
//! is nothing to retry.

use thiserror::Error;

use crate::diagram::EdgeId;

/// A violated structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("node '{0}' already exists")]
    DuplicateLabel(String),

    #[error("node '{0}' is not a member of the diagram")]
    UnknownNode(String),

    #[error("edge {0} is not a member of the diagram")]
    UnknownEdge(EdgeId),

    #[error("node '{label}' still has {count} incident edge(s)")]
    IncidentEdges { label: String, count: usize },

    #[error("node '{0}' is not a leaf")]
    NotALeaf(String),

    #[error("leaf '{0}' cannot have outgoing edges")]
    LeafEdge(String),

    #[error("node '{0}' already has an else edge")]
    MultipleElseEdges(String),

    #[error("diagram has no root")]
    MissingRoot,

    #[error("diagram has {0} root facts, expected exactly one")]
    MultipleRoots(usize),

    #[error("unknown comparator '{0}'")]
    UnknownComparator(String),

    #[error("node '{label}' has out-degree {found}, expected {expected}")]
    OutDegree { label: String, expected: usize, found: usize },

    #[error("node '{label}' has {found} conditional edge(s), expected exactly one")]
    ConditionalEdges { label: String, found: usize },

    #[error("node '{label}' tests against non-numeric threshold '{value}'")]
    InvalidThreshold { label: String, value: String },

    #[error("diagram contains a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("malformed fact: {0}")]
    MalformedFact(String),
}

pub type Result<T, E = StructuralViolation> = std::result::Result<T, E>;
