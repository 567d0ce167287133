//! Structural merging of two decision diagrams.
//!
//! Two strategies are provided by [`Merger`]:
//!
//! - [`average`][Merger::average] co-traverses two ordered binary trees and averages
//!   the numeric thresholds of nodes testing the same attribute;
//! - [`majority_voting`][Merger::majority_voting] consults the second diagram at every
//!   leaf of the first one, turning disagreements into the *unknown* classification.
//!
//! # Example
//!
//! ```
//! use dd_merge::diagram::DecisionDiagram;
//! use dd_merge::merge::Merger;
//! use dd_merge::types::{Comparator, Condition};
//!
//! fn threshold(value: &str) -> DecisionDiagram {
//!     let mut dd = DecisionDiagram::new();
//!     dd.add_node("a").unwrap();
//!     dd.add_leaf_node("b", "x").unwrap();
//!     dd.add_leaf_node("c", "y").unwrap();
//!     dd.add_edge("a", "b", Condition::new("v", Comparator::Lt, value)).unwrap();
//!     dd.add_else_edge("a", "c").unwrap();
//!     dd.set_root("a").unwrap();
//!     dd
//! }
//!
//! let merged = Merger::default().average(&threshold("4"), &threshold("6")).unwrap();
//! assert_eq!(merged.to_string(), r#"a:[v<5 => b:"x", _ => c:"y"]"#);
//! ```

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::diagram::{DecisionDiagram, Split};
use crate::error::{Result, StructuralViolation};
use crate::types::Condition;

/// Classification assigned where the merged sources disagree.
pub const UNKNOWN: &str = "unknown";

/// Merge strategies over pairs of decision diagrams.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Merger {
    unknown: String,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(UNKNOWN)
    }
}

impl Merger {
    pub fn new(unknown: impl Into<String>) -> Self {
        Self {
            unknown: unknown.into(),
        }
    }

    pub fn unknown(&self) -> &str {
        &self.unknown
    }

    /// Average two ordered binary decision trees.
    ///
    /// Both inputs must have a root, and every inner node must have exactly one
    /// conditional and one else edge. Nodes testing different attributes are resolved
    /// by assuming both inputs are [ordered][DecisionDiagram::order]: this is not
    /// verified, and the result is unspecified for unordered inputs.
    pub fn average(&self, left: &DecisionDiagram, right: &DecisionDiagram) -> Result<DecisionDiagram> {
        let left_root = left.root_or_err()?;
        let right_root = right.root_or_err()?;
        debug!("average: {} and {}", left, right);

        let mut result = DecisionDiagram::new();
        let root = self.average_into(&mut result, left, left_root, right, right_root)?;
        result.set_root(&root)?;
        debug!("average: result has {} node(s)", result.node_count());
        Ok(result)
    }

    /// Merge the subtree of `left` below `left_node` with the subtree of `right` below
    /// `right_node`, writing into `result`. Returns the label of the merged node.
    pub fn average_into(
        &self,
        result: &mut DecisionDiagram,
        left: &DecisionDiagram,
        left_node: &str,
        right: &DecisionDiagram,
        right_node: &str,
    ) -> Result<String> {
        match (left.split(left_node)?, right.split(right_node)?) {
            (Split::Leaf(a), Split::Leaf(b)) => {
                let label = result.unique_label(left_node);
                let classification = if a == b { a } else { self.unknown.clone() };
                trace!("average: leaves {} and {} -> {:?}", left_node, right_node, classification);
                result.add_leaf_node(label.clone(), classification)?;
                Ok(label)
            }

            (Split::Leaf(_), Split::Inner(branches)) => {
                debug!("average: leaf {} against inner {}", left_node, right_node);
                let label = result.unique_label(right_node);
                result.add_node(label.clone())?;
                let then = self.average_into(result, left, left_node, right, &branches.then)?;
                let otherwise = self.average_into(result, left, left_node, right, &branches.otherwise)?;
                attach(result, &label, branches.condition, &then, &otherwise)?;
                Ok(label)
            }

            (Split::Inner(branches), Split::Leaf(_)) => {
                debug!("average: inner {} against leaf {}", left_node, right_node);
                let label = result.unique_label(left_node);
                result.add_node(label.clone())?;
                let then = self.average_into(result, left, &branches.then, right, right_node)?;
                let otherwise = self.average_into(result, left, &branches.otherwise, right, right_node)?;
                attach(result, &label, branches.condition, &then, &otherwise)?;
                Ok(label)
            }

            (Split::Inner(l), Split::Inner(r)) if l.condition.attribute() == r.condition.attribute() => {
                let a = threshold(left_node, &l.condition)?;
                let b = threshold(right_node, &r.condition)?;
                // Halve first: the sum of two finite thresholds may overflow.
                let mean = a / 2.0 + b / 2.0;
                debug!(
                    "average: {} and {} test {}, threshold {} and {} -> {}",
                    left_node,
                    right_node,
                    l.condition.attribute(),
                    a,
                    b,
                    mean
                );
                let condition = Condition::new(l.condition.operand1, l.condition.comparator, mean.to_string());

                let label = result.unique_label(left_node);
                result.add_node(label.clone())?;
                let then = self.average_into(result, left, &l.then, right, &r.then)?;
                let otherwise = self.average_into(result, left, &l.otherwise, right, &r.otherwise)?;
                attach(result, &label, condition, &then, &otherwise)?;
                Ok(label)
            }

            (Split::Inner(l), Split::Inner(r)) => {
                // In ordered trees, the smaller attribute does not occur below the other node.
                let left_first = l.condition.attribute() < r.condition.attribute();
                let (node, first, second) = if left_first {
                    (left_node, l.condition.attribute(), r.condition.attribute())
                } else {
                    (right_node, r.condition.attribute(), l.condition.attribute())
                };
                debug!("average: {} splits on {} before {}", node, first, second);

                let label = result.unique_label(node);
                result.add_node(label.clone())?;
                let (then, otherwise, condition) = if left_first {
                    let then = self.average_into(result, left, &l.then, right, right_node)?;
                    let otherwise = self.average_into(result, left, &l.otherwise, right, right_node)?;
                    (then, otherwise, l.condition)
                } else {
                    let then = self.average_into(result, left, left_node, right, &r.then)?;
                    let otherwise = self.average_into(result, left, left_node, right, &r.otherwise)?;
                    (then, otherwise, r.condition)
                };
                attach(result, &label, condition, &then, &otherwise)?;
                Ok(label)
            }
        }
    }

    /// Refine every leaf of `left` by the classification `right` gives to the same case.
    ///
    /// For each classification of `left` (in sorted order), a copy of `right` is made in
    /// which every other classification is replaced by *unknown*. Each leaf of `left`
    /// carrying that classification becomes an inner node whose else edge leads to a
    /// fresh copy of it. Agreement is kept, disagreement becomes *unknown*.
    pub fn majority_voting(&self, left: &DecisionDiagram, right: &DecisionDiagram) -> Result<DecisionDiagram> {
        left.root_or_err()?;
        right.root_or_err()?;
        debug!("majority_voting: {} and {}", left, right);

        let classes: BTreeSet<&str> = left.leaves().filter_map(|n| n.classification()).collect();
        let mut result = left.clone();

        for class in classes {
            let mut tailored = right.clone();
            let differing: Vec<String> = tailored
                .leaves()
                .filter(|n| n.classification() != Some(class))
                .map(|n| n.label().to_string())
                .collect();
            for label in &differing {
                tailored.set_classification(label, self.unknown.as_str())?;
            }

            let targets: Vec<&str> = left
                .leaves()
                .filter(|n| n.classification() == Some(class))
                .map(|n| n.label())
                .collect();
            debug!(
                "majority_voting: class {:?}, {} leaf(s), {} of {} right leaf(s) disagree",
                class,
                targets.len(),
                differing.len(),
                right.leaf_count()
            );

            for target in targets {
                self.replace_leaf(&mut result, target, &tailored)?;
            }
        }

        Ok(result)
    }

    /// Turn leaf `label` of `result` into an inner node with an else edge to a copy of `graft`.
    fn replace_leaf(&self, result: &mut DecisionDiagram, label: &str, graft: &DecisionDiagram) -> Result<()> {
        let displaced = result.unique_label(label);
        result.rename_node(label, displaced.clone())?;
        result.add_node(label)?;
        for id in result.incoming(&displaced).to_vec() {
            result.redirect_edge(id, label)?;
        }
        if result.root() == Some(displaced.as_str()) {
            result.set_root(label)?;
        }
        result.remove_node(&displaced, false)?;

        let mut copy = graft.clone();
        copy.use_unique_labels(result)?;
        let copy_root = result.add_decision_diagram(&copy)?;
        result.add_else_edge(label, &copy_root)?;
        trace!("majority_voting: {} now leads to {}", label, copy_root);
        Ok(())
    }
}

/// Numeric threshold of a condition.
fn threshold(label: &str, condition: &Condition) -> Result<f64> {
    condition
        .operand2
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StructuralViolation::InvalidThreshold {
            label: label.to_string(),
            value: condition.operand2.clone(),
        })
}

/// Connect a freshly merged inner node to its two merged children.
fn attach(result: &mut DecisionDiagram, label: &str, condition: Condition, then: &str, otherwise: &str) -> Result<()> {
    result.add_edge(label, then, condition)?;
    result.add_else_edge(label, otherwise)?;
    Ok(())
}
