//! Root-to-leaf paths of a decision diagram.
//!
//! A path is the sequence of edges taken from the root to a leaf, together with the
//! classification of that leaf. Normalization reshapes a diagram without changing any
//! condition or classification, so paths are the natural way to compare a diagram
//! with its normalized form.
//!
//! # Example
//!
//! ```
//! use dd_merge::diagram::DecisionDiagram;
//! use dd_merge::paths::Step;
//! use dd_merge::types::{Comparator, Condition};
//!
//! let mut dd = DecisionDiagram::new();
//! dd.add_node("a").unwrap();
//! dd.add_leaf_node("b", "x").unwrap();
//! dd.add_leaf_node("c", "y").unwrap();
//! dd.add_edge("a", "b", Condition::new("v", Comparator::Lt, "5")).unwrap();
//! dd.add_else_edge("a", "c").unwrap();
//! dd.set_root("a").unwrap();
//!
//! let paths = dd.paths().unwrap();
//! assert_eq!(paths.len(), 2);
//! assert_eq!(paths[1].steps, vec![Step::Else]);
//! assert_eq!(paths[1].classification, "y");
//! ```
//!
//! Note: the number of paths can be exponential in the size of a diagram with shared
//! substructure. [`path_count`][DecisionDiagram::path_count] counts them without
//! enumerating.

use std::collections::{HashMap, HashSet};
use std::fmt;

use num_bigint::BigUint;

use crate::diagram::{DecisionDiagram, EdgeKind, NodeKind};
use crate::error::{Result, StructuralViolation};
use crate::types::Condition;

/// One edge taken along a path.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Step {
    Conditional(Condition),
    Else,
}

impl From<&EdgeKind> for Step {
    fn from(kind: &EdgeKind) -> Self {
        match kind {
            EdgeKind::Conditional(condition) => Step::Conditional(condition.clone()),
            EdgeKind::Else => Step::Else,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Conditional(condition) => write!(f, "{}", condition),
            Step::Else => f.write_str("_"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DiagramPath {
    pub steps: Vec<Step>,
    pub classification: String,
}

impl fmt::Display for DiagramPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", step)?;
        }
        write!(f, "] => {:?}", self.classification)
    }
}

impl DecisionDiagram {
    /// Enumerate every root-to-leaf path, in edge order.
    ///
    /// Returns an empty list for a diagram without root, and
    /// [`StructuralViolation::Cycle`] for a cyclic one. Inner nodes without outgoing
    /// edges end no path.
    pub fn paths(&self) -> Result<Vec<DiagramPath>> {
        let Some(root) = self.root() else {
            return Ok(Vec::new());
        };
        let cycle = self.contains_cycles();
        if !cycle.is_empty() {
            return Err(StructuralViolation::Cycle(cycle));
        }

        let mut paths = Vec::new();
        let mut stack = vec![(root.to_string(), Vec::new())];
        while let Some((label, steps)) = stack.pop() {
            match self.node_or_err(&label)?.kind() {
                NodeKind::Leaf { classification } => paths.push(DiagramPath {
                    steps,
                    classification: classification.clone(),
                }),
                NodeKind::Inner { edges } => {
                    // Reversed, so that the first edge is explored first.
                    for &id in edges.iter().rev() {
                        let edge = self.edge_or_err(id)?;
                        let mut next = steps.clone();
                        next.push(Step::from(edge.kind()));
                        stack.push((edge.to().to_string(), next));
                    }
                }
            }
        }
        Ok(paths)
    }

    /// Number of root-to-leaf paths.
    ///
    /// Shared substructure is counted once per path through it, so for an acyclic
    /// diagram this equals the number of leaves of its [unfolding][Self::unfold].
    /// Edges closing a cycle contribute no paths.
    pub fn path_count(&self) -> BigUint {
        let Some(root) = self.root() else {
            return BigUint::ZERO;
        };
        let mut cache = HashMap::new();
        let mut visiting = HashSet::new();
        self._path_count(root, &mut cache, &mut visiting)
    }

    fn _path_count(
        &self,
        label: &str,
        cache: &mut HashMap<String, BigUint>,
        visiting: &mut HashSet<String>,
    ) -> BigUint {
        if let Some(count) = cache.get(label) {
            return count.clone();
        }
        let Some(node) = self.node(label) else {
            return BigUint::ZERO;
        };
        if node.is_leaf() {
            return BigUint::from(1u32);
        }
        if !visiting.insert(label.to_string()) {
            return BigUint::ZERO;
        }

        let mut count = BigUint::ZERO;
        for child in self.children(label) {
            count += self._path_count(&child, cache, visiting);
        }

        visiting.remove(label);
        cache.insert(label.to_string(), count.clone());
        count
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Comparator;

    /// A ladder of `n` inner nodes where both edges of each rung lead to the next one.
    fn ladder(n: usize) -> DecisionDiagram {
        let mut dd = DecisionDiagram::new();
        for i in 0..n {
            dd.add_node(format!("n{}", i)).unwrap();
        }
        dd.add_leaf_node("end", "x").unwrap();
        for i in 0..n {
            let next = if i + 1 < n { format!("n{}", i + 1) } else { "end".to_string() };
            let from = format!("n{}", i);
            dd.add_edge(&from, &next, Condition::new(format!("v{}", i), Comparator::Gt, "0"))
                .unwrap();
            dd.add_else_edge(&from, &next).unwrap();
        }
        dd.set_root("n0").unwrap();
        dd
    }

    #[test]
    fn test_paths_of_leaf() {
        let mut dd = DecisionDiagram::new();
        dd.add_leaf_node("l", "x").unwrap();
        dd.set_root("l").unwrap();
        let paths = dd.paths().unwrap();
        assert_eq!(
            paths,
            vec![DiagramPath {
                steps: vec![],
                classification: "x".to_string()
            }]
        );
        assert_eq!(dd.path_count(), BigUint::from(1u32));
    }

    #[test]
    fn test_paths_without_root() {
        let dd = DecisionDiagram::new();
        assert!(dd.paths().unwrap().is_empty());
        assert_eq!(dd.path_count(), BigUint::ZERO);
    }

    #[test]
    fn test_paths_ladder() {
        let dd = ladder(3);
        let paths = dd.paths().unwrap();
        assert_eq!(paths.len(), 8);
        assert!(paths.iter().all(|p| p.steps.len() == 3 && p.classification == "x"));
        assert_eq!(paths[0].to_string(), r#"[v0>0, v1>0, v2>0] => "x""#);
        assert_eq!(paths[7].to_string(), r#"[_, _, _] => "x""#);
    }

    #[test]
    fn test_path_count_is_exponential() {
        let dd = ladder(100);
        assert_eq!(dd.path_count(), BigUint::from(2u32).pow(100));
    }

    #[test]
    fn test_path_count_matches_unfolding() {
        let dd = ladder(4);
        let tree = dd.unfold().unwrap();
        assert_eq!(dd.path_count(), BigUint::from(tree.leaf_count()));
    }

    #[test]
    fn test_paths_reject_cycles() {
        let mut dd = ladder(2);
        dd.remove_edge(dd.else_edge("n1").unwrap()).unwrap();
        dd.add_else_edge("n1", "n0").unwrap();
        assert!(matches!(dd.paths(), Err(StructuralViolation::Cycle(_))));
        // n0 -> n1 twice, n1 -> end once: the back edge adds nothing.
        assert_eq!(dd.path_count(), BigUint::from(2u32));
    }
}
