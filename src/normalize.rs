//! Structural normalization of decision diagrams.
//!
//! Merging operates on ordered binary decision trees. This module brings an arbitrary
//! acyclic diagram into that shape:
//!
//! 1. [`contains_cycles`][DecisionDiagram::contains_cycles] rejects cyclic input;
//! 2. [`unfold`][DecisionDiagram::unfold] replicates shared substructure so every node
//!    has at most one parent;
//! 3. [`to_binary`][DecisionDiagram::to_binary] splits wide fan-out into a cascade of
//!    else edges;
//! 4. [`order`][DecisionDiagram::order] (see [`reorder`][crate::reorder]) sinks nodes
//!    until tested attributes follow lexicographic order along every path.
//!
//! [`normalized`][DecisionDiagram::normalized] runs the whole pipeline.
//!
//! None of these steps changes a condition or a classification: the set of
//! (path conditions, classification) pairs is preserved, only the shape changes.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::diagram::{DecisionDiagram, NodeKind};
use crate::error::{Result, StructuralViolation};

impl DecisionDiagram {
    /// Search for a directed cycle reachable from the root.
    ///
    /// Returns the cycle as a sequence of labels starting and ending at the same node,
    /// e.g. `[a, b, c, a]`, or an empty sequence if there is none (or no root).
    ///
    /// Depth-first traversal keeps a parent map for the nodes on the active path only:
    /// a node reached twice through different parents is shared substructure, not a
    /// cycle. Nodes are entered at most once, so the search is linear in the number of
    /// edges.
    pub fn contains_cycles(&self) -> Vec<String> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let mut active = HashMap::new();
        let mut done = HashSet::new();
        active.insert(root.to_string(), None);
        self.find_cycle(root, &mut active, &mut done).unwrap_or_default()
    }

    fn find_cycle(
        &self,
        label: &str,
        active: &mut HashMap<String, Option<String>>,
        done: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        for child in self.children(label) {
            if active.contains_key(&child) {
                // Walk back from the current node to the revisited one.
                let mut cycle = vec![label.to_string()];
                let mut current = label.to_string();
                while current != child {
                    match active.get(&current).cloned().flatten() {
                        Some(parent) => {
                            cycle.push(parent.clone());
                            current = parent;
                        }
                        None => break,
                    }
                }
                cycle.reverse();
                cycle.push(child);
                debug!("contains_cycles: found {:?}", cycle);
                return Some(cycle);
            }
            if done.contains(&child) {
                continue;
            }
            active.insert(child.clone(), Some(label.to_string()));
            if let Some(cycle) = self.find_cycle(&child, active, done) {
                return Some(cycle);
            }
            active.remove(&child);
            done.insert(child);
        }
        None
    }

    pub fn is_acyclic(&self) -> bool {
        self.contains_cycles().is_empty()
    }

    /// Every node has at most one incoming edge.
    pub fn is_tree(&self) -> bool {
        self.nodes().all(|n| n.incoming().len() <= 1)
    }

    /// Every inner node has at most two outgoing edges.
    pub fn is_binary(&self) -> bool {
        self.nodes().all(|n| n.outgoing().len() <= 2)
    }

    /// Replicate shared substructure so the result is a tree.
    ///
    /// The diagram must be acyclic; on cyclic input this does not terminate. Labels of
    /// the first copy of each node are kept, later copies get suffixed labels.
    pub fn unfold(&self) -> Result<DecisionDiagram> {
        let root = self.root_or_err()?;
        debug!("unfold(root = {}, nodes = {})", root, self.node_count());
        let tree = self.unfold_from(root)?;
        debug!("unfold: {} -> {} nodes", self.node_count(), tree.node_count());
        Ok(tree)
    }

    fn unfold_from(&self, label: &str) -> Result<DecisionDiagram> {
        let node = self.node_or_err(label)?;
        let mut result = DecisionDiagram::new();
        match node.kind() {
            NodeKind::Leaf { classification } => {
                result.add_leaf_node(label, classification.clone())?;
            }
            NodeKind::Inner { edges } => {
                result.add_node(label)?;
                for &id in edges {
                    let edge = self.edge_or_err(id)?;
                    let mut child = self.unfold_from(edge.to())?;
                    child.use_unique_labels(&result)?;
                    let child_root = result.add_decision_diagram(&child)?;
                    result.add_edge_kind(label, &child_root, edge.kind().clone())?;
                }
            }
        }
        result.set_root(label)?;
        Ok(result)
    }

    /// Reduce fan-out in place so every node has at most two outgoing edges.
    ///
    /// The diagram must be a tree. A node with more than two outgoing edges keeps its
    /// first conditional edge; all other edges move to a fresh intermediate node,
    /// which is attached through a new else edge.
    pub fn to_binary(&mut self) -> Result<()> {
        let root = self.root_or_err()?.to_string();
        debug!("to_binary(root = {})", root);
        self.binarize(&root)
    }

    fn binarize(&mut self, label: &str) -> Result<()> {
        let outgoing = self.outgoing(label).to_vec();
        if outgoing.len() > 2 {
            let keep = self.conditional_edges(label).first().copied().ok_or_else(|| {
                StructuralViolation::ConditionalEdges {
                    label: label.to_string(),
                    found: 0,
                }
            })?;

            let fresh = self.unique_label(label);
            debug!(
                "to_binary: moving {} edge(s) from {} to {}",
                outgoing.len() - 1,
                label,
                fresh
            );
            self.add_node(fresh.clone())?;
            for id in outgoing.into_iter().filter(|&id| id != keep) {
                let edge = self.remove_edge(id)?;
                self.add_edge_kind(&fresh, edge.to(), edge.kind().clone())?;
            }
            self.add_else_edge(label, &fresh)?;
        }

        for child in self.children(label) {
            self.binarize(&child)?;
        }
        Ok(())
    }

    /// Bring a copy of the diagram into ordered binary tree form.
    ///
    /// Fails with [`StructuralViolation::Cycle`] on cyclic input. Unfolding is skipped
    /// when the diagram already is a tree.
    pub fn normalized(&self) -> Result<DecisionDiagram> {
        let cycle = self.contains_cycles();
        if !cycle.is_empty() {
            return Err(StructuralViolation::Cycle(cycle));
        }
        let mut dd = if self.is_tree() { self.clone() } else { self.unfold()? };
        dd.to_binary()?;
        dd.order()?;
        debug!("normalized: {}", dd);
        Ok(dd)
    }
}
