//! Canonical variable ordering for binary decision trees.
//!
//! # Ordered trees
//!
//! A binary decision tree is *ordered* when, along every root-to-leaf path, the tested
//! attributes never decrease in lexicographic order. Two ordered trees can be merged
//! by a single co-traversal: whenever the two current nodes test different attributes,
//! the smaller one is known not to occur any deeper in the other tree.
//!
//! # Sinking
//!
//! [`order`][DecisionDiagram::order] works bottom-up. Both subtrees of a node are
//! ordered first, then the node itself is *sunk*: if one of its children tests a
//! smaller attribute, the two are rotated.
//!
//! ```text
//!         u:x                         v:y
//!        /   \                       /   \
//!      v:y    s        ==>        u:x     u':x
//!     /   \                      /   \    /   \
//!   t1     t2                  t1     s  t2    s'
//! ```
//!
//! The child `v` becomes the local root, the old root `u` is duplicated along both of
//! `v`'s branches, and the untouched sibling `s` is copied so that each duplicate owns
//! one. Both duplicates are then sunk again, exactly like a sift-down in a heap. If both
//! children test a smaller attribute, the smaller of the two wins (the conditional child
//! on a tie).
//!
//! Every rotation moves a larger attribute strictly below a smaller one, so the number
//! of order violations on each path decreases and the process terminates. The price is
//! duplication: each rotation copies the sibling subtree.

use log::debug;

use crate::diagram::{DecisionDiagram, Split};
use crate::error::Result;

/// Statistics collected during ordering.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OrderStats {
    /// Number of rotations performed
    pub rotations: usize,
    /// Number of nodes created by copying sibling subtrees
    pub copied_nodes: usize,
    /// Number of nodes before ordering
    pub initial_size: usize,
    /// Number of nodes after ordering
    pub final_size: usize,
}

impl DecisionDiagram {
    /// Attribute tested by `label`, `None` for leaves.
    pub fn tested_attribute(&self, label: &str) -> Result<Option<String>> {
        Ok(match self.split(label)? {
            Split::Leaf(_) => None,
            Split::Inner(branches) => Some(branches.condition.operand1),
        })
    }

    /// Reorder the tree in place so that tested attributes are sorted along every path.
    ///
    /// The diagram must be a binary tree: every inner node has exactly one conditional
    /// and one else edge. Otherwise a structural error is returned, and the diagram
    /// may be left partially reordered.
    pub fn order(&mut self) -> Result<OrderStats> {
        let root = self.root_or_err()?.to_string();
        let mut stats = OrderStats {
            initial_size: self.node_count(),
            ..Default::default()
        };

        let new_root = self.order_from(&root, &mut stats)?;
        self.set_root(&new_root)?;

        stats.final_size = self.node_count();
        debug!(
            "order: {} rotation(s), {} copied node(s), size {} -> {}",
            stats.rotations, stats.copied_nodes, stats.initial_size, stats.final_size
        );
        Ok(stats)
    }

    /// Order the subtree below `label` and return the label of its new local root.
    fn order_from(&mut self, label: &str, stats: &mut OrderStats) -> Result<String> {
        let Split::Inner(branches) = self.split(label)? else {
            return Ok(label.to_string());
        };

        let then = self.order_from(&branches.then, stats)?;
        self.redirect_edge(branches.then_edge, &then)?;
        let otherwise = self.order_from(&branches.otherwise, stats)?;
        self.redirect_edge(branches.else_edge, &otherwise)?;

        self.sink(label, stats)
    }

    /// Push `label` down until neither child tests a smaller attribute.
    ///
    /// Both subtrees must already be ordered. Returns the new local root; the caller is
    /// responsible for pointing the parent edge at it.
    fn sink(&mut self, label: &str, stats: &mut OrderStats) -> Result<String> {
        let Split::Inner(top) = self.split(label)? else {
            return Ok(label.to_string());
        };
        let attribute = top.condition.attribute();

        let then_attribute = self.tested_attribute(&top.then)?;
        let else_attribute = self.tested_attribute(&top.otherwise)?;
        let then_smaller = then_attribute.as_deref().filter(|a| *a < attribute);
        let else_smaller = else_attribute.as_deref().filter(|a| *a < attribute);

        let via_then = match (then_smaller, else_smaller) {
            (None, None) => return Ok(label.to_string()),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(t), Some(e)) => t <= e,
        };

        let (child, child_edge, sibling) = if via_then {
            (&top.then, top.then_edge, &top.otherwise)
        } else {
            (&top.otherwise, top.else_edge, &top.then)
        };
        let Split::Inner(low) = self.split(child)? else {
            return Ok(label.to_string());
        };
        debug!(
            "sink: rotating {} ({}) below {} ({})",
            label,
            attribute,
            child,
            low.condition.attribute()
        );

        // The sibling subtree has to appear under both copies of the old root.
        let mut sibling_copy = self.subdiagram(sibling)?;
        sibling_copy.use_unique_labels(self)?;
        let sibling_copy_root = self.add_decision_diagram(&sibling_copy)?;
        stats.copied_nodes += sibling_copy.node_count();

        // `label` keeps the conditional branch of the child, `twin` takes the else branch.
        let twin = self.unique_label(label);
        self.add_node(twin.clone())?;
        self.redirect_edge(child_edge, &low.then)?;
        if via_then {
            self.add_edge(&twin, &low.otherwise, top.condition.clone())?;
            self.add_else_edge(&twin, &sibling_copy_root)?;
        } else {
            self.add_edge(&twin, &sibling_copy_root, top.condition.clone())?;
            self.add_else_edge(&twin, &low.otherwise)?;
        }
        self.redirect_edge(low.then_edge, label)?;
        self.redirect_edge(low.else_edge, &twin)?;
        stats.rotations += 1;

        let sunk = self.sink(label, stats)?;
        self.redirect_edge(low.then_edge, &sunk)?;
        let sunk = self.sink(&twin, stats)?;
        self.redirect_edge(low.else_edge, &sunk)?;

        Ok(child.clone())
    }

    /// No inner node has an inner child testing a smaller attribute.
    ///
    /// Returns `false` if some inner node is not binary.
    pub fn is_ordered(&self) -> bool {
        self.nodes().filter(|n| n.is_inner()).all(|n| {
            let Ok(Split::Inner(branches)) = self.split(n.label()) else {
                return false;
            };
            let not_smaller = |child: &str| match self.tested_attribute(child) {
                Ok(Some(a)) => a.as_str() >= branches.condition.attribute(),
                Ok(None) => true,
                Err(_) => false,
            };
            not_smaller(&branches.then) && not_smaller(&branches.otherwise)
        })
    }
}
