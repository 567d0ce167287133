//! The decision diagram data model.
//!
//! A [`DecisionDiagram`] owns a set of labelled [`Node`]s and a set of [`Edge`]s, and
//! designates at most one node as its root. Nodes live in an insertion-ordered arena
//! keyed by label, edges in an arena keyed by [`EdgeId`]. Edges refer to their endpoints
//! by label, so cloning a diagram is a plain value copy.
//!
//! # Invariants
//!
//! All of these are checked when the diagram is mutated, and a violation is reported
//! as a [`StructuralViolation`]:
//!
//! - node labels are unique within a diagram;
//! - both endpoints of an edge are members before the edge is added;
//! - leaves have no outgoing edges;
//! - a node has at most one outgoing else edge;
//! - the root, if any, is a member.
//!
//! # Examples
//!
//! ```
//! use dd_merge::diagram::DecisionDiagram;
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
//! assert_eq!(dd.node_count(), 3);
//! assert_eq!(dd.leaf_count(), 2);
//! assert_eq!(dd.edge_count(), 2);
//! assert_eq!(dd.to_string(), r#"a:[v<5 => b:"x", _ => c:"y"]"#);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use log::trace;

use crate::error::{Result, StructuralViolation};
use crate::types::Condition;

/// Opaque identifier of an edge within one diagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeId(usize);

impl EdgeId {
    /// Return the raw index of the edge.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    /// Taken when the condition holds.
    Conditional(Condition),
    /// Taken when none of the parent's conditional edges matched.
    Else,
}

impl EdgeKind {
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            EdgeKind::Conditional(condition) => Some(condition),
            EdgeKind::Else => None,
        }
    }

    pub fn is_else(&self) -> bool {
        matches!(self, EdgeKind::Else)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Edge {
    from: String,
    to: String,
    kind: EdgeKind,
}

impl Edge {
    pub fn from(&self) -> &str {
        &self.from
    }
    pub fn to(&self) -> &str {
        &self.to
    }
    pub fn kind(&self) -> &EdgeKind {
        &self.kind
    }
    pub fn condition(&self) -> Option<&Condition> {
        self.kind.condition()
    }
    pub fn is_else(&self) -> bool {
        self.kind.is_else()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeKind {
    Inner { edges: Vec<EdgeId> },
    Leaf { classification: String },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    label: String,
    kind: NodeKind,
    incoming: Vec<EdgeId>,
}

impl Node {
    fn new(label: String, kind: NodeKind) -> Self {
        Self {
            label,
            kind,
            incoming: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
    pub fn is_inner(&self) -> bool {
        matches!(self.kind, NodeKind::Inner { .. })
    }

    /// Classification of a leaf, `None` for inner nodes.
    pub fn classification(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { classification } => Some(classification),
            NodeKind::Inner { .. } => None,
        }
    }

    /// Outgoing edges in insertion order (always empty for leaves).
    pub fn outgoing(&self) -> &[EdgeId] {
        match &self.kind {
            NodeKind::Inner { edges } => edges,
            NodeKind::Leaf { .. } => &[],
        }
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }
}

/// The two branches of an inner node of a binary diagram.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Branches {
    pub condition: Condition,
    pub then_edge: EdgeId,
    pub then: String,
    pub else_edge: EdgeId,
    pub otherwise: String,
}

/// Binary view of a node: either a leaf, or an inner node with exactly one
/// conditional and one else edge.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Split {
    Leaf(String),
    Inner(Branches),
}

#[derive(Debug, Clone, Default)]
pub struct DecisionDiagram {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<EdgeId, Edge>,
    next_edge: usize,
    root: Option<String>,
    /// Highest `N` ever used in a label `base_N`, per base.
    suffixes: HashMap<String, usize>,
}

/// Returns `proposal` if it is not taken, otherwise the first free `proposal_<i>` with
/// `i >= start`.
fn fresh_label(proposal: &str, start: usize, taken: impl Fn(&str) -> bool) -> String {
    if !taken(proposal) {
        return proposal.to_string();
    }
    let mut i = start.max(1);
    loop {
        let candidate = format!("{}_{}", proposal, i);
        if !taken(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Split a label `base_N` into `(base, N)`.
fn split_suffix(label: &str) -> Option<(&str, usize)> {
    let (base, n) = label.rsplit_once('_')?;
    if base.is_empty() || n.starts_with('0') || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    n.parse().ok().map(|n| (base, n))
}

impl DecisionDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn leaf_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_leaf()).count()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.nodes.contains_key(label)
    }

    pub fn node(&self, label: &str) -> Option<&Node> {
        self.nodes.get(label)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|(&id, edge)| (id, edge))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_leaf())
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub(crate) fn node_or_err(&self, label: &str) -> Result<&Node> {
        self.nodes
            .get(label)
            .ok_or_else(|| StructuralViolation::UnknownNode(label.to_string()))
    }

    pub(crate) fn edge_or_err(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(StructuralViolation::UnknownEdge(id))
    }

    pub(crate) fn root_or_err(&self) -> Result<&str> {
        self.root().ok_or(StructuralViolation::MissingRoot)
    }

    /// Outgoing edges of `label`; empty for leaves and non-members.
    pub fn outgoing(&self, label: &str) -> &[EdgeId] {
        self.nodes.get(label).map(|n| n.outgoing()).unwrap_or(&[])
    }

    /// Incoming edges of `label`; empty for non-members.
    pub fn incoming(&self, label: &str) -> &[EdgeId] {
        self.nodes.get(label).map(|n| n.incoming()).unwrap_or(&[])
    }

    pub fn in_degree(&self, label: &str) -> usize {
        self.incoming(label).len()
    }
    pub fn out_degree(&self, label: &str) -> usize {
        self.outgoing(label).len()
    }

    /// Targets of the outgoing edges of `label`, in edge order.
    pub fn children(&self, label: &str) -> Vec<String> {
        self.outgoing(label)
            .iter()
            .filter_map(|&id| self.edges.get(&id))
            .map(|e| e.to.clone())
            .collect()
    }

    pub fn else_edge(&self, label: &str) -> Option<EdgeId> {
        self.outgoing(label)
            .iter()
            .copied()
            .find(|id| self.edges.get(id).is_some_and(|e| e.is_else()))
    }

    pub fn conditional_edges(&self, label: &str) -> Vec<EdgeId> {
        self.outgoing(label)
            .iter()
            .copied()
            .filter(|id| self.edges.get(id).is_some_and(|e| !e.is_else()))
            .collect()
    }

    /// View `label` as a node of a binary diagram.
    ///
    /// Fails unless the node is a leaf, or an inner node with exactly one conditional
    /// edge and one else edge.
    pub fn split(&self, label: &str) -> Result<Split> {
        let node = self.node_or_err(label)?;
        let edges = match &node.kind {
            NodeKind::Leaf { classification } => return Ok(Split::Leaf(classification.clone())),
            NodeKind::Inner { edges } => edges,
        };

        let conditional = self.conditional_edges(label);
        if conditional.len() != 1 {
            return Err(StructuralViolation::ConditionalEdges {
                label: label.to_string(),
                found: conditional.len(),
            });
        }
        let else_edge = self.else_edge(label).ok_or_else(|| StructuralViolation::OutDegree {
            label: label.to_string(),
            expected: 2,
            found: edges.len(),
        })?;

        let then_edge = conditional[0];
        let cond = self.edge_or_err(then_edge)?;
        let otherwise = self.edge_or_err(else_edge)?;
        Ok(Split::Inner(Branches {
            condition: cond.condition().cloned().ok_or(StructuralViolation::UnknownEdge(then_edge))?,
            then_edge,
            then: cond.to.clone(),
            else_edge,
            otherwise: otherwise.to.clone(),
        }))
    }

    fn insert_node(&mut self, label: String, kind: NodeKind) -> Result<()> {
        if self.nodes.contains_key(&label) {
            return Err(StructuralViolation::DuplicateLabel(label));
        }
        self.note_suffix(&label);
        self.nodes.insert(label.clone(), Node::new(label, kind));
        Ok(())
    }

    /// Add an inner node without edges.
    pub fn add_node(&mut self, label: impl Into<String>) -> Result<()> {
        self.insert_node(label.into(), NodeKind::Inner { edges: Vec::new() })
    }

    pub fn add_leaf_node(&mut self, label: impl Into<String>, classification: impl Into<String>) -> Result<()> {
        self.insert_node(
            label.into(),
            NodeKind::Leaf {
                classification: classification.into(),
            },
        )
    }

    /// Add an edge of the given kind from `from` to `to`.
    pub fn add_edge_kind(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<EdgeId> {
        self.node_or_err(to)?;
        let source = self.node_or_err(from)?;
        match &source.kind {
            NodeKind::Leaf { .. } => return Err(StructuralViolation::LeafEdge(from.to_string())),
            NodeKind::Inner { .. } => {}
        }
        if kind.is_else() && self.else_edge(from).is_some() {
            return Err(StructuralViolation::MultipleElseEdges(from.to_string()));
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                from: from.to_string(),
                to: to.to_string(),
                kind,
            },
        );
        if let Some(Node {
            kind: NodeKind::Inner { edges },
            ..
        }) = self.nodes.get_mut(from)
        {
            edges.push(id);
        }
        if let Some(target) = self.nodes.get_mut(to) {
            target.incoming.push(id);
        }
        Ok(id)
    }

    pub fn add_edge(&mut self, from: &str, to: &str, condition: Condition) -> Result<EdgeId> {
        self.add_edge_kind(from, to, EdgeKind::Conditional(condition))
    }

    pub fn add_else_edge(&mut self, from: &str, to: &str) -> Result<EdgeId> {
        self.add_edge_kind(from, to, EdgeKind::Else)
    }

    /// Detach the edge from both endpoints and discard it.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.edges.shift_remove(&id).ok_or(StructuralViolation::UnknownEdge(id))?;
        if let Some(Node {
            kind: NodeKind::Inner { edges },
            ..
        }) = self.nodes.get_mut(&edge.from)
        {
            edges.retain(|&e| e != id);
        }
        if let Some(target) = self.nodes.get_mut(&edge.to) {
            target.incoming.retain(|&e| e != id);
        }
        Ok(edge)
    }

    /// Remove a node.
    ///
    /// Fails if the node still has incident edges, unless `force_remove_edges` is set,
    /// in which case those edges are removed first. Removing the root leaves the
    /// diagram without a root.
    pub fn remove_node(&mut self, label: &str, force_remove_edges: bool) -> Result<Node> {
        let node = self.node_or_err(label)?;
        let mut incident: Vec<EdgeId> = node.outgoing().iter().chain(node.incoming()).copied().collect();
        incident.sort();
        incident.dedup();

        if !incident.is_empty() {
            if !force_remove_edges {
                return Err(StructuralViolation::IncidentEdges {
                    label: label.to_string(),
                    count: incident.len(),
                });
            }
            for id in incident {
                self.remove_edge(id)?;
            }
        }

        if self.root.as_deref() == Some(label) {
            self.root = None;
        }
        self.nodes
            .shift_remove(label)
            .ok_or_else(|| StructuralViolation::UnknownNode(label.to_string()))
    }

    pub fn set_root(&mut self, label: &str) -> Result<()> {
        self.node_or_err(label)?;
        self.root = Some(label.to_string());
        Ok(())
    }

    /// Overwrite the classification of a leaf.
    pub fn set_classification(&mut self, label: &str, classification: impl Into<String>) -> Result<()> {
        match self.nodes.get_mut(label).map(|n| &mut n.kind) {
            Some(NodeKind::Leaf { classification: c }) => {
                *c = classification.into();
                Ok(())
            }
            Some(NodeKind::Inner { .. }) => Err(StructuralViolation::NotALeaf(label.to_string())),
            None => Err(StructuralViolation::UnknownNode(label.to_string())),
        }
    }

    /// Point an existing edge at a different target node.
    pub fn redirect_edge(&mut self, id: EdgeId, to: &str) -> Result<()> {
        self.node_or_err(to)?;
        let edge = self.edges.get_mut(&id).ok_or(StructuralViolation::UnknownEdge(id))?;
        if edge.to == to {
            return Ok(());
        }
        let old = std::mem::replace(&mut edge.to, to.to_string());
        if let Some(node) = self.nodes.get_mut(&old) {
            node.incoming.retain(|&e| e != id);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.incoming.push(id);
        }
        Ok(())
    }

    /// Rename a node in place. Incident edges and the root designation follow it.
    pub fn rename_node(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        if old == new {
            return self.node_or_err(old).map(|_| ());
        }
        if self.nodes.contains_key(&new) {
            return Err(StructuralViolation::DuplicateLabel(new));
        }
        let index = self
            .nodes
            .get_index_of(old)
            .ok_or_else(|| StructuralViolation::UnknownNode(old.to_string()))?;
        let Some(mut node) = self.nodes.shift_remove(old) else {
            return Err(StructuralViolation::UnknownNode(old.to_string()));
        };
        trace!("rename {} -> {}", old, new);

        for id in node.outgoing() {
            if let Some(edge) = self.edges.get_mut(id) {
                edge.from = new.clone();
            }
        }
        for id in node.incoming() {
            if let Some(edge) = self.edges.get_mut(id) {
                edge.to = new.clone();
            }
        }
        if self.root.as_deref() == Some(old) {
            self.root = Some(new.clone());
        }
        self.note_suffix(&new);
        node.label = new.clone();
        self.nodes.shift_insert(index, new, node);
        Ok(())
    }

    /// Returns `proposal` if it is free, else the first free `proposal_1`, `proposal_2`, ...
    ///
    /// This is a pure query: the diagram is not modified, so the label stays free only
    /// until it is used. Suffixes start above the highest one ever used for `proposal`
    /// in this diagram, so repeated requests do not rescan the taken ones.
    pub fn unique_label(&self, proposal: &str) -> String {
        fresh_label(proposal, self.next_suffix(proposal), |l| self.contains(l))
    }

    fn next_suffix(&self, base: &str) -> usize {
        self.suffixes.get(base).map_or(1, |&n| n + 1)
    }

    fn note_suffix(&mut self, label: &str) {
        if let Some((base, n)) = split_suffix(label) {
            let highest = self.suffixes.entry(base.to_string()).or_insert(0);
            *highest = (*highest).max(n);
        }
    }

    /// Rename every node of `self` whose label also occurs in `other`.
    ///
    /// New labels use the same suffixing scheme as [`unique_label`][Self::unique_label]
    /// and are free in both diagrams, so the renaming never introduces new collisions.
    pub fn use_unique_labels(&mut self, other: &DecisionDiagram) -> Result<()> {
        let colliding: Vec<String> = self.nodes.keys().filter(|l| other.contains(l)).cloned().collect();
        for label in colliding {
            let start = self.next_suffix(&label).max(other.next_suffix(&label));
            let fresh = fresh_label(&label, start, |l| self.contains(l) || other.contains(l));
            self.rename_node(&label, fresh)?;
        }
        Ok(())
    }

    /// Deep-copy every node and edge of `other` into `self`.
    ///
    /// Returns the label of the copy of `other`'s root. Fails without modifying `self`
    /// if `other` has no root or if any of its labels is already taken; call
    /// [`use_unique_labels`][Self::use_unique_labels] on `other` first when collisions
    /// are possible.
    pub fn add_decision_diagram(&mut self, other: &DecisionDiagram) -> Result<String> {
        let root = other.root_or_err()?.to_string();
        if let Some(label) = other.nodes.keys().find(|l| self.contains(l)) {
            return Err(StructuralViolation::DuplicateLabel(label.clone()));
        }

        for node in other.nodes() {
            self.insert_node(node.label.clone(), node.kind.without_edges())?;
        }
        for (_, edge) in other.edges() {
            self.add_edge_kind(&edge.from, &edge.to, edge.kind.clone())?;
        }
        Ok(root)
    }

    /// Copy of everything reachable from `label`, rooted at `label`.
    pub fn subdiagram(&self, label: &str) -> Result<DecisionDiagram> {
        self.node_or_err(label)?;

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![label.to_string()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for child in self.children(&current).into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
            order.push(current);
        }

        let mut sub = DecisionDiagram::new();
        for current in &order {
            let node = self.node_or_err(current)?;
            sub.insert_node(current.clone(), node.kind.without_edges())?;
        }
        for current in &order {
            for &id in self.outgoing(current) {
                let edge = self.edge_or_err(id)?;
                sub.add_edge_kind(&edge.from, &edge.to, edge.kind.clone())?;
            }
        }
        sub.set_root(label)?;
        Ok(sub)
    }

    /// Compact one-line rendering of the subgraph below `label`.
    ///
    /// ```text
    /// a:[v<5 => b:"x", _ => c:"y"]
    /// ```
    ///
    /// A node that is revisited on the current path is printed as `label:...`.
    pub fn to_bracket_string(&self, label: &str) -> String {
        let mut path = Vec::new();
        let mut out = String::new();
        self.write_bracket(label, &mut path, &mut out);
        out
    }

    fn write_bracket(&self, label: &str, path: &mut Vec<String>, out: &mut String) {
        let Some(node) = self.nodes.get(label) else {
            out.push('?');
            return;
        };
        if path.iter().any(|l| l == label) {
            out.push_str(label);
            out.push_str(":...");
            return;
        }
        match &node.kind {
            NodeKind::Leaf { classification } => {
                out.push_str(&format!("{}:{:?}", label, classification));
            }
            NodeKind::Inner { edges } => {
                out.push_str(label);
                out.push_str(":[");
                path.push(label.to_string());
                for (i, id) in edges.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let Some(edge) = self.edges.get(id) else {
                        continue;
                    };
                    match &edge.kind {
                        EdgeKind::Conditional(c) => out.push_str(&c.to_string()),
                        EdgeKind::Else => out.push('_'),
                    }
                    out.push_str(" => ");
                    self.write_bracket(&edge.to, path, out);
                }
                path.pop();
                out.push(']');
            }
        }
    }
}

impl NodeKind {
    fn without_edges(&self) -> NodeKind {
        match self {
            NodeKind::Inner { .. } => NodeKind::Inner { edges: Vec::new() },
            NodeKind::Leaf { classification } => NodeKind::Leaf {
                classification: classification.clone(),
            },
        }
    }
}

impl fmt::Display for DecisionDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => f.write_str(&self.to_bracket_string(root)),
            None => f.write_str("<no root>"),
        }
    }
}
