//! Decision diagram to DOT (Graphviz) conversion.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **Inner nodes** are ellipses labelled with their tested attribute, grouped by
//!   attribute (same rank)
//! - **Leaves** are boxes labelled with their classification, at the bottom (sink rank)
//! - **Edges**:
//!   - Solid lines represent conditional edges, labelled with their condition
//!   - Dashed lines represent else edges
//! - The **root** is drawn bold
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
//! let dot = dd.to_dot().unwrap();
//! assert!(dot.contains(r#""a" -> "b" [style=solid, label="v<5"];"#));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::diagram::{DecisionDiagram, EdgeKind, NodeKind};

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings.
///
/// ```
/// use dd_merge::dot::DotConfig;
///
/// let config = DotConfig {
///     show_node_labels: true,
///     ..DotConfig::default()
/// };
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for inner nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Shape for leaves (default: "box")
    pub leaf_shape: &'static str,
    /// Style for the root node (default: "bold")
    pub root_style: &'static str,
    /// Style for conditional edges (default: "solid")
    pub conditional_edge_style: &'static str,
    /// Style for else edges (default: "dashed")
    pub else_edge_style: &'static str,
    /// Whether to put inner nodes testing the same attribute on one rank (default: true)
    pub rank_by_attribute: bool,
    /// Whether to prefix node captions with the node label (default: false)
    pub show_node_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            leaf_shape: "box",
            root_style: "bold",
            conditional_edge_style: "solid",
            else_edge_style: "dashed",
            rank_by_attribute: true,
            show_node_labels: false,
        }
    }
}

/// Quote a string as a DOT identifier.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl DecisionDiagram {
    /// Converts the diagram to DOT (Graphviz) format with default settings.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the diagram to DOT format with custom configuration.
    ///
    /// Every node is rendered, including nodes not reachable from the root.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        let caption = |label: &str, text: &str| {
            if config.show_node_labels {
                quoted(&format!("{}: {}", label, text))
            } else {
                quoted(text)
            }
        };

        // Inner nodes, grouped by the attribute they test.
        let mut ranks = BTreeMap::<String, Vec<&str>>::new();
        for node in self.nodes().filter(|n| n.is_inner()) {
            let attribute = self
                .conditional_edges(node.label())
                .first()
                .and_then(|&id| self.edge(id))
                .and_then(|e| e.condition())
                .map(|c| c.attribute().to_string())
                .unwrap_or_default();
            ranks.entry(attribute).or_default().push(node.label());
        }
        for (attribute, labels) in &ranks {
            let grouped = config.rank_by_attribute && !attribute.is_empty();
            if grouped {
                writeln!(dot, "{{ rank=same")?;
            }
            for &label in labels {
                let text = if attribute.is_empty() { label } else { attribute.as_str() };
                writeln!(dot, "{} [label={}];", quoted(label), caption(label, text))?;
            }
            if grouped {
                writeln!(dot, "}}")?;
            }
        }

        // Leaves at the bottom.
        writeln!(dot, "{{ rank=sink")?;
        for node in self.nodes() {
            if let NodeKind::Leaf { classification } = node.kind() {
                writeln!(
                    dot,
                    "{} [shape={}, label={}];",
                    quoted(node.label()),
                    config.leaf_shape,
                    caption(node.label(), classification)
                )?;
            }
        }
        writeln!(dot, "}}")?;

        if let Some(root) = self.root() {
            writeln!(dot, "{} [style={}];", quoted(root), config.root_style)?;
        }

        for (_, edge) in self.edges() {
            let (from, to) = (quoted(edge.from()), quoted(edge.to()));
            match edge.kind() {
                EdgeKind::Conditional(condition) => writeln!(
                    dot,
                    "{} -> {} [style={}, label={}];",
                    from,
                    to,
                    config.conditional_edge_style,
                    quoted(&condition.to_string())
                )?,
                EdgeKind::Else => writeln!(dot, "{} -> {} [style={}];", from, to, config.else_edge_style)?,
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Comparator, Condition};

    fn sample() -> DecisionDiagram {
        let mut dd = DecisionDiagram::new();
        dd.add_node("a").unwrap();
        dd.add_node("d").unwrap();
        dd.add_leaf_node("b", "x").unwrap();
        dd.add_leaf_node("c", "say \"hi\"").unwrap();
        dd.add_edge("a", "d", Condition::new("v", Comparator::Lt, "5")).unwrap();
        dd.add_else_edge("a", "c").unwrap();
        dd.add_edge("d", "b", Condition::new("w", Comparator::Ge, "1")).unwrap();
        dd.add_else_edge("d", "c").unwrap();
        dd.set_root("a").unwrap();
        dd
    }

    /// Basic test: verify DOT output is generated without errors
    #[test]
    fn test_to_dot_basic() {
        let dot = sample().to_dot().unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains(r#""a" [label="v"];"#));
        assert!(dot.contains(r#""b" [shape=box, label="x"];"#));
        assert!(dot.contains(r#""a" [style=bold];"#));
        assert!(dot.contains(r#""d" -> "b" [style=solid, label="w>=1"];"#));
        assert!(dot.contains(r#""d" -> "c" [style=dashed];"#));
    }

    #[test]
    fn test_to_dot_escapes_quotes() {
        let dot = sample().to_dot().unwrap();
        assert!(dot.contains(r#"label="say \"hi\"""#));
    }

    #[test]
    fn test_to_dot_empty() {
        let dot = DecisionDiagram::new().to_dot().unwrap();
        assert_eq!(dot, "digraph {\nnode [shape=ellipse];\n{ rank=sink\n}\n}\n");
    }

    /// Test with custom configuration
    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            rank_by_attribute: false,
            show_node_labels: true,
            ..DotConfig::default()
        };
        let dot = sample().to_dot_with_config(&config).unwrap();
        assert!(!dot.contains("rank=same"));
        assert!(dot.contains(r#""a" [label="a: v"];"#));
        assert!(dot.contains(r#""b" [shape=box, label="b: x"];"#));
    }
}
