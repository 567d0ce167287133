//! Fact-set encoding of decision diagrams.
//!
//! Diagrams travel between pipeline stages as sets of logical facts:
//!
//! ```text
//! innernode(Label)
//! leafnode(Label, Classification)
//! conditionaledge(From, To, Operand1, Operator, Operand2)
//! elseedge(From, To)
//! root(Label)
//! ```
//!
//! The set is unordered. [`DecisionDiagram::from_facts`] and
//! [`DecisionDiagram::to_facts`] are mutually inverse on every fact set accepted by
//! `from_facts`.
//!
//! # Textual form
//!
//! [`to_text`] renders one atom per line, terminated by a period. Labels are printed
//! bare when they are plain identifiers, every other term is quoted:
//!
//! ```text
//! conditionaledge(a,b,"v","<","5").
//! elseedge(a,c).
//! innernode(a).
//! ```
//!
//! [`parse_facts`] reads the same syntax back, accepting bare or quoted terms and
//! `%` line comments.
//!
//! # Examples
//!
//! ```
//! use dd_merge::diagram::DecisionDiagram;
//! use dd_merge::facts::parse_facts;
//!
//! let facts = parse_facts(r#"
//!     innernode(a). leafnode(b,"x"). leafnode(c,"y").
//!     conditionaledge(a,b,"v","<","5"). elseedge(a,c).
//!     root(a).
//! "#).unwrap();
//!
//! let dd = DecisionDiagram::from_facts(&facts).unwrap();
//! assert_eq!(dd.node_count(), 3);
//! assert_eq!(dd.to_facts(), facts);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use log::debug;

use crate::diagram::{DecisionDiagram, EdgeKind, NodeKind};
use crate::error::{Result, StructuralViolation};
use crate::types::{Comparator, Condition};

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Fact {
    InnerNode(String),
    LeafNode {
        label: String,
        classification: String,
    },
    ConditionalEdge {
        from: String,
        to: String,
        operand1: String,
        operator: String,
        operand2: String,
    },
    ElseEdge {
        from: String,
        to: String,
    },
    Root(String),
}

pub type FactSet = BTreeSet<Fact>;

impl Fact {
    pub fn predicate(&self) -> &'static str {
        match self {
            Fact::InnerNode(_) => "innernode",
            Fact::LeafNode { .. } => "leafnode",
            Fact::ConditionalEdge { .. } => "conditionaledge",
            Fact::ElseEdge { .. } => "elseedge",
            Fact::Root(_) => "root",
        }
    }

    /// Builds a fact from its predicate name and argument terms.
    pub fn from_terms(predicate: &str, mut terms: Vec<String>) -> Result<Self> {
        let arity = terms.len();
        let malformed = || StructuralViolation::MalformedFact(format!("{}/{}", predicate, arity));
        let fact = match (predicate, arity) {
            ("innernode", 1) => Fact::InnerNode(terms.remove(0)),
            ("root", 1) => Fact::Root(terms.remove(0)),
            ("leafnode", 2) => {
                let classification = terms.pop().ok_or_else(malformed)?;
                let label = terms.pop().ok_or_else(malformed)?;
                Fact::LeafNode { label, classification }
            }
            ("elseedge", 2) => {
                let to = terms.pop().ok_or_else(malformed)?;
                let from = terms.pop().ok_or_else(malformed)?;
                Fact::ElseEdge { from, to }
            }
            ("conditionaledge", 5) => {
                let mut terms = terms.into_iter();
                let mut next = || terms.next().ok_or_else(malformed);
                Fact::ConditionalEdge {
                    from: next()?,
                    to: next()?,
                    operand1: next()?,
                    operator: next()?,
                    operand2: next()?,
                }
            }
            _ => return Err(malformed()),
        };
        Ok(fact)
    }
}

fn is_plain_identifier(term: &str) -> bool {
    let mut chars = term.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, term: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in term.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_label(f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
    if is_plain_identifier(label) {
        f.write_str(label)
    } else {
        write_quoted(f, label)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate())?;
        match self {
            Fact::InnerNode(label) | Fact::Root(label) => write_label(f, label)?,
            Fact::LeafNode { label, classification } => {
                write_label(f, label)?;
                f.write_str(",")?;
                write_quoted(f, classification)?;
            }
            Fact::ConditionalEdge {
                from,
                to,
                operand1,
                operator,
                operand2,
            } => {
                write_label(f, from)?;
                f.write_str(",")?;
                write_label(f, to)?;
                for term in [operand1, operator, operand2] {
                    f.write_str(",")?;
                    write_quoted(f, term)?;
                }
            }
            Fact::ElseEdge { from, to } => {
                write_label(f, from)?;
                f.write_str(",")?;
                write_label(f, to)?;
            }
        }
        f.write_str(")")
    }
}

/// Render a fact set, one `atom.` per line.
pub fn to_text(facts: &FactSet) -> String {
    let mut out = String::new();
    for fact in facts {
        out.push_str(&fact.to_string());
        out.push_str(".\n");
    }
    out
}

/// Parse a fact set from its textual form.
pub fn parse_facts(text: &str) -> Result<FactSet> {
    let mut parser = FactParser {
        text,
        chars: text.char_indices().peekable(),
    };
    let mut facts = FactSet::new();
    while let Some(fact) = parser.next_fact()? {
        facts.insert(fact);
    }
    Ok(facts)
}

struct FactParser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl FactParser<'_> {
    fn error(&mut self, message: &str) -> StructuralViolation {
        let position = self.chars.peek().map_or(self.text.len(), |&(i, _)| i);
        StructuralViolation::MalformedFact(format!("{} at offset {}", message, position))
    }

    fn skip_blank(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '%' {
                while let Some((_, c)) = self.chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_blank();
        if self.chars.peek().map(|&(_, c)| c) == Some(expected) {
            self.chars.next();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn next_fact(&mut self) -> Result<Option<Fact>> {
        self.skip_blank();
        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let mut predicate = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                predicate.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if predicate.is_empty() {
            return Err(self.error("expected predicate"));
        }

        self.expect('(')?;
        let mut terms = vec![self.term()?];
        loop {
            self.skip_blank();
            match self.chars.next() {
                Some((_, ',')) => terms.push(self.term()?),
                Some((_, ')')) => break,
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        self.expect('.')?;

        Fact::from_terms(&predicate, terms).map(Some)
    }

    fn term(&mut self) -> Result<String> {
        self.skip_blank();
        match self.chars.peek().map(|&(_, c)| c) {
            Some('"') => {
                self.chars.next();
                self.quoted()
            }
            Some(_) => {
                let mut term = String::new();
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == ',' || c == ')' || c.is_whitespace() {
                        break;
                    }
                    term.push(c);
                    self.chars.next();
                }
                if term.is_empty() {
                    Err(self.error("expected term"))
                } else {
                    Ok(term)
                }
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn quoted(&mut self) -> Result<String> {
        let mut term = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(term),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => term.push('\n'),
                    Some((_, c)) => term.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some((_, c)) => term.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

impl DecisionDiagram {
    /// Build a diagram from its fact encoding.
    ///
    /// Nodes are created first, then edges, then the root. Fails if a label is
    /// declared twice, an edge references an undeclared label, an operator is not
    /// one of `<`, `<=`, `=`, `>=`, `>`, or the number of `root` facts is not one.
    pub fn from_facts<'a>(facts: impl IntoIterator<Item = &'a Fact>) -> Result<Self> {
        let facts: Vec<&Fact> = facts.into_iter().collect();
        let mut dd = DecisionDiagram::new();

        for fact in &facts {
            match fact {
                Fact::InnerNode(label) => dd.add_node(label.clone())?,
                Fact::LeafNode { label, classification } => dd.add_leaf_node(label.clone(), classification.clone())?,
                _ => {}
            }
        }

        for fact in &facts {
            match fact {
                Fact::ConditionalEdge {
                    from,
                    to,
                    operand1,
                    operator,
                    operand2,
                } => {
                    let comparator: Comparator = operator.parse()?;
                    dd.add_edge(from, to, Condition::new(operand1.clone(), comparator, operand2.clone()))?;
                }
                Fact::ElseEdge { from, to } => {
                    dd.add_else_edge(from, to)?;
                }
                _ => {}
            }
        }

        let roots: Vec<&String> = facts
            .iter()
            .filter_map(|fact| match fact {
                Fact::Root(label) => Some(label),
                _ => None,
            })
            .collect();
        match roots.as_slice() {
            [] => return Err(StructuralViolation::MissingRoot),
            [root] => dd.set_root(root)?,
            _ => return Err(StructuralViolation::MultipleRoots(roots.len())),
        }

        debug!(
            "from_facts: {} facts -> {} nodes, {} edges",
            facts.len(),
            dd.node_count(),
            dd.edge_count()
        );
        Ok(dd)
    }

    /// Encode the diagram as a fact set.
    pub fn to_facts(&self) -> FactSet {
        let mut facts = FactSet::new();
        for node in self.nodes() {
            facts.insert(match node.kind() {
                NodeKind::Inner { .. } => Fact::InnerNode(node.label().to_string()),
                NodeKind::Leaf { classification } => Fact::LeafNode {
                    label: node.label().to_string(),
                    classification: classification.clone(),
                },
            });
        }
        for (_, edge) in self.edges() {
            facts.insert(match edge.kind() {
                EdgeKind::Conditional(condition) => Fact::ConditionalEdge {
                    from: edge.from().to_string(),
                    to: edge.to().to_string(),
                    operand1: condition.operand1.clone(),
                    operator: condition.comparator.to_string(),
                    operand2: condition.operand2.clone(),
                },
                EdgeKind::Else => Fact::ElseEdge {
                    from: edge.from().to_string(),
                    to: edge.to().to_string(),
                },
            });
        }
        if let Some(root) = self.root() {
            facts.insert(Fact::Root(root.to_string()));
        }
        facts
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn inner(label: &str) -> Fact {
        Fact::InnerNode(label.to_string())
    }

    fn leaf(label: &str, classification: &str) -> Fact {
        Fact::LeafNode {
            label: label.to_string(),
            classification: classification.to_string(),
        }
    }

    fn cond(from: &str, to: &str, operand1: &str, operator: &str, operand2: &str) -> Fact {
        Fact::ConditionalEdge {
            from: from.to_string(),
            to: to.to_string(),
            operand1: operand1.to_string(),
            operator: operator.to_string(),
            operand2: operand2.to_string(),
        }
    }

    fn otherwise(from: &str, to: &str) -> Fact {
        Fact::ElseEdge {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn root(label: &str) -> Fact {
        Fact::Root(label.to_string())
    }

    fn scenario_a() -> FactSet {
        FactSet::from([
            inner("a"),
            leaf("b", "x"),
            leaf("c", "y"),
            cond("a", "b", "v", "<", "5"),
            otherwise("a", "c"),
            root("a"),
        ])
    }

    #[test]
    fn test_roundtrip_scenario_a() {
        let facts = scenario_a();
        let dd = DecisionDiagram::from_facts(&facts).unwrap();
        assert_eq!(dd.node_count(), 3);
        assert_eq!(dd.edge_count(), 2);
        assert_eq!(dd.root(), Some("a"));
        assert_eq!(dd.to_facts(), facts);
    }

    #[test]
    fn test_roundtrip_dag() {
        let facts = FactSet::from([
            inner("a"),
            inner("b"),
            leaf("c", "x"),
            leaf("d", "y"),
            cond("a", "b", "v", "<=", "1.5"),
            cond("a", "c", "w", "=", "red"),
            otherwise("a", "d"),
            cond("b", "c", "u", ">", "0"),
            cond("b", "c", "u", ">=", "-4"),
            otherwise("b", "d"),
            root("a"),
        ]);
        let dd = DecisionDiagram::from_facts(&facts).unwrap();
        assert_eq!(dd.to_facts(), facts);
    }

    #[test]
    fn test_multiple_roots() {
        let mut facts = scenario_a();
        facts.insert(root("b"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::MultipleRoots(2)
        );
    }

    #[test]
    fn test_missing_root() {
        let mut facts = scenario_a();
        facts.remove(&root("a"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::MissingRoot
        );
    }

    #[test]
    fn test_root_must_be_declared() {
        let mut facts = scenario_a();
        facts.remove(&root("a"));
        facts.insert(root("zzz"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::UnknownNode("zzz".to_string())
        );
    }

    #[test]
    fn test_dangling_edge() {
        let mut facts = scenario_a();
        facts.insert(otherwise("b", "q"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::UnknownNode("q".to_string())
        );
    }

    #[test]
    fn test_unknown_operator() {
        let mut facts = scenario_a();
        facts.insert(cond("a", "c", "v", "<>", "5"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::UnknownComparator("<>".to_string())
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut facts = scenario_a();
        facts.insert(inner("b"));
        assert_eq!(
            DecisionDiagram::from_facts(&facts).unwrap_err(),
            StructuralViolation::DuplicateLabel("b".to_string())
        );
    }

    #[test]
    fn test_to_text() {
        let text = to_text(&scenario_a());
        assert_eq!(
            text,
            concat!(
                "innernode(a).\n",
                "leafnode(b,\"x\").\n",
                "leafnode(c,\"y\").\n",
                "conditionaledge(a,b,\"v\",\"<\",\"5\").\n",
                "elseedge(a,c).\n",
                "root(a).\n",
            )
        );
    }

    #[test]
    fn test_parse_text() {
        let facts = parse_facts(&to_text(&scenario_a())).unwrap();
        assert_eq!(facts, scenario_a());
    }

    #[test]
    fn test_parse_bare_and_quoted() {
        let text = r#"
            % a comment
            innernode("Node A").
            leafnode( b , x ).   % trailing comment
            conditionaledge("Node A", b, v, "<=", -2.5).
            leafnode(c, "say \"hi\"").
            elseedge("Node A", c).
            root("Node A").
        "#;
        let facts = parse_facts(text).unwrap();
        assert!(facts.contains(&inner("Node A")));
        assert!(facts.contains(&leaf("b", "x")));
        assert!(facts.contains(&leaf("c", "say \"hi\"")));
        assert!(facts.contains(&cond("Node A", "b", "v", "<=", "-2.5")));

        let dd = DecisionDiagram::from_facts(&facts).unwrap();
        assert_eq!(parse_facts(&to_text(&dd.to_facts())).unwrap(), facts);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_facts("innernode(a)"),
            Err(StructuralViolation::MalformedFact(_))
        ));
        assert!(matches!(
            parse_facts("innernode(a, b)."),
            Err(StructuralViolation::MalformedFact(_))
        ));
        assert!(matches!(
            parse_facts("edge(a, b)."),
            Err(StructuralViolation::MalformedFact(_))
        ));
        assert!(matches!(
            parse_facts("leafnode(a, \"x)."),
            Err(StructuralViolation::MalformedFact(_))
        ));
        assert!(matches!(parse_facts("(a)."), Err(StructuralViolation::MalformedFact(_))));
        assert_eq!(parse_facts("  % nothing here\n").unwrap(), FactSet::new());
    }
}
