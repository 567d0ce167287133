//! # dd-merge: Structural merging of decision diagrams
//!
//! **`dd-merge`** consolidates classification knowledge contributed by independent
//! sources. Each source describes its knowledge as a **decision diagram**: a rooted
//! graph of attribute tests leading to classification leaves. Diagrams are exchanged
//! between pipeline stages as flat sets of logical facts, and recombined by one of
//! several merge strategies.
//!
//! ## What is a decision diagram here?
//!
//! An inner node has any number of *conditional* edges, each guarded by a test such
//! as `v < 5`, and at most one *else* edge taken when none of them matches. A leaf
//! carries a classification. Several edges may share a target, so a diagram is in
//! general a DAG rather than a tree.
//!
//! ## Pipeline
//!
//! 1. **Decode** a fact set into a [`DecisionDiagram`][crate::diagram::DecisionDiagram]
//!    ([`facts`]).
//! 2. **Normalize** it into an ordered binary tree ([`normalize`], [`reorder`]).
//! 3. **Merge** two diagrams by threshold averaging or majority voting ([`merge`]).
//! 4. **Encode** the result back into a fact set.
//!
//! The [`operator`] module packages these steps behind a uniform interface.
//!
//! ## Basic Usage
//!
//! ```rust
//! use dd_merge::diagram::DecisionDiagram;
//! use dd_merge::facts::parse_facts;
//! use dd_merge::merge::Merger;
//!
//! let left = parse_facts(r#"
//!     innernode(a). leafnode(b,"x"). leafnode(c,"y").
//!     conditionaledge(a,b,"v","<","4"). elseedge(a,c). root(a).
//! "#).unwrap();
//! let right = parse_facts(r#"
//!     innernode(a). leafnode(b,"x"). leafnode(c,"y").
//!     conditionaledge(a,b,"v","<","6"). elseedge(a,c). root(a).
//! "#).unwrap();
//!
//! let left = DecisionDiagram::from_facts(&left).unwrap().normalized().unwrap();
//! let right = DecisionDiagram::from_facts(&right).unwrap().normalized().unwrap();
//!
//! let merged = Merger::default().average(&left, &right).unwrap();
//! assert_eq!(merged.to_string(), r#"a:[v<5 => b:"x", _ => c:"y"]"#);
//! ```
//!
//! ## Core Components
//!
//! - **[`diagram`]**: The data model and its structural invariants.
//! - **[`facts`]**: Fact-set encoding, as values and as text.
//! - **[`normalize`]** and **[`reorder`]**: Cycle detection, unfolding, fan-out reduction
//!   and variable ordering.
//! - **[`merge`]**: Threshold averaging and majority voting.
//! - **[`paths`]** and **[`dot`]**: Inspection and visualization.

pub mod config;
pub mod diagram;
pub mod dot;
pub mod error;
pub mod facts;
pub mod merge;
pub mod normalize;
pub mod operator;
pub mod paths;
pub mod reorder;
pub mod types;
