//! End-to-end tests: facts in, normalization and merging, facts out.

use std::collections::BTreeSet;

use dd_merge::diagram::DecisionDiagram;
use dd_merge::error::StructuralViolation;
use dd_merge::facts::{parse_facts, to_text, Fact, FactSet};
use dd_merge::merge::{Merger, UNKNOWN};
use dd_merge::operator::{operator, OperatorError};
use dd_merge::paths::Step;
use dd_merge::types::{Comparator, Condition};

fn diagram(text: &str) -> DecisionDiagram {
    DecisionDiagram::from_facts(&parse_facts(text).unwrap()).unwrap()
}

/// Tested attributes along every root-to-leaf path.
fn attribute_sequences(dd: &DecisionDiagram) -> Vec<Vec<String>> {
    dd.paths()
        .unwrap()
        .into_iter()
        .map(|p| {
            p.steps
                .into_iter()
                .filter_map(|s| match s {
                    Step::Conditional(c) => Some(c.operand1),
                    Step::Else => None,
                })
                .collect()
        })
        .collect()
}

fn classifications(dd: &DecisionDiagram) -> BTreeSet<String> {
    dd.leaves()
        .filter_map(|n| n.classification())
        .map(str::to_string)
        .collect()
}

/// `r` tests `b`, its conditional child `s` tests `a`, and leaf `x` is shared.
const SHARED: &str = r#"
    % r:[b<2 => s:[a<1 => x, _ => y], _ => x]
    innernode(r). innernode(s).
    leafnode(x,"p"). leafnode(y,"q").
    conditionaledge(r,s,"b","<","2"). elseedge(r,x).
    conditionaledge(s,x,"a","<","1"). elseedge(s,y).
    root(r).
"#;

// ─── Serialization ─────────────────────────────────────────────────────────────

#[test]
fn scenario_round_trip() {
    let facts: FactSet = [
        Fact::InnerNode("a".to_string()),
        Fact::LeafNode {
            label: "b".to_string(),
            classification: "x".to_string(),
        },
        Fact::LeafNode {
            label: "c".to_string(),
            classification: "y".to_string(),
        },
        Fact::ConditionalEdge {
            from: "a".to_string(),
            to: "b".to_string(),
            operand1: "v".to_string(),
            operator: "<".to_string(),
            operand2: "5".to_string(),
        },
        Fact::ElseEdge {
            from: "a".to_string(),
            to: "c".to_string(),
        },
        Fact::Root("a".to_string()),
    ]
    .into_iter()
    .collect();

    let dd = DecisionDiagram::from_facts(&facts).unwrap();
    assert_eq!(dd.to_facts(), facts);
    assert_eq!(parse_facts(&to_text(&facts)).unwrap(), facts);
}

#[test]
fn round_trip_of_merged_diagram() {
    let left = diagram(SHARED).normalized().unwrap();
    let merged = Merger::default().average(&left, &left).unwrap();
    let facts = merged.to_facts();
    assert_eq!(DecisionDiagram::from_facts(&facts).unwrap().to_facts(), facts);
}

// ─── Model ─────────────────────────────────────────────────────────────────────

#[test]
fn unique_labels_stay_fresh() {
    let mut dd = diagram(SHARED);
    let mut seen = BTreeSet::new();
    for _ in 0..5 {
        let label = dd.unique_label("s");
        assert!(!dd.contains(&label));
        assert!(seen.insert(label.clone()));
        dd.add_node(label).unwrap();
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), ["s_1", "s_2", "s_3", "s_4", "s_5"]);
}

// ─── Normalization ─────────────────────────────────────────────────────────────

#[test]
fn cycle_detection() {
    let acyclic = diagram(SHARED);
    assert!(acyclic.contains_cycles().is_empty());

    let cyclic = diagram(
        r#"innernode(a). innernode(b). innernode(c). leafnode(d,"z").
           elseedge(a,b). elseedge(b,c). elseedge(c,a).
           conditionaledge(c,d,"v","=","0"). root(a)."#,
    );
    assert_eq!(cyclic.contains_cycles(), ["a", "b", "c", "a"]);
    assert!(matches!(cyclic.normalized(), Err(StructuralViolation::Cycle(_))));
}

#[test]
fn scenario_fan_out_reduction() {
    let mut dd = diagram(
        r#"innernode(r). leafnode(x,"p"). leafnode(y,"q"). leafnode(z,"s").
           conditionaledge(r,x,"a","<","1").
           conditionaledge(r,y,"b","<","2").
           conditionaledge(r,z,"c","<","3").
           root(r)."#,
    );
    let mut before = dd.paths().unwrap();
    dd.to_binary().unwrap();

    assert!(dd.is_binary());
    assert_eq!(dd.out_degree("r"), 2);
    assert_eq!(dd.conditional_edges("r").len(), 1);
    assert_eq!(dd.out_degree("r_1"), 2);
    assert_eq!(
        dd.to_string(),
        r#"r:[a<1 => x:"p", _ => r_1:[b<2 => y:"q", c<3 => z:"s"]]"#
    );

    // Same conditions lead to the same classifications, with an else step in between.
    let mut after: Vec<_> = dd
        .paths()
        .unwrap()
        .into_iter()
        .map(|mut p| {
            p.steps.retain(|s| *s != Step::Else);
            p
        })
        .collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
}

#[test]
fn normalization_produces_ordered_binary_tree() {
    let dd = diagram(SHARED);
    assert!(!dd.is_tree());

    let normalized = dd.normalized().unwrap();
    assert!(normalized.is_tree());
    assert!(normalized.is_binary());
    assert!(normalized.is_ordered());
    assert_eq!(normalized.tested_attribute(normalized.root().unwrap()).unwrap().as_deref(), Some("a"));
    assert_eq!(classifications(&normalized), classifications(&dd));
    // Unfolding and rotating never lose a path.
    assert!(normalized.path_count() >= dd.path_count());
}

#[test]
fn ordering_is_idempotent() {
    let once = diagram(SHARED).normalized().unwrap();
    let mut twice = once.clone();
    let stats = twice.order().unwrap();
    assert_eq!(stats.rotations, 0);
    assert_eq!(attribute_sequences(&twice), attribute_sequences(&once));
}

// ─── Merging ───────────────────────────────────────────────────────────────────

#[test]
fn scenario_average_of_leaves() {
    let x = diagram(r#"leafnode(l,"x"). root(l)."#);
    let y = diagram(r#"leafnode(l,"y"). root(l)."#);

    let same = Merger::default().average(&x, &x.clone()).unwrap();
    assert_eq!(same.node_count(), 1);
    assert_eq!(classifications(&same), BTreeSet::from(["x".to_string()]));

    let different = Merger::default().average(&x, &y).unwrap();
    assert_eq!(different.node_count(), 1);
    assert_eq!(classifications(&different), BTreeSet::from([UNKNOWN.to_string()]));
}

#[test]
fn scenario_threshold_averaging() {
    let tree = |threshold: &str| {
        diagram(&format!(
            r#"innernode(a). leafnode(b,"x"). leafnode(c,"y").
               conditionaledge(a,b,"v","<","{}"). elseedge(a,c). root(a)."#,
            threshold
        ))
    };
    let merged = Merger::default().average(&tree("4"), &tree("6")).unwrap();
    let root = merged.root().unwrap();
    let edge = merged.edge(merged.conditional_edges(root)[0]).unwrap();
    assert_eq!(edge.condition(), Some(&Condition::new("v", Comparator::Lt, "5")));
}

#[test]
fn self_average_identity() {
    let dd = diagram(SHARED).normalized().unwrap();
    let merged = Merger::default().average(&dd, &dd.clone()).unwrap();
    assert_eq!(merged.to_string(), dd.to_string());
    assert!(!classifications(&merged).contains(UNKNOWN));
}

#[test]
fn majority_agreement() {
    let left = diagram(SHARED);
    let right = diagram(
        r#"innernode(t). leafnode(u,"p"). leafnode(w,"q").
           conditionaledge(t,u,"c",">=","7"). elseedge(t,w). root(t)."#,
    );
    // Every leaf of `right` agrees with one class of `left` only.
    let merged = Merger::default().majority_voting(&left, &right).unwrap();
    assert!(merged.is_acyclic());
    assert!(classifications(&merged).contains(UNKNOWN));

    let uniform = diagram(r#"leafnode(l,"p"). root(l)."#);
    let agreeing = diagram(
        r#"innernode(t). leafnode(u,"p"). leafnode(w,"p").
           conditionaledge(t,u,"c",">=","7"). elseedge(t,w). root(t)."#,
    );
    let merged = Merger::default().majority_voting(&uniform, &agreeing).unwrap();
    assert!(!classifications(&merged).contains(UNKNOWN));
    assert_eq!(merged.leaf_count(), 2);
}

// ─── Operators ─────────────────────────────────────────────────────────────────

#[test]
fn operator_pipeline() {
    let left = parse_facts(SHARED).unwrap();
    let right = parse_facts(&SHARED.replace(r#""b","<","2""#, r#""b","<","4""#)).unwrap();

    let average = operator("average").unwrap();
    let result = average.apply(&[vec![left], vec![right]], &[]).unwrap();
    assert_eq!(result.len(), 1);

    let merged = DecisionDiagram::from_facts(&result[0]).unwrap();
    assert!(merged.is_ordered());
    assert!(merged.is_tree());
    let thresholds: BTreeSet<String> = merged
        .edges()
        .filter_map(|(_, e)| e.condition())
        .filter(|c| c.attribute() == "b")
        .map(|c| c.operand2.clone())
        .collect();
    assert_eq!(thresholds, BTreeSet::from(["3".to_string()]));
}

#[test]
fn operator_reports_argument() {
    let good = parse_facts(SHARED).unwrap();
    let bad = parse_facts(r#"innernode(a). conditionaledge(a,a,"v","~","1"). root(a)."#).unwrap();
    let err = operator("majority")
        .unwrap()
        .apply(&[vec![good], vec![bad]], &[])
        .unwrap_err();
    match err {
        OperatorError::Structural {
            operator,
            argument,
            source,
        } => {
            assert_eq!(operator, "majority");
            assert_eq!(argument, Some(1));
            assert_eq!(source, StructuralViolation::UnknownComparator("~".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
}
