//! # Graph Test Suite
//!
//! Tests for [`Graph`](crate::Graph): node insertion, connection rules and traversals.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Node Insertion**: roots, links and rejected parents
//! - **Connections**: parent reset, duplicate sources, cycles and excess targets
//! - **Reachability**: dead ends reported by node name
//! - **Traversals**: breadth-first node and link order, early stop on error

use crate::error::{BuildError, BuildWarning};
use crate::graph::{Graph, NodeId};
use crate::operators::{Concat, Filter, Selector, Source, Target, Union};
use crate::transformation::Operator;

fn add(graph: &mut Graph, name: &str, op: impl Operator + 'static, parents: &[&str]) -> NodeId {
  let parents: Vec<_> = parents.iter().map(|p| graph.id_of(p).unwrap()).collect();
  graph.insert_node(name, Box::new(op), &parents).unwrap().0
}

fn reachability(graph: &Graph) -> Vec<BuildError> {
  let mut errors = Vec::new();
  graph.check_reachability(|e| errors.push(e));
  errors
}

/// src1 -> f1 -> u -> tgt, src2 -> u
fn diamond() -> Graph {
  let mut g = Graph::new();
  add(&mut g, "src1", Source::new(), &[]);
  add(&mut g, "src2", Source::new(), &[]);
  add(&mut g, "f1", Filter::default(), &["src1"]);
  add(&mut g, "u", Union, &["f1", "src2"]);
  add(&mut g, "tgt", Target::new(), &["u"]);
  g
}

#[test]
fn test_insert_tracks_roots_and_links() {
  let g = diamond();
  assert_eq!(g.len(), 5);
  assert_eq!(g.roots(), vec!["src1", "src2"]);
  assert!(g.is_root("src2"));
  assert!(!g.is_root("u"));
  assert_eq!(g.sources_of("u").unwrap(), vec!["f1", "src2"]);
  assert_eq!(g.targets_of("src1").unwrap(), vec!["f1"]);
  assert!(g.get("tgt").unwrap().has_source());
  assert!(!g.get("tgt").unwrap().has_target());
  assert!(reachability(&g).is_empty());
}

#[test]
fn test_insert_rejects_duplicate_name() {
  let mut g = diamond();
  let err = g.insert_node("f1", Box::new(Filter::default()), &[]).unwrap_err();
  assert_eq!(err, BuildError::NodeAlreadyExists("f1".to_string()));
  assert_eq!(g.len(), 5);
}

#[test]
fn test_insert_rejects_illegal_parents() {
  let mut g = diamond();
  let src1 = g.id_of("src1").unwrap();
  let src2 = g.id_of("src2").unwrap();
  let tgt = g.id_of("tgt").unwrap();

  assert_eq!(
    g.insert_node("s3", Box::new(Source::new()), &[src1]).unwrap_err(),
    BuildError::NotDownstreamable("s3".to_string())
  );
  assert_eq!(
    g.insert_node("f2", Box::new(Filter::default()), &[src1, src2]).unwrap_err(),
    BuildError::SingleSource("f2".to_string())
  );
  assert_eq!(
    g.insert_node("c", Box::new(Concat), &[src1, src1]).unwrap_err(),
    BuildError::DuplicatedSource {
      node: "c".to_string(),
      parent: "src1".to_string(),
    }
  );
  assert_eq!(
    g.insert_node("f3", Box::new(Filter::default()), &[tgt]).unwrap_err(),
    BuildError::NotUpstreamable("tgt".to_string())
  );
  assert_eq!(g.len(), 5);
  assert_eq!(g.id_of("f2").unwrap_err(), BuildError::NodeNotFound("f2".to_string()));
}

#[test]
fn test_connect_single_input_resets_parent() {
  let mut g = diamond();
  let src2 = g.id_of("src2").unwrap();
  let f1 = g.id_of("f1").unwrap();

  let warnings = g.connect(src2, f1).unwrap();
  assert_eq!(
    warnings,
    vec![BuildWarning::ParentReset {
      node: "f1".to_string(),
      previous: "src1".to_string(),
    }]
  );
  assert_eq!(g.sources_of("f1").unwrap(), vec!["src2"]);
  assert!(g.targets_of("src1").unwrap().is_empty());
  assert_eq!(
    reachability(&g),
    vec![BuildError::UnconnectedToTarget("src1".to_string())]
  );
}

#[test]
fn test_connect_rejects_duplicates_and_cycles() {
  let mut g = Graph::new();
  add(&mut g, "src", Source::new(), &[]);
  add(&mut g, "u", Union, &["src"]);
  add(&mut g, "f", Filter::default(), &["u"]);
  let (src, u, f) = (g.id_of("src").unwrap(), g.id_of("u").unwrap(), g.id_of("f").unwrap());

  assert_eq!(
    g.connect(src, u).unwrap_err(),
    BuildError::DuplicatedSource {
      node: "u".to_string(),
      parent: "src".to_string(),
    }
  );
  assert_eq!(
    g.connect(f, u).unwrap_err(),
    BuildError::CycleDetected {
      producer: "f".to_string(),
      consumer: "u".to_string(),
    }
  );
  assert!(matches!(g.connect(u, u), Err(BuildError::CycleDetected { .. })));
  assert!(g.targets_of("f").unwrap().is_empty());
}

#[test]
fn test_connect_warns_on_excess_selector_targets() {
  let mut g = Graph::new();
  add(&mut g, "src", Source::new(), &[]);
  add(&mut g, "sel", Selector::new().when(|_| true), &["src"]);
  add(&mut g, "t1", Target::new(), &["sel"]);
  add(&mut g, "t2", Target::new(), &["sel"]);

  let (_, warnings) = g
    .insert_node("t3", Box::new(Target::new()), &[g.id_of("sel").unwrap()])
    .unwrap();
  assert_eq!(
    warnings,
    vec![BuildWarning::TooManyTargets {
      node: "sel".to_string(),
      connected: 3,
      usable: 2,
    }]
  );
}

#[test]
fn test_reachability_reports_dead_ends() {
  let mut g = Graph::new();
  add(&mut g, "src1", Source::new(), &[]);
  assert_eq!(
    reachability(&g),
    vec![BuildError::UnconnectedToTarget("src1".to_string())]
  );

  add(&mut g, "orphan", Filter::default(), &[]);
  add(&mut g, "tgt", Target::new(), &["orphan"]);
  let errors = reachability(&g);
  assert!(errors.contains(&BuildError::UnconnectedToSource("orphan".to_string())));
  assert!(errors.contains(&BuildError::UnconnectedToTarget("src1".to_string())));
  assert_eq!(errors.len(), 2);
}

#[test]
fn test_bfs_visits_each_node_once() {
  let mut g = diamond();
  let mut visited = Vec::new();
  g.bfs_traverse(|node| {
    visited.push(node.name().to_string());
    Ok::<(), ()>(())
  })
  .unwrap();
  assert_eq!(visited, vec!["src1", "src2", "f1", "u", "tgt"]);
}

#[test]
fn test_bfs_links_visit_each_edge_once() {
  let mut g = diamond();
  let mut links = Vec::new();
  g.bfs_traverse_links(|producer, consumer| {
    links.push(format!("{}->{}", producer.name(), consumer.name()));
    Ok::<(), ()>(())
  })
  .unwrap();
  assert_eq!(links, vec!["src1->f1", "src2->u", "f1->u", "u->tgt"]);
}

#[test]
fn test_bfs_traverse_stops_at_first_error() {
  let mut g = diamond();
  let mut count = 0;
  let result = g.bfs_traverse(|node| {
    count += 1;
    if node.name() == "src2" { Err(node.name().to_string()) } else { Ok(()) }
  });
  assert_eq!(result, Err("src2".to_string()));
  assert_eq!(count, 2);
}
