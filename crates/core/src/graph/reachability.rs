//! Reachability from the package's public entry points.
//!
//! Seeds are the nodes flagged as entry points; when a package flags none,
//! every root candidate that declares operations stands in. From the seeds
//! the closure follows reference edges (tokens naming another node) and
//! ancestor edges (base types and implemented interfaces). Descendants are
//! not followed: a type being a subtype of something reachable does not make
//! it reachable.

use std::collections::{BTreeSet, VecDeque};
use surface_api::SymbolGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReachabilityPolicy {
    /// Also pull in subtypes of sealed reachable types.
    pub include_sealed_descendants: bool,
}

/// Reachability seeds in name order.
pub fn seeds(graph: &SymbolGraph) -> Vec<&str> {
    let entry: Vec<&str> = graph
        .nodes
        .values()
        .filter(|n| n.is_entry_point)
        .map(|n| n.name.as_str())
        .collect();
    if !entry.is_empty() {
        return entry;
    }
    graph
        .nodes
        .values()
        .filter(|n| n.is_root_candidate && n.has_operations())
        .map(|n| n.name.as_str())
        .collect()
}

pub fn reachable(graph: &SymbolGraph, policy: &ReachabilityPolicy) -> BTreeSet<String> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for seed in seeds(graph) {
        if visited.insert(seed.to_string()) {
            queue.push_back(seed);
        }
    }

    while let Some(name) = queue.pop_front() {
        let Some(node) = graph.get(name) else {
            continue;
        };

        let referenced = node
            .referenced_tokens
            .iter()
            .chain(node.ancestors())
            .filter_map(|t| graph.nodes.get_key_value(t.as_str()).map(|(k, _)| k));

        let sealed = policy.include_sealed_descendants && node.is_sealed;
        let descendants = sealed
            .then(|| graph.derived_of(name))
            .unwrap_or(&[])
            .iter()
            .filter_map(|d| graph.nodes.get_key_value(d.as_str()).map(|(k, _)| k));

        for next in referenced.chain(descendants) {
            if visited.insert(next.clone()) {
                queue.push_back(next.as_str());
            }
        }
    }

    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_api::{NodeKind, Operation, SymbolNode};

    fn node(name: &str, refs: &[&str]) -> SymbolNode {
        let mut n = SymbolNode::new(name, NodeKind::Class);
        n.referenced_tokens = refs.iter().map(|s| s.to_string()).collect();
        n
    }

    fn with_op(mut n: SymbolNode) -> SymbolNode {
        n.operations.push(Operation {
            name: "run".into(),
            ..Default::default()
        });
        n
    }

    #[test]
    fn test_reference_chain_and_orphan() {
        let mut graph = SymbolGraph::new("p");
        let mut client = with_op(node("Client", &["Options", "self", "str"]));
        client.is_entry_point = true;
        graph.insert(client);
        graph.insert(node("Options", &["RetryPolicy"]));
        graph.insert(node("RetryPolicy", &[]));
        graph.insert(with_op(node("Orphan", &[])));

        let reached = reachable(&graph, &ReachabilityPolicy::default());
        let expected: BTreeSet<String> = ["Client", "Options", "RetryPolicy"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_ancestors_followed_descendants_not() {
        let mut graph = SymbolGraph::new("p");
        let mut client = with_op(node("Client", &["Shape"]));
        client.is_entry_point = true;
        graph.insert(client);
        let mut shape = node("Shape", &[]);
        shape.base_types.push("Base".into());
        graph.insert(shape);
        graph.insert(node("Base", &[]));
        let mut circle = node("Circle", &[]);
        circle.base_types.push("Shape".into());
        graph.insert(circle);

        let reached = reachable(&graph, &ReachabilityPolicy::default());
        assert!(reached.contains("Base"));
        assert!(!reached.contains("Circle"));
    }

    #[test]
    fn test_sealed_descendants_opt_in() {
        let mut graph = SymbolGraph::new("p");
        let mut client = with_op(node("Client", &["Shape"]));
        client.is_entry_point = true;
        graph.insert(client);
        let mut shape = node("Shape", &[]);
        shape.is_sealed = true;
        graph.insert(shape);
        let mut circle = node("Circle", &[]);
        circle.base_types.push("Shape".into());
        graph.insert(circle);

        let off = reachable(&graph, &ReachabilityPolicy::default());
        assert!(!off.contains("Circle"));
        let on = reachable(
            &graph,
            &ReachabilityPolicy {
                include_sealed_descendants: true,
            },
        );
        assert!(on.contains("Circle"));
    }

    #[test]
    fn test_root_candidates_when_no_entry_points() {
        let mut graph = SymbolGraph::new("p");
        graph.insert(with_op(node("Service", &["Model"])));
        graph.insert(node("Model", &[]));
        let mut abstract_base = with_op(node("AbstractThing", &[]));
        abstract_base.is_root_candidate = false;
        graph.insert(abstract_base);
        graph.insert(node("Plain", &[]));

        assert_eq!(seeds(&graph), vec!["Service"]);
        let reached = reachable(&graph, &ReachabilityPolicy::default());
        assert!(reached.contains("Model"));
        assert!(!reached.contains("AbstractThing"));
        assert!(!reached.contains("Plain"));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut graph = SymbolGraph::new("p");
        let mut a = with_op(node("A", &["B"]));
        a.is_entry_point = true;
        graph.insert(a);
        graph.insert(node("B", &["A"]));
        assert_eq!(reachable(&graph, &ReachabilityPolicy::default()).len(), 2);
    }

    #[test]
    fn test_empty_graph() {
        let graph = SymbolGraph::new("p");
        assert!(reachable(&graph, &ReachabilityPolicy::default()).is_empty());
    }
}
