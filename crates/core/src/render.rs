//! Budgeted text serializer.
//!
//! Renders the reachable part of a [`SymbolGraph`] as a language-neutral stub
//! listing no longer than a caller-supplied number of bytes. Nodes are
//! emitted in priority order, each together with the still-unemitted nodes it
//! references, and a cluster is written only if it fits whole. The first
//! cluster that does not fit ends the walk and a marker states how many
//! nodes were left out.

use crate::tokenizer::tokenize_into;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt::Write;
use surface_api::{Field, NodeKind, Operation, SymbolGraph, SymbolNode};

const CONFIG_SUFFIXES: [&str; 4] = ["Options", "Config", "Configuration", "Settings"];
const ERROR_SUFFIXES: [&str; 2] = ["Error", "Exception"];

pub fn render(graph: &SymbolGraph, reachable: &BTreeSet<String>, max_length: usize) -> String {
    let order = priority_order(graph, reachable);

    let (full, omitted) = walk(graph, reachable, &order, max_length);
    if omitted == 0 {
        return full;
    }

    // Sized for the largest possible count so a shorter walk never outgrows it.
    let reserve = truncation_marker(order.len() + dependency_count(graph)).len();
    if reserve > max_length {
        tracing::debug!(max_length, "budget too small for any output");
        return String::new();
    }
    let (mut out, omitted) = walk(graph, reachable, &order, max_length - reserve);
    out.push_str(&truncation_marker(omitted));
    debug_assert!(out.len() <= max_length);
    tracing::debug!(omitted, max_length, "surface rendering truncated");
    out
}

fn dependency_count(graph: &SymbolGraph) -> usize {
    graph.dependencies.iter().map(|g| g.types.len()).sum()
}

pub fn truncation_marker(omitted: usize) -> String {
    format!("// ... {omitted} more types omitted\n")
}

/// Emits clusters until one overflows `budget`; returns the text and the
/// number of nodes (reachable and dependency) left out.
fn walk(
    graph: &SymbolGraph,
    reachable: &BTreeSet<String>,
    order: &[&SymbolNode],
    budget: usize,
) -> (String, usize) {
    let total = order.len() + dependency_count(graph);

    let mut out = String::new();
    let header = format!("// package {}\n\n", graph.package);
    if header.len() <= budget {
        out.push_str(&header);
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    for node in order {
        if emitted.contains(node.name.as_str()) {
            continue;
        }
        let cluster = cluster_of(graph, reachable, node, &emitted);
        let text: String = cluster.iter().map(|n| render_node(n)).collect();
        if out.len() + text.len() > budget {
            return (out, total - emitted.len());
        }
        out.push_str(&text);
        emitted.extend(cluster.iter().map(|n| n.name.as_str()));
    }

    let mut emitted_deps = 0usize;
    let mut section_open = false;
    for group in &graph.dependencies {
        let mut group_open = false;
        for ty in &group.types {
            let mut text = String::new();
            if !section_open {
                text.push_str("// dependencies\n\n");
            }
            if !group_open {
                let stdlib = if group.is_stdlib { " (stdlib)" } else { "" };
                let _ = writeln!(text, "// from {}{}", group.package, stdlib);
            }
            text.push_str(&render_node(ty));
            if out.len() + text.len() > budget {
                return (out, total - emitted.len() - emitted_deps);
            }
            out.push_str(&text);
            section_open = true;
            group_open = true;
            emitted_deps += 1;
        }
    }

    (out, total - emitted.len() - emitted_deps)
}

/// The node followed by its unemitted direct references, in name order.
fn cluster_of<'g>(
    graph: &'g SymbolGraph,
    reachable: &BTreeSet<String>,
    node: &'g SymbolNode,
    emitted: &HashSet<&str>,
) -> Vec<&'g SymbolNode> {
    let mut cluster = vec![node];
    let deps = node
        .referenced_tokens
        .iter()
        .chain(node.ancestors())
        .filter(|t| t.as_str() != node.name)
        .filter(|t| reachable.contains(t.as_str()) && !emitted.contains(t.as_str()))
        .collect::<BTreeSet<_>>();
    cluster.extend(deps.into_iter().filter_map(|t| graph.get(t)));
    cluster
}

/// Reachable nodes sorted by priority class, then by name.
pub fn priority_order<'g>(
    graph: &'g SymbolGraph,
    reachable: &BTreeSet<String>,
) -> Vec<&'g SymbolNode> {
    let from_entries = referenced_by_entry_points(graph, reachable);
    let mut nodes: Vec<&SymbolNode> = reachable.iter().filter_map(|n| graph.get(n)).collect();
    nodes.sort_by(|a, b| {
        let pa = priority(graph, a, &from_entries);
        let pb = priority(graph, b, &from_entries);
        pa.cmp(&pb).then_with(|| a.name.cmp(&b.name))
    });
    nodes
}

fn priority(graph: &SymbolGraph, node: &SymbolNode, from_entries: &BTreeSet<&str>) -> u8 {
    if node.is_entry_point {
        1
    } else if from_entries.contains(node.name.as_str()) {
        2
    } else if is_config_or_error(graph, node) {
        3
    } else if !node.has_operations() {
        4
    } else {
        5
    }
}

/// Closure over the tokens of the entry points' operations.
fn referenced_by_entry_points<'g>(
    graph: &'g SymbolGraph,
    reachable: &BTreeSet<String>,
) -> BTreeSet<&'g str> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&SymbolNode> = VecDeque::new();

    for entry in graph.nodes.values().filter(|n| n.is_entry_point) {
        let mut tokens = BTreeSet::new();
        for op in &entry.operations {
            tokenize_into(&op.signature, &mut tokens);
            if let Some(ret) = &op.return_type {
                tokenize_into(ret, &mut tokens);
            }
        }
        for token in &tokens {
            if let Some((name, node)) = graph.nodes.get_key_value(token.as_str())
                && reachable.contains(name)
                && !node.is_entry_point
                && seen.insert(name.as_str())
            {
                queue.push_back(node);
            }
        }
    }

    while let Some(node) = queue.pop_front() {
        for token in &node.referenced_tokens {
            if let Some((name, next)) = graph.nodes.get_key_value(token.as_str())
                && reachable.contains(name)
                && !next.is_entry_point
                && seen.insert(name.as_str())
            {
                queue.push_back(next);
            }
        }
    }
    seen
}

fn is_config_or_error(graph: &SymbolGraph, node: &SymbolNode) -> bool {
    let has_suffix = |name: &str| {
        CONFIG_SUFFIXES
            .iter()
            .chain(ERROR_SUFFIXES.iter())
            .any(|s| name.ends_with(s))
    };
    if has_suffix(&node.name) {
        return true;
    }
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = node.ancestors().map(String::as_str).collect();
    while let Some(base) = stack.pop() {
        if !visited.insert(base) {
            continue;
        }
        if ERROR_SUFFIXES.iter().any(|s| base.ends_with(s)) {
            return true;
        }
        if let Some(parent) = graph.get(base) {
            stack.extend(parent.ancestors().map(String::as_str));
        }
    }
    false
}

/// Text of a single node, always ending with a blank line.
pub fn render_node(node: &SymbolNode) -> String {
    let mut out = String::new();
    if let Some(doc) = node.doc.as_deref().and_then(first_line) {
        let _ = writeln!(out, "/// {doc}");
    }
    if let Some(msg) = &node.deprecated {
        out.push_str(&deprecated_tag(msg));
        out.push('\n');
    }

    let mut head = format!("{} {}", node.kind.keyword(), node.name);
    if !node.type_params.is_empty() {
        let _ = write!(head, "<{}>", node.type_params.join(", "));
    }

    if node.kind == NodeKind::Alias {
        let target = node.alias_of.as_deref().unwrap_or("?");
        let _ = writeln!(out, "{head} = {target}\n");
        return out;
    }

    if !node.base_types.is_empty() {
        let _ = write!(head, " extends {}", node.base_types.join(", "));
    }
    if !node.implemented.is_empty() {
        let _ = write!(head, " implements {}", node.implemented.join(", "));
    }

    if node.values.is_empty() && node.fields.is_empty() && node.operations.is_empty() {
        let _ = writeln!(out, "{head} {{}}\n");
        return out;
    }

    let _ = writeln!(out, "{head} {{");
    if !node.values.is_empty() {
        let _ = writeln!(out, "  {}", node.values.join(", "));
    }
    for field in &node.fields {
        out.push_str(&render_field(field));
    }
    for op in &node.operations {
        out.push_str(&render_operation(op));
    }
    out.push_str("}\n\n");
    out
}

fn render_field(field: &Field) -> String {
    let mut line = String::from("  ");
    if let Some(msg) = &field.deprecated {
        line.push_str(&deprecated_tag(msg));
        line.push(' ');
    }
    if field.is_static {
        line.push_str("static ");
    }
    line.push_str(&field.name);
    if let Some(ty) = &field.type_name {
        let _ = write!(line, ": {ty}");
    }
    if let Some(value) = &field.value {
        let _ = write!(line, " = {value}");
    }
    line.push('\n');
    line
}

fn render_operation(op: &Operation) -> String {
    let mut line = String::from("  ");
    if let Some(msg) = &op.deprecated {
        line.push_str(&deprecated_tag(msg));
        line.push(' ');
    }
    if op.is_static {
        line.push_str("static ");
    }
    if op.is_async {
        line.push_str("async ");
    }
    if op.is_constructor {
        line.push_str("constructor");
    } else {
        line.push_str(&op.name);
    }
    let _ = write!(line, "({})", op.signature);
    if let Some(ret) = &op.return_type {
        let _ = write!(line, " -> {ret}");
    }
    line.push('\n');
    line
}

fn deprecated_tag(message: &str) -> String {
    if message.trim().is_empty() {
        "@deprecated".to_string()
    } else {
        format!("@deprecated({})", message.trim())
    }
}

fn first_line(doc: &str) -> Option<&str> {
    doc.lines().map(str::trim).find(|l| !l.is_empty())
}
