use std::collections::{BTreeMap, BTreeSet};
use surface_api::{Diagnostic, Severity, SymbolGraph};
use surface_plugin::LanguageAdapter;

pub const UNRESOLVED_ID: &str = "SURF-UNRESOLVED";

/// Report capitalized tokens referenced from the reachable surface that name
/// neither a local node, a dependency type, nor a language builtin.
pub fn unresolved_references(
    graph: &SymbolGraph,
    reachable: &BTreeSet<String>,
    adapter: &dyn LanguageAdapter,
) -> Vec<Diagnostic> {
    let dependency_types = graph.dependency_type_names();
    // token -> first referencing node, in name order
    let mut missing: BTreeMap<&str, &str> = BTreeMap::new();

    for node in reachable.iter().filter_map(|n| graph.get(n)) {
        for token in node.referenced_tokens.iter().chain(node.ancestors()) {
            let candidate = token.as_str();
            if !looks_like_type(candidate)
                || graph.contains(candidate)
                || dependency_types.contains(candidate)
                || node
                    .type_params
                    .iter()
                    .any(|p| p.split_whitespace().next() == Some(candidate))
                || adapter.is_builtin_type(candidate)
            {
                continue;
            }
            missing.entry(candidate).or_insert(node.name.as_str());
        }
    }

    missing
        .into_iter()
        .map(|(token, from)| {
            Diagnostic::new(
                UNRESOLVED_ID,
                format!("type '{token}' referenced by '{from}' is not declared in the package or its dependencies"),
                Severity::Info,
            )
        })
        .collect()
}

/// Single uppercase letters are treated as type parameters.
fn looks_like_type(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => chars.next().is_some(),
        _ => false,
    }
}
