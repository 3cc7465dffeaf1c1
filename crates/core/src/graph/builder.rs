//! Symbol graph builder.
//!
//! Turns an adapter-normalized [`RawPackage`] into a [`SymbolGraph`]. Every
//! node's raw reference tokens are computed here, once, from its operation
//! signatures, return types, field types and alias target. Raw entries that
//! normalize to the same name (generic instantiations, partial declarations
//! spread over files) collapse into one node.

use crate::tokenizer::{strip_generics, tokenize_into};
use std::collections::BTreeMap;
use surface_api::{DependencyGroup, Field, NodeKind, Operation, SymbolGraph, SymbolNode};
use surface_plugin::normalize::simple_name;
use surface_plugin::{LanguageAdapter, RawField, RawOperation, RawPackage, RawType};

/// Canonical node name for a declared or referenced type.
pub fn normalize_type_name(name: &str) -> String {
    simple_name(strip_generics(name)).to_string()
}

pub fn build_graph(raw: &RawPackage, adapter: &dyn LanguageAdapter) -> SymbolGraph {
    let mut nodes: BTreeMap<String, SymbolNode> = BTreeMap::new();

    for module in &raw.modules {
        for ty in &module.types {
            let node = convert_type(ty, &module.name, adapter, true);
            if node.name.is_empty() {
                continue;
            }
            merge_into(&mut nodes, node);
        }

        if !module.functions.is_empty() || !module.fields.is_empty() {
            let node = module_node(module, &raw.package);
            merge_into(&mut nodes, node);
        }
    }

    let mut graph = SymbolGraph::new(raw.package.clone());
    graph.language = Some(adapter.language().clone());
    for (_, mut node) in nodes {
        node.referenced_tokens = node_tokens(&node);
        graph.insert(node);
    }

    graph.dependencies = raw
        .dependencies
        .iter()
        .filter(|d| !d.package.is_empty() || !d.types.is_empty())
        .map(|dep| {
            let mut types: BTreeMap<String, SymbolNode> = BTreeMap::new();
            for ty in &dep.types {
                let mut node = convert_type(ty, &dep.package, adapter, false);
                if node.name.is_empty() {
                    continue;
                }
                node.referenced_tokens = node_tokens(&node);
                merge_into(&mut types, node);
            }
            DependencyGroup {
                package: dep.package.clone(),
                is_stdlib: dep.is_stdlib,
                types: types.into_values().collect(),
            }
        })
        .collect();
    graph
        .dependencies
        .sort_by(|a, b| a.package.cmp(&b.package));

    graph
}

fn convert_type(
    ty: &RawType,
    package: &str,
    adapter: &dyn LanguageAdapter,
    local: bool,
) -> SymbolNode {
    let name = normalize_type_name(&ty.name);
    let mut node = SymbolNode::new(name, ty.kind);
    node.package = package.to_string();
    node.doc = ty.doc.clone();
    node.deprecated = ty.deprecated.clone();
    node.type_params = ty.type_params.clone();
    node.values = ty.values.clone();
    node.alias_of = ty.alias_of.clone();
    node.is_sealed = ty.is_sealed;
    node.operations = ty.operations.iter().map(convert_operation).collect();
    node.fields = ty.fields.iter().map(convert_field).collect();
    node.base_types = ancestor_names(&ty.bases, &node.name);
    node.implemented = ancestor_names(&ty.implements, &node.name);

    if local {
        node.is_entry_point = ty
            .entry_point
            .unwrap_or_else(|| adapter.infer_entry_point(ty));
        let marker_kind = matches!(ty.kind, NodeKind::Interface | NodeKind::Annotation)
            && ty.operations.is_empty();
        node.is_root_candidate =
            !(ty.is_abstract || marker_kind || adapter.is_marker_base(&node.name));
    } else {
        node.is_entry_point = false;
        node.is_root_candidate = false;
    }
    node
}

fn module_node(module: &surface_plugin::RawModule, package: &str) -> SymbolNode {
    let name = if module.name.is_empty() {
        package.to_string()
    } else {
        module.name.clone()
    };
    let mut node = SymbolNode::new(name, NodeKind::Module);
    node.package = package.to_string();
    node.doc = module.doc.clone();
    node.operations = module.functions.iter().map(convert_operation).collect();
    node.fields = module.fields.iter().map(convert_field).collect();
    node.is_entry_point = module.functions.iter().any(|f| f.entry_point);
    node
}

fn ancestor_names(raw: &[String], own_name: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for base in raw {
        let name = normalize_type_name(base);
        if name.is_empty() || name == own_name || out.contains(&name) {
            continue;
        }
        out.push(name);
    }
    out
}

fn convert_operation(op: &RawOperation) -> Operation {
    Operation {
        name: op.name.clone(),
        signature: op.signature.clone(),
        return_type: op.return_type.clone(),
        is_static: op.is_static,
        is_async: op.is_async,
        is_constructor: op.is_constructor,
        deprecated: op.deprecated.clone(),
        doc: op.doc.clone(),
    }
}

fn convert_field(field: &RawField) -> Field {
    Field {
        name: field.name.clone(),
        type_name: field.type_name.clone(),
        value: field.value.clone(),
        is_static: field.is_static,
        deprecated: field.deprecated.clone(),
        doc: field.doc.clone(),
    }
}

fn merge_into(nodes: &mut BTreeMap<String, SymbolNode>, node: SymbolNode) {
    match nodes.get_mut(&node.name) {
        Some(existing) => merge_node(existing, node),
        None => {
            nodes.insert(node.name.clone(), node);
        }
    }
}

/// Fold `other` into `target`. Entry-point status is sticky; a single marker
/// declaration is enough to disqualify the merged node as a root candidate.
fn merge_node(target: &mut SymbolNode, other: SymbolNode) {
    for op in other.operations {
        let duplicate = target.operations.iter().any(|o| {
            o.name == op.name && o.signature == op.signature && o.return_type == op.return_type
        });
        if !duplicate {
            target.operations.push(op);
        }
    }
    for field in other.fields {
        if !target.fields.iter().any(|f| f.name == field.name) {
            target.fields.push(field);
        }
    }
    for base in other.base_types {
        if !target.base_types.contains(&base) {
            target.base_types.push(base);
        }
    }
    for iface in other.implemented {
        if !target.implemented.contains(&iface) {
            target.implemented.push(iface);
        }
    }
    for value in other.values {
        if !target.values.contains(&value) {
            target.values.push(value);
        }
    }
    for param in other.type_params {
        if !target.type_params.contains(&param) {
            target.type_params.push(param);
        }
    }
    target.doc = target.doc.take().or(other.doc);
    target.deprecated = target.deprecated.take().or(other.deprecated);
    target.alias_of = target.alias_of.take().or(other.alias_of);
    target.is_entry_point |= other.is_entry_point;
    target.is_root_candidate &= other.is_root_candidate;
    target.is_sealed |= other.is_sealed;
}

fn node_tokens(node: &SymbolNode) -> std::collections::BTreeSet<String> {
    let mut tokens = std::collections::BTreeSet::new();
    for op in &node.operations {
        tokenize_into(&op.signature, &mut tokens);
        if let Some(ret) = &op.return_type {
            tokenize_into(ret, &mut tokens);
        }
    }
    for field in &node.fields {
        if let Some(ty) = &field.type_name {
            tokenize_into(ty, &mut tokens);
        }
    }
    if let Some(alias) = &node.alias_of {
        tokenize_into(alias, &mut tokens);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_api::{EngineDescriptor, Language};
    use surface_plugin::{CanonicalAdapter, RawDependency, RawModule};

    fn adapter() -> CanonicalAdapter {
        CanonicalAdapter::new(EngineDescriptor::new(Language::PYTHON, "python"))
    }

    fn package(types: Vec<RawType>) -> RawPackage {
        RawPackage {
            package: "sdk".into(),
            modules: vec![RawModule {
                name: "sdk".into(),
                types,
                ..Default::default()
            }],
            dependencies: vec![],
        }
    }

    #[test]
    fn test_tokens_cover_signatures_returns_and_fields() {
        let mut ty = RawType::new("Client", NodeKind::Class);
        ty.operations
            .push(RawOperation::new("get", "name: str, opts: GetOptions").returning("Item"));
        ty.fields
            .push(RawField::new("policy", Some("RetryPolicy".into())));
        let graph = build_graph(&package(vec![ty]), &adapter());

        let node = graph.get("Client").unwrap();
        for t in ["GetOptions", "Item", "RetryPolicy", "name", "str"] {
            assert!(node.referenced_tokens.contains(t), "missing {t}");
        }
    }

    #[test]
    fn test_generic_instantiations_collapse() {
        let mut a = RawType::new("Pager[T]", NodeKind::Class);
        a.operations.push(RawOperation::new("next", "").returning("T"));
        let mut b = RawType::new("Pager[Item]", NodeKind::Class);
        b.operations.push(RawOperation::new("by_page", "").returning("Iterator"));
        let graph = build_graph(&package(vec![a, b]), &adapter());

        assert_eq!(graph.len(), 1);
        let node = graph.get("Pager").unwrap();
        assert_eq!(node.operations.len(), 2);
        assert!(node.referenced_tokens.contains("Iterator"));
    }

    #[test]
    fn test_flags_and_edges() {
        let mut iface = RawType::new("Marker", NodeKind::Interface);
        iface.entry_point = Some(false);
        let mut base = RawType::new("Base", NodeKind::Class);
        base.is_abstract = true;
        base.operations.push(RawOperation::new("close", ""));
        let mut client = RawType::new("StorageClient", NodeKind::Class);
        client.bases.push("pkg.Base[T]".into());
        client.implements.push("Marker".into());
        client.operations.push(RawOperation::new("upload", "data: bytes"));

        let graph = build_graph(&package(vec![iface, base, client]), &adapter());

        let client = graph.get("StorageClient").unwrap();
        assert!(client.is_entry_point, "Client suffix infers an entry point");
        assert!(client.is_root_candidate);
        assert_eq!(client.base_types, vec!["Base".to_string()]);
        assert_eq!(client.implemented, vec!["Marker".to_string()]);

        assert!(!graph.get("Base").unwrap().is_root_candidate);
        assert!(!graph.get("Marker").unwrap().is_root_candidate);
        assert_eq!(graph.derived_of("Base"), ["StorageClient".to_string()]);
    }

    #[test]
    fn test_explicit_flag_beats_inference() {
        let mut ty = RawType::new("LegacyClient", NodeKind::Class);
        ty.operations.push(RawOperation::new("call", ""));
        ty.entry_point = Some(false);
        let graph = build_graph(&package(vec![ty]), &adapter());
        assert!(!graph.get("LegacyClient").unwrap().is_entry_point);
    }

    #[test]
    fn test_module_functions_become_module_node() {
        let mut raw = package(vec![]);
        let mut func = RawOperation::new("connect", "url: str").returning("Connection");
        func.entry_point = true;
        raw.modules[0].functions.push(func);
        let graph = build_graph(&raw, &adapter());

        let module = graph.get("sdk").unwrap();
        assert_eq!(module.kind, NodeKind::Module);
        assert!(module.is_entry_point);
        assert!(module.referenced_tokens.contains("Connection"));
    }

    #[test]
    fn test_dependencies_grouped_and_never_seeds() {
        let mut raw = package(vec![]);
        raw.dependencies.push(RawDependency {
            package: "requests".into(),
            is_stdlib: false,
            types: vec![RawType::new("Session", NodeKind::Class)],
        });
        let graph = build_graph(&raw, &adapter());

        assert!(graph.is_empty());
        assert_eq!(graph.dependencies.len(), 1);
        let session = &graph.dependencies[0].types[0];
        assert!(!session.is_entry_point);
        assert!(!session.is_root_candidate);
    }
}
