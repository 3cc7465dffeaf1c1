use super::diagnostic::Diagnostic;
use super::engine::ExecutionMode;
use super::language::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Class,
    Interface,
    Struct,
    Enum,
    Annotation,
    Alias,
    Module,
}

impl NodeKind {
    /// Keyword used by the text renderer.
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Struct => "struct",
            NodeKind::Enum => "enum",
            NodeKind::Annotation => "annotation",
            NodeKind::Alias => "type",
            NodeKind::Module => "module",
        }
    }
}

impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "interface" | "protocol" | "trait" => NodeKind::Interface,
            "struct" | "record" => NodeKind::Struct,
            "enum" => NodeKind::Enum,
            "annotation" => NodeKind::Annotation,
            "alias" | "type" => NodeKind::Alias,
            "module" | "package" => NodeKind::Module,
            _ => NodeKind::Class,
        }
    }
}

/// A callable member: method, constructor, or module-level function.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct Operation {
    pub name: String,
    /// Parameter list as written by the collaborator, without parentheses.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_constructor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A field, property, constant or variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct SymbolNode {
    /// Type name with generic parameters stripped.
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    /// Identifier tokens of every signature, return type and field type.
    #[serde(default)]
    pub referenced_tokens: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implemented: Vec<String>,
    #[serde(default)]
    pub is_entry_point: bool,
    #[serde(default)]
    pub is_root_candidate: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_sealed: bool,
}

impl SymbolNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_root_candidate: true,
            ..Default::default()
        }
    }

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Base types followed by implemented interfaces.
    pub fn ancestors(&self) -> impl Iterator<Item = &String> {
        self.base_types.iter().chain(self.implemented.iter())
    }
}

/// External types referenced by the package, grouped by their origin package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct DependencyGroup {
    pub package: String,
    #[serde(default)]
    pub is_stdlib: bool,
    #[serde(default)]
    pub types: Vec<SymbolNode>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
pub struct SymbolGraph {
    pub package: String,
    pub language: Option<Language>,
    pub nodes: BTreeMap<String, SymbolNode>,
    /// base name -> names of types declaring it as an ancestor
    pub derived_by_base: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub dependencies: Vec<DependencyGroup>,
}

impl SymbolGraph {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&SymbolNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn derived_of(&self, base: &str) -> &[String] {
        self.derived_by_base
            .get(base)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert a node and register its ancestor edges in the derived index.
    pub fn insert(&mut self, node: SymbolNode) {
        for ancestor in node.ancestors() {
            let derived = self.derived_by_base.entry(ancestor.clone()).or_default();
            if !derived.contains(&node.name) {
                derived.push(node.name.clone());
                derived.sort();
            }
        }
        self.nodes.insert(node.name.clone(), node);
    }

    /// Names of every dependency type across all groups.
    pub fn dependency_type_names(&self) -> BTreeSet<&str> {
        self.dependencies
            .iter()
            .flat_map(|g| g.types.iter().map(|t| t.name.as_str()))
            .collect()
    }
}

/// The cached outcome of one full extraction pipeline run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ApiSurface {
    pub language: Language,
    pub mode: ExecutionMode,
    /// Hex digest of the recognized files the surface was computed from.
    pub fingerprint: String,
    pub graph: SymbolGraph,
    pub reachable: BTreeSet<String>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Raw collaborator payload, kept for usage analysis.
    #[serde(skip)]
    pub payload: String,
}

impl ApiSurface {
    /// Reachable nodes in name order.
    pub fn reachable_nodes(&self) -> impl Iterator<Item = &SymbolNode> {
        self.reachable.iter().filter_map(|n| self.graph.get(n))
    }
}
