//! Canonical raw payload shared by every language adapter.
//!
//! Adapters fill these structs from their tool's output; absent optional
//! fields default to empty so the graph builder never branches on language.

use serde::{Deserialize, Serialize};
use surface_api::NodeKind;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPackage {
    pub package: String,
    pub modules: Vec<RawModule>,
    pub dependencies: Vec<RawDependency>,
}

/// A namespace of declarations: Python module, Go package, Java package.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawModule {
    pub name: String,
    pub doc: Option<String>,
    pub types: Vec<RawType>,
    /// Module-level functions.
    pub functions: Vec<RawOperation>,
    /// Module-level constants and variables.
    pub fields: Vec<RawField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawType {
    /// Declared name, possibly still carrying generic parameters.
    pub name: String,
    pub kind: NodeKind,
    pub doc: Option<String>,
    pub deprecated: Option<String>,
    pub type_params: Vec<String>,
    pub bases: Vec<String>,
    pub implements: Vec<String>,
    pub operations: Vec<RawOperation>,
    pub fields: Vec<RawField>,
    pub values: Vec<String>,
    pub alias_of: Option<String>,
    /// `None` when the collaborator did not say; inference applies then.
    pub entry_point: Option<bool>,
    /// Abstract or marker type: never a reachability seed.
    pub is_abstract: bool,
    pub is_sealed: bool,
}

impl RawType {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOperation {
    pub name: String,
    pub signature: String,
    pub return_type: Option<String>,
    pub is_static: bool,
    pub is_async: bool,
    pub is_constructor: bool,
    pub deprecated: Option<String>,
    pub doc: Option<String>,
    pub entry_point: bool,
}

impl RawOperation {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            ..Default::default()
        }
    }

    pub fn returning(mut self, ret: impl Into<String>) -> Self {
        let ret = ret.into();
        self.return_type = if ret.trim().is_empty() { None } else { Some(ret) };
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawField {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<String>,
    pub is_static: bool,
    pub deprecated: Option<String>,
    pub doc: Option<String>,
}

impl RawField {
    pub fn new(name: impl Into<String>, type_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_name,
            ..Default::default()
        }
    }
}

/// Types from one external package the analyzed package refers to.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDependency {
    pub package: String,
    pub is_stdlib: bool,
    pub types: Vec<RawType>,
}
