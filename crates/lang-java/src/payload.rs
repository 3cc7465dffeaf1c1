//! Payload emitted by `GraphApi.java --json`.
//!
//! The source-parsing and compiled-class code paths of the tool disagree on a
//! few shapes (joined strings vs. lists), so those fields accept either.

use serde::Deserialize;
use surface_plugin::normalize::split_top_level;

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaModule {
    pub package: String,
    pub packages: Vec<JavaPackage>,
    pub dependencies: Vec<JavaDependency>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaPackage {
    pub name: String,
    pub classes: Vec<JavaType>,
    pub interfaces: Vec<JavaType>,
    pub enums: Vec<JavaType>,
    pub annotations: Vec<JavaType>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaDependency {
    pub package: String,
    pub is_stdlib: bool,
    pub classes: Vec<JavaType>,
    pub interfaces: Vec<JavaType>,
    pub types: Vec<JavaType>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaType {
    pub name: String,
    /// `record`, `annotation`, or a runtime-resolved kind for dependencies.
    pub kind: Option<String>,
    pub deprecated: bool,
    pub modifiers: Vec<String>,
    pub type_params: StringOrList,
    pub extends: StringOrList,
    pub implements: StringOrList,
    pub doc: Option<String>,
    pub constructors: Vec<JavaMethod>,
    pub methods: Vec<JavaMethod>,
    pub fields: Vec<JavaField>,
    pub values: Vec<String>,
    pub components: Vec<JavaComponent>,
    pub members: Vec<JavaMember>,
    pub entry_point: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaMethod {
    pub name: String,
    pub deprecated: bool,
    pub modifiers: Vec<String>,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub type_params: StringOrList,
    pub sig: String,
    pub ret: Option<String>,
    pub throws: Vec<String>,
    pub doc: Option<String>,
    pub entry_point: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JavaField {
    pub name: String,
    pub deprecated: bool,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub modifiers: Vec<String>,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub value: Option<String>,
    pub doc: Option<String>,
}

/// Record component.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct JavaComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

/// Annotation member (`String value() default ""`).
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct JavaMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub default: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

impl StringOrList {
    /// Flatten to a list, splitting a joined `"A, B<C, D>"` at top level.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => split_top_level(&s, ','),
            StringOrList::Many(v) => v
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl JavaModule {
    pub fn has_entry_flags(&self) -> bool {
        self.packages.iter().any(|p| {
            p.classes
                .iter()
                .chain(&p.interfaces)
                .chain(&p.enums)
                .chain(&p.annotations)
                .any(|t| t.entry_point || t.methods.iter().any(|m| m.entry_point))
        })
    }
}

pub fn has_modifier(modifiers: &[String], keyword: &str) -> bool {
    modifiers.iter().any(|m| m == keyword)
}
