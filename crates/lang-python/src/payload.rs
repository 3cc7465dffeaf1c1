//! Payload emitted by `extract_api.py --json`.

use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonPackage {
    pub package: String,
    pub modules: Vec<PythonModule>,
    pub dependencies: Vec<PythonDependency>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonModule {
    pub name: String,
    pub doc: Option<String>,
    pub classes: Vec<PythonClass>,
    pub functions: Vec<PythonFunction>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonClass {
    pub name: String,
    /// Comma separated base list as written in the class header.
    pub base: Option<String>,
    pub doc: Option<String>,
    pub entry_point: bool,
    pub re_exported_from: Option<String>,
    pub methods: Vec<PythonFunction>,
    pub properties: Vec<PythonProperty>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonFunction {
    pub name: String,
    pub sig: String,
    pub ret: Option<String>,
    pub doc: Option<String>,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub classmethod: bool,
    pub staticmethod: bool,
    pub overload: bool,
    pub entry_point: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub doc: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PythonDependency {
    pub package: String,
    pub is_stdlib: bool,
    pub classes: Vec<PythonClass>,
}

impl PythonPackage {
    /// True when the tool flagged at least one entry point.
    pub fn has_entry_flags(&self) -> bool {
        self.modules.iter().any(|m| {
            m.functions.iter().any(|f| f.entry_point)
                || m.classes.iter().any(|c| c.entry_point)
        })
    }
}
