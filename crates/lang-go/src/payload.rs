//! Payload emitted by `graph_api.go --json`.

use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoModule {
    pub package: String,
    pub packages: Vec<GoPackage>,
    pub dependencies: Vec<GoDependency>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoPackage {
    pub name: String,
    pub doc: Option<String>,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub functions: Vec<GoFunc>,
    pub types: Vec<GoNamedType>,
    pub constants: Vec<GoConst>,
    pub variables: Vec<GoVar>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoDependency {
    pub package: String,
    pub is_stdlib: bool,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub types: Vec<GoNamedType>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoStruct {
    pub name: String,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
    pub type_params: Vec<String>,
    pub embeds: Vec<String>,
    pub fields: Vec<GoField>,
    pub methods: Vec<GoFunc>,
    pub entry_point: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoInterface {
    pub name: String,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
    pub embeds: Vec<String>,
    pub methods: Vec<GoFunc>,
    pub entry_point: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoFunc {
    pub name: String,
    pub entry_point: bool,
    pub type_params: Vec<String>,
    pub sig: String,
    pub ret: Option<String>,
    pub doc: Option<String>,
    #[serde(rename = "method")]
    pub is_method: bool,
    #[serde(rename = "recv")]
    pub receiver: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub tag: Option<String>,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
}

/// `type Name Underlying` declarations that are neither structs nor interfaces.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoNamedType {
    pub name: String,
    #[serde(rename = "type")]
    pub underlying: String,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoConst {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub value: Option<String>,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GoVar {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub doc: Option<String>,
    pub deprecated: bool,
    pub deprecated_msg: Option<String>,
}

impl GoModule {
    pub fn has_entry_flags(&self) -> bool {
        self.packages.iter().any(|p| {
            p.structs.iter().any(|s| s.entry_point)
                || p.interfaces.iter().any(|i| i.entry_point)
                || p.functions.iter().any(|f| f.entry_point)
        })
    }
}
