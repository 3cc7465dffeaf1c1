//! Go language adapter.
//!
//! `graph_api.go` is run through `go run` (or as the prebuilt `surface-go`
//! binary). Its payload groups declarations by kind per Go package; this
//! adapter folds them into canonical types:
//!
//! - struct embeds and interface embeds become bases;
//! - package-level constructor functions attached to a struct become static
//!   operations of that struct;
//! - typed constants of a named type become that type's enum values;
//! - other named types become aliases of their underlying type.

pub mod payload;

use payload::{GoConst, GoFunc, GoInterface, GoModule, GoNamedType, GoStruct};
use std::collections::BTreeMap;
use surface_api::{EngineDescriptor, Language, NodeKind};
use surface_plugin::normalize::{deprecation, entry_flag, non_empty, strip_decoration};
use surface_plugin::{
    LanguageAdapter, PayloadError, RawDependency, RawField, RawModule, RawOperation, RawPackage,
    RawType,
};

pub const DEFAULT_IMAGE: &str = "ghcr.io/surface-tools/go-extractor:latest";

const BUILTIN_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
];

#[derive(Debug, Clone)]
pub struct GoAdapter {
    descriptor: EngineDescriptor,
}

impl GoAdapter {
    pub fn new() -> Self {
        let descriptor = EngineDescriptor::new(Language::GO, "go")
            .with_runtime_script("graph_api.go")
            .with_runtime_prefix_args(["run"])
            .with_runtime_validation_args(["version"])
            .with_default_image(DEFAULT_IMAGE)
            .with_extensions(["go"]);
        Self { descriptor }
    }
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for GoAdapter {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    fn parse_payload(&self, payload: &str) -> Result<RawPackage, PayloadError> {
        if payload.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        let module: GoModule = serde_json::from_str(payload)?;
        Ok(normalize(module))
    }

    fn is_builtin_type(&self, name: &str) -> bool {
        BUILTIN_TYPES.contains(&name)
    }
}

fn normalize(module: GoModule) -> RawPackage {
    let flagged = module.has_entry_flags();
    tracing::debug!(
        package = %module.package,
        packages = module.packages.len(),
        flagged,
        "Normalizing go payload"
    );

    let modules = module
        .packages
        .into_iter()
        .map(|pkg| {
            let (enum_consts, loose_consts): (Vec<GoConst>, Vec<GoConst>) =
                pkg.constants.into_iter().partition(|c| {
                    c.type_name
                        .as_deref()
                        .is_some_and(|t| pkg.types.iter().any(|nt| nt.name == t))
                });
            let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for c in enum_consts {
                if let Some(owner) = c.type_name {
                    values.entry(owner).or_default().push(c.name);
                }
            }

            let mut types = Vec::new();
            types.extend(pkg.structs.into_iter().map(|s| convert_struct(s, flagged)));
            types.extend(
                pkg.interfaces
                    .into_iter()
                    .map(|i| convert_interface(i, flagged)),
            );
            types.extend(pkg.types.into_iter().map(|t| {
                let vals = values.remove(&t.name).unwrap_or_default();
                convert_named(t, vals)
            }));

            let mut fields: Vec<RawField> = loose_consts.into_iter().map(convert_const).collect();
            fields.extend(pkg.variables.into_iter().map(|v| {
                let mut field = RawField::new(v.name, non_empty(v.type_name));
                field.doc = non_empty(v.doc);
                field.deprecated = deprecation(v.deprecated, v.deprecated_msg);
                field
            }));

            RawModule {
                name: pkg.name,
                doc: non_empty(pkg.doc),
                types,
                functions: pkg.functions.into_iter().map(convert_func).collect(),
                fields,
            }
        })
        .collect();

    let dependencies = module
        .dependencies
        .into_iter()
        .map(|dep| {
            let mut types: Vec<RawType> = dep
                .structs
                .into_iter()
                .map(|s| convert_struct(s, false))
                .collect();
            types.extend(dep.interfaces.into_iter().map(|i| convert_interface(i, false)));
            types.extend(dep.types.into_iter().map(|t| convert_named(t, Vec::new())));
            RawDependency {
                package: dep.package,
                is_stdlib: dep.is_stdlib,
                types,
            }
        })
        .collect();

    RawPackage {
        package: module.package,
        modules,
        dependencies,
    }
}

fn embeds_to_bases(embeds: Vec<String>) -> Vec<String> {
    embeds
        .iter()
        .map(|e| strip_decoration(e).to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

fn convert_struct(s: GoStruct, flagged: bool) -> RawType {
    let mut ty = RawType::new(s.name, NodeKind::Struct);
    ty.doc = non_empty(s.doc);
    ty.deprecated = deprecation(s.deprecated, s.deprecated_msg);
    ty.type_params = s.type_params;
    ty.bases = embeds_to_bases(s.embeds);
    ty.entry_point = entry_flag(s.entry_point, flagged);
    ty.fields = s
        .fields
        .into_iter()
        .map(|f| {
            let mut field = RawField::new(f.name, non_empty(Some(f.type_name)));
            field.doc = non_empty(f.doc);
            field.deprecated = deprecation(f.deprecated, f.deprecated_msg);
            field
        })
        .collect();
    ty.operations = s
        .methods
        .into_iter()
        .map(|m| {
            // package-level funcs grouped under the type by the tool
            let attached = !m.is_method;
            let mut op = convert_func(m);
            op.is_static = attached;
            op.is_constructor = attached && op.name.starts_with("New");
            op
        })
        .collect();
    ty
}

fn convert_interface(i: GoInterface, flagged: bool) -> RawType {
    let mut ty = RawType::new(i.name, NodeKind::Interface);
    ty.doc = non_empty(i.doc);
    ty.deprecated = deprecation(i.deprecated, i.deprecated_msg);
    ty.bases = embeds_to_bases(i.embeds);
    ty.entry_point = entry_flag(i.entry_point, flagged);
    ty.operations = i.methods.into_iter().map(convert_func).collect();
    ty
}

fn convert_named(t: GoNamedType, values: Vec<String>) -> RawType {
    let kind = if values.is_empty() {
        NodeKind::Alias
    } else {
        NodeKind::Enum
    };
    let mut ty = RawType::new(t.name, kind);
    ty.doc = non_empty(t.doc);
    ty.deprecated = deprecation(t.deprecated, t.deprecated_msg);
    ty.values = values;
    ty.alias_of = non_empty(Some(t.underlying));
    ty
}

fn convert_func(f: GoFunc) -> RawOperation {
    let mut op = RawOperation::new(f.name, f.sig).returning(f.ret.unwrap_or_default());
    op.doc = non_empty(f.doc);
    op.deprecated = deprecation(f.deprecated, f.deprecated_msg);
    op.entry_point = f.entry_point;
    op
}

fn convert_const(c: GoConst) -> RawField {
    let mut field = RawField::new(c.name, non_empty(c.type_name));
    field.value = non_empty(c.value);
    field.is_static = true;
    field.doc = non_empty(c.doc);
    field.deprecated = deprecation(c.deprecated, c.deprecated_msg);
    field
}
