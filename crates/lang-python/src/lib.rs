//! Python language adapter.
//!
//! Runs `extract_api.py` under a Python interpreter (or the prebuilt
//! `surface-python` binary / extractor image) and normalizes its
//! module-oriented payload into the canonical [`RawPackage`].

pub mod payload;

use payload::{PythonClass, PythonFunction, PythonPackage};
use surface_api::{EngineDescriptor, Language, NodeKind};
use surface_plugin::normalize::{entry_flag, non_empty, simple_name, split_top_level};
use surface_plugin::{
    LanguageAdapter, PayloadError, RawDependency, RawField, RawModule, RawOperation, RawPackage,
    RawType,
};

pub const DEFAULT_IMAGE: &str = "ghcr.io/surface-tools/python-extractor:latest";

const MARKER_BASES: &[&str] = &["ABC", "ABCMeta", "Protocol", "Generic", "object"];

const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

const BUILTIN_TYPES: &[&str] = &[
    // builtins
    "None", "NoneType", "Ellipsis", "NotImplemented", "BaseException", "Exception",
    "ArithmeticError", "AttributeError", "KeyError", "IndexError", "LookupError", "OSError",
    "IOError", "RuntimeError", "StopIteration", "StopAsyncIteration", "TimeoutError",
    "TypeError", "ValueError", "NotImplementedError", "ConnectionError", "PermissionError",
    "FileNotFoundError", "UnicodeDecodeError", "Warning", "DeprecationWarning", "UserWarning",
    // typing
    "Any", "AnyStr", "Annotated", "Callable", "ClassVar", "Concatenate", "Dict", "Final",
    "FrozenSet", "Generic", "List", "Literal", "LiteralString", "Never", "NoReturn",
    "NotRequired", "Optional", "ParamSpec", "Protocol", "Required", "Self", "Set", "Tuple",
    "Type", "TypeAlias", "TypeGuard", "TypeVar", "TypeVarTuple", "TypedDict", "Union", "Unpack",
    "NamedTuple", "IO", "TextIO", "BinaryIO", "Pattern", "Match", "DefaultDict", "OrderedDict",
    "Counter", "ChainMap", "Deque",
    // collections.abc
    "Awaitable", "Coroutine", "AsyncIterable", "AsyncIterator", "AsyncGenerator", "Iterable",
    "Iterator", "Generator", "Reversible", "Container", "Collection", "Sized", "Hashable",
    "Sequence", "MutableSequence", "Mapping", "MutableMapping", "MutableSet", "AbstractSet",
    "MappingView", "KeysView", "ItemsView", "ValuesView", "ByteString", "Buffer",
    // abc
    "ABC", "ABCMeta",
    // enum
    "Enum", "IntEnum", "StrEnum", "Flag", "IntFlag",
];

#[derive(Debug, Clone)]
pub struct PythonAdapter {
    descriptor: EngineDescriptor,
}

impl PythonAdapter {
    pub fn new() -> Self {
        let descriptor = EngineDescriptor::new(Language::PYTHON, "python")
            .with_runtime_candidates(["python3", "python", "py"])
            .with_runtime_script("extract_api.py")
            .with_default_image(DEFAULT_IMAGE)
            .with_extensions(["py", "pyi"]);
        Self { descriptor }
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    fn parse_payload(&self, payload: &str) -> Result<RawPackage, PayloadError> {
        if payload.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        let pkg: PythonPackage = serde_json::from_str(payload)?;
        Ok(normalize(pkg))
    }

    fn is_marker_base(&self, name: &str) -> bool {
        MARKER_BASES.contains(&simple_name(name))
    }

    fn is_builtin_type(&self, name: &str) -> bool {
        BUILTIN_TYPES.contains(&name)
    }
}

fn normalize(pkg: PythonPackage) -> RawPackage {
    let flagged = pkg.has_entry_flags();
    tracing::debug!(
        package = %pkg.package,
        modules = pkg.modules.len(),
        flagged,
        "Normalizing python payload"
    );

    let modules = pkg
        .modules
        .into_iter()
        .map(|m| RawModule {
            name: m.name,
            doc: non_empty(m.doc),
            types: m
                .classes
                .into_iter()
                .map(|c| convert_class(c, flagged))
                .collect(),
            functions: m.functions.into_iter().map(convert_function).collect(),
            fields: Vec::new(),
        })
        .collect();

    let dependencies = pkg
        .dependencies
        .into_iter()
        .map(|d| RawDependency {
            package: d.package,
            is_stdlib: d.is_stdlib,
            types: d
                .classes
                .into_iter()
                .map(|c| convert_class(c, false))
                .collect(),
        })
        .collect();

    RawPackage {
        package: pkg.package,
        modules,
        dependencies,
    }
}

/// `Generic[K, V]` -> (`Generic`, Some(`K, V`)).
fn split_subscript(expr: &str) -> (&str, Option<&str>) {
    match expr.find('[') {
        Some(open) if expr.ends_with(']') => {
            (&expr[..open], Some(&expr[open + 1..expr.len() - 1]))
        }
        _ => (expr, None),
    }
}

fn convert_class(class: PythonClass, flagged: bool) -> RawType {
    let mut ty = RawType::new(class.name, NodeKind::Class);
    ty.doc = non_empty(class.doc);
    ty.entry_point = entry_flag(class.entry_point, flagged);

    for base in class
        .base
        .as_deref()
        .map(|b| split_top_level(b, ','))
        .unwrap_or_default()
    {
        let (head, args) = split_subscript(&base);
        match simple_name(head) {
            "Generic" => {
                ty.type_params
                    .extend(args.map(|a| split_top_level(a, ',')).unwrap_or_default());
            }
            "Protocol" => {
                ty.kind = NodeKind::Interface;
                ty.type_params
                    .extend(args.map(|a| split_top_level(a, ',')).unwrap_or_default());
            }
            "ABC" | "ABCMeta" => ty.is_abstract = true,
            "object" => {}
            simple if ENUM_BASES.contains(&simple) => ty.kind = NodeKind::Enum,
            _ => ty.bases.push(base.clone()),
        }
    }
    ty.type_params.dedup();

    ty.operations = class.methods.into_iter().map(convert_method).collect();
    ty.fields = class
        .properties
        .into_iter()
        .map(|p| {
            let mut field = RawField::new(p.name, non_empty(p.type_name));
            field.doc = non_empty(p.doc);
            field
        })
        .collect();
    ty
}

fn convert_method(method: PythonFunction) -> RawOperation {
    let is_static = method.classmethod || method.staticmethod;
    let mut op = convert_function(method);
    op.is_constructor = op.name == "__init__";
    op.is_static = is_static;
    op
}

fn convert_function(func: PythonFunction) -> RawOperation {
    let mut op = RawOperation::new(func.name, func.sig).returning(func.ret.unwrap_or_default());
    op.doc = non_empty(func.doc);
    op.is_async = func.is_async;
    op.entry_point = func.entry_point;
    op
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "package": "storage",
        "modules": [{
            "name": "storage.client",
            "classes": [
                {"name": "StorageClient", "base": "BaseClient", "entryPoint": true,
                 "methods": [
                    {"name": "__init__", "sig": "self, options: ClientOptions"},
                    {"name": "get", "sig": "self, key: str", "ret": "Blob", "async": true},
                    {"name": "from_env", "sig": "cls", "ret": "StorageClient", "classmethod": true}
                 ]},
                {"name": "Cache", "base": "Generic[K, V]",
                 "methods": [{"name": "get", "sig": "self, key: K", "ret": "V | None"}]},
                {"name": "Color", "base": "str, Enum"},
                {"name": "Reader", "base": "Protocol",
                 "methods": [{"name": "read", "sig": "self", "ret": "bytes"}]},
                {"name": "BaseHandler", "base": "ABC",
                 "properties": [{"name": "name", "type": "str", "doc": "Handler name"}]}
            ],
            "functions": [{"name": "connect", "sig": "url: str", "ret": "StorageClient"}]
        }],
        "dependencies": [{"package": "httpx", "classes": [{"name": "Response", "entryPoint": true}]}]
    }"#;

    fn parse() -> RawPackage {
        PythonAdapter::new().parse_payload(SAMPLE).unwrap()
    }

    fn find<'a>(pkg: &'a RawPackage, name: &str) -> &'a RawType {
        pkg.modules[0].types.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_methods_normalized() {
        let pkg = parse();
        let client = find(&pkg, "StorageClient");
        assert_eq!(client.entry_point, Some(true));
        assert_eq!(client.bases, vec!["BaseClient".to_string()]);
        assert!(client.operations[0].is_constructor);
        assert!(client.operations[1].is_async);
        assert_eq!(client.operations[1].return_type.as_deref(), Some("Blob"));
        assert!(client.operations[2].is_static);
        assert_eq!(pkg.modules[0].functions[0].name, "connect");
    }

    #[test]
    fn test_flagged_package_marks_other_classes_false() {
        let pkg = parse();
        assert_eq!(find(&pkg, "Cache").entry_point, Some(false));
    }

    #[test]
    fn test_unflagged_package_defers_to_inference() {
        let pkg = PythonAdapter::new()
            .parse_payload(r#"{"package":"p","modules":[{"name":"m","classes":[{"name":"A"}]}]}"#)
            .unwrap();
        assert_eq!(pkg.modules[0].types[0].entry_point, None);
    }

    #[test]
    fn test_special_bases() {
        let pkg = parse();
        let cache = find(&pkg, "Cache");
        assert_eq!(cache.type_params, vec!["K".to_string(), "V".to_string()]);
        assert!(cache.bases.is_empty());
        assert_eq!(find(&pkg, "Color").kind, NodeKind::Enum);
        assert_eq!(find(&pkg, "Color").bases, vec!["str".to_string()]);
        assert_eq!(find(&pkg, "Reader").kind, NodeKind::Interface);
        let handler = find(&pkg, "BaseHandler");
        assert!(handler.is_abstract);
        assert_eq!(handler.fields[0].type_name.as_deref(), Some("str"));
    }

    #[test]
    fn test_dependencies_never_flagged() {
        let pkg = parse();
        assert_eq!(pkg.dependencies[0].package, "httpx");
        assert_eq!(pkg.dependencies[0].types[0].entry_point, None);
    }

    #[test]
    fn test_empty_and_malformed_payloads() {
        let adapter = PythonAdapter::new();
        assert!(matches!(adapter.parse_payload("  "), Err(PayloadError::Empty)));
        assert!(matches!(
            adapter.parse_payload("{not json"),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_markers_and_builtins() {
        let adapter = PythonAdapter::new();
        assert!(adapter.is_marker_base("typing.Protocol"));
        assert!(adapter.is_marker_base("ABC"));
        assert!(!adapter.is_marker_base("BaseClient"));
        assert!(adapter.is_builtin_type("Optional"));
        assert!(adapter.is_builtin_type("AsyncIterator"));
        assert!(!adapter.is_builtin_type("Blob"));
    }

    #[test]
    fn test_descriptor() {
        let adapter = PythonAdapter::new();
        let desc = adapter.descriptor();
        assert_eq!(desc.runtime_candidates[0], "python3");
        assert_eq!(desc.runtime_script.as_deref(), Some("extract_api.py"));
        assert!(desc.recognizes_extension("pyi"));
        assert_eq!(desc.image_env_var, "SURFACE_IMAGE_PYTHON");
    }
}
