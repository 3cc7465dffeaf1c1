//! Java language adapter.
//!
//! Runs `GraphApi.java` with the single-file source launcher (or through
//! `jbang`), or the prebuilt `surface-java` binary, and normalizes its
//! per-package class/interface/enum/annotation lists.

pub mod payload;

use payload::{JavaMethod, JavaModule, JavaType, has_modifier};
use surface_api::{EngineDescriptor, Language, NodeKind};
use surface_plugin::normalize::{deprecation, entry_flag, non_empty, simple_name};
use surface_plugin::{
    LanguageAdapter, PayloadError, RawDependency, RawField, RawModule, RawOperation, RawPackage,
    RawType,
};

pub const DEFAULT_IMAGE: &str = "ghcr.io/surface-tools/java-extractor:latest";

const MARKER_BASES: &[&str] = &["Serializable", "Cloneable", "RandomAccess", "EventListener"];

const BUILTIN_TYPES: &[&str] = &[
    // java.lang
    "Object", "String", "CharSequence", "Boolean", "Byte", "Character", "Short", "Integer",
    "Long", "Float", "Double", "Number", "Void", "Class", "Enum", "Record", "Iterable",
    "Comparable", "Runnable", "AutoCloseable", "Thread", "StringBuilder", "Throwable",
    "Exception", "RuntimeException", "Error", "IllegalArgumentException",
    "IllegalStateException", "NullPointerException", "UnsupportedOperationException",
    "InterruptedException", "IndexOutOfBoundsException", "Override", "Deprecated",
    "FunctionalInterface", "SafeVarargs", "SuppressWarnings",
    // java.util
    "List", "ArrayList", "LinkedList", "Map", "HashMap", "LinkedHashMap", "TreeMap", "Set",
    "HashSet", "LinkedHashSet", "TreeSet", "Collection", "Iterator", "Optional", "OptionalInt",
    "OptionalLong", "OptionalDouble", "UUID", "Locale", "Objects", "Arrays", "Collections",
    "Deque", "Queue", "SortedMap", "NavigableMap", "Properties", "Date",
    // java.util.function / concurrent / stream
    "Function", "BiFunction", "Consumer", "BiConsumer", "Supplier", "Predicate",
    "BiPredicate", "UnaryOperator", "BinaryOperator", "Callable", "Future",
    "CompletableFuture", "CompletionStage", "Executor", "ExecutorService", "TimeUnit",
    "Stream", "IntStream", "LongStream", "Flow",
    // java.io / nio / net / time / math
    "Closeable", "Serializable", "InputStream", "OutputStream", "Reader", "Writer",
    "IOException", "UncheckedIOException", "File", "Path", "ByteBuffer", "Charset", "URI",
    "URL", "Duration", "Instant", "LocalDate", "LocalDateTime", "OffsetDateTime",
    "ZonedDateTime", "BigDecimal", "BigInteger",
];

#[derive(Debug, Clone)]
pub struct JavaAdapter {
    descriptor: EngineDescriptor,
}

impl JavaAdapter {
    pub fn new() -> Self {
        let descriptor = EngineDescriptor::new(Language::JAVA, "java")
            .with_runtime_candidates(["java", "jbang"])
            .with_runtime_script("GraphApi.java")
            .with_default_image(DEFAULT_IMAGE)
            .with_extensions(["java"]);
        Self { descriptor }
    }
}

impl Default for JavaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for JavaAdapter {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    fn parse_payload(&self, payload: &str) -> Result<RawPackage, PayloadError> {
        if payload.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        let module: JavaModule = serde_json::from_str(payload)?;
        Ok(normalize(module))
    }

    fn is_marker_base(&self, name: &str) -> bool {
        MARKER_BASES.contains(&simple_name(name))
    }

    fn is_builtin_type(&self, name: &str) -> bool {
        BUILTIN_TYPES.contains(&name)
    }
}

fn normalize(module: JavaModule) -> RawPackage {
    let flagged = module.has_entry_flags();
    tracing::debug!(
        package = %module.package,
        packages = module.packages.len(),
        flagged,
        "Normalizing java payload"
    );

    let modules = module
        .packages
        .into_iter()
        .map(|pkg| {
            let mut types = Vec::new();
            let groups = [
                (pkg.classes, NodeKind::Class),
                (pkg.interfaces, NodeKind::Interface),
                (pkg.enums, NodeKind::Enum),
                (pkg.annotations, NodeKind::Annotation),
            ];
            for (group, kind) in groups {
                types.extend(group.into_iter().map(|t| convert_type(t, kind, Some(flagged))));
            }
            RawModule {
                name: pkg.name,
                types,
                ..Default::default()
            }
        })
        .collect();

    let dependencies = module
        .dependencies
        .into_iter()
        .map(|dep| {
            let groups = [
                (dep.classes, NodeKind::Class),
                (dep.interfaces, NodeKind::Interface),
                (dep.types, NodeKind::Class),
            ];
            let mut types = Vec::new();
            for (group, kind) in groups {
                types.extend(group.into_iter().map(|t| convert_type(t, kind, None)));
            }
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

fn kind_of(declared: Option<&str>, fallback: NodeKind) -> NodeKind {
    match declared {
        Some("record") => NodeKind::Struct,
        Some("annotation") => NodeKind::Annotation,
        Some("interface") => NodeKind::Interface,
        Some("enum") => NodeKind::Enum,
        Some("class") => NodeKind::Class,
        _ => fallback,
    }
}

/// `flagged` is `None` for dependency types, which never carry entry flags.
fn convert_type(t: JavaType, group_kind: NodeKind, flagged: Option<bool>) -> RawType {
    let kind = kind_of(t.kind.as_deref(), group_kind);
    let mut ty = RawType::new(t.name, kind);
    ty.doc = non_empty(t.doc);
    ty.deprecated = deprecation(t.deprecated, None);
    ty.type_params = t.type_params.into_vec();
    ty.bases = t
        .extends
        .into_vec()
        .into_iter()
        .filter(|b| simple_name(b) != "Object")
        .collect();
    ty.implements = t.implements.into_vec();
    ty.values = t.values;
    ty.entry_point = flagged.and_then(|f| entry_flag(t.entry_point, f));
    ty.is_abstract = kind == NodeKind::Class && has_modifier(&t.modifiers, "abstract");
    ty.is_sealed = has_modifier(&t.modifiers, "sealed");

    let type_name = ty.name.clone();
    ty.operations = t
        .constructors
        .into_iter()
        .map(|c| {
            let mut op = convert_method(c);
            op.name = type_name.clone();
            op.is_constructor = true;
            op.is_static = false;
            op
        })
        .chain(t.methods.into_iter().map(convert_method))
        .collect();

    ty.fields = t
        .fields
        .into_iter()
        .map(|f| {
            let mut field = RawField::new(f.name, non_empty(f.type_name));
            field.value = non_empty(f.value);
            field.is_static = f.is_static || has_modifier(&f.modifiers, "static");
            field.deprecated = deprecation(f.deprecated, None);
            field.doc = non_empty(f.doc);
            field
        })
        .chain(
            t.components
                .into_iter()
                .map(|c| RawField::new(c.name, non_empty(c.type_name))),
        )
        .chain(t.members.into_iter().map(|m| {
            let mut field = RawField::new(m.name, non_empty(m.type_name));
            field.value = non_empty(m.default);
            field
        }))
        .collect();
    ty
}

fn convert_method(m: JavaMethod) -> RawOperation {
    let mut ret = m.ret.unwrap_or_default();
    if !m.throws.is_empty() {
        let throws = format!("throws {}", m.throws.join(", "));
        ret = if ret.trim().is_empty() {
            throws
        } else {
            format!("{ret} {throws}")
        };
    }
    let mut op = RawOperation::new(m.name, m.sig).returning(ret);
    op.is_static = m.is_static || has_modifier(&m.modifiers, "static");
    op.deprecated = deprecation(m.deprecated, None);
    op.doc = non_empty(m.doc);
    op.entry_point = m.entry_point;
    op
}
