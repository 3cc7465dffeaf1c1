#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use surface_api::{EngineDescriptor, ExecutionMode, Language};
use surface_core::config::{EngineSettings, Environment};
use surface_core::{SurfaceEngine, SurfaceError};
use surface_plugin::CanonicalAdapter;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const PAYLOAD: &str = r#"{
  "package": "sdk",
  "modules": [{
    "name": "sdk",
    "types": [
      {"name": "StorageClient", "operations": [
        {"name": "get", "signature": "key: str, options: GetOptions", "returnType": "Blob"}
      ]},
      {"name": "GetOptions", "fields": [{"name": "timeout", "typeName": "int"}]},
      {"name": "Blob", "bases": ["BaseModel"]},
      {"name": "BaseModel"},
      {"name": "Unused", "operations": [{"name": "noop", "signature": ""}]}
    ]
  }]
}"#;

struct Fixture {
    dir: TempDir,
    pkg: PathBuf,
    count: PathBuf,
    payload: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("client.py"), "class StorageClient: ...\n").unwrap();
        let payload = dir.path().join("payload.json");
        fs::write(&payload, PAYLOAD).unwrap();
        fs::create_dir_all(dir.path().join("home/tools")).unwrap();
        Self {
            count: dir.path().join("runs"),
            dir,
            pkg,
            payload,
        }
    }

    /// Install the collaborator script; every run appends a line to the
    /// run counter before executing `body`.
    fn tool(&self, body: &str) {
        let body = body.replace("{payload}", &self.payload.display().to_string());
        let script = format!("echo run >> '{}'\n{}\n", self.count.display(), body);
        fs::write(self.dir.path().join("home/tools/tool.sh"), script).unwrap();
    }

    fn runs(&self) -> usize {
        fs::read_to_string(&self.count)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn descriptor() -> EngineDescriptor {
        EngineDescriptor::new(Language::PYTHON, "sh")
            .with_native_binary("surface-python-missing")
            .with_runtime_candidates(["/bin/sh"])
            .with_runtime_validation_args(["-c", "exit 0"])
            .with_runtime_script("tool.sh")
            .with_extensions(["py"])
    }

    fn engine_with(&self, desc: EngineDescriptor, tweak: impl FnOnce(&mut EngineSettings)) -> SurfaceEngine {
        let mut settings = EngineSettings::rooted_at(self.dir.path().join("home"), Environment::default());
        settings.executor.timeout = Duration::from_secs(20);
        tweak(&mut settings);
        SurfaceEngine::builder(settings)
            .register_adapter(Arc::new(CanonicalAdapter::new(desc)))
            .container_runtimes(Vec::<String>::new())
            .without_exe_dir()
            .build()
    }

    fn engine(&self) -> SurfaceEngine {
        self.engine_with(Self::descriptor(), |_| {})
    }
}

fn touch(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_surface_is_cached_for_unchanged_package() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let first = engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    let second = engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fx.runs(), 1);
    assert_eq!(first.mode, ExecutionMode::RuntimeInterpreter);
    let reachable: Vec<&str> = first.reachable.iter().map(String::as_str).collect();
    assert_eq!(reachable, vec!["BaseModel", "Blob", "GetOptions", "StorageClient"]);
}

#[tokio::test]
async fn test_modified_source_forces_recompute() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let first = engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    touch(&fx.pkg.join("client.py"), "class StorageClient:\n    pass\n");
    let second = engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    assert_eq!(fx.runs(), 2);
    assert_ne!(first.fingerprint, second.fingerprint);

    touch(&fx.pkg.join("NOTES.md"), "not a source file");
    engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    assert_eq!(fx.runs(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_run() {
    let fx = Fixture::new();
    fx.tool("sleep 0.3\ncat '{payload}'");
    let engine = Arc::new(fx.engine());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let pkg = fx.pkg.clone();
        handles.push(tokio::spawn(async move {
            engine
                .surface(&pkg, &Language::PYTHON, &CancellationToken::new())
                .await
                .unwrap()
        }));
    }
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(fx.runs(), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[tokio::test]
async fn test_failures_are_retried() {
    let fx = Fixture::new();
    fx.tool("echo 'Traceback: boom' >&2\nexit 2");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        match engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await {
            Err(SurfaceError::ProcessFailure { exit_code, stderr, mode, .. }) => {
                assert_eq!(exit_code, Some(2));
                assert!(stderr.contains("boom"));
                assert_eq!(mode, ExecutionMode::RuntimeInterpreter);
            }
            other => panic!("expected process failure, got {other:?}"),
        }
    }
    assert_eq!(fx.runs(), 2);
}

#[tokio::test]
async fn test_malformed_output_is_distinct() {
    let fx = Fixture::new();
    fx.tool("echo 'this is not json'");
    let err = fx
        .engine()
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::MalformedOutput { .. }), "{err:?}");
}

#[tokio::test]
async fn test_truncated_but_parseable_output_warns() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'\nhead -c 20000 /dev/zero | tr '\\000' ' '");
    let limit = PAYLOAD.len() + 100;
    let engine = fx.engine_with(Fixture::descriptor(), |s| s.executor.max_output_bytes = limit);

    let surface = engine
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap();
    assert!(surface.diagnostics.iter().any(|d| d.id == "SURF-TRUNC"));
    assert!(surface.graph.contains("StorageClient"));
}

#[tokio::test]
async fn test_truncated_unparseable_output_is_too_large() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let engine = fx.engine_with(Fixture::descriptor(), |s| s.executor.max_output_bytes = 20);

    let err = engine
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::OutputTooLarge { limit: 20, .. }), "{err:?}");
}

#[tokio::test]
async fn test_timeout_and_cancellation_are_distinct() {
    let fx = Fixture::new();
    fx.tool("exec sleep 30");
    let engine = fx.engine_with(Fixture::descriptor(), |s| {
        s.executor.timeout = Duration::from_millis(300)
    });
    let err = engine
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SurfaceError::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_millis(300)),
        other => panic!("expected timeout, got {other:?}"),
    }

    let engine = fx.engine();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });
    let err = engine
        .surface(&fx.pkg, &Language::PYTHON, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Cancelled), "{err:?}");
}

#[tokio::test]
async fn test_unavailable_names_runtime_tool() {
    let fx = Fixture::new();
    let desc = EngineDescriptor::new(Language::PYTHON, "surface-no-such-interpreter")
        .with_extensions(["py"]);
    let engine = fx.engine_with(desc, |_| {});
    let err = engine
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SurfaceError::Unavailable { reason, .. } => {
            assert!(reason.contains("surface-no-such-interpreter"));
            assert!(reason.contains("native binary"));
            assert!(reason.contains("container"));
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_language_and_bad_path() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let err = engine
        .surface(&fx.pkg, &Language::new("cobol"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::UnsupportedLanguage(_)));

    let err = engine
        .surface(&fx.pkg.join("missing"), &Language::PYTHON, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_workspace_root_confines_targets() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let outside = fx.dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    let root = fx.pkg.clone();
    let engine = fx.engine_with(Fixture::descriptor(), |s| {
        s.executor.workspace_root = Some(root);
    });
    let cancel = CancellationToken::new();

    engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();

    let escaped = fx.pkg.join("..").join("outside");
    let err = engine
        .surface(&escaped, &Language::PYTHON, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidPath { .. }));
    assert_eq!(fx.runs(), 1);
}

#[tokio::test]
async fn test_side_channel_and_unresolved_diagnostics() {
    let fx = Fixture::new();
    let payload = PAYLOAD.replace(r#""typeName": "int""#, r#""typeName": "RetryPolicy""#);
    fs::write(&fx.payload, payload).unwrap();
    fx.tool("echo 'warning: skipped broken.py' >&2\ncat '{payload}'");

    let surface = fx
        .engine()
        .surface(&fx.pkg, &Language::PYTHON, &CancellationToken::new())
        .await
        .unwrap();
    assert!(surface
        .diagnostics
        .iter()
        .any(|d| d.id == "TOOL-warning" && d.text == "skipped broken.py"));
    assert!(surface
        .diagnostics
        .iter()
        .any(|d| d.id == "SURF-UNRESOLVED" && d.text.contains("RetryPolicy")));
}

#[tokio::test]
async fn test_render_end_to_end() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let text = fx
        .engine()
        .render(&fx.pkg, &Language::PYTHON, 10_000, &CancellationToken::new())
        .await
        .unwrap();
    assert!(text.starts_with("// package sdk"));
    assert!(text.contains("class StorageClient {"));
    assert!(text.contains("  get(key: str, options: GetOptions) -> Blob"));
    assert!(text.contains("class Blob extends BaseModel"));
    assert!(!text.contains("Unused"));
}

#[tokio::test]
async fn test_usage_report() {
    let fx = Fixture::new();
    let samples = fx.dir.path().join("samples");
    fs::create_dir_all(&samples).unwrap();
    fx.tool(
        r#"if [ "$1" = "--usage" ]; then
  test -s "$2" || exit 9
  echo '{"fileCount":1,"covered":[{"client":"StorageClient","method":"get","file":"s.py","line":4}],"uncovered":[]}'
  exit 0
fi
cat '{payload}'"#,
    );

    let report = fx
        .engine()
        .usage(&fx.pkg, &Language::PYTHON, &samples, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.file_count, 1);
    assert_eq!(report.covered[0].method, "get");
    assert!((report.coverage() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_reset_forgets_everything() {
    let fx = Fixture::new();
    fx.tool("cat '{payload}'");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    assert_eq!(engine.cached_surfaces(), 1);
    engine.reset();
    assert_eq!(engine.cached_surfaces(), 0);
    assert!(engine.resolver().cached(&Language::PYTHON).is_none());

    engine.surface(&fx.pkg, &Language::PYTHON, &cancel).await.unwrap();
    assert_eq!(fx.runs(), 2);
}
