//! Module loader integration tests, over real files.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vibe_engine::{CallOptions, CancelToken, Engine, RuntimeError, Value};

fn write_module(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create module dir");
    }
    fs::write(path, source).expect("write module");
}

fn engine_with_root(root: &Path) -> Engine {
    Engine::builder()
        .module_path(root)
        .build()
        .expect("engine config")
}

fn eval(engine: &Engine, source: &str) -> Result<Value, RuntimeError> {
    let script = engine.compile(source).expect("compile failed");
    script.eval(&CancelToken::new(), CallOptions::default())
}

#[test]
fn require_binds_exports_and_bare_names() {
    let dir = TempDir::new().expect("tempdir");
    write_module(
        dir.path(),
        "mathx.vibe",
        "def double(n)\n  n * 2\nend\n\ndef triple(n)\n  n * 3\nend\n",
    );

    let engine = engine_with_root(dir.path());
    let result = eval(
        &engine,
        "m = require \"mathx\"\nm.double(10) + triple(1)",
    )
    .expect("eval failed");
    assert_eq!(result, Value::Int(23));
}

#[test]
fn private_functions_are_not_exported() {
    let dir = TempDir::new().expect("tempdir");
    write_module(
        dir.path(),
        "secrets.vibe",
        "private def hidden\n  1\nend\n\ndef visible\n  hidden()\nend\n",
    );

    let engine = engine_with_root(dir.path());
    // Public functions can reach private ones through the module env.
    assert_eq!(
        eval(&engine, "require \"secrets\"\nvisible()").expect("eval failed"),
        Value::Int(1)
    );
    // But the exports object does not carry them.
    let err = eval(&engine, "m = require \"secrets\"\nm.hidden()").unwrap_err();
    assert!(err.message().contains("undefined attribute `hidden`"));
}

#[test]
fn repeat_requires_return_the_same_exports_object() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "util.vibe", "def id(x)\n  x\nend\n");

    let engine = engine_with_root(dir.path());
    let result = eval(
        &engine,
        "a = require \"util\"\nb = require \"util\"\na == b",
    )
    .expect("eval failed");
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn alias_binding_and_collisions() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "util.vibe", "def id(x)\n  x\nend\n");

    let engine = engine_with_root(dir.path());
    assert_eq!(
        eval(
            &engine,
            "require \"util\", as: :u\nu.id(7)",
        )
        .expect("eval failed"),
        Value::Int(7)
    );

    // Re-requiring under the same alias is idempotent.
    assert_eq!(
        eval(
            &engine,
            "require \"util\", as: :u\nrequire \"util\", as: :u\nu.id(7)",
        )
        .expect("eval failed"),
        Value::Int(7)
    );

    // A collision with an unrelated binding fails.
    let err = eval(
        &engine,
        "u = 5\nrequire \"util\", as: :u",
    )
    .unwrap_err();
    assert!(err.message().contains("alias `u` is already defined"));
}

#[test]
fn circular_dependencies_are_detected() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "a.vibe", "require \"b\"\n\ndef fa\n  1\nend\n");
    write_module(dir.path(), "b.vibe", "require \"a\"\n\ndef fb\n  2\nend\n");

    let engine = engine_with_root(dir.path());
    let err = eval(&engine, "require \"a\"").unwrap_err();
    assert!(
        err.message()
            .contains("circular dependency detected: a -> b -> a"),
        "got: {}",
        err.message()
    );
}

#[test]
fn relative_requires_resolve_from_the_requiring_module() {
    let dir = TempDir::new().expect("tempdir");
    write_module(
        dir.path(),
        "pkg/entry.vibe",
        "require \"./helper\"\n\ndef run\n  helper_value()\nend\n",
    );
    write_module(
        dir.path(),
        "pkg/helper.vibe",
        "def helper_value\n  99\nend\n",
    );

    let engine = engine_with_root(dir.path());
    assert_eq!(
        eval(&engine, "require \"pkg/entry\"\nrun()").expect("eval failed"),
        Value::Int(99)
    );
}

#[test]
fn escaping_the_module_root_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().join("root");
    fs::create_dir_all(&root).expect("mkdir");
    write_module(&root, "inner.vibe", "require \"../outer\"\n");
    write_module(dir.path(), "outer.vibe", "def x\n  1\nend\n");

    let engine = engine_with_root(&root);
    let err = eval(&engine, "require \"inner\"").unwrap_err();
    assert!(
        err.message().contains("escapes the module root"),
        "got: {}",
        err.message()
    );
}

#[test]
fn bare_names_must_not_contain_parent_segments() {
    let dir = TempDir::new().expect("tempdir");
    let engine = engine_with_root(dir.path());
    let err = eval(&engine, "require \"../evil\"").unwrap_err();
    // `../` makes it a relative require resolved against the script's
    // root, which immediately escapes.
    assert!(err.message().contains("escapes the module root"));

    let err = eval(&engine, "require \"pkg/../../evil\"").unwrap_err();
    assert!(err.message().contains("must not contain `..`"));
}

#[test]
fn deny_list_is_checked_before_allow_list() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "net/http.vibe", "def get\n  1\nend\n");
    write_module(dir.path(), "util.vibe", "def id(x)\n  x\nend\n");

    let engine = Engine::builder()
        .module_path(dir.path())
        .module_deny("net/*")
        .build()
        .expect("engine config");
    let err = eval(&engine, "require \"net/http\"").unwrap_err();
    assert!(err.message().contains("denied by policy"));
    assert!(eval(&engine, "require \"util\"").is_ok());
}

#[test]
fn allow_list_restricts_everything_else() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "good.vibe", "def g\n  1\nend\n");
    write_module(dir.path(), "other.vibe", "def o\n  1\nend\n");

    let engine = Engine::builder()
        .module_path(dir.path())
        .module_allow("good")
        .build()
        .expect("engine config");
    assert!(eval(&engine, "require \"good\"").is_ok());
    let err = eval(&engine, "require \"other\"").unwrap_err();
    assert!(err.message().contains("not allowed by policy"));
}

#[test]
fn module_cache_is_bounded_without_eviction() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "one.vibe", "def f1\n  1\nend\n");
    write_module(dir.path(), "two.vibe", "def f2\n  2\nend\n");

    let engine = Engine::builder()
        .module_path(dir.path())
        .max_cached_modules(1)
        .build()
        .expect("engine config");
    assert!(eval(&engine, "require \"one\"").is_ok());
    // The cached module stays loadable; a new one cannot be inserted.
    assert!(eval(&engine, "require \"one\"").is_ok());
    let err = eval(&engine, "require \"two\"").unwrap_err();
    assert!(err.message().contains("module cache limit reached"));
}

#[test]
fn strict_effects_gates_require_behind_opt_in() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "util.vibe", "def id(x)\n  x\nend\n");

    let engine = Engine::builder()
        .module_path(dir.path())
        .strict_effects(true)
        .build()
        .expect("engine config");

    let script = engine
        .compile("m = require \"util\"\nm.id(5)")
        .expect("compile failed");
    let err = script
        .eval(&CancelToken::new(), CallOptions::default())
        .unwrap_err();
    assert!(err.message().contains("require is not allowed"));

    let ok = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                allow_require: true,
                ..CallOptions::default()
            },
        )
        .expect("opted-in eval failed");
    assert_eq!(ok, Value::Int(5));
}

#[test]
fn modules_reject_arbitrary_top_level_statements() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "weird.vibe", "x = 1\n\ndef f\n  x\nend\n");

    let engine = engine_with_root(dir.path());
    let err = eval(&engine, "require \"weird\"").unwrap_err();
    assert!(
        err.message()
            .contains("unsupported top-level statement in module"),
        "got: {}",
        err.message()
    );
}

#[test]
fn missing_modules_are_reported() {
    let dir = TempDir::new().expect("tempdir");
    let engine = engine_with_root(dir.path());
    let err = eval(&engine, "require \"ghost\"").unwrap_err();
    assert!(err.message().contains("module `ghost` not found"));
}

#[test]
fn module_errors_render_against_the_module_source() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "boom.vibe", "def explode\n  1 / 0\nend\n");

    let engine = engine_with_root(dir.path());
    let script = engine
        .compile("require \"boom\"\nexplode()")
        .expect("compile failed");
    let err = script
        .eval(&CancelToken::new(), CallOptions::default())
        .unwrap_err();

    // The code frame comes from boom.vibe, not the requiring script,
    // even though the renderer is handed the main source as fallback.
    let rendered = err.render(Some(script.source()));
    assert!(rendered.contains("division by zero"), "got: {rendered}");
    assert!(rendered.contains("1 / 0"), "got: {rendered}");
    assert!(!rendered.contains("> 2 | explode()"), "got: {rendered}");
}

#[test]
fn bare_exported_names_never_overwrite_existing_bindings() {
    let dir = TempDir::new().expect("tempdir");
    write_module(dir.path(), "util.vibe", "def marker\n  :module\nend\n");

    let engine = engine_with_root(dir.path());
    let result = eval(
        &engine,
        "marker = :mine\nm = require \"util\"\nmarker",
    )
    .expect("eval failed");
    assert_eq!(result, Value::symbol("mine"));
}
