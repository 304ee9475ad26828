//! Module loader tests
//!
//! Sources live in a `MemoryStore` so every scenario spells out the files
//! it loads.

use hyperbox_vm::{
    Bindings, MemoryStore, Module, ModuleOptions, Runtime, RuntimeConfig, VmError,
};
use hyperbox_script::Value;
use std::path::Path;
use std::rc::Rc;

// ============================================================================
// Helpers
// ============================================================================

fn runtime(files: &[(&str, &str)]) -> Runtime {
    let store = MemoryStore::new();
    for (path, source) in files {
        store.insert(path, *source);
    }
    Runtime::with_store(RuntimeConfig::default(), store)
}

fn instantiate(runtime: &Runtime, code: &str, options: ModuleOptions) -> Result<Module, VmError> {
    let name = options.id.clone();
    let module = Module::new(runtime, options)?;
    module.load(&name)?;
    module.compile(code, &name)?;
    Ok(module)
}

fn get(value: &Value, key: &str) -> Value {
    value
        .as_object()
        .and_then(|obj| obj.get(key))
        .unwrap_or_default()
}

// ============================================================================
// Environments
// ============================================================================

#[test]
fn test_globals_do_not_leak_across_loads() {
    let runtime = runtime(&[]);
    let code = "global.foo = global.foo || 0; global.foo += 1; module.exports = global.foo;";

    let first = instantiate(&runtime, code, ModuleOptions::new("/app/a.js")).unwrap();
    let second = instantiate(&runtime, code, ModuleOptions::new("/app/a.js")).unwrap();

    assert_eq!(first.exports(), Value::from(1));
    assert_eq!(second.exports(), Value::from(1));
}

#[test]
fn test_new_environment_per_module() {
    let runtime = runtime(&[]);
    let first = instantiate(&runtime, "global.foo = 1", ModuleOptions::new("/a.js")).unwrap();
    let second = instantiate(&runtime, "global.foo = 1", ModuleOptions::new("/a.js")).unwrap();

    assert!(!first.environment().ptr_eq(second.environment()));
}

#[test]
fn test_explicit_environment_is_used() {
    let runtime = runtime(&[]);
    let mut bindings = Bindings::new();
    bindings.insert("tenant".to_string(), Value::from("acme"));
    let env = runtime.create_environment(&bindings);

    let module = instantiate(
        &runtime,
        "module.exports = tenant;",
        ModuleOptions::new("/t.js").with_environment(env.clone()),
    )
    .unwrap();

    assert_eq!(module.exports(), Value::from("acme"));
    assert!(module.environment().ptr_eq(&env));
}

#[test]
fn test_baseline_bindings_are_present() {
    let runtime = runtime(&[]);
    let module = instantiate(
        &runtime,
        r#"
        module.exports = {
            buffer: Buffer.from('hi').toString('hex'),
            console: typeof console.log,
            process: typeof process.cwd,
            timers: typeof setTimeout,
            self: global === globalThis,
        };
        "#,
        ModuleOptions::new("/b.js"),
    )
    .unwrap();
    let exports = module.exports();

    assert_eq!(get(&exports, "buffer"), Value::from("6869"));
    assert_eq!(get(&exports, "console"), Value::from("function"));
    assert_eq!(get(&exports, "process"), Value::from("function"));
    assert_eq!(get(&exports, "timers"), Value::from("function"));
    assert_eq!(get(&exports, "self"), Value::Boolean(true));
}

// ============================================================================
// Contract violations
// ============================================================================

#[test]
fn test_flags_must_be_paired() {
    let runtime = runtime(&[]);
    runtime.init_global_context(&Bindings::new());

    let err = Module::new(
        &runtime,
        ModuleOptions::new("a").with_prefer_cached_initializer(true),
    )
    .unwrap_err();
    assert!(matches!(err, VmError::Config(_)));
    assert!(err.is_contract_violation());
}

#[test]
fn test_shared_environment_must_be_initialized() {
    let runtime = runtime(&[]);
    let err = Module::new(&runtime, ModuleOptions::new("a").with_shared_context()).unwrap_err();
    assert!(matches!(err, VmError::GlobalContextUninitialized));
}

#[test]
fn test_double_load_fails() {
    let runtime = runtime(&[("/a.js", "module.exports = 1;")]);
    let module = runtime.load("/a.js", "/a.js").unwrap();

    let err = module.load("/a.js").unwrap_err();
    assert!(matches!(err, VmError::AlreadyLoaded(_)));
}

#[test]
fn test_non_string_specifier() {
    let runtime = runtime(&[]);
    let module = instantiate(
        &runtime,
        r#"
        var caught = [];
        try { require(42); } catch (e) { caught.push(e.message); }
        try { require(''); } catch (e) { caught.push(e.message); }
        module.exports = caught;
        "#,
        ModuleOptions::new("/a.js"),
    )
    .unwrap();

    let caught = module.exports().as_object().unwrap().array_items().unwrap();
    assert_eq!(caught.len(), 2);
    assert!(caught[0].to_js_string().contains("Invalid module specifier"));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_returns_module() {
    let runtime = runtime(&[("/app/array.js", "module.exports = [];")]);
    let module = runtime.load("/app/array.js", "/app/array.js").unwrap();

    assert!(module.is_loaded());
    assert_eq!(module.filename().as_deref(), Some(Path::new("/app/array.js")));
    assert!(module.exports().as_object().unwrap().array_items().is_some());
}

#[test]
fn test_run_marks_loaded_on_failure() {
    let runtime = runtime(&[("/app/bad.js", "throw new Error('nope');")]);
    let module = Module::new(&runtime, ModuleOptions::new("/app/bad.js")).unwrap();
    module.load("/app/bad.js").unwrap();

    let err = module.run("/app/bad.js").unwrap_err();
    assert!(matches!(err, VmError::Script(_)));
    assert!(module.is_loaded());
}

#[test]
fn test_load_tree_singleton() {
    let runtime = runtime(&[
        ("/app/dep.js", "module.exports = { items: [] };"),
        (
            "/app/main.js",
            r#"
            var a = require('./dep');
            var b = require('./dep.js');
            a.items.push(1);
            module.exports = { same: a === b, dep: b, count: b.items.length };
            "#,
        ),
    ]);

    let first = runtime.load_file("/app/main.js", None).unwrap();
    assert_eq!(get(&first, "same"), Value::Boolean(true));
    assert_eq!(get(&first, "count"), Value::from(1));

    let second = runtime.load_file("/app/main.js", None).unwrap();
    assert_ne!(get(&first, "dep"), get(&second, "dep"));
    assert_eq!(get(&second, "count"), Value::from(1));
}

#[test]
fn test_singleton_is_not_mutated_across_trees() {
    let runtime = runtime(&[("/app/list.js", "module.exports = [];")]);
    let code = "var list = require('./list'); list.push(1); module.exports = list;";

    let first = instantiate(&runtime, code, ModuleOptions::new("/app/a.js")).unwrap();
    let second = instantiate(&runtime, code, ModuleOptions::new("/app/a.js")).unwrap();

    let first = first.exports();
    let second = second.exports();
    assert_ne!(first, second);
    assert_eq!(second.as_object().unwrap().array_items().unwrap().len(), 1);
}

#[test]
fn test_failed_require_is_rolled_back() {
    let runtime = runtime(&[
        (
            "/app/flaky.js",
            r#"
            global.attempts = (global.attempts || 0) + 1;
            if (!global.ready) { throw new Error('not ready'); }
            module.exports = { ok: true };
            "#,
        ),
        (
            "/app/main.js",
            r#"
            var first;
            try { require('./flaky'); } catch (e) { first = e.message; }
            global.ready = true;
            var second = require('./flaky');
            module.exports = { first: first, ok: second.ok, attempts: global.attempts };
            "#,
        ),
    ]);

    let exports = runtime.load_file("/app/main.js", None).unwrap();
    assert_eq!(get(&exports, "first"), Value::from("not ready"));
    assert_eq!(get(&exports, "ok"), Value::Boolean(true));
    assert_eq!(get(&exports, "attempts"), Value::from(2));
}

#[test]
fn test_failed_top_level_load_leaves_no_entry() {
    let runtime = runtime(&[("/app/bad.js", "throw new Error('boom');")]);
    let root = Module::new(&runtime, ModuleOptions::new("/app/root.js")).unwrap();
    root.load("/app/root.js").unwrap();

    assert!(root.require("./bad").is_err());
    assert!(!root.cache().has("/app/bad.js"));
    assert!(root.require("./bad").is_err());
}

#[test]
fn test_cyclic_requires_see_partial_exports() {
    let runtime = runtime(&[
        (
            "/app/a.js",
            r#"
            exports.started = true;
            var b = require('./b');
            exports.bSawA = b.sawStarted;
            exports.bSawDone = b.sawDone;
            exports.done = true;
            "#,
        ),
        (
            "/app/b.js",
            r#"
            var a = require('./a');
            exports.sawStarted = a.started === true;
            exports.sawDone = a.done === true;
            "#,
        ),
    ]);

    let exports = runtime.load_file("/app/a.js", None).unwrap();
    assert_eq!(get(&exports, "bSawA"), Value::Boolean(true));
    assert_eq!(get(&exports, "bSawDone"), Value::Boolean(false));
    assert_eq!(get(&exports, "done"), Value::Boolean(true));
}

#[test]
fn test_missing_dependency_surfaces_unwrapped() {
    let runtime = runtime(&[("/app/main.js", "require('./missing');")]);
    let err = runtime.load_file("/app/main.js", None).unwrap_err();
    assert!(matches!(err, VmError::ModuleNotFound(ref s) if s == "./missing"));
}

#[test]
fn test_process_exit_surfaces_as_exit() {
    let runtime = runtime(&[]);
    let err = instantiate(&runtime, "process.exit(3);", ModuleOptions::new("/a.js")).unwrap_err();
    assert!(matches!(err, VmError::Exit(3)));
}

#[test]
fn test_syntax_error_names_file() {
    let runtime = runtime(&[]);
    let err = instantiate(&runtime, "var = ;", ModuleOptions::new("/app/broken.js")).unwrap_err();
    assert!(err.to_string().contains("/app/broken.js"));
}

// ============================================================================
// Extensions and native modules
// ============================================================================

#[test]
fn test_json_modules() {
    let runtime = runtime(&[
        ("/app/data.json", r#"{"name": "hyperbox", "tags": ["a", "b"]}"#),
        (
            "/app/main.js",
            "var data = require('./data'); module.exports = data.name + ':' + data.tags.length;",
        ),
    ]);

    let exports = runtime.load_file("/app/main.js", None).unwrap();
    assert_eq!(exports, Value::from("hyperbox:2"));
}

#[test]
fn test_add_extension() {
    let runtime = runtime(&[
        ("/app/note.txt", "hello"),
        ("/app/main.js", "module.exports = require('./note.txt').toUpperCase();"),
    ]);
    runtime.add_extension(".txt", |module, path| {
        let text = module.runtime().read_source(path)?;
        module.set_exports(Value::from(text));
        Ok(())
    });

    assert!(runtime.extensions().contains(&".txt".to_string()));
    let exports = runtime.load_file("/app/main.js", None).unwrap();
    assert_eq!(exports, Value::from("HELLO"));
}

#[test]
fn test_extension_handler_can_compile() {
    let runtime = runtime(&[
        ("/app/answer.expr", "6 * 7"),
        ("/app/main.js", "module.exports = require('./answer');"),
    ]);
    runtime.add_extension("expr", |module, path| {
        let text = module.runtime().read_source(path)?;
        module.compile(&format!("module.exports = {};", text), &path.to_string_lossy())?;
        Ok(())
    });

    let exports = runtime.load_file("/app/main.js", None).unwrap();
    assert_eq!(exports, Value::from(42));
}

#[test]
fn test_native_path_module() {
    let runtime = runtime(&[]);
    let module = instantiate(
        &runtime,
        r#"
        var path = require('path');
        module.exports = {
            joined: path.join('/srv', 'app', '../lib', 'x.js'),
            same: path === require('node:path'),
            ext: path.extname('bundle.min.js'),
        };
        "#,
        ModuleOptions::new("/app/a.js"),
    )
    .unwrap();
    let exports = module.exports();

    assert_eq!(get(&exports, "joined"), Value::from("/srv/lib/x.js"));
    assert_eq!(get(&exports, "same"), Value::Boolean(true));
    assert_eq!(get(&exports, "ext"), Value::from(".js"));
}

#[test]
fn test_register_native_module() {
    let runtime = runtime(&[]);
    runtime.register_native_module("answer", |_| Value::from(42));

    let module = instantiate(
        &runtime,
        "module.exports = require('answer');",
        ModuleOptions::new("/a.js"),
    )
    .unwrap();
    assert_eq!(module.exports(), Value::from(42));
}

#[test]
fn test_require_resolve() {
    let runtime = runtime(&[("/app/lib/util.js", "")]);
    let module = instantiate(
        &runtime,
        "module.exports = require.resolve('./lib/util');",
        ModuleOptions::new("/app/main.js"),
    )
    .unwrap();
    assert_eq!(module.exports(), Value::from("/app/lib/util.js"));
}

// ============================================================================
// Initializer cache
// ============================================================================

#[test]
fn test_cached_initializer_reuses_environment() {
    let runtime = runtime(&[]);
    let code = "module.exports = global";

    runtime.init_global_context(&Bindings::new());
    let first = instantiate(&runtime, code, ModuleOptions::new("/g.js").with_shared_context()).unwrap();
    let second = instantiate(&runtime, code, ModuleOptions::new("/g.js").with_shared_context()).unwrap();

    assert_eq!(first.exports(), second.exports());
    assert!(first.environment().ptr_eq(second.environment()));
    assert_eq!(runtime.initializer_cache_len(), 1);
}

#[test]
fn test_cached_initializer_wins_over_new_source() {
    let runtime = runtime(&[]);
    runtime.init_global_context(&Bindings::new());
    let options = || ModuleOptions::new("/v.js").with_shared_context();

    let first = instantiate(&runtime, "module.exports = 1;", options()).unwrap();
    let second = instantiate(&runtime, "module.exports = 2;", options()).unwrap();
    assert_eq!(first.exports(), Value::from(1));
    assert_eq!(second.exports(), Value::from(1));

    runtime.clear_initializer_cache();
    assert_eq!(runtime.initializer_cache_len(), 0);
    let third = instantiate(&runtime, "module.exports = 2;", options()).unwrap();
    assert_eq!(third.exports(), Value::from(2));
}

#[test]
fn test_cached_initializer_sees_reset_bindings() {
    let runtime = runtime(&[]);
    let code = "module.exports = typeof tenant === 'undefined' ? 'none' : tenant;";
    let options = || ModuleOptions::new("/tenant.js").with_shared_context();

    let mut bindings = Bindings::new();
    bindings.insert("tenant".to_string(), Value::from("a"));
    runtime.init_global_context(&bindings);
    let first = instantiate(&runtime, code, options()).unwrap();

    bindings.insert("tenant".to_string(), Value::from("b"));
    runtime.init_global_context(&bindings);
    let second = instantiate(&runtime, code, options()).unwrap();

    runtime.init_global_context(&Bindings::new());
    let third = instantiate(&runtime, code, options()).unwrap();

    assert_eq!(first.exports(), Value::from("a"));
    assert_eq!(second.exports(), Value::from("b"));
    assert_eq!(third.exports(), Value::from("none"));
}

#[test]
fn test_ephemeral_modules_do_not_cache_initializers() {
    let runtime = runtime(&[]);
    instantiate(&runtime, "module.exports = 1;", ModuleOptions::new("/e.js")).unwrap();
    assert_eq!(runtime.initializer_cache_len(), 0);
}

#[test]
fn test_initializer_cache_is_bounded() {
    let config = RuntimeConfig {
        initializer_cache_size: 2,
        ..Default::default()
    };
    let runtime = Runtime::with_store(config, Rc::new(MemoryStore::new()));
    runtime.init_global_context(&Bindings::new());

    for id in ["/1.js", "/2.js", "/3.js"] {
        instantiate(&runtime, "module.exports = 1;", ModuleOptions::new(id).with_shared_context())
            .unwrap();
    }
    assert_eq!(runtime.initializer_cache_len(), 2);
}

// ============================================================================
// Timers
// ============================================================================

#[test]
fn test_timers_fire_on_drain() {
    let runtime = runtime(&[]);
    let module = instantiate(
        &runtime,
        r#"
        global.order = [];
        setTimeout(function () { order.push('timeout'); }, 10);
        setImmediate(function () { order.push('immediate'); });
        process.nextTick(function () { order.push('tick'); });
        "#,
        ModuleOptions::new("/t.js"),
    )
    .unwrap();

    assert_eq!(runtime.pending_timers(), 3);
    assert_eq!(runtime.run_timers().unwrap(), 3);
    assert_eq!(runtime.pending_timers(), 0);

    let order = module.environment().get("order").unwrap();
    let order: Vec<String> = order
        .as_object()
        .unwrap()
        .array_items()
        .unwrap()
        .iter()
        .map(|v| v.to_js_string())
        .collect();
    assert_eq!(order, vec!["immediate", "tick", "timeout"]);
}
