//! Execution service tests

use hyperbox_script::Value;
use hyperbox_vm::{
    Bindings, Module, ModuleOptions, RunOptions, Runtime, Vm, VmConfig, VmError, VmOptions,
};

fn vm() -> Vm {
    Vm::new(Runtime::default(), VmOptions::new())
}

#[test]
fn test_runs_the_code() {
    let vm = vm();
    let exports = vm.run("test.js", "module.exports = 12;", &RunOptions::new()).unwrap();
    assert_eq!(exports, Value::from(12));
}

#[test]
fn test_globals_reach_the_shared_context() {
    let vm = vm();
    let exports = vm
        .run(
            "test.js",
            "module.exports = foo;",
            &RunOptions::shared().with_global("foo", Value::from("foo")),
        )
        .unwrap();
    assert_eq!(exports, Value::from("foo"));
}

#[test]
fn test_globals_do_not_bleed_between_runs() {
    let vm = vm();
    let code = "module.exports = global.foo;";

    let first = vm
        .run(
            "module1",
            code,
            &RunOptions::shared().with_global("foo", Value::from("foo")),
        )
        .unwrap();
    let second = vm.run("module1", code, &RunOptions::shared()).unwrap();

    assert_eq!(first, Value::from("foo"));
    assert_eq!(second, Value::Undefined);
}

#[test]
fn test_caches_exports() {
    let vm = vm();
    let code = "process.foo = (process.foo || 0) + 1; module.exports = process.foo;";

    assert_eq!(vm.run("test.js", code, &RunOptions::new()).unwrap(), Value::from(1));
    assert_eq!(vm.run("test.js", code, &RunOptions::new()).unwrap(), Value::from(1));

    vm.reset();
    assert_eq!(vm.run("test.js", code, &RunOptions::new()).unwrap(), Value::from(2));
}

#[test]
fn test_flushes_the_cache() {
    let vm = vm();
    vm.run("test.js", "", &RunOptions::new()).unwrap();
    assert_eq!(vm.exports_cache_len(), 1);

    vm.reset();
    assert_eq!(vm.exports_cache_len(), 0);
}

#[test]
fn test_changed_source_misses_the_cache() {
    let vm = vm();
    assert_eq!(
        vm.run("a.js", "module.exports = 1;", &RunOptions::new()).unwrap(),
        Value::from(1)
    );
    assert_eq!(
        vm.run("a.js", "module.exports = 2;", &RunOptions::new()).unwrap(),
        Value::from(2)
    );
    assert_eq!(vm.exports_cache_len(), 2);
}

#[test]
fn test_ephemeral_runs_are_isolated() {
    let vm = vm();
    let code = "global.count = (global.count || 0) + 1; module.exports = global.count;";

    assert_eq!(vm.run("a.js", code, &RunOptions::new()).unwrap(), Value::from(1));
    assert_eq!(vm.run("b.js", code, &RunOptions::new()).unwrap(), Value::from(1));
}

#[test]
fn test_shared_runs_skip_the_export_cache() {
    let vm = vm();
    vm.run("a.js", "module.exports = 1;", &RunOptions::shared()).unwrap();
    vm.run("a.js", "module.exports = 1;", &RunOptions::shared()).unwrap();

    assert_eq!(vm.exports_cache_len(), 0);
    assert_eq!(vm.runtime().initializer_cache_len(), 1);
}

#[test]
fn test_shared_runs_reuse_the_initializer_for_a_name() {
    let vm = vm();
    let first = vm.run("a.js", "module.exports = 1;", &RunOptions::shared()).unwrap();
    let second = vm.run("a.js", "module.exports = 2;", &RunOptions::shared()).unwrap();

    assert_eq!(first, Value::from(1));
    assert_eq!(second, Value::from(1));
}

#[test]
fn test_shared_runs_execute_every_time() {
    let vm = vm();
    let code = "process.runs = (process.runs || 0) + 1; module.exports = process.runs;";

    assert_eq!(vm.run("a.js", code, &RunOptions::shared()).unwrap(), Value::from(1));
    assert_eq!(vm.run("a.js", code, &RunOptions::shared()).unwrap(), Value::from(2));
}

#[test]
fn test_cache_is_bounded() {
    let vm = Vm::new(Runtime::default(), VmOptions::new().with_cache_size(2));
    let code = "process.hits = (process.hits || 0) + 1; module.exports = process.hits;";

    vm.run("a.js", code, &RunOptions::new()).unwrap();
    vm.run("b.js", code, &RunOptions::new()).unwrap();
    vm.run("c.js", code, &RunOptions::new()).unwrap();
    assert_eq!(vm.exports_cache_len(), 2);

    // a.js was evicted, so it runs again
    assert_eq!(vm.run("a.js", code, &RunOptions::new()).unwrap(), Value::from(4));
    assert_eq!(vm.run("c.js", code, &RunOptions::new()).unwrap(), Value::from(3));
}

#[test]
fn test_custom_key() {
    let vm = Vm::new(
        Runtime::default(),
        VmOptions::new().with_get_key(|name, _| name.to_string()),
    );

    vm.run("a.js", "module.exports = 1;", &RunOptions::new()).unwrap();
    let exports = vm.run("a.js", "module.exports = 2;", &RunOptions::new()).unwrap();
    assert_eq!(exports, Value::from(1));
}

#[test]
fn test_environment_factory_supplies_parent() {
    let runtime = Runtime::default();
    let mut bindings = Bindings::new();
    bindings.insert("tenant".to_string(), Value::from("acme"));
    let env = runtime.create_environment(&bindings);
    let parent = Module::new(&runtime, ModuleOptions::new("tenant").with_environment(env)).unwrap();

    let vm = Vm::new(
        runtime,
        VmOptions::new().with_environment(move |name| {
            (name == "tenant.js").then(|| parent.clone())
        }),
    );

    let exports = vm
        .run("tenant.js", "module.exports = tenant;", &RunOptions::new())
        .unwrap();
    assert_eq!(exports, Value::from("acme"));

    let err = vm
        .run("other.js", "module.exports = tenant;", &RunOptions::new())
        .unwrap_err();
    assert!(matches!(err, VmError::Script(_)));
}

#[test]
fn test_failures_are_not_cached() {
    let vm = vm();
    let err = vm
        .run("bad.js", "throw new Error('boom');", &RunOptions::new())
        .unwrap_err();

    assert!(matches!(err, VmError::Script(_)));
    assert!(err.to_string().contains("boom"));
    assert_eq!(vm.exports_cache_len(), 0);
}

#[test]
fn test_globals_without_shared_context_fail() {
    let vm = vm();
    let err = vm
        .run(
            "a.js",
            "",
            &RunOptions::new().with_global("foo", Value::from(1)),
        )
        .unwrap_err();
    assert!(matches!(err, VmError::Config(_)));
}

#[test]
fn test_mismatched_flags_fail() {
    let vm = vm();
    let err = vm
        .run(
            "a.js",
            "",
            &RunOptions::new().with_prefer_cached_initializer(true),
        )
        .unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_from_config() {
    let config = VmConfig::from_toml_str(
        r#"
        cache_size = 1

        [runtime]
        native_modules = false
        "#,
    )
    .unwrap();
    let vm = Vm::from_config(&config).unwrap();

    vm.run("a.js", "", &RunOptions::new()).unwrap();
    vm.run("b.js", "", &RunOptions::new()).unwrap();
    assert_eq!(vm.exports_cache_len(), 1);

    let err = vm
        .run("c.js", "require('path');", &RunOptions::new())
        .unwrap_err();
    assert!(matches!(err, VmError::ModuleNotFound(_)));
}

#[test]
fn test_deeply_nested_source_fails_cleanly() {
    let vm = vm();
    for source in [
        format!("module.exports = {}1{};", "(".repeat(10_000), ")".repeat(10_000)),
        format!("module.exports = {}1{};", "[".repeat(3_000), "]".repeat(3_000)),
    ] {
        let err = vm.run("deep.js", &source, &RunOptions::new()).unwrap_err();
        assert!(matches!(err, VmError::Script(_)), "{}", err);
        assert!(err.to_string().contains("Maximum nesting depth exceeded"), "{}", err);
    }

    assert_eq!(vm.exports_cache_len(), 0);
    let exports = vm.run("deep.js", "module.exports = ((1));", &RunOptions::new()).unwrap();
    assert_eq!(exports, Value::from(1));
}

#[test]
fn test_shared_runs_drop_stale_timers() {
    let vm = vm();
    let code = "setTimeout(function () { global.fired = true; }, 10); module.exports = 1;";

    for _ in 0..1000 {
        vm.run("ssr.js", code, &RunOptions::shared()).unwrap();
    }
    assert_eq!(vm.runtime().pending_timers(), 1);

    vm.run("other.js", "module.exports = 2;", &RunOptions::shared()).unwrap();
    assert_eq!(vm.runtime().pending_timers(), 0);
    assert_eq!(vm.runtime().run_timers().unwrap(), 0);

    let shared = vm.runtime().global_context().unwrap();
    assert!(shared.get("fired").is_none());
}
