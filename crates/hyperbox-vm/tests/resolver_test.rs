//! Resolution against the real filesystem

use hyperbox_script::Value;
use hyperbox_vm::{DiskStore, Runtime, RuntimeConfig, SourceStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(root, "lib/util.js", "exports.double = function (n) { return n * 2; };");
    write(root, "config.json", r#"{"port": 8080}"#);
    write(root, "widgets/index.js", "module.exports = 'widgets';");
    write(
        root,
        "node_modules/greeter/package.json",
        r#"{"name": "greeter", "main": "./src/greet"}"#,
    );
    write(
        root,
        "node_modules/greeter/src/greet.js",
        "module.exports = function (name) { return 'hello ' + name; };",
    );
    write(
        root,
        "main.js",
        r#"
        var util = require('./lib/util');
        var greet = require('greeter');
        module.exports = {
            doubled: util.double(21),
            port: require('./config').port,
            widgets: require('./widgets'),
            greeting: greet('disk'),
            resolved: require.resolve('./lib/util'),
        };
        "#,
    );
    dir
}

fn get(value: &Value, key: &str) -> Value {
    value.as_object().and_then(|obj| obj.get(key)).unwrap_or_default()
}

#[test]
fn test_loads_a_project_from_disk() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let runtime = Runtime::new(RuntimeConfig::default());

    let main = root.join("main.js");
    let exports = runtime.load_file(&main.to_string_lossy(), None).unwrap();

    assert_eq!(get(&exports, "doubled"), Value::from(42));
    assert_eq!(get(&exports, "port"), Value::from(8080));
    assert_eq!(get(&exports, "widgets"), Value::from("widgets"));
    assert_eq!(get(&exports, "greeting"), Value::from("hello disk"));
    assert_eq!(
        get(&exports, "resolved"),
        Value::from(root.join("lib/util.js").to_string_lossy().as_ref())
    );
}

#[test]
fn test_load_records_search_paths() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let runtime = Runtime::new(RuntimeConfig::default());

    let main = root.join("main.js");
    let module = runtime.load(&main.to_string_lossy(), &main).unwrap();

    assert_eq!(module.paths().first(), Some(&root.join("node_modules")));
    assert_eq!(module.dirname(), root);
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = project();
    let runtime = Runtime::new(RuntimeConfig::default());
    let missing = dir.path().join("nope.js");

    let err = runtime
        .load_file(&missing.to_string_lossy(), None)
        .unwrap_err();
    assert!(matches!(err, hyperbox_vm::VmError::ModuleNotFound(_)));
}

#[test]
fn test_disk_store() {
    let dir = project();
    let store = DiskStore;

    assert!(store.is_file(&dir.path().join("main.js")));
    assert!(store.is_dir(&dir.path().join("lib")));
    assert!(store.read_to_string(&dir.path().join("nope.js")).is_err());
    assert_eq!(
        store.canonicalize(&dir.path().join("lib/../main.js")),
        dir.path().canonicalize().unwrap().join("main.js")
    );
}
