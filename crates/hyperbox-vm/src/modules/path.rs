// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `path` module (POSIX flavour)

use hyperbox_script::Error;
use hyperbox_script::runtime::{ObjectRef, Value, arg, native_function};

/// Create the path module exports
pub fn create_module() -> Value {
    let exports = ObjectRef::ordinary();

    exports.set(
        "join",
        native_function("join", |_, _, args| {
            let parts = string_args(args)?;
            Ok(Value::from(join(&parts)))
        }),
    );
    exports.set(
        "resolve",
        native_function("resolve", |_, _, args| {
            let parts = string_args(args)?;
            let cwd = std::env::current_dir().map_err(Error::host)?;
            Ok(Value::from(resolve(&cwd.to_string_lossy(), &parts)))
        }),
    );
    exports.set(
        "dirname",
        native_function("dirname", |_, _, args| {
            Ok(Value::from(dirname(&string_arg(args, 0)?)))
        }),
    );
    exports.set(
        "basename",
        native_function("basename", |_, _, args| {
            let path = string_arg(args, 0)?;
            let ext = match arg(args, 1) {
                Value::Undefined => None,
                ext => Some(ext.to_js_string()),
            };
            Ok(Value::from(basename(&path, ext.as_deref())))
        }),
    );
    exports.set(
        "extname",
        native_function("extname", |_, _, args| {
            Ok(Value::from(extname(&string_arg(args, 0)?)))
        }),
    );
    exports.set(
        "normalize",
        native_function("normalize", |_, _, args| {
            Ok(Value::from(normalize(&string_arg(args, 0)?)))
        }),
    );
    exports.set(
        "isAbsolute",
        native_function("isAbsolute", |_, _, args| {
            Ok(Value::Boolean(string_arg(args, 0)?.starts_with('/')))
        }),
    );
    exports.set("sep", Value::from("/"));
    exports.set("delimiter", Value::from(":"));

    Value::Object(exports)
}

fn string_arg(args: &[Value], index: usize) -> hyperbox_script::Result<String> {
    match arg(args, index) {
        Value::String(s) => Ok(s.to_string()),
        other => Err(Error::type_error(format!(
            "The \"path\" argument must be of type string. Received {}",
            other.type_of()
        ))),
    }
}

fn string_args(args: &[Value]) -> hyperbox_script::Result<Vec<String>> {
    (0..args.len()).map(|i| string_arg(args, i)).collect()
}

/// path.join(...paths)
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// path.resolve(...paths), relative to `cwd`
pub fn resolve<S: AsRef<str>>(cwd: &str, parts: &[S]) -> String {
    let mut resolved = cwd.to_string();
    for part in parts.iter().map(|p| p.as_ref()).filter(|p| !p.is_empty()) {
        if part.starts_with('/') {
            resolved = part.to_string();
        } else {
            resolved = format!("{}/{}", resolved, part);
        }
    }
    normalize(&resolved)
}

/// path.normalize(path)
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.last().is_some_and(|c| *c != "..") {
                    components.pop();
                } else if !absolute {
                    components.push("..");
                }
            }
            c => components.push(c),
        }
    }

    let body = components.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// path.dirname(path)
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(index) => trimmed[..index].to_string(),
        None => ".".to_string(),
    }
}

/// path.basename(path, ext?)
pub fn basename(path: &str, ext: Option<&str>) -> String {
    let trimmed = path.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or_default();
    match ext {
        Some(ext) if name.len() > ext.len() && name.ends_with(ext) => {
            name[..name.len() - ext.len()].to_string()
        }
        _ => name.to_string(),
    }
}

/// path.extname(path)
pub fn extname(path: &str) -> String {
    let name = basename(path, None);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(index) => name[index..].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename("/foo/bar/baz.txt", None), "baz.txt");
        assert_eq!(basename("/foo/bar/baz.txt", Some(".txt")), "baz");
        assert_eq!(basename("/foo/bar/", None), "bar");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/foo/bar/baz.txt"), "/foo/bar");
        assert_eq!(dirname("/foo"), "/");
        assert_eq!(dirname("foo"), ".");
        assert_eq!(dirname("/"), "/");
    }

    #[test]
    fn test_extname() {
        assert_eq!(extname("file.tar.gz"), ".gz");
        assert_eq!(extname("file"), "");
        assert_eq!(extname(".hidden"), "");
    }

    #[test]
    fn test_join_and_resolve() {
        assert_eq!(join(&["foo", "bar", "../baz"]), "foo/baz");
        assert_eq!(join(&["/foo", "/bar"]), "/foo/bar");
        assert_eq!(join::<&str>(&[]), ".");
        assert_eq!(resolve("/srv", &["app", "./lib"]), "/srv/app/lib");
        assert_eq!(resolve("/srv", &["app", "/etc", "x"]), "/etc/x");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/foo/bar//baz/asdf/quux/.."), "/foo/bar/baz/asdf");
        assert_eq!(normalize("../a/./b"), "../a/b");
        assert_eq!(normalize("/.."), "/");
    }
}
