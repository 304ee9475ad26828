// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)

use super::store::{SourceStore, normalize};
use crate::error::{Result, VmError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Resolver implementing Node.js file and `node_modules` lookup over a
/// [`SourceStore`]
#[derive(Debug, Clone)]
pub struct NodeResolver<S> {
    store: S,
}

impl<S: SourceStore> NodeResolver<S> {
    /// Create a resolver reading from `store`
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The store this resolver reads from
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `specifier` as required from `from_dir`.
    ///
    /// `paths` are the `node_modules` directories searched for bare
    /// specifiers; `extensions` are tried in order (each with its dot).
    pub fn resolve(
        &self,
        specifier: &str,
        from_dir: &Path,
        paths: &[PathBuf],
        extensions: &[String],
    ) -> Result<PathBuf> {
        trace!(specifier, from = %from_dir.display(), "resolving module");

        let found = if is_path_specifier(specifier) {
            self.resolve_path(&from_dir.join(specifier), extensions)
        } else {
            self.resolve_package(specifier, paths, extensions)
        };

        match found {
            Some(path) => {
                let id = self.store.canonicalize(&path);
                trace!(specifier, resolved = %id.display(), "resolved module");
                Ok(id)
            }
            None => Err(VmError::module_not_found(specifier)),
        }
    }

    /// Try `path` as a file, then with each extension appended, then as a
    /// directory
    fn resolve_path(&self, path: &Path, extensions: &[String]) -> Option<PathBuf> {
        let path = normalize(path);
        self.resolve_file(&path, extensions)
            .or_else(|| self.resolve_directory(&path, extensions))
    }

    fn resolve_file(&self, path: &Path, extensions: &[String]) -> Option<PathBuf> {
        if self.store.is_file(path) {
            return Some(path.to_path_buf());
        }
        extensions.iter().find_map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            trace!(candidate = %candidate.display(), "trying extension");
            self.store.is_file(&candidate).then_some(candidate)
        })
    }

    /// Resolve a directory (look for package.json main or index files)
    fn resolve_directory(&self, dir: &Path, extensions: &[String]) -> Option<PathBuf> {
        if !self.store.is_dir(dir) {
            return None;
        }

        let manifest = dir.join("package.json");
        if self.store.is_file(&manifest) {
            let main = self
                .store
                .read_to_string(&manifest)
                .ok()
                .and_then(|text| serde_json::from_str::<PackageJson>(&text).ok())
                .and_then(|pkg| pkg.main);
            if let Some(main) = main {
                let main = normalize(&dir.join(main));
                let found = self
                    .resolve_file(&main, extensions)
                    .or_else(|| self.resolve_index(&main, extensions));
                if found.is_some() {
                    return found;
                }
            }
        }

        self.resolve_index(dir, extensions)
    }

    fn resolve_index(&self, dir: &Path, extensions: &[String]) -> Option<PathBuf> {
        extensions
            .iter()
            .map(|ext| dir.join(format!("index{}", ext)))
            .find(|index| self.store.is_file(index))
    }

    /// Resolve a bare specifier from the search paths
    fn resolve_package(
        &self,
        specifier: &str,
        paths: &[PathBuf],
        extensions: &[String],
    ) -> Option<PathBuf> {
        let (package, subpath) = parse_package_specifier(specifier);
        paths.iter().find_map(|node_modules| {
            let root = node_modules.join(package);
            trace!(candidate = %root.display(), "searching package");
            match subpath {
                Some(sub) => self.resolve_path(&root.join(sub), extensions),
                None => self.resolve_path(&root, extensions),
            }
        })
    }
}

/// Returns true for `./x`, `../x`, `.`, `..` and absolute specifiers
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// The `node_modules` directories searched from `dir`, nearest first
pub fn node_module_paths(dir: &Path) -> Vec<PathBuf> {
    absolute_dir(dir)
        .ancestors()
        .filter(|ancestor| ancestor.file_name().is_none_or(|name| name != "node_modules"))
        .map(|ancestor| ancestor.join("node_modules"))
        .collect()
}

/// `dir` made absolute against the working directory and normalized
pub fn absolute_dir(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return normalize(dir);
    }
    std::env::current_dir()
        .map(|cwd| normalize(&cwd.join(dir)))
        .unwrap_or_else(|_| normalize(dir))
}

/// Split a package specifier into name and optional subpath
fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if let Some(scoped) = specifier.strip_prefix('@') {
        scoped.find('/').and_then(|scope_end| {
            let name_start = scope_end + 2;
            specifier[name_start..].find('/').map(|i| name_start + i)
        })
    } else {
        specifier.find('/')
    };

    match name_end {
        Some(end) => (&specifier[..end], Some(&specifier[end + 1..])),
        None => (specifier, None),
    }
}

/// Minimal package.json structure for resolution
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::store::MemoryStore;

    fn extensions() -> Vec<String> {
        vec![".js".to_string(), ".json".to_string()]
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_file("/app/main.js", "")
            .with_file("/app/lib/util.js", "")
            .with_file("/app/data.json", "{}")
            .with_file("/app/dir/index.js", "")
            .with_file("/app/node_modules/left-pad/package.json", r#"{"main": "lib/pad"}"#)
            .with_file("/app/node_modules/left-pad/lib/pad.js", "")
            .with_file("/node_modules/@scope/pkg/index.js", "")
            .with_file("/node_modules/@scope/pkg/extra/thing.js", "")
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(parse_package_specifier("lodash/get"), ("lodash", Some("get")));
        assert_eq!(parse_package_specifier("@types/node"), ("@types/node", None));
        assert_eq!(
            parse_package_specifier("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_node_module_paths() {
        let paths = node_module_paths(Path::new("/app/node_modules/left-pad/lib"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/app/node_modules/left-pad/lib/node_modules"),
                PathBuf::from("/app/node_modules/left-pad/node_modules"),
                PathBuf::from("/app/node_modules"),
                PathBuf::from("/node_modules"),
            ]
        );
    }

    #[test]
    fn test_relative_resolution() {
        let resolver = NodeResolver::new(store());
        let from = Path::new("/app");
        let ext = extensions();

        assert_eq!(
            resolver.resolve("./lib/util", from, &[], &ext).ok(),
            Some(PathBuf::from("/app/lib/util.js"))
        );
        assert_eq!(
            resolver.resolve("./data", from, &[], &ext).ok(),
            Some(PathBuf::from("/app/data.json"))
        );
        assert_eq!(
            resolver.resolve("./dir", from, &[], &ext).ok(),
            Some(PathBuf::from("/app/dir/index.js"))
        );
        assert_eq!(
            resolver.resolve("../main.js", Path::new("/app/lib"), &[], &ext).ok(),
            Some(PathBuf::from("/app/main.js"))
        );
        assert_eq!(
            resolver.resolve("../../app/main", Path::new("/app/lib"), &[], &ext).ok(),
            Some(PathBuf::from("/app/main.js"))
        );
    }

    #[test]
    fn test_package_resolution() {
        let resolver = NodeResolver::new(store());
        let from = Path::new("/app/lib");
        let paths = node_module_paths(from);
        let ext = extensions();

        assert_eq!(
            resolver.resolve("left-pad", from, &paths, &ext).ok(),
            Some(PathBuf::from("/app/node_modules/left-pad/lib/pad.js"))
        );
        assert_eq!(
            resolver.resolve("@scope/pkg", from, &paths, &ext).ok(),
            Some(PathBuf::from("/node_modules/@scope/pkg/index.js"))
        );
        assert_eq!(
            resolver.resolve("@scope/pkg/extra/thing", from, &paths, &ext).ok(),
            Some(PathBuf::from("/node_modules/@scope/pkg/extra/thing.js"))
        );
    }

    #[test]
    fn test_not_found() {
        let resolver = NodeResolver::new(store());
        let err = resolver
            .resolve("./missing", Path::new("/app"), &[], &extensions())
            .unwrap_err();
        assert!(matches!(err, VmError::ModuleNotFound(ref s) if s == "./missing"));
    }
}
