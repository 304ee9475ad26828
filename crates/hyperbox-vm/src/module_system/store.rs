// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Where module source text comes from

use crate::error::Result;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

/// A read-only view of module sources
pub trait SourceStore {
    /// Returns true if `path` names a file
    fn is_file(&self, path: &Path) -> bool;

    /// Returns true if `path` names a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// The canonical id for a resolved path
    fn canonicalize(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}

impl<S: SourceStore + ?Sized> SourceStore for Rc<S> {
    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        (**self).read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        (**self).canonicalize(path)
    }
}

/// The host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl SourceStore for DiskStore {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| normalize(path))
    }
}

/// Sources held in memory, keyed by absolute path
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RefCell<FxHashMap<PathBuf, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files
            .borrow_mut()
            .insert(normalize(path.as_ref()), source.into());
    }

    /// Builder form of [`MemoryStore::insert`]
    pub fn with_file(self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    /// Returns true if the store holds no files
    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl SourceStore for MemoryStore {
    fn is_file(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = normalize(path);
        self.files
            .borrow()
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .borrow()
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
                .into()
            })
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
