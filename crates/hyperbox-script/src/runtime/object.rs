// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Heap objects with reference identity.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::function::FunctionKind;
use super::value::Value;

/// What an object is, beyond its property bag.
#[derive(Clone)]
pub enum ObjectKind {
    /// A plain object
    Ordinary,
    /// An array with dense elements
    Array(Vec<Value>),
    /// A byte buffer
    Bytes(Vec<u8>),
    /// An error instance (`new Error(..)` or a caught engine error)
    Error,
    /// A callable function
    Function(FunctionKind),
}

/// A property slot.
#[derive(Clone)]
enum Slot {
    Value(Value),
    /// Reads back as the owning object itself (`global`, `globalThis`).
    SelfRef,
}

/// The object payload behind an [`ObjectRef`].
pub struct JsObject {
    /// The object kind
    pub kind: ObjectKind,
    properties: IndexMap<String, Slot>,
    prototype: Option<ObjectRef>,
    frozen: bool,
}

/// A shared, identity-bearing reference to a heap object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<JsObject>>);

impl ObjectRef {
    /// Creates a new object of the given kind.
    pub fn new(kind: ObjectKind) -> Self {
        Self(Rc::new(RefCell::new(JsObject {
            kind,
            properties: IndexMap::new(),
            prototype: None,
            frozen: false,
        })))
    }

    /// Creates an empty plain object.
    pub fn ordinary() -> Self {
        Self::new(ObjectKind::Ordinary)
    }

    /// Creates an array from its elements.
    pub fn array(items: Vec<Value>) -> Self {
        Self::new(ObjectKind::Array(items))
    }

    /// Creates a byte buffer.
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::new(ObjectKind::Bytes(bytes))
    }

    /// Creates a plain object with the given prototype.
    pub fn with_prototype(kind: ObjectKind, prototype: Option<ObjectRef>) -> Self {
        let obj = Self::new(kind);
        obj.0.borrow_mut().prototype = prototype;
        obj
    }

    /// Returns true if both references point to the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Immutably borrows the object payload.
    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    /// Mutably borrows the object payload.
    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    /// The prototype this object inherits from.
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0.borrow().prototype.clone()
    }

    /// Reads an own property, including array elements and lengths.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        let obj = self.0.borrow();
        match &obj.kind {
            ObjectKind::Array(items) => {
                if key == "length" {
                    return Some(Value::from(items.len()));
                }
                if let Some(index) = array_index(key) {
                    return items.get(index).cloned();
                }
            }
            ObjectKind::Bytes(bytes) => {
                if key == "length" {
                    return Some(Value::from(bytes.len()));
                }
                if let Some(index) = array_index(key) {
                    return bytes.get(index).map(|b| Value::Number(*b as f64));
                }
            }
            ObjectKind::Function(function) => {
                if key == "name" && !obj.properties.contains_key(key) {
                    return Some(Value::from(function.name()));
                }
                if key == "length" {
                    return Some(Value::from(function.arity()));
                }
            }
            _ => {}
        }

        match obj.properties.get(key)? {
            Slot::Value(value) => Some(value.clone()),
            Slot::SelfRef => Some(Value::Object(self.clone())),
        }
    }

    /// Reads a property, walking the prototype chain.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            if let Some(value) = current.get_own(key) {
                return Some(value);
            }
            current = current.prototype()?;
        }
    }

    /// Writes a property. Writes to frozen objects are ignored.
    pub fn set(&self, key: &str, value: Value) {
        let mut obj = self.0.borrow_mut();
        if obj.frozen {
            return;
        }

        match &mut obj.kind {
            ObjectKind::Array(items) => {
                if key == "length" {
                    let len = value.to_number();
                    if len >= 0.0 && len.fract() == 0.0 {
                        items.resize(len as usize, Value::Undefined);
                    }
                    return;
                }
                if let Some(index) = array_index(key) {
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                    return;
                }
            }
            ObjectKind::Bytes(bytes) => {
                if key == "length" {
                    return;
                }
                if let Some(index) = array_index(key) {
                    if let Some(byte) = bytes.get_mut(index) {
                        *byte = to_uint8(value.to_number());
                    }
                    return;
                }
            }
            _ => {}
        }

        obj.properties.insert(key.to_string(), Slot::Value(value));
    }

    /// Makes `key` read back as this object itself.
    pub fn set_self_alias(&self, key: &str) {
        self.0
            .borrow_mut()
            .properties
            .insert(key.to_string(), Slot::SelfRef);
    }

    /// Returns true if the object has an own property named `key`.
    pub fn has_own(&self, key: &str) -> bool {
        let obj = self.0.borrow();
        match &obj.kind {
            ObjectKind::Array(items) => {
                if key == "length" || array_index(key).is_some_and(|i| i < items.len()) {
                    return true;
                }
            }
            ObjectKind::Bytes(bytes) => {
                if key == "length" || array_index(key).is_some_and(|i| i < bytes.len()) {
                    return true;
                }
            }
            _ => {}
        }
        obj.properties.contains_key(key)
    }

    /// Returns true if `key` is found on the object or its prototype chain.
    pub fn has(&self, key: &str) -> bool {
        let mut current = self.clone();
        loop {
            if current.has_own(key) {
                return true;
            }
            match current.prototype() {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Removes an own property. Array elements become holes (`undefined`).
    pub fn delete(&self, key: &str) -> bool {
        let mut obj = self.0.borrow_mut();
        if obj.frozen {
            return false;
        }
        if let ObjectKind::Array(items) = &mut obj.kind {
            if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
                *slot = Value::Undefined;
                return true;
            }
        }
        obj.properties.shift_remove(key);
        true
    }

    /// Own enumerable keys in insertion order (element indices first).
    pub fn keys(&self) -> Vec<String> {
        let obj = self.0.borrow();
        let mut keys: Vec<String> = match &obj.kind {
            ObjectKind::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            ObjectKind::Bytes(bytes) => (0..bytes.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        keys.extend(obj.properties.keys().cloned());
        keys
    }

    /// Removes every own property and alias. Object identity is unchanged.
    pub fn clear(&self) {
        let mut obj = self.0.borrow_mut();
        obj.properties.clear();
        obj.frozen = false;
    }

    /// Number of own named properties (elements excluded).
    pub fn property_count(&self) -> usize {
        self.0.borrow().properties.len()
    }

    /// Prevents further writes and deletes.
    pub fn freeze(&self) {
        self.0.borrow_mut().frozen = true;
    }

    /// Returns true if the object was frozen.
    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    /// Returns the elements if this is an array.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Returns the bytes if this is a buffer.
    pub fn byte_contents(&self) -> Option<Vec<u8>> {
        match &self.0.borrow().kind {
            ObjectKind::Bytes(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// String conversion used by `String(obj)` and concatenation.
    pub(crate) fn to_display_string(&self) -> String {
        let Some(_guard) = DisplayGuard::enter() else {
            return String::new();
        };

        let obj = self.0.borrow();
        match &obj.kind {
            ObjectKind::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            ObjectKind::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ObjectKind::Function(function) => function.source_text(),
            ObjectKind::Error => {
                let name = self
                    .get("name")
                    .map(|n| n.to_js_string())
                    .unwrap_or_else(|| "Error".to_string());
                let message = self
                    .get("message")
                    .map(|m| m.to_js_string())
                    .unwrap_or_default();
                if message.is_empty() {
                    name
                } else {
                    format!("{}: {}", name, message)
                }
            }
            ObjectKind::Ordinary => "[object Object]".to_string(),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(obj) = self.0.try_borrow() else {
            return write!(f, "[Object <borrowed>]");
        };
        match &obj.kind {
            ObjectKind::Ordinary => write!(f, "[Object {} keys]", obj.properties.len()),
            ObjectKind::Array(items) => write!(f, "[Array({})]", items.len()),
            ObjectKind::Bytes(bytes) => write!(f, "<Buffer {} bytes>", bytes.len()),
            ObjectKind::Error => write!(f, "[Error]"),
            ObjectKind::Function(function) => write!(f, "[Function: {}]", function.name()),
        }
    }
}

/// Parses a canonical array index (`"0"`, `"17"`, never `"01"`).
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn to_uint8(n: f64) -> u8 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64).rem_euclid(256) as u8
}

thread_local! {
    static DISPLAY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Bounds recursion when stringifying self-referencing arrays.
struct DisplayGuard;

impl DisplayGuard {
    const MAX_DEPTH: usize = 64;

    fn enter() -> Option<Self> {
        DISPLAY_DEPTH.with(|depth| {
            if depth.get() >= Self::MAX_DEPTH {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(DisplayGuard)
            }
        })
    }
}

impl Drop for DisplayGuard {
    fn drop(&mut self) {
        DISPLAY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_keep_insertion_order() {
        let obj = ObjectRef::ordinary();
        obj.set("b", Value::from(1));
        obj.set("a", Value::from(2));
        obj.set("b", Value::from(3));
        assert_eq!(obj.keys(), vec!["b", "a"]);
        assert_eq!(obj.get("b"), Some(Value::from(3)));
    }

    #[test]
    fn test_self_alias_reads_back_as_object() {
        let global = ObjectRef::ordinary();
        global.set_self_alias("globalThis");
        match global.get("globalThis") {
            Some(Value::Object(obj)) => assert!(obj.ptr_eq(&global)),
            other => panic!("unexpected {:?}", other),
        }
        global.clear();
        assert!(global.get("globalThis").is_none());
    }

    #[test]
    fn test_array_elements_and_length() {
        let arr = ObjectRef::array(vec![Value::from(1)]);
        arr.set("3", Value::from(4));
        assert_eq!(arr.get("length"), Some(Value::from(4)));
        assert_eq!(arr.get("1"), Some(Value::Undefined));
        arr.set("length", Value::from(1));
        assert_eq!(arr.keys(), vec!["0"]);
        assert_eq!(Value::Object(arr).to_js_string(), "1");
    }

    #[test]
    fn test_bytes_wrap_on_write() {
        let buf = ObjectRef::bytes(vec![0, 0]);
        buf.set("0", Value::from(257));
        buf.set("5", Value::from(1));
        assert_eq!(buf.byte_contents(), Some(vec![1, 0]));
    }

    #[test]
    fn test_prototype_chain_lookup() {
        let proto = ObjectRef::ordinary();
        proto.set("greet", Value::from("hi"));
        let obj = ObjectRef::with_prototype(ObjectKind::Ordinary, Some(proto));
        assert!(obj.has("greet"));
        assert!(!obj.has_own("greet"));
        assert_eq!(obj.get("greet"), Some(Value::from("hi")));
    }

    #[test]
    fn test_frozen_objects_ignore_writes() {
        let obj = ObjectRef::ordinary();
        obj.set("a", Value::from(1));
        obj.freeze();
        obj.set("a", Value::from(2));
        assert!(!obj.delete("a"));
        assert_eq!(obj.get("a"), Some(Value::from(1)));
    }

    #[test]
    fn test_self_referencing_array_display_terminates() {
        let arr = ObjectRef::array(vec![Value::from(1)]);
        arr.set("1", Value::Object(arr.clone()));
        let text = Value::Object(arr.clone()).to_js_string();
        assert!(text.starts_with("1,1,"));
        arr.set("length", Value::from(0));
    }

    #[test]
    fn test_array_index_parsing() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
    }
}
