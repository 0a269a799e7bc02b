//! Form tree boundary
//!
//! The form tree is owned by the surrounding UI layer. The engine reads it
//! to build a context snapshot and writes it only through the merge applier,
//! via the [`FormStore`] trait.

use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

use crate::error::FormError;
use crate::schema::path::{section_segments, FieldPath, PathSegment};

/// Read/write access to a form tree keyed by field paths
pub trait FormStore {
    /// Current value at `path`, if present
    fn get(&self, path: &FieldPath) -> Result<Option<Value>, FormError>;

    /// Write `value` at `path`; the row of an indexed path must already exist
    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError>;

    /// Number of rows in a repeating section (absent sections have none)
    fn length(&self, section: &str) -> Result<usize, FormError>;

    /// Append `row` to a repeating section, returning the new length
    fn append_default_row(&mut self, section: &str, row: Value) -> Result<usize, FormError>;

    /// Deep copy of the whole tree
    fn to_value(&self) -> Result<Value, FormError>;
}

/// A form held as a JSON tree
#[derive(Debug, Clone, PartialEq)]
pub struct FormTree {
    root: Value,
}

impl Default for FormTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FormTree {
    /// Empty form
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    fn walk<'a, 'p>(
        &'a self,
        segments: impl IntoIterator<Item = PathSegment<'p>>,
    ) -> Option<&'a Value> {
        segments
            .into_iter()
            .try_fold(&self.root, |node, segment| match segment {
                PathSegment::Key(key) => node.as_object()?.get(key),
                PathSegment::Index(index) => node.as_array()?.get(index),
            })
    }

    /// Walk to a section's list, creating missing objects along the way and
    /// an empty list at the end
    fn section_list_mut(&mut self, section: &str) -> Result<&mut Vec<Value>, FormError> {
        let mut node = &mut self.root;
        let keys: Vec<&str> = section.split('.').collect();
        for (i, key) in keys.iter().enumerate() {
            let is_last = i + 1 == keys.len();
            if node.is_null() {
                *node = Value::Object(Map::new());
            }
            let object = node.as_object_mut().ok_or_else(|| FormError::NotAnObject {
                path: section.to_string(),
            })?;
            node = object.entry(key.to_string()).or_insert_with(|| {
                if is_last {
                    Value::Array(Vec::new())
                } else {
                    Value::Object(Map::new())
                }
            });
        }
        if node.is_null() {
            *node = Value::Array(Vec::new());
        }
        node.as_array_mut().ok_or_else(|| FormError::NotAList {
            section: section.to_string(),
        })
    }
}

impl FormStore for FormTree {
    fn get(&self, path: &FieldPath) -> Result<Option<Value>, FormError> {
        Ok(self.walk(path.segments()).cloned())
    }

    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        let parent: &mut Map<String, Value> = match path {
            FieldPath::Scalar { section, .. } => {
                let mut node = &mut self.root;
                for key in section.split('.') {
                    if node.is_null() {
                        *node = Value::Object(Map::new());
                    }
                    node = node
                        .as_object_mut()
                        .ok_or_else(|| FormError::NotAnObject {
                            path: path.to_string(),
                        })?
                        .entry(key.to_string())
                        .or_insert(Value::Null);
                }
                if node.is_null() {
                    *node = Value::Object(Map::new());
                }
                node.as_object_mut().ok_or_else(|| FormError::NotAnObject {
                    path: path.to_string(),
                })?
            }
            FieldPath::Indexed { section, index, .. } => {
                let length = self.length(section)?;
                if *index >= length {
                    return Err(FormError::RowOutOfBounds {
                        section: section.clone(),
                        index: *index,
                        length,
                    });
                }
                let row = &mut self.section_list_mut(section)?[*index];
                if row.is_null() {
                    *row = Value::Object(Map::new());
                }
                row.as_object_mut().ok_or_else(|| FormError::NotAnObject {
                    path: path.to_string(),
                })?
            }
        };
        parent.insert(path.leaf().to_string(), value);
        Ok(())
    }

    fn length(&self, section: &str) -> Result<usize, FormError> {
        match self.walk(section_segments(section)) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Array(rows)) => Ok(rows.len()),
            Some(_) => Err(FormError::NotAList {
                section: section.to_string(),
            }),
        }
    }

    fn append_default_row(&mut self, section: &str, row: Value) -> Result<usize, FormError> {
        let rows = self.section_list_mut(section)?;
        rows.push(row);
        Ok(rows.len())
    }

    fn to_value(&self) -> Result<Value, FormError> {
        Ok(self.root.clone())
    }
}

/// Shared handle to a form tree
///
/// Every path write and row append takes the write lock once, so a reader
/// sees a value either before or after a given write, never a partial row.
#[derive(Debug, Clone, Default)]
pub struct SharedForm {
    inner: Arc<RwLock<FormTree>>,
}

impl SharedForm {
    pub fn new(tree: FormTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// Run `f` against a consistent read view of the tree
    pub fn read<T>(&self, f: impl FnOnce(&FormTree) -> T) -> Result<T, FormError> {
        let guard = self.inner.read().map_err(|_| FormError::Poisoned)?;
        Ok(f(&guard))
    }
}

impl FormStore for SharedForm {
    fn get(&self, path: &FieldPath) -> Result<Option<Value>, FormError> {
        self.read(|tree| tree.get(path))?
    }

    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        let mut guard = self.inner.write().map_err(|_| FormError::Poisoned)?;
        guard.set(path, value)
    }

    fn length(&self, section: &str) -> Result<usize, FormError> {
        self.read(|tree| tree.length(section))?
    }

    fn append_default_row(&mut self, section: &str, row: Value) -> Result<usize, FormError> {
        let mut guard = self.inner.write().map_err(|_| FormError::Poisoned)?;
        guard.append_default_row(section, row)
    }

    fn to_value(&self) -> Result<Value, FormError> {
        self.read(|tree| tree.root.clone())
    }
}
