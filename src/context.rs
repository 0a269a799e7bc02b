//! Context Snapshot Builder
//!
//! A snapshot is taken once per turn and handed to the interpreter. It holds
//! copies, not references, so merges later in the turn cannot change what
//! the oracle was shown.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::FormError;
use crate::form::{FormStore, FormTree};
use crate::schema::{FieldPath, FieldSchemaRegistry};

/// The field the user had focused when recording started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedField {
    /// Form field name, a dotted path such as `clientDetails.email`
    pub name: String,
    /// Input element kind as reported by the UI (text, email, textarea, ...)
    pub input_kind: String,
    pub display_label: String,
}

impl FocusedField {
    pub fn new(
        name: impl Into<String>,
        input_kind: impl Into<String>,
        display_label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_kind: input_kind.into(),
            display_label: display_label.into(),
        }
    }

    /// The focused field as a typed path, if the registry knows it
    pub fn resolve(&self, registry: &FieldSchemaRegistry) -> Option<FieldPath> {
        registry.parse_path(&self.name).ok()
    }
}

/// Immutable per-turn view of the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub focused_field: Option<FocusedField>,
    pub array_lengths: BTreeMap<String, usize>,
    pub current_values: Value,
}

impl ContextSnapshot {
    /// Capture lengths and values from `form` in one read
    pub fn capture<F: FormStore + ?Sized>(
        form: &F,
        registry: &FieldSchemaRegistry,
        focused_field: Option<FocusedField>,
    ) -> Result<Self, FormError> {
        let tree = FormTree::from_value(form.to_value()?);

        let mut array_lengths = BTreeMap::new();
        for section in registry.repeating_sections() {
            array_lengths.insert(section.name.clone(), tree.length(&section.name)?);
        }

        let mut current_values = Value::Object(Map::new());
        let section_names = registry
            .scalar_sections()
            .iter()
            .map(|s| s.name.as_str())
            .chain(registry.repeating_sections().iter().map(|s| s.name.as_str()));
        for name in section_names {
            if let Some(value) = lookup(tree.as_value(), name) {
                insert_at(&mut current_values, name, value.clone());
            }
        }

        tracing::debug!(
            sections = array_lengths.len(),
            focused = focused_field.as_ref().map(|f| f.name.as_str()),
            "Captured context snapshot"
        );

        Ok(Self {
            focused_field,
            array_lengths,
            current_values,
        })
    }

    /// Row count of a repeating section at turn start
    pub fn length_of(&self, section: &str) -> usize {
        self.array_lengths.get(section).copied().unwrap_or(0)
    }

    pub fn is_field_scoped(&self) -> bool {
        self.focused_field.is_some()
    }
}

fn lookup<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(root, |node, key| node.as_object()?.get(key))
        .filter(|v| !v.is_null())
}

fn insert_at(root: &mut Value, dotted: &str, value: Value) {
    let mut node = root;
    let mut keys = dotted.split('.').peekable();
    while let Some(key) = keys.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(object) = node.as_object_mut() else {
            return;
        };
        if keys.peek().is_none() {
            object.insert(key.to_string(), value);
            return;
        }
        node = object
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
