//! Field Schema Registry
//!
//! Static description of every addressable path in the form. The registry is
//! built once per process and shared read-only; it is used both to describe
//! the form to the oracle and to validate the paths the oracle returns.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::path::FieldPath;
use crate::error::{ConfigError, PathError};

/// Row ceiling for a repeating section unless the schema sets one
pub const DEFAULT_MAX_ROWS: usize = 100;

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

/// Declared value kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Email,
    Date,
    /// Multi-sentence free text
    TextBlock,
}

impl ValueKind {
    /// Zero value used when a row is synthesized
    pub fn zero_value(&self) -> Value {
        match self {
            ValueKind::Number => json!(0),
            ValueKind::Text | ValueKind::Email | ValueKind::Date | ValueKind::TextBlock => {
                json!("")
            }
        }
    }
}

/// A single field (scalar leaf or row attribute)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: ValueKind,
    /// Row default; falls back to the kind's zero value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or_else(|| self.kind.zero_value())
    }
}

/// A fixed section of scalar fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSectionSpec {
    pub name: String,
    pub label: String,
    pub fields: Vec<FieldSpec>,
}

impl ScalarSectionSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, label: &str, kind: ValueKind) -> Self {
        self.fields.push(FieldSpec::new(name, label, kind));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A section holding an ordered list of uniformly-shaped rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatingSectionSpec {
    pub name: String,
    pub label: String,
    pub attributes: Vec<FieldSpec>,
    /// Indices at or past this are rejected before any growth is planned
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl RepeatingSectionSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            attributes: Vec::new(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn attribute(mut self, name: &str, label: &str, kind: ValueKind) -> Self {
        self.attributes.push(FieldSpec::new(name, label, kind));
        self
    }

    pub fn attribute_with_default(
        mut self,
        name: &str,
        label: &str,
        kind: ValueKind,
        default: Value,
    ) -> Self {
        self.attributes
            .push(FieldSpec::new(name, label, kind).with_default(default));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Default-row factory: a fresh row carrying every attribute
    pub fn default_row(&self) -> Value {
        let row: Map<String, Value> = self
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.default_value()))
            .collect();
        Value::Object(row)
    }
}

/// Serializable description of the form, sent to the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescription {
    pub scalar_fields: Vec<PathDescription>,
    pub repeating_sections: Vec<SectionDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDescription {
    pub path: String,
    pub label: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescription {
    pub section: String,
    pub label: String,
    /// e.g. `items.<index>.<attribute>`
    pub path_pattern: String,
    pub max_rows: usize,
    pub attributes: Vec<PathDescription>,
}

/// Registry of every addressable field path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchemaRegistry {
    #[serde(default)]
    scalar_sections: Vec<ScalarSectionSpec>,
    #[serde(default)]
    repeating_sections: Vec<RepeatingSectionSpec>,
}

impl FieldSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar_section(mut self, section: ScalarSectionSpec) -> Self {
        self.scalar_sections.push(section);
        self
    }

    pub fn with_repeating_section(mut self, section: RepeatingSectionSpec) -> Self {
        self.repeating_sections.push(section);
        self
    }

    /// Load a registry definition from JSON
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let registry: Self =
            serde_json::from_str(source).map_err(|e| ConfigError::InvalidValue {
                key: "registry",
                value: source.chars().take(80).collect(),
                reason: e.to_string(),
            })?;
        registry.check()?;
        Ok(registry)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        let names = self
            .scalar_sections
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.repeating_sections.iter().map(|s| s.name.as_str()));
        for name in names {
            if name.is_empty() || name.split('.').any(str::is_empty) {
                return Err(ConfigError::InvalidValue {
                    key: "registry",
                    value: name.to_string(),
                    reason: "section names must be non-empty dotted identifiers".to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::InvalidValue {
                    key: "registry",
                    value: name.to_string(),
                    reason: "duplicate section name".to_string(),
                });
            }
        }
        for section in &self.repeating_sections {
            if section.max_rows == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "registry",
                    value: section.name.clone(),
                    reason: "max_rows must be at least 1".to_string(),
                });
            }
            if section.attributes.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "registry",
                    value: section.name.clone(),
                    reason: "repeating section has no attributes".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The business-document form: client info, line items, taxes, scope of work
    pub fn business_document() -> Self {
        Self::new()
            .with_scalar_section(
                ScalarSectionSpec::new("clientDetails", "Client details")
                    .field("clientName", "Client name", ValueKind::Text)
                    .field("companyName", "Company name", ValueKind::Text)
                    .field("email", "Client email", ValueKind::Email)
                    .field("phone", "Client phone", ValueKind::Text)
                    .field("address", "Client address", ValueKind::TextBlock),
            )
            .with_scalar_section(
                ScalarSectionSpec::new("documentDetails", "Document details")
                    .field("documentNumber", "Document number", ValueKind::Text)
                    .field("issueDate", "Issue date", ValueKind::Date)
                    .field("dueDate", "Due date", ValueKind::Date)
                    .field("currency", "Currency", ValueKind::Text),
            )
            .with_repeating_section(
                RepeatingSectionSpec::new("items", "Line items")
                    .attribute("description", "Item description", ValueKind::Text)
                    .attribute("quantity", "Quantity", ValueKind::Number)
                    .attribute("rate", "Rate", ValueKind::Number),
            )
            .with_repeating_section(
                RepeatingSectionSpec::new("taxes", "Tax rows")
                    .attribute("name", "Tax name", ValueKind::Text)
                    .attribute("rate", "Tax rate (%)", ValueKind::Number),
            )
            .with_scalar_section(
                ScalarSectionSpec::new("scopeOfWork", "Scope of work")
                    .field("introduction", "Introduction", ValueKind::TextBlock)
                    .field("deliverables", "Deliverables", ValueKind::TextBlock),
            )
            .with_repeating_section(
                RepeatingSectionSpec::new("scopeOfWork.timeline", "Timeline phases")
                    .attribute("phase", "Phase name", ValueKind::Text)
                    .attribute("duration", "Duration", ValueKind::Text)
                    .attribute("description", "Phase description", ValueKind::TextBlock),
            )
            .with_scalar_section(
                ScalarSectionSpec::new("notes", "Notes")
                    .field("terms", "Terms and conditions", ValueKind::TextBlock)
                    .field(
                        "paymentInstructions",
                        "Payment instructions",
                        ValueKind::TextBlock,
                    ),
            )
    }

    pub fn scalar_sections(&self) -> &[ScalarSectionSpec] {
        &self.scalar_sections
    }

    pub fn repeating_sections(&self) -> &[RepeatingSectionSpec] {
        &self.repeating_sections
    }

    pub fn section(&self, name: &str) -> Option<&RepeatingSectionSpec> {
        self.repeating_sections.iter().find(|s| s.name == name)
    }

    /// Field spec for a parsed path
    pub fn field(&self, path: &FieldPath) -> Option<&FieldSpec> {
        match path {
            FieldPath::Scalar { section, field } => self
                .scalar_sections
                .iter()
                .find(|s| &s.name == section)
                .and_then(|s| s.get(field)),
            FieldPath::Indexed {
                section, attribute, ..
            } => self.section(section).and_then(|s| s.get(attribute)),
        }
    }

    /// Human label for a path, e.g. "Line items #2: Rate"
    pub fn label_for(&self, path: &FieldPath) -> Option<String> {
        match path {
            FieldPath::Scalar { .. } => self.field(path).map(|f| f.label.clone()),
            FieldPath::Indexed {
                section, index, ..
            } => {
                let spec = self.section(section)?;
                let field = self.field(path)?;
                Some(format!("{} #{}: {}", spec.label, index + 1, field.label))
            }
        }
    }

    pub fn default_row(&self, section: &str) -> Option<Value> {
        self.section(section).map(RepeatingSectionSpec::default_row)
    }

    /// Describe every addressable path family
    pub fn describe(&self) -> SchemaDescription {
        let scalar_fields = self
            .scalar_sections
            .iter()
            .flat_map(|section| {
                section.fields.iter().map(move |f| PathDescription {
                    path: format!("{}.{}", section.name, f.name),
                    label: format!("{}: {}", section.label, f.label),
                    kind: f.kind,
                })
            })
            .collect();

        let repeating_sections = self
            .repeating_sections
            .iter()
            .map(|section| SectionDescription {
                section: section.name.clone(),
                label: section.label.clone(),
                path_pattern: format!("{}.<index>.<attribute>", section.name),
                max_rows: section.max_rows,
                attributes: section
                    .attributes
                    .iter()
                    .map(|a| PathDescription {
                        path: a.name.clone(),
                        label: a.label.clone(),
                        kind: a.kind,
                    })
                    .collect(),
            })
            .collect();

        SchemaDescription {
            scalar_fields,
            repeating_sections,
        }
    }

    /// Parse and validate a dotted path string
    ///
    /// The longest matching repeating-section prefix wins, so
    /// `scopeOfWork.timeline.0.phase` is an indexed path even though
    /// `scopeOfWork` is also a scalar section.
    pub fn parse_path(&self, raw: &str) -> Result<FieldPath, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let repeating = self
            .repeating_sections
            .iter()
            .filter(|s| {
                raw.len() > s.name.len()
                    && raw.starts_with(s.name.as_str())
                    && raw.as_bytes()[s.name.len()] == b'.'
            })
            .max_by_key(|s| s.name.len());

        if let Some(section) = repeating {
            let rest = &raw[section.name.len() + 1..];
            let (index, attribute) = rest.split_once('.').ok_or_else(|| PathError::Malformed {
                path: raw.to_string(),
            })?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::InvalidIndex {
                    path: raw.to_string(),
                    index: index.to_string(),
                });
            }
            let index: usize = index.parse().map_err(|_| PathError::InvalidIndex {
                path: raw.to_string(),
                index: index.to_string(),
            })?;
            if index >= section.max_rows {
                return Err(PathError::IndexOutOfRange {
                    path: raw.to_string(),
                    index,
                    max_rows: section.max_rows,
                });
            }
            if !section.has_attribute(attribute) {
                return Err(PathError::UnknownAttribute {
                    section: section.name.clone(),
                    attribute: attribute.to_string(),
                });
            }
            return Ok(FieldPath::indexed(section.name.clone(), index, attribute));
        }

        self.scalar_sections
            .iter()
            .filter_map(|s| {
                raw.strip_prefix(s.name.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .filter(|field| s.get(field).is_some())
                    .map(|field| FieldPath::scalar(s.name.clone(), field))
            })
            .next()
            .ok_or_else(|| PathError::UnknownPath {
                path: raw.to_string(),
            })
    }
}
