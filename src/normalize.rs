//! Update Normalizer
//!
//! Turns the oracle's untrusted `updates` map into typed updates. Unknown or
//! malformed paths are dropped, never fatal; they are kept only for
//! diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interpreter::RawInterpretationResult;
use crate::schema::{FieldPath, FieldSchemaRegistry};

/// A validated update, before growth resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub value: String,
    pub append: bool,
}

/// A dropped entry from the oracle output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedPath {
    pub raw_path: String,
    pub reason: String,
}

/// Output of normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Normalization {
    pub updates: Vec<FieldUpdate>,
    pub rejected: Vec<RejectedPath>,
    pub summary: String,
}

impl Normalization {
    /// False when nothing survived validation ("no actionable data")
    pub fn is_actionable(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// Validates oracle output against the field registry
pub struct UpdateNormalizer<'a> {
    registry: &'a FieldSchemaRegistry,
}

impl<'a> UpdateNormalizer<'a> {
    pub fn new(registry: &'a FieldSchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn normalize(&self, raw: RawInterpretationResult) -> Normalization {
        let mut normalization = Normalization {
            summary: raw.summary.trim().to_string(),
            ..Default::default()
        };

        for (raw_path, raw_value) in raw.updates {
            let path = match self.registry.parse_path(&raw_path) {
                Ok(path) => path,
                Err(e) => {
                    normalization.rejected.push(RejectedPath {
                        raw_path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match extract_value(&raw_value) {
                Ok((value, append)) => normalization.updates.push(FieldUpdate {
                    path,
                    value,
                    append,
                }),
                Err(reason) => normalization.rejected.push(RejectedPath {
                    raw_path,
                    reason: reason.to_string(),
                }),
            }
        }

        if !normalization.rejected.is_empty() {
            tracing::info!(
                accepted = normalization.updates.len(),
                rejected = normalization.rejected.len(),
                paths = ?normalization
                    .rejected
                    .iter()
                    .map(|r| r.raw_path.as_str())
                    .collect::<Vec<_>>(),
                "Dropped oracle updates that do not match the form schema"
            );
        }

        normalization
    }
}

/// Value text and append flag from one `updates` entry
fn extract_value(raw: &Value) -> Result<(String, bool), &'static str> {
    match raw {
        Value::Object(entry) => {
            let value = entry
                .get("value")
                .ok_or("update object has no value")
                .and_then(scalar_text)?;
            let append = match entry.get("append") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err("append flag must be a boolean"),
            };
            Ok((value, append))
        }
        other => scalar_text(other).map(|value| (value, false)),
    }
}

fn scalar_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(strip_matched_quotes(s).to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err("value is null"),
        Value::Array(_) | Value::Object(_) => Err("value is not a scalar"),
    }
}

/// Remove one matched pair of surrounding `"` or `'`
pub fn strip_matched_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
