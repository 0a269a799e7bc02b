//! Array Growth Resolver
//!
//! Works out how far each repeating section must grow so every indexed
//! update lands on an existing row. Growth per section is the maximum needed
//! across the whole turn, computed once against the snapshot lengths.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::context::ContextSnapshot;
use crate::normalize::FieldUpdate;
use crate::schema::{FieldPath, FieldSchemaRegistry};

/// Planned growth of one repeating section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionGrowth {
    pub section: String,
    /// Length seen in the snapshot
    pub current_length: usize,
    pub target_length: usize,
    /// Template each synthesized row is cloned from
    pub default_row: Value,
}

impl SectionGrowth {
    pub fn rows_to_add(&self) -> usize {
        self.target_length.saturating_sub(self.current_length)
    }
}

/// Per-section growth for one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthPlan {
    sections: BTreeMap<String, SectionGrowth>,
}

impl GrowthPlan {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, section: &str) -> Option<&SectionGrowth> {
        self.sections.get(section)
    }

    pub fn target_length(&self, section: &str) -> Option<usize> {
        self.get(section).map(|g| g.target_length)
    }

    pub fn rows_to_add(&self, section: &str) -> usize {
        self.get(section).map(SectionGrowth::rows_to_add).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionGrowth> {
        self.sections.values()
    }
}

/// Updates ready to merge, with the growth that makes their rows exist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSet {
    pub growth: GrowthPlan,
    pub updates: Vec<FieldUpdate>,
}

impl UpdateSet {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

pub struct ArrayGrowthResolver<'a> {
    registry: &'a FieldSchemaRegistry,
}

impl<'a> ArrayGrowthResolver<'a> {
    pub fn new(registry: &'a FieldSchemaRegistry) -> Self {
        Self { registry }
    }

    /// Plan growth for `updates` against the snapshot's section lengths
    pub fn resolve(&self, updates: Vec<FieldUpdate>, snapshot: &ContextSnapshot) -> UpdateSet {
        let mut needed: BTreeMap<&str, usize> = BTreeMap::new();
        for update in &updates {
            if let FieldPath::Indexed { section, index, .. } = &update.path {
                let entry = needed.entry(section.as_str()).or_insert(0);
                *entry = (*entry).max(index.saturating_add(1));
            }
        }

        let mut growth = GrowthPlan::default();
        for (section, needed_length) in needed {
            let current_length = snapshot.length_of(section);
            if needed_length <= current_length {
                continue;
            }
            let Some(default_row) = self.registry.default_row(section) else {
                tracing::warn!(section, "No row template for repeating section; skipping growth");
                continue;
            };
            tracing::debug!(
                section,
                current_length,
                target_length = needed_length,
                "Planned section growth"
            );
            growth.sections.insert(
                section.to_string(),
                SectionGrowth {
                    section: section.to_string(),
                    current_length,
                    target_length: needed_length,
                    default_row,
                },
            );
        }

        UpdateSet { growth, updates }
    }
}
