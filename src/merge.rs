//! Merge Applier
//!
//! The only writer of the form tree. Grows repeating sections first, then
//! writes each update in order; later writes to the same path win.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::FormError;
use crate::form::FormStore;
use crate::growth::UpdateSet;
use crate::normalize::FieldUpdate;
use crate::schema::FieldPath;

/// What a merge did to the form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub applied: Vec<FieldPath>,
    pub rows_added: BTreeMap<String, usize>,
    pub count: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MergeApplier;

impl MergeApplier {
    pub fn new() -> Self {
        Self
    }

    /// Apply `set` to `form`
    ///
    /// A form error stops the merge; writes made before it stay in place.
    pub fn apply<F: FormStore + ?Sized>(
        &self,
        set: &UpdateSet,
        form: &mut F,
    ) -> Result<MergeReport, FormError> {
        let mut report = MergeReport::default();

        for growth in set.growth.iter() {
            let mut length = form.length(&growth.section)?;
            let mut added = 0;
            while length < growth.target_length {
                length = form.append_default_row(&growth.section, growth.default_row.clone())?;
                added += 1;
            }
            if added > 0 {
                tracing::debug!(section = %growth.section, added, length, "Grew repeating section");
                report.rows_added.insert(growth.section.clone(), added);
            }
        }

        for update in &set.updates {
            let value = self.resolve_value(update, form)?;
            form.set(&update.path, Value::String(value))?;
            report.applied.push(update.path.clone());
        }
        report.count = report.applied.len();

        tracing::info!(
            applied = report.count,
            sections_grown = report.rows_added.len(),
            "Merged voice updates"
        );
        Ok(report)
    }

    fn resolve_value<F: FormStore + ?Sized>(
        &self,
        update: &FieldUpdate,
        form: &F,
    ) -> Result<String, FormError> {
        if !update.append {
            return Ok(update.value.clone());
        }
        Ok(match form.get(&update.path)? {
            Some(Value::String(existing)) if !existing.is_empty() => {
                format!("{} {}", existing, update.value)
            }
            _ => update.value.clone(),
        })
    }
}
