//! Typed field paths
//!
//! Dotted path strings coming back from the oracle are parsed once, by
//! [`FieldSchemaRegistry::parse_path`](super::FieldSchemaRegistry::parse_path),
//! into a [`FieldPath`]. Nothing downstream re-parses strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated location in the form tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldPath {
    /// Leaf of a fixed section, e.g. `clientDetails.clientName`
    Scalar { section: String, field: String },
    /// Attribute of a row in a repeating section, e.g. `items.2.rate`
    Indexed {
        section: String,
        index: usize,
        attribute: String,
    },
}

/// One step when walking the form tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

impl FieldPath {
    pub fn scalar(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Scalar {
            section: section.into(),
            field: field.into(),
        }
    }

    pub fn indexed(section: impl Into<String>, index: usize, attribute: impl Into<String>) -> Self {
        Self::Indexed {
            section: section.into(),
            index,
            attribute: attribute.into(),
        }
    }

    /// Section name (may itself be dotted, e.g. `scopeOfWork.timeline`)
    pub fn section(&self) -> &str {
        match self {
            FieldPath::Scalar { section, .. } | FieldPath::Indexed { section, .. } => section,
        }
    }

    /// Final key written by this path
    pub fn leaf(&self) -> &str {
        match self {
            FieldPath::Scalar { field, .. } => field,
            FieldPath::Indexed { attribute, .. } => attribute,
        }
    }

    /// Row index for indexed paths
    pub fn index(&self) -> Option<usize> {
        match self {
            FieldPath::Indexed { index, .. } => Some(*index),
            FieldPath::Scalar { .. } => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, FieldPath::Indexed { .. })
    }

    /// Segments to walk from the form root to this location
    pub fn segments(&self) -> Vec<PathSegment<'_>> {
        let mut segments: Vec<PathSegment<'_>> =
            self.section().split('.').map(PathSegment::Key).collect();
        match self {
            FieldPath::Scalar { field, .. } => segments.push(PathSegment::Key(field)),
            FieldPath::Indexed {
                index, attribute, ..
            } => {
                segments.push(PathSegment::Index(*index));
                segments.push(PathSegment::Key(attribute));
            }
        }
        segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Scalar { section, field } => write!(f, "{}.{}", section, field),
            FieldPath::Indexed {
                section,
                index,
                attribute,
            } => write!(f, "{}.{}.{}", section, index, attribute),
        }
    }
}

/// Section name segments, for walking to a repeating section's list
pub fn section_segments(section: &str) -> impl Iterator<Item = PathSegment<'_>> {
    section.split('.').map(PathSegment::Key)
}
