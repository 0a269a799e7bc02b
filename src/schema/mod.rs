//! Form schema: typed field paths and the field registry

pub mod path;
pub mod registry;

pub use path::{FieldPath, PathSegment};
pub use registry::{
    FieldSchemaRegistry, FieldSpec, PathDescription, RepeatingSectionSpec, ScalarSectionSpec,
    SchemaDescription, SectionDescription, ValueKind,
};
