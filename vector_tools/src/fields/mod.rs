//! Fields module for vector_tools
//!
//! This module handles attribute fields: their model, name generation and
//! value access.

pub mod attributes;
pub mod namer;
pub mod types;

// Re-export key types
pub use attributes::{
    numeric_values, resolve_field_index, AttributeValue, Feature, FeatureSource,
};
pub use namer::FieldNamer;
pub use types::{Field, FieldRef, FieldType};
