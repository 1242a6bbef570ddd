//! Type definitions for attribute table fields

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute field value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Integer64,
    Double,
    String,
    Date,
    Time,
    DateTime,
    Boolean,
    Binary,
}

impl FieldType {
    /// Default type name reported for this field type
    pub fn default_type_name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Integer64 => "integer64",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Boolean => "boolean",
            FieldType::Binary => "binary",
        }
    }
}

/// Represents an attribute table field
///
/// Fields are never renamed in place; [`Field::renamed`] returns a new field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub type_name: String,
    pub length: i32,
    pub precision: i32,
    pub comment: Option<String>,
}

impl Field {
    /// Create a new field with the given name and type
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            type_name: field_type.default_type_name().to_string(),
            length: 0,
            precision: 0,
            comment: None,
        }
    }

    /// Set the field length and precision
    pub fn with_size(mut self, length: i32, precision: i32) -> Self {
        self.length = length;
        self.precision = precision;
        self
    }

    /// Set the field comment
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Set the provider type name
    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.type_name = type_name.to_string();
        self
    }

    /// Copy of this field under a new name, keeping type, size and comment
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

/// A reference to a field, either by position or by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Index(usize),
    Name(String),
}

impl From<usize> for FieldRef {
    fn from(index: usize) -> Self {
        FieldRef::Index(index)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Name(name.to_string())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Index(index) => write!(f, "#{}", index),
            FieldRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Names of the given fields, in order
pub fn field_names(fields: &[Field]) -> Vec<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
}
