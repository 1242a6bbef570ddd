//! Attribute table access
//!
//! Feature containers are supplied by the caller through [`FeatureSource`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::types::{Field, FieldRef};
use crate::geometry::Geometry;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl AttributeValue {
    /// Numeric reading of the value, `None` when it has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Integer(v) => Some(*v as f64),
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            AttributeValue::String(s) => s.trim().parse().ok(),
        }
    }
}

static NULL_VALUE: AttributeValue = AttributeValue::Null;

/// A feature record
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: i64,
    pub attributes: Vec<AttributeValue>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// Attribute at `index`, `Null` when out of range
    pub fn attribute(&self, index: usize) -> &AttributeValue {
        self.attributes.get(index).unwrap_or(&NULL_VALUE)
    }
}

/// A container of features with a fixed attribute schema
pub trait FeatureSource {
    /// Attribute schema of the source
    fn fields(&self) -> &[Field];

    /// Iterate the features, loading at least the attributes in `subset`.
    /// Each call starts a fresh iteration.
    fn features<'a>(&'a self, subset: &[usize]) -> Box<dyn Iterator<Item = Feature> + 'a>;
}

/// Resolve a field reference to its index in `fields`
pub fn resolve_field_index(fields: &[Field], field: &FieldRef) -> Result<usize> {
    match field {
        FieldRef::Index(index) if *index < fields.len() => Ok(*index),
        FieldRef::Index(index) => Err(Error::InvalidReference(format!(
            "Field index {} out of range ({} fields)",
            index,
            fields.len()
        ))),
        FieldRef::Name(name) => fields
            .iter()
            .position(|f| &f.name == name)
            .ok_or_else(|| Error::InvalidReference(format!("Wrong field name: {}", name))),
    }
}

/// Read the numeric values of the given fields over every feature.
///
/// Keys are the references as passed in, in the same order. Values that are
/// not numbers come back as `None`.
pub fn numeric_values<S: FeatureSource + ?Sized>(
    source: &S,
    fields: &[FieldRef],
) -> Result<IndexMap<FieldRef, Vec<Option<f64>>>> {
    let mut keyed: IndexMap<usize, FieldRef> = IndexMap::new();
    for field in fields {
        let index = resolve_field_index(source.fields(), field)?;
        keyed.insert(index, field.clone());
    }
    let indices: Vec<usize> = keyed.keys().copied().collect();

    let mut values: IndexMap<FieldRef, Vec<Option<f64>>> = keyed
        .values()
        .map(|key| (key.clone(), Vec::new()))
        .collect();

    for feature in source.features(&indices) {
        for (index, key) in &keyed {
            if let Some(column) = values.get_mut(key) {
                column.push(feature.attribute(*index).as_f64());
            }
        }
    }

    Ok(values)
}
