//! Field name generation
//!
//! Output formats such as dBase limit field names to ten characters, so every
//! generated name is truncated first and then made unique with a numeric
//! `_N` suffix on an eight character stem.

use std::collections::HashSet;

use crate::config::NamingConfig;
use crate::error::{Error, Result};
use crate::fields::types::{field_names, Field, FieldType};

/// Generates short, collision-free field names
#[derive(Debug, Clone)]
pub struct FieldNamer {
    config: NamingConfig,
}

impl Default for FieldNamer {
    fn default() -> Self {
        Self::new(&NamingConfig::default())
    }
}

impl FieldNamer {
    /// Create a namer using the given limits
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Truncate `candidate` and, if the result is taken, append `_1`, `_2`, ...
    /// to its stem until a free name is found.
    ///
    /// Comparison is exact and case-sensitive. The suffix search has no upper
    /// bound, so suffixes past `_9` yield names longer than the maximum.
    pub fn unique_name<S: AsRef<str>>(&self, candidate: &str, reserved: &[S]) -> String {
        let short_name = truncate(candidate, self.config.max_length);

        // Free after truncation: keep as is
        if reserved.is_empty() || !is_taken(&short_name, reserved) {
            return short_name;
        }

        let stem = truncate(&short_name, self.config.stem_length);
        let mut suffix: u64 = 1;
        loop {
            let name = format!("{}_{}", stem, suffix);
            if !is_taken(&name, reserved) {
                tracing::debug!(candidate, name = %name, "Generated unique field name");
                return name;
            }
            suffix += 1;
        }
    }

    /// [`FieldNamer::unique_name`] against the names of a field list
    pub fn unique_field_name(&self, candidate: &str, reserved: &[Field]) -> String {
        self.unique_name(candidate, &field_names(reserved))
    }

    /// Rename candidate fields until none shares a name with a reserved field
    /// or with another candidate.
    ///
    /// Every rename restarts the scan from the top; the result is returned only
    /// once a full pass finds nothing to rename. A rename always clears at
    /// least one collision, so more passes than candidates means the namer is
    /// broken and is reported as an error.
    pub fn deduplicate_against(
        &self,
        reserved: &[Field],
        candidates: Vec<Field>,
    ) -> Result<Vec<Field>> {
        let mut candidates = candidates;
        let max_passes = candidates.len() + 1;

        // Restart from the top after every rename; a rename can create a new
        // collision with a field that was already checked
        for pass in 0..max_passes {
            let Some(index) = first_collision(reserved, &candidates) else {
                tracing::debug!(passes = pass + 1, "Field names reached a fixed point");
                return Ok(candidates);
            };

            // The new name must avoid every reserved field and every other candidate
            let pool: Vec<&str> = reserved
                .iter()
                .map(|f| f.name.as_str())
                .chain(
                    candidates
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != index)
                        .map(|(_, f)| f.name.as_str()),
                )
                .collect();
            let name = self.unique_name(&candidates[index].name, &pool);

            tracing::debug!(
                from = %candidates[index].name,
                to = %name,
                "Renaming colliding field"
            );
            candidates[index] = candidates[index].renamed(&name);
        }

        Err(Error::NamingError(format!(
            "Field names did not converge after {} passes",
            max_passes
        )))
    }

    /// Find a field named exactly `name`, or append a new numeric field with a
    /// unique name derived from it. Returns the index and the field list.
    pub fn find_or_create_numeric_field(
        &self,
        existing: Vec<Field>,
        name: &str,
    ) -> (usize, Vec<Field>) {
        self.find_or_create_numeric_field_sized(
            existing,
            name,
            self.config.numeric_length,
            self.config.numeric_precision,
        )
    }

    /// [`FieldNamer::find_or_create_numeric_field`] with an explicit size for
    /// the created field
    pub fn find_or_create_numeric_field_sized(
        &self,
        existing: Vec<Field>,
        name: &str,
        length: i32,
        precision: i32,
    ) -> (usize, Vec<Field>) {
        if let Some(index) = existing.iter().position(|f| f.name == name) {
            return (index, existing);
        }

        let mut fields = existing;
        let unique = self.unique_field_name(name, &fields);
        fields.push(Field::new(&unique, FieldType::Double).with_size(length, precision));

        (fields.len() - 1, fields)
    }

    /// Concatenate two field lists. Fields from `second` whose lower-cased name
    /// is used in `first` are renamed `<name>_2`, `<name>_3`, ... in lower case
    /// and keep only their type.
    pub fn combine_fields(&self, first: &[Field], second: &[Field]) -> Vec<Field> {
        let mut taken: HashSet<String> = first.iter().map(|f| f.name.to_lowercase()).collect();
        let mut fields = first.to_vec();

        for field in second {
            let name = field.name.to_lowercase();
            if !taken.contains(&name) {
                fields.push(field.clone());
                continue;
            }

            // The field already in `first` counts as number 1
            let mut index = 2;
            let mut new_name = format!("{}_{}", name, index);
            while taken.contains(&new_name) {
                index += 1;
                new_name = format!("{}_{}", name, index);
            }

            fields.push(Field::new(&new_name, field.field_type).with_type_name(&field.type_name));
            taken.insert(new_name);
        }

        fields
    }
}

fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

fn is_taken<S: AsRef<str>>(name: &str, reserved: &[S]) -> bool {
    reserved.iter().any(|r| AsRef::<str>::as_ref(r) == name)
}

/// Index of the first candidate that collides with a reserved field (reserved
/// fields scanned in the outer loop) or, failing that, with an earlier
/// candidate.
fn first_collision(reserved: &[Field], candidates: &[Field]) -> Option<usize> {
    for r in reserved {
        if let Some(index) = candidates.iter().position(|c| c.name == r.name) {
            return Some(index);
        }
    }

    // Then repeats among the candidates themselves
    let mut seen = HashSet::new();
    candidates
        .iter()
        .position(|c| !seen.insert(c.name.as_str()))
}
