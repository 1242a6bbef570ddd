//! Layer name lookup for layer URIs

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::error::{Error, Result};

static TABLE_WITH_SCHEMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#" table="([^"]*)"\."([^"]*)""#).unwrap());
static TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#" table="([^"]*)""#).unwrap());
static LAYER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"layername=([^|]*)").unwrap());

/// An opened multi-layer container
pub trait Dataset {
    /// Native name of the layer at `index`
    fn layer_name(&self, index: usize) -> Option<String>;
}

/// Opens multi-layer containers by path
pub trait DatasetOpener {
    fn open(&self, path: &str) -> Option<Box<dyn Dataset>>;
}

/// Name of the layer a URI points at.
///
/// Checked in order: an existing file (its stem), a database ` table=` option,
/// a `layername=` option, then the `|layerid=` of a multi-layer container
/// opened through `opener`. A missing container or layer is `Ok(None)`.
pub fn ogr_layer_name(uri: &str, opener: &dyn DatasetOpener) -> Result<Option<String>> {
    let path = Path::new(uri);
    if path.is_file() {
        return Ok(path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned()));
    }

    // Database sources: "schema"."table" wins over a bare "table"
    if uri.contains(" table=") {
        if let Some(caps) = TABLE_WITH_SCHEMA.captures(uri) {
            return Ok(Some(format!("{}.{}", &caps[1], &caps[2])));
        }
        if let Some(caps) = TABLE.captures(uri) {
            return Ok(Some(caps[1].to_string()));
        }
    } else if uri.contains("layername") {
        if let Some(caps) = LAYER_NAME.captures(uri) {
            return Ok(Some(caps[1].to_string()));
        }
    }

    // Fall back to the |key=value options after the path
    let mut parts = uri.split('|');
    let base_path = parts.next().unwrap_or(uri);
    let mut layer_id: i64 = 0;

    for part in parts {
        if let Some(value) = part.strip_prefix("layername=") {
            return Ok(Some(option_value(value).to_string()));
        }
        if let Some(value) = part.strip_prefix("layerid=") {
            let value = option_value(value);
            layer_id = value.trim().parse().map_err(|_| {
                Error::MalformedSource(format!("Invalid layerid '{}' in {}", value, uri))
            })?;
        }
    }

    let Some(dataset) = opener.open(base_path) else {
        tracing::debug!(path = base_path, "Could not open data source");
        return Ok(None);
    };

    // Negative ids never name a layer
    let name = usize::try_from(layer_id)
        .ok()
        .and_then(|index| dataset.layer_name(index));
    if name.is_none() {
        tracing::debug!(path = base_path, layer_id, "Layer not found");
    }

    Ok(name)
}

/// Option value up to the next `=`
fn option_value(value: &str) -> &str {
    value.split('=').next().unwrap_or(value)
}
