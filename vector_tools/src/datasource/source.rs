//! Data source descriptors

use serde::{Deserialize, Serialize};

use crate::datasource::uri::DataSourceUri;
use crate::error::Result;

/// A vector data source, one variant per provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// File-based source, optionally followed by `|key=value` options
    GenericFile { source: String },
    /// SpatiaLite source string containing `dbname='<path>'`
    Spatialite { source: String },
    Postgres(DataSourceUri),
    Oracle(DataSourceUri),
    /// Any other provider, identified by name
    Other { provider: String, source: String },
}

impl DataSource {
    /// Build a descriptor from a provider name and its native source string
    pub fn from_provider(provider: &str, source: &str) -> Result<Self> {
        let data_source = match provider {
            "ogr" => DataSource::GenericFile {
                source: source.to_string(),
            },
            "spatialite" => DataSource::Spatialite {
                source: source.to_string(),
            },
            "postgres" => DataSource::Postgres(DataSourceUri::parse(source)?),
            "oracle" => DataSource::Oracle(DataSourceUri::parse(source)?),
            other => DataSource::Other {
                provider: other.to_string(),
                source: source.to_string(),
            },
        };

        Ok(data_source)
    }

    /// Provider name of this source
    pub fn provider(&self) -> &str {
        match self {
            DataSource::GenericFile { .. } => "ogr",
            DataSource::Spatialite { .. } => "spatialite",
            DataSource::Postgres(_) => "postgres",
            DataSource::Oracle(_) => "oracle",
            DataSource::Other { provider, .. } => provider,
        }
    }
}

/// Resolves a layer URI to its data source
///
/// This is the processing context a caller supplies when only a URI is known.
pub trait LayerCatalog {
    /// The data source behind `uri`, or `None` if no layer can be loaded
    fn data_source(&self, uri: &str) -> Option<DataSource>;
}
