//! vector_tools: helpers for vector geoprocessing algorithms
//!
//! vector_tools derives short unique field names for attribute tables, OGR
//! connection strings and layer names for data sources, and writes CSV
//! tables. Every helper is stateless; collaborators such as feature sources,
//! credential prompts and layer containers are passed in as traits.

pub mod config;
pub mod datasource;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod output;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use datasource::{
    ogr_layer_name, ConnectionStringResolver, CredentialStore, DataSource, DataSourceUri,
    PgConnector,
};
pub use error::{Error, Result};
pub use fields::{Field, FieldNamer, FieldRef, FieldType};
pub use geometry::{extract_points, Geometry, Point};
pub use output::TableWriter;

/// Load configuration from a file and set up logging
pub fn init(config_path: &str) -> Result<VectorTools> {
    let config = config::load_from_file(config_path)?;
    utils::init_logging(&config.logging)?;
    Ok(VectorTools::new(config))
}

/// Entry point bundling a configuration with the helpers it parameterizes
#[derive(Debug, Clone, Default)]
pub struct VectorTools {
    config: Config,
}

impl VectorTools {
    /// Create from an already loaded configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Field namer using the configured limits
    pub fn field_namer(&self) -> FieldNamer {
        FieldNamer::new(&self.config.naming)
    }

    /// Connection string resolver using the configured Oracle and PostgreSQL
    /// settings
    pub fn resolver<'a>(
        &self,
        connector: &'a dyn PgConnector,
        credentials: &'a dyn CredentialStore,
    ) -> ConnectionStringResolver<'a> {
        ConnectionStringResolver::new(
            &self.config.oracle,
            &self.config.postgres,
            connector,
            credentials,
        )
    }

    /// Create a CSV table, using the configured default encoding when none is
    /// given
    pub fn table_writer<S: AsRef<str>>(
        &self,
        file_name: &str,
        encoding: Option<&str>,
        header: &[S],
    ) -> Result<TableWriter> {
        let encoding = encoding.unwrap_or(&self.config.output.default_encoding);
        TableWriter::create(file_name, Some(encoding), header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_init_loads_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_tools.toml");
        fs::write(&path, "[naming]\nmax_length = 8\n").unwrap();

        let tools = init(path.to_str().unwrap()).unwrap();

        assert_eq!(tools.config().naming.max_length, 8);
        assert!(tools.config().logging.is_none());
        assert_eq!(tools.field_namer().unique_name::<&str>("population", &[]), "populati");
    }

    #[test]
    fn test_init_missing_config() {
        assert!(init("/nonexistent/vector_tools.toml").is_err());
    }

    #[test]
    fn test_table_writer_uses_default_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.default_encoding = "latin1".to_string();
        let tools = VectorTools::new(config);

        let path = dir.path().join("names");
        let writer = tools
            .table_writer(path.to_str().unwrap(), None, &["café"])
            .unwrap();
        assert_eq!(writer.encoding().name(), "windows-1252");
        assert_eq!(fs::read(writer.path()).unwrap(), b"caf\xe9\r\n");

        let writer = tools
            .table_writer(path.to_str().unwrap(), Some("utf-8"), &["café"])
            .unwrap();
        assert_eq!(fs::read(writer.path()).unwrap(), "café\r\n".as_bytes());
    }
}
