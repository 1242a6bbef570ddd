//! Data source module for vector_tools
//!
//! This module parses provider source strings and derives OGR connection
//! strings and layer names from them.

pub mod connection;
pub mod layer_name;
pub mod resolver;
pub mod source;
pub mod uri;

// Re-export key types
pub use connection::{
    ConnectFailure, CredentialStore, Credentials, MemoryCredentialStore, PgConnector,
    SqlxConnector,
};
pub use layer_name::{ogr_layer_name, Dataset, DatasetOpener};
pub use resolver::{oracle_connection_string, spatialite_path, ConnectionStringResolver};
pub use source::{DataSource, LayerCatalog};
pub use uri::{DataSourceUri, SslMode};
