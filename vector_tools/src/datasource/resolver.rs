//! OGR connection string derivation
//!
//! Turns a [`DataSource`] into the double-quoted connection string expected by
//! OGR's generic vector driver.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{OracleConfig, PostgresConfig};
use crate::datasource::connection::{ConnectFailure, CredentialStore, Credentials, PgConnector};
use crate::datasource::source::{DataSource, LayerCatalog};
use crate::datasource::uri::DataSourceUri;
use crate::error::{Error, Result};

static SPATIALITE_DBNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"dbname='(.+)'").unwrap());

/// Derives OGR connection strings, checking PostgreSQL credentials on the way
pub struct ConnectionStringResolver<'a> {
    oracle: OracleConfig,
    postgres: PostgresConfig,
    connector: &'a dyn PgConnector,
    credentials: &'a dyn CredentialStore,
}

impl<'a> ConnectionStringResolver<'a> {
    /// Create a resolver using the given connector and credential store
    pub fn new(
        oracle: &OracleConfig,
        postgres: &PostgresConfig,
        connector: &'a dyn PgConnector,
        credentials: &'a dyn CredentialStore,
    ) -> Self {
        Self {
            oracle: oracle.clone(),
            postgres: postgres.clone(),
            connector,
            credentials,
        }
    }

    /// Connection string for a data source
    pub fn resolve(&self, source: &DataSource) -> Result<String> {
        let ogr_source = match source {
            DataSource::GenericFile { source } => strip_options(source).to_string(),
            DataSource::Spatialite { source } => spatialite_path(source)?,
            DataSource::Postgres(uri) => self.postgres_connection_string(uri)?,
            DataSource::Oracle(uri) => oracle_connection_string(uri, &self.oracle.default_port)?,
            DataSource::Other { source, .. } => strip_options(source).to_string(),
        };

        tracing::debug!(provider = source.provider(), "Resolved OGR connection string");
        Ok(quote(&ogr_source))
    }

    /// Connection string for a layer URI. A URI the catalog cannot load is
    /// returned quoted as it is.
    pub fn resolve_uri(&self, uri: &str, catalog: &dyn LayerCatalog) -> Result<String> {
        match catalog.data_source(uri) {
            Some(source) => self.resolve(&source),
            None => {
                tracing::debug!(uri, "No layer for URI, quoting it unchanged");
                Ok(quote(uri))
            }
        }
    }

    /// `PG:<connection info>` once a connection with the URI's credentials, or
    /// credentials supplied by the store, succeeds.
    fn postgres_connection_string(&self, uri: &DataSourceUri) -> Result<String> {
        // Credentials are stored under the connection info as first given
        let realm = uri.connection_info();
        let mut uri = uri.clone();
        let mut accepted: Option<Credentials> = None;
        let mut prompts: u32 = 0;

        loop {
            match self.connector.connect(&uri) {
                Ok(()) => break,
                Err(ConnectFailure::Authentication(message)) => {
                    if let Some(max) = self.postgres.max_credential_attempts {
                        if prompts >= max {
                            return Err(Error::ConnectionUnavailable(format!(
                                "Giving up after {} credential attempts: {}",
                                prompts, message
                            )));
                        }
                    }
                    prompts += 1;

                    tracing::warn!(
                        host = %uri.host,
                        database = %uri.database,
                        username = %uri.username,
                        "PostgreSQL authentication failed, requesting credentials"
                    );

                    let Some(credentials) =
                        self.credentials.get(&realm, &uri.username, &uri.password)
                    else {
                        return Err(Error::ConnectionUnavailable(
                            "Could not connect to PostgreSQL database - check connection info"
                                .to_string(),
                        ));
                    };

                    // Retry with whatever the store handed back
                    uri.set_credentials(&credentials.username, &credentials.password);
                    accepted = Some(credentials);
                }
                Err(ConnectFailure::Other(message)) => {
                    return Err(Error::ConnectionUnavailable(message));
                }
            }
        }

        // Only credentials that had to be asked for are persisted
        if let Some(credentials) = accepted {
            if let Err(e) = self
                .credentials
                .put(&realm, &credentials.username, &credentials.password)
            {
                tracing::warn!(error = %e, "Failed to store PostgreSQL credentials");
            }
        }

        tracing::info!(host = %uri.host, database = %uri.database, "Connected to PostgreSQL");
        Ok(format!("PG:{}", uri.connection_info()))
    }
}

/// `OCI:user/password@host:port/database:schema.table`
///
/// The port is left out when it equals `default_port`. Without a host the
/// database follows the credentials directly (`@` separated when a user is
/// set). A source with no user, host or database is rejected.
pub fn oracle_connection_string(uri: &DataSourceUri, default_port: &str) -> Result<String> {
    let mut ogr_source = String::from("OCI:");
    let mut delim = "";

    // A user makes the database part need an `@` even without a host
    if !uri.username.is_empty() {
        ogr_source.push_str(&uri.username);
        if !uri.password.is_empty() {
            ogr_source.push('/');
            ogr_source.push_str(&uri.password);
        }
        delim = "@";
    }

    // Host form: @host[:port]/database, default port left out
    if !uri.host.is_empty() {
        ogr_source.push('@');
        ogr_source.push_str(&uri.host);
        if !uri.port.is_empty() && uri.port != default_port {
            ogr_source.push(':');
            ogr_source.push_str(&uri.port);
        }
        ogr_source.push('/');
        ogr_source.push_str(&uri.database);
    } else if !uri.database.is_empty() {
        ogr_source.push_str(delim);
        ogr_source.push_str(&uri.database);
    }

    // Nothing to connect to
    if ogr_source == "OCI:" {
        return Err(Error::MissingParameters(
            "Invalid oracle data source - check connection info".to_string(),
        ));
    }

    // Table part: :[schema.]table
    ogr_source.push(':');
    if !uri.schema.is_empty() {
        ogr_source.push_str(&uri.schema);
        ogr_source.push('.');
    }
    ogr_source.push_str(&uri.table);

    Ok(ogr_source)
}

/// Database path from a SpatiaLite source string
pub fn spatialite_path(source: &str) -> Result<String> {
    SPATIALITE_DBNAME
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            Error::MalformedSource(format!("No dbname='...' in spatialite source: {}", source))
        })
}

/// Everything before the first `|`
fn strip_options(source: &str) -> &str {
    source.split('|').next().unwrap_or(source)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct AlwaysConnects;

    impl PgConnector for AlwaysConnects {
        fn connect(&self, _uri: &DataSourceUri) -> std::result::Result<(), ConnectFailure> {
            Ok(())
        }
    }

    struct AcceptsPassword {
        password: &'static str,
        attempts: Cell<u32>,
    }

    impl PgConnector for AcceptsPassword {
        fn connect(&self, uri: &DataSourceUri) -> std::result::Result<(), ConnectFailure> {
            self.attempts.set(self.attempts.get() + 1);
            if uri.password == self.password {
                Ok(())
            } else {
                Err(ConnectFailure::Authentication("password authentication failed".into()))
            }
        }
    }

    #[derive(Default)]
    struct ScriptedPrompt {
        answers: RefCell<Vec<Option<Credentials>>>,
        prompts: RefCell<Vec<(String, String)>>,
        stored: RefCell<Vec<(String, Credentials)>>,
        fail_put: bool,
    }

    impl CredentialStore for ScriptedPrompt {
        fn get(&self, _realm: &str, username: &str, password: &str) -> Option<Credentials> {
            self.prompts
                .borrow_mut()
                .push((username.to_string(), password.to_string()));
            let mut answers = self.answers.borrow_mut();
            if answers.is_empty() {
                None
            } else {
                answers.remove(0)
            }
        }

        fn put(&self, realm: &str, username: &str, password: &str) -> Result<()> {
            if self.fail_put {
                return Err(Error::ConnectionUnavailable("keyring locked".into()));
            }
            self.stored
                .borrow_mut()
                .push((realm.to_string(), Credentials::new(username, password)));
            Ok(())
        }
    }

    fn pg_uri(password: &str) -> DataSourceUri {
        DataSourceUri {
            host: "localhost".into(),
            port: "5432".into(),
            username: "gis".into(),
            password: password.into(),
            database: "osm".into(),
            table: "roads".into(),
            ..Default::default()
        }
    }

    fn resolver<'a>(
        connector: &'a dyn PgConnector,
        store: &'a dyn CredentialStore,
        postgres: PostgresConfig,
    ) -> ConnectionStringResolver<'a> {
        ConnectionStringResolver::new(&OracleConfig::default(), &postgres, connector, store)
    }

    #[test]
    fn test_generic_file_strips_options() {
        let store = ScriptedPrompt::default();
        let r = resolver(&AlwaysConnects, &store, PostgresConfig::default());
        let source = DataSource::GenericFile {
            source: "/tmp/x.shp|layerid=0".into(),
        };
        assert_eq!(r.resolve(&source).unwrap(), "\"/tmp/x.shp\"");
    }

    #[test]
    fn test_spatialite_path() {
        assert_eq!(
            spatialite_path("dbname='/geodata/osm_ch.sqlite' table=\"places\" (Geometry) sql=")
                .unwrap(),
            "/geodata/osm_ch.sqlite"
        );
        assert!(matches!(
            spatialite_path("/geodata/osm_ch.sqlite"),
            Err(Error::MalformedSource(_))
        ));
    }

    #[test]
    fn test_other_provider() {
        let store = ScriptedPrompt::default();
        let r = resolver(&AlwaysConnects, &store, PostgresConfig::default());
        let source = DataSource::Other {
            provider: "memory".into(),
            source: "Point?crs=EPSG:4326|uid=1".into(),
        };
        assert_eq!(r.resolve(&source).unwrap(), "\"Point?crs=EPSG:4326\"");
    }

    #[test]
    fn test_oracle_default_port_omitted() {
        let uri = DataSourceUri {
            username: "scott".into(),
            password: "tiger".into(),
            host: "db.example.com".into(),
            port: "1521".into(),
            database: "orcl".into(),
            table: "emp".into(),
            ..Default::default()
        };
        assert_eq!(
            oracle_connection_string(&uri, "1521").unwrap(),
            "OCI:scott/tiger@db.example.com/orcl:emp"
        );
    }

    #[test]
    fn test_oracle_without_host() {
        let uri = DataSourceUri {
            username: "scott".into(),
            password: "tiger".into(),
            database: "orcl".into(),
            schema: "hr".into(),
            table: "emp".into(),
            ..Default::default()
        };
        assert_eq!(
            oracle_connection_string(&uri, "1521").unwrap(),
            "OCI:scott/tiger@orcl:hr.emp"
        );

        let anonymous = DataSourceUri {
            database: "orcl".into(),
            table: "emp".into(),
            ..Default::default()
        };
        assert_eq!(oracle_connection_string(&anonymous, "1521").unwrap(), "OCI:orcl:emp");
    }

    #[test]
    fn test_oracle_missing_parameters() {
        let uri = DataSourceUri {
            table: "emp".into(),
            schema: "hr".into(),
            ..Default::default()
        };
        assert!(matches!(
            oracle_connection_string(&uri, "1521"),
            Err(Error::MissingParameters(_))
        ));
    }

    #[test]
    fn test_postgres_connects_first_time() {
        let connector = AcceptsPassword {
            password: "good",
            attempts: Cell::new(0),
        };
        let store = ScriptedPrompt::default();
        let r = resolver(&connector, &store, PostgresConfig::default());

        let result = r.resolve(&DataSource::Postgres(pg_uri("good"))).unwrap();

        assert_eq!(
            result,
            "\"PG:dbname='osm' host=localhost port=5432 user='gis' password='good'\""
        );
        assert_eq!(connector.attempts.get(), 1);
        assert!(store.prompts.borrow().is_empty());
        assert!(store.stored.borrow().is_empty());
    }

    #[test]
    fn test_postgres_cancelled_prompt() {
        let connector = AcceptsPassword {
            password: "good",
            attempts: Cell::new(0),
        };
        let store = ScriptedPrompt::default();
        let r = resolver(&connector, &store, PostgresConfig::default());

        let err = r.resolve(&DataSource::Postgres(pg_uri("bad"))).unwrap_err();

        assert!(matches!(err, Error::ConnectionUnavailable(_)));
        assert_eq!(
            *store.prompts.borrow(),
            vec![("gis".to_string(), "bad".to_string())]
        );
    }

    #[test]
    fn test_postgres_bounded_attempts() {
        let connector = AcceptsPassword {
            password: "good",
            attempts: Cell::new(0),
        };
        let store = ScriptedPrompt {
            answers: RefCell::new(vec![
                Some(Credentials::new("gis", "bad")),
                Some(Credentials::new("gis", "bad")),
                Some(Credentials::new("gis", "good")),
            ]),
            ..Default::default()
        };
        let postgres = PostgresConfig {
            max_credential_attempts: Some(2),
            ..Default::default()
        };
        let r = resolver(&connector, &store, postgres);

        let err = r.resolve(&DataSource::Postgres(pg_uri("bad"))).unwrap_err();

        assert!(matches!(err, Error::ConnectionUnavailable(_)));
        assert_eq!(connector.attempts.get(), 3);
        assert_eq!(store.prompts.borrow().len(), 2);
    }

    #[test]
    fn test_postgres_stores_accepted_credentials() {
        let connector = AcceptsPassword {
            password: "good",
            attempts: Cell::new(0),
        };
        let store = ScriptedPrompt {
            answers: RefCell::new(vec![Some(Credentials::new("gis", "good"))]),
            ..Default::default()
        };
        let r = resolver(&connector, &store, PostgresConfig::default());
        let uri = pg_uri("bad");

        let result = r.resolve(&DataSource::Postgres(uri.clone())).unwrap();

        assert_eq!(
            result,
            "\"PG:dbname='osm' host=localhost port=5432 user='gis' password='good'\""
        );
        assert_eq!(connector.attempts.get(), 2);
        assert_eq!(
            *store.stored.borrow(),
            vec![(uri.connection_info(), Credentials::new("gis", "good"))]
        );
    }

    #[test]
    fn test_postgres_store_failure_is_ignored() {
        let connector = AcceptsPassword {
            password: "good",
            attempts: Cell::new(0),
        };
        let store = ScriptedPrompt {
            answers: RefCell::new(vec![Some(Credentials::new("gis", "good"))]),
            fail_put: true,
            ..Default::default()
        };
        let r = resolver(&connector, &store, PostgresConfig::default());

        assert!(r.resolve(&DataSource::Postgres(pg_uri("bad"))).is_ok());
    }

    #[test]
    fn test_other_connect_failure_is_not_prompted() {
        struct Unreachable;
        impl PgConnector for Unreachable {
            fn connect(&self, _uri: &DataSourceUri) -> std::result::Result<(), ConnectFailure> {
                Err(ConnectFailure::Other("connection refused".into()))
            }
        }

        let store = ScriptedPrompt::default();
        let r = resolver(&Unreachable, &store, PostgresConfig::default());

        assert!(r.resolve(&DataSource::Postgres(pg_uri("good"))).is_err());
        assert!(store.prompts.borrow().is_empty());
    }

    #[test]
    fn test_resolve_uri_unknown_layer() {
        struct EmptyCatalog;
        impl LayerCatalog for EmptyCatalog {
            fn data_source(&self, _uri: &str) -> Option<DataSource> {
                None
            }
        }

        let store = ScriptedPrompt::default();
        let r = resolver(&AlwaysConnects, &store, PostgresConfig::default());
        assert_eq!(
            r.resolve_uri("/missing.shp|layerid=2", &EmptyCatalog).unwrap(),
            "\"/missing.shp|layerid=2\""
        );
    }
}
