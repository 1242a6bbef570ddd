//! PostgreSQL connection checks and credential handling
//!
//! Connection strings are only handed out for databases that accept the
//! credentials, so the resolver needs a way to try a connection and a way to
//! ask the user for new credentials.

use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::datasource::uri::{DataSourceUri, SslMode};
use crate::error::{Error, Result};

/// Why a connection attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The server rejected the credentials
    Authentication(String),
    /// Anything else: unreachable host, TLS, protocol
    Other(String),
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectFailure::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            ConnectFailure::Other(msg) => f.write_str(msg),
        }
    }
}

/// Attempts a PostgreSQL connection
pub trait PgConnector {
    fn connect(&self, uri: &DataSourceUri) -> std::result::Result<(), ConnectFailure>;
}

/// A username/password pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Supplies and remembers credentials for a realm (a connection info string)
pub trait CredentialStore {
    /// Ask for credentials, starting from the ones currently known.
    /// `None` means the user cancelled.
    fn get(&self, realm: &str, username: &str, password: &str) -> Option<Credentials>;

    /// Remember credentials that were accepted for `realm`
    fn put(&self, realm: &str, username: &str, password: &str) -> Result<()>;
}

/// In-memory credential store.
///
/// `get` offers the stored credentials for a realm unless they are exactly the
/// ones that were just rejected.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored credentials for `realm`
    pub fn lookup(&self, realm: &str) -> Option<Credentials> {
        self.entries.lock().ok()?.get(realm).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, realm: &str, username: &str, password: &str) -> Option<Credentials> {
        let stored = self.lookup(realm)?;
        if stored.username == username && stored.password == password {
            return None;
        }
        Some(stored)
    }

    fn put(&self, realm: &str, username: &str, password: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::ConnectionUnavailable(format!("Credential store poisoned: {}", e)))?;
        entries.insert(realm.to_string(), Credentials::new(username, password));
        Ok(())
    }
}

/// [`PgConnector`] backed by a sqlx connection, opened and closed on a
/// private current-thread runtime.
///
/// The check blocks, so it refuses to run on a thread that is already driving
/// a tokio runtime and reports [`ConnectFailure::Other`] instead.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    timeout: Duration,
}

impl SqlxConnector {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

impl PgConnector for SqlxConnector {
    fn connect(&self, uri: &DataSourceUri) -> std::result::Result<(), ConnectFailure> {
        // block_on panics inside a runtime
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ConnectFailure::Other(
                "Cannot check a PostgreSQL connection from inside an async runtime".to_string(),
            ));
        }

        let options = connect_options(uri)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConnectFailure::Other(format!("Failed to start runtime: {}", e)))?;

        runtime.block_on(async {
            let connection = tokio::time::timeout(self.timeout, PgConnection::connect_with(&options))
                .await
                .map_err(|_| ConnectFailure::Other("Connection attempt timed out".to_string()))?
                .map_err(classify)?;

            connection.close().await.map_err(classify)
        })
    }
}

fn connect_options(uri: &DataSourceUri) -> std::result::Result<PgConnectOptions, ConnectFailure> {
    if !uri.service.is_empty() {
        return Err(ConnectFailure::Other(format!(
            "Service connections are not supported: {}",
            uri.service
        )));
    }

    let mut options = PgConnectOptions::new().ssl_mode(match uri.ssl_mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    });

    if !uri.host.is_empty() {
        options = options.host(&uri.host);
    }
    // Empty fields fall back to libpq defaults
    if !uri.port.is_empty() {
        let port = uri
            .port
            .parse::<u16>()
            .map_err(|_| ConnectFailure::Other(format!("Invalid port: {}", uri.port)))?;
        options = options.port(port);
    }
    if !uri.username.is_empty() {
        options = options.username(&uri.username);
    }
    if !uri.password.is_empty() {
        options = options.password(&uri.password);
    }
    if !uri.database.is_empty() {
        options = options.database(&uri.database);
    }

    Ok(options)
}

/// SQLSTATE class 28 is "invalid authorization specification"
fn classify(error: sqlx::Error) -> ConnectFailure {
    match &error {
        sqlx::Error::Database(db_error)
            if db_error.code().map_or(false, |code| code.starts_with("28")) =>
        {
            ConnectFailure::Authentication(db_error.message().to_string())
        }
        _ => ConnectFailure::Other(error.to_string()),
    }
}
