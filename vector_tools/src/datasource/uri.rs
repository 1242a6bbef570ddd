//! Provider data source URIs
//!
//! Database providers describe their sources as a space separated list of
//! `key=value` pairs, e.g.
//! `dbname='gis' host=localhost port=5432 user='me' table="public"."roads" (geom) sql=`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use crate::error::{Error, Result};

/// libpq SSL negotiation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(Error::MalformedSource(format!("Unknown sslmode: {}", other))),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters of a database-backed layer.
///
/// Empty strings mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceUri {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub service: String,
    pub ssl_mode: SslMode,
    pub geometry_column: String,
    pub key_column: String,
    pub sql: String,
}

impl DataSourceUri {
    /// Parse a provider source string.
    ///
    /// Unknown keys are skipped; `sql=` consumes the rest of the input.
    pub fn parse(source: &str) -> Result<Self> {
        let mut uri = DataSourceUri::default();
        let mut chars = source.chars().peekable();

        loop {
            skip_whitespace(&mut chars);
            if chars.peek().is_none() {
                break;
            }

            let key = read_key(&mut chars);
            if chars.next() != Some('=') {
                return Err(Error::MalformedSource(format!(
                    "Expected '=' after '{}' in data source",
                    key
                )));
            }

            match key.as_str() {
                // sql= is always last and may contain anything
                "sql" => {
                    uri.sql = chars.by_ref().collect::<String>().trim().to_string();
                    break;
                }
                "table" => {
                    // "schema"."table" or just "table"
                    let first = read_value(&mut chars)?;
                    if chars.peek() == Some(&'.') {
                        chars.next();
                        uri.schema = first;
                        uri.table = read_value(&mut chars)?;
                    } else {
                        uri.table = first;
                    }

                    // Optional geometry column in parentheses
                    skip_whitespace(&mut chars);
                    if chars.peek() == Some(&'(') {
                        chars.next();
                        uri.geometry_column = chars.by_ref().take_while(|c| *c != ')').collect();
                    }
                }
                _ => {
                    let value = read_value(&mut chars)?;
                    match key.as_str() {
                        "dbname" => uri.database = value,
                        "host" => uri.host = value,
                        "port" => uri.port = value,
                        "user" | "username" => uri.username = value,
                        "password" => uri.password = value,
                        "service" => uri.service = value,
                        "sslmode" => uri.ssl_mode = value.parse()?,
                        "key" => uri.key_column = value,
                        _ => tracing::trace!(key = %key, "Ignoring data source key"),
                    }
                }
            }
        }

        Ok(uri)
    }

    /// Render the libpq connection info for this source.
    ///
    /// A service replaces host and port; the password is only written when a
    /// user is set; `sslmode` is omitted when it is the libpq default.
    pub fn connection_info(&self) -> String {
        let mut items = Vec::new();

        if !self.database.is_empty() {
            items.push(format!("dbname={}", quote_value(&self.database)));
        }

        if !self.service.is_empty() {
            items.push(format!("service={}", quote_value(&self.service)));
        } else {
            if !self.host.is_empty() {
                items.push(format!("host={}", self.host));
            }
            if !self.port.is_empty() {
                items.push(format!("port={}", self.port));
            }
        }

        if !self.username.is_empty() {
            items.push(format!("user={}", quote_value(&self.username)));
            if !self.password.is_empty() {
                items.push(format!("password={}", quote_value(&self.password)));
            }
        }

        if self.ssl_mode != SslMode::Prefer {
            items.push(format!("sslmode={}", self.ssl_mode));
        }

        items.join(" ")
    }

    /// Replace the credentials
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = password.to_string();
    }
}

/// Single-quote a connection info value, escaping `\` and `'`
pub fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_key(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut key = String::new();
    while let Some(&c) = chars.peek() {
        if c == '=' || c.is_whitespace() {
            break;
        }
        key.push(c);
        chars.next();
    }
    key
}

/// Read a bare value up to whitespace, or a `'`/`"` quoted value with
/// backslash escapes
fn read_value(chars: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut value = String::new();

    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(c) => value.push(c),
                        None => break,
                    },
                    Some(c) if c == quote => return Ok(value),
                    Some(c) => value.push(c),
                    None => break,
                }
            }
            Err(Error::MalformedSource(format!(
                "Unterminated quoted value: {}{}",
                quote, value
            )))
        }
        _ => {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgres_source() {
        let uri = DataSourceUri::parse(
            "dbname='ktryjh_iuuqef' host=spacialdb.com port=9999 user='ktryjh_iuuqef' \
             password='xyqwer' sslmode=disable key='gid' estimatedmetadata=true srid=4326 \
             type=MULTIPOLYGON table=\"public\".\"t4\" (geom) sql=",
        )
        .unwrap();

        assert_eq!(uri.database, "ktryjh_iuuqef");
        assert_eq!(uri.host, "spacialdb.com");
        assert_eq!(uri.port, "9999");
        assert_eq!(uri.username, "ktryjh_iuuqef");
        assert_eq!(uri.password, "xyqwer");
        assert_eq!(uri.ssl_mode, SslMode::Disable);
        assert_eq!(uri.key_column, "gid");
        assert_eq!(uri.schema, "public");
        assert_eq!(uri.table, "t4");
        assert_eq!(uri.geometry_column, "geom");
        assert_eq!(uri.sql, "");
    }

    #[test]
    fn test_parse_table_without_schema_and_sql() {
        let uri = DataSourceUri::parse("dbname='/data/a.sqlite' table=\"places\" sql=\"kind\" = 'city'")
            .unwrap();
        assert_eq!(uri.table, "places");
        assert_eq!(uri.schema, "");
        assert_eq!(uri.sql, "\"kind\" = 'city'");
    }

    #[test]
    fn test_parse_escaped_quote() {
        let uri = DataSourceUri::parse(r"user='o\'brien' password='a\\b'").unwrap();
        assert_eq!(uri.username, "o'brien");
        assert_eq!(uri.password, r"a\b");
    }

    #[test]
    fn test_parse_unterminated() {
        assert!(matches!(
            DataSourceUri::parse("dbname='gis"),
            Err(Error::MalformedSource(_))
        ));
    }

    #[test]
    fn test_connection_info() {
        let uri = DataSourceUri {
            host: "localhost".into(),
            port: "5432".into(),
            username: "o'brien".into(),
            password: "secret".into(),
            database: "gis".into(),
            ssl_mode: SslMode::Require,
            ..Default::default()
        };

        assert_eq!(
            uri.connection_info(),
            r"dbname='gis' host=localhost port=5432 user='o\'brien' password='secret' sslmode=require"
        );
    }

    #[test]
    fn test_connection_info_service_and_no_user() {
        let uri = DataSourceUri {
            host: "ignored".into(),
            port: "5432".into(),
            password: "orphan".into(),
            service: "prod".into(),
            ..Default::default()
        };

        assert_eq!(uri.connection_info(), "service='prod'");
    }
}
