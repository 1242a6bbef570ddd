//! Command line front end for vector_tools

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

use vector_tools::datasource::{
    CredentialStore, Credentials, Dataset, DatasetOpener, MemoryCredentialStore, SqlxConnector,
};
use vector_tools::{ogr_layer_name, DataSource, Field, FieldType, VectorTools};

#[derive(Parser)]
#[command(name = "vector_tools", version, about = "Field name and data source helpers")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a short field name that does not collide with the reserved names
    FieldName {
        name: String,
        #[arg(long, value_delimiter = ',')]
        reserved: Vec<String>,
    },
    /// Rename candidate fields that collide with reserved fields or each other
    Dedupe {
        #[arg(long, value_delimiter = ',')]
        reserved: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<String>,
        /// Print the result as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the OGR connection string for a provider source
    ConnectionString {
        /// Provider name: ogr, spatialite, postgres, oracle or any other
        #[arg(long, default_value = "ogr")]
        provider: String,
        source: String,
    },
    /// Print the layer name a URI refers to
    LayerName { uri: String },
}

/// Prompts on the terminal, remembering accepted credentials for the session
struct TerminalPrompt {
    accepted: MemoryCredentialStore,
}

impl TerminalPrompt {
    fn read_line(label: &str) -> Option<String> {
        eprint!("{}", label);
        io::stderr().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl CredentialStore for TerminalPrompt {
    fn get(&self, _realm: &str, username: &str, _password: &str) -> Option<Credentials> {
        eprintln!("Authentication failed, enter new credentials (Ctrl-D to cancel)");
        let entered = Self::read_line(&format!("Username [{}]: ", username))?;
        let username = if entered.is_empty() { username.to_string() } else { entered };
        let password = Self::read_line("Password: ")?;
        Some(Credentials::new(&username, &password))
    }

    fn put(&self, realm: &str, username: &str, password: &str) -> vector_tools::Result<()> {
        self.accepted.put(realm, username, password)
    }
}

/// Multi-layer containers need a native driver; none is linked into the CLI
struct NoContainers;

impl DatasetOpener for NoContainers {
    fn open(&self, _path: &str) -> Option<Box<dyn Dataset>> {
        None
    }
}

fn string_fields(names: &[String]) -> Vec<Field> {
    names.iter().map(|n| Field::new(n, FieldType::String)).collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Without a config file there is no logging section, so nothing to set up
    let tools = match &cli.config {
        Some(path) => vector_tools::init(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => VectorTools::default(),
    };

    match cli.command {
        Command::FieldName { name, reserved } => {
            println!("{}", tools.field_namer().unique_name(&name, reserved.as_slice()));
        }
        Command::Dedupe {
            reserved,
            candidates,
            json,
        } => {
            let fields = tools
                .field_namer()
                .deduplicate_against(&string_fields(&reserved), string_fields(&candidates))?;
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            if json {
                println!("{}", serde_json::to_string(&names)?);
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
        Command::ConnectionString { provider, source } => {
            let data_source = DataSource::from_provider(&provider, &source)?;
            let connector = SqlxConnector::new(tools.config().postgres.connect_timeout_seconds);
            let prompt = TerminalPrompt {
                accepted: MemoryCredentialStore::new(),
            };
            let connection_string = tools.resolver(&connector, &prompt).resolve(&data_source)?;
            println!("{}", connection_string);
        }
        Command::LayerName { uri } => match ogr_layer_name(&uri, &NoContainers)? {
            Some(name) => println!("{}", name),
            None => anyhow::bail!("Layer not found: {}", uri),
        },
    }

    Ok(())
}
