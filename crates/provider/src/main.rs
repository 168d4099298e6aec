//! NetBox Provider - command-line host
//!
//! Drives the `netbox_device` lifecycle from the shell: attribute sets are
//! read from JSON files and the resulting state is printed as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use netbox_common::config::{ENV_API_TOKEN, ENV_SERVER_URL};
use netbox_common::ProviderConfig;
use netbox_provider::state::{make_state, string_value};
use netbox_provider::{Diagnostic, DynamicValue, NetBoxProvider, Severity};

const RESOURCE_TYPE: &str = "netbox_device";

/// NetBox Provider - manage NetBox devices declaratively
#[derive(Parser)]
#[command(name = "netbox-provider")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Provider configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// NetBox server URL
    #[arg(long, env = ENV_SERVER_URL, global = true)]
    server_url: Option<String>,

    /// NetBox API token
    #[arg(long, env = ENV_API_TOKEN, hide_env_values = true, global = true)]
    api_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    allow_insecure_https: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the provider and resource schemas
    Schema,

    /// Create a device from a JSON attribute file
    Create {
        /// Declared attributes
        #[arg(long)]
        attrs: PathBuf,
    },

    /// Read a device by id
    Read { id: String },

    /// Update a device to match a JSON attribute file
    Update {
        id: String,

        /// Declared attributes
        #[arg(long)]
        attrs: PathBuf,
    },

    /// Delete a device by id
    Delete { id: String },

    /// Import an existing device by id
    Import { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(netbox_common::default_config_path);
    let base_config = ProviderConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let provider = NetBoxProvider::new(base_config);

    // CLI flags and their env fallbacks override the config file
    let mut block = DynamicValue::Null;
    if let Some(url) = &cli.server_url {
        block.set("server_url", string_value(url));
    }
    if let Some(token) = &cli.api_token {
        block.set("api_token", string_value(token));
    }
    if cli.allow_insecure_https {
        block.set("allow_insecure_https", DynamicValue::Bool(true));
    }
    if !matches!(cli.command, Commands::Schema) {
        check(provider.configure_provider(&block).await)?;
    }

    match cli.command {
        Commands::Schema => print_json(&provider.get_provider_schema())?,
        Commands::Create { attrs } => {
            let planned = load_attrs(&attrs)?;
            check(provider.validate_resource_config(RESOURCE_TYPE, &planned))?;
            let response = provider
                .apply_resource_change(RESOURCE_TYPE, &DynamicValue::Null, &planned)
                .await;
            check(response.diagnostics)?;
            print_json(&response.new_state)?;
        }
        Commands::Read { id } => {
            let current = make_state(vec![("id", string_value(&id))]);
            let response = provider.read_resource(RESOURCE_TYPE, &current).await;
            check(response.diagnostics)?;
            match response.new_state {
                Some(state) => print_json(&state)?,
                None => bail!("device {} does not exist", id),
            }
        }
        Commands::Update { id, attrs } => {
            let current = make_state(vec![("id", string_value(&id))]);
            let read = provider.read_resource(RESOURCE_TYPE, &current).await;
            check(read.diagnostics)?;
            let Some(prior) = read.new_state else {
                bail!("device {} does not exist", id);
            };

            let mut planned = load_attrs(&attrs)?;
            check(provider.validate_resource_config(RESOURCE_TYPE, &planned))?;
            planned.set("id", string_value(&id));

            let response = provider
                .apply_resource_change(RESOURCE_TYPE, &prior, &planned)
                .await;
            check(response.diagnostics)?;
            print_json(&response.new_state)?;
        }
        Commands::Delete { id } => {
            let prior = make_state(vec![("id", string_value(&id))]);
            let response = provider
                .apply_resource_change(RESOURCE_TYPE, &prior, &DynamicValue::Null)
                .await;
            check(response.diagnostics)?;
            info!("Device {} deleted", id);
        }
        Commands::Import { id } => {
            let response = provider.import_resource_state(RESOURCE_TYPE, &id).await;
            check(response.diagnostics)?;
            for imported in &response.imported_resources {
                print_json(&imported.state)?;
            }
        }
    }

    Ok(())
}

fn load_attrs(path: &Path) -> anyhow::Result<DynamicValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn check(diagnostics: Vec<Diagnostic>) -> anyhow::Result<()> {
    for d in &diagnostics {
        match &d.attribute {
            Some(attr) => eprintln!("{:?}: {} ({}): {}", d.severity, d.summary, attr, d.detail),
            None => eprintln!("{:?}: {}: {}", d.severity, d.summary, d.detail),
        }
    }
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("{} error(s) reported", errors);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
