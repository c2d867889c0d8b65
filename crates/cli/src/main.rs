//! Dataverse CLI - utility for investigating a Dataverse database.
//!
//! Requires the `DYNAMICS_*` environment variables (or a dataverse.toml) to
//! be set properly; see `dataverse config init`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dataverse::Client;
use dataverse_core::Config;
use std::path::PathBuf;

mod logging;

use logging::init_cli_logging;

#[derive(Parser)]
#[command(name = "dataverse")]
#[command(about = "Query utility for the Dataverse Web API")]
#[command(after_help = "\
QUICK START:
  dataverse config init           # Write a config template
  dataverse query accounts        # List rows of a table
  dataverse query \"\"              # List the tables in the database
  dataverse schema                # Download the $metadata schema

Include quotes around the query to add query options with '&':
  dataverse query \"accounts?$select=name&$top=3\"")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `dataverse config`
#[derive(Subcommand)]
enum ConfigCommand {
  /// Show the current effective configuration
  Show,
  /// Write a config template to ./dataverse.toml
  Init,
}

#[derive(Subcommand)]
enum Commands {
  /// Run an ad-hoc query against the Web API
  Query {
    /// Table name, optionally with raw query options appended
    query: String,
    /// Save the data to a file instead of printing it
    #[arg(long)]
    to_file: bool,
    /// Leave out annotations (enum labels, GUID names, etc.)
    #[arg(long)]
    no_annotations: bool,
  },
  /// Download the organization's $metadata schema as XML
  Schema {
    /// Output path (default: dataverse_schema.xml)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Manage configuration
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  init_cli_logging();
  let cli = Cli::parse();

  match cli.command {
    Commands::Query {
      query,
      to_file,
      no_annotations,
    } => cmd_query(&query, to_file, no_annotations).await,
    Commands::Schema { output } => cmd_schema(output).await,
    Commands::Config { command } => match command {
      ConfigCommand::Show => cmd_config_show(),
      ConfigCommand::Init => cmd_config_init(),
    },
  }
}

fn connect() -> Result<Client> {
  let mut config = Config::load_default();
  config.validate().context("configuration is incomplete")?;
  Client::new(config).context("failed to create client")
}

async fn cmd_query(query: &str, to_file: bool, no_annotations: bool) -> Result<()> {
  let client = connect()?;

  let result = client
    .entity(query)
    .annotations(!no_annotations)
    .not_found_ok()
    .get()
    .await
    .context("query failed")?;

  let output = serde_json::to_string_pretty(&result.rows)?;

  if to_file {
    let name: String = query
      .chars()
      .map(|c| if c.is_alphanumeric() { c } else { '_' })
      .collect();
    let path = format!("dataverse_query__{name}.json");
    std::fs::write(&path, output).with_context(|| format!("failed to write {path}"))?;
    println!("Saved {} rows to {path}", result.rows.len());
  } else {
    println!("{output}");
  }

  if let Some(count) = result.count {
    println!("Total count: {count}");
  }

  Ok(())
}

async fn cmd_schema(output: Option<PathBuf>) -> Result<()> {
  let client = connect()?;

  let schema = client.fetch_metadata().await.context("schema download failed")?;
  let path = output.unwrap_or_else(|| PathBuf::from("dataverse_schema.xml"));
  std::fs::write(&path, schema).with_context(|| format!("failed to write {}", path.display()))?;

  println!("Saved schema to {}", path.display());
  Ok(())
}

fn cmd_config_show() -> Result<()> {
  let config = Config::load_default();
  println!("{}", toml::to_string_pretty(&config)?);
  Ok(())
}

fn cmd_config_init() -> Result<()> {
  let path = PathBuf::from("dataverse.toml");
  if path.exists() {
    anyhow::bail!("dataverse.toml already exists");
  }
  std::fs::write(&path, Config::generate_template()).context("failed to write dataverse.toml")?;
  println!("Wrote config template to dataverse.toml");
  Ok(())
}
