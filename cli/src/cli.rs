use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Provision the Azure resources of the monitoring sample and write their keys
/// into local environment files.
#[derive(Debug, Parser)]
#[command(name = "azmon", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase console verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full deployment: resource group, template, keys, env files
    Deploy(DeployArgs),
    /// Render the env files offline from a JSON file of placeholder values
    Render(RenderArgs),
    /// Report placeholders left in the generated env files
    Verify,
    /// Send a test trace to Application Insights
    Ping(PingArgs),
    /// Write a configuration file with every setting at its default
    Init(InitArgs),
}

#[derive(Debug, Args, Default)]
pub struct DeployArgs {
    /// Use this suffix instead of generating one
    #[arg(long)]
    pub suffix: Option<String>,

    /// Subscription id to deploy into
    #[arg(long)]
    pub subscription: Option<String>,

    /// Azure region for the resource group
    #[arg(long)]
    pub location: Option<String>,

    /// Check inputs and print the plan without calling Azure
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the parameters file untouched
    #[arg(long)]
    pub no_write_parameters: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// JSON object mapping placeholder names (e.g. INSIGHTS_KEY) to values
    #[arg(long)]
    pub values: PathBuf,
}

#[derive(Debug, Args, Default)]
pub struct PingArgs {
    /// Connection string to use instead of the configured one
    #[arg(long)]
    pub connection_string: Option<String>,

    /// Message to send
    #[arg(long, default_value = "azmon ping")]
    pub message: String,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Where to write the file
    #[arg(long, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
