//! quarry cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub connection: ConnectionArgs,

    /// Groups configuration document
    #[clap(short = 'f', long = "config", env = "QUARRY_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct ConnectionArgs {
    /// URL of the record store API
    #[clap(long, env = "QUARRY_URL")]
    pub url: String,

    /// Application token
    #[clap(long = "app-token", env = "QUARRY_APPTOKEN")]
    pub app_token: String,

    /// User API token (preferred over username/password)
    #[clap(long = "user-token", env = "QUARRY_USERTOKEN")]
    pub user_token: Option<String>,

    /// Username for basic authentication
    #[clap(long, env = "QUARRY_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[clap(long, env = "QUARRY_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve all groups and print the full inventory
    List(ListCommand),

    /// Resolve all groups and print the variables of one host
    Host(HostCommand),
}

#[derive(Parser, Debug)]
pub struct ListCommand {
    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct HostCommand {
    #[clap(flatten)]
    pub output: OutputArgs,

    /// Host to look up
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
