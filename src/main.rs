mod catalog;
mod cli;
mod color;
mod config;
mod resolver;
mod store;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{
    check::check_cmd, engines::engines_cmd, latest::latest_cmd, list::list_cmd, rules::rules_cmd,
    ColorMode, Session,
};
use tracing_subscriber::{prelude::*, EnvFilter};

use catalog::{DeviceArchitecture, ModelEndpoint, RuleType};

/// Environment variable holding a `tracing` filter, e.g. `enginecat=debug`.
const LOG_ENV_VAR: &str = "ENGINECAT_LOG";

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "enginecat")]
#[command(
    about = "Resolve which inference engines run a model, and how they parse its output",
    version = "0.1.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Read the configuration from this file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Catalog file path, or an http(s) URL serving a catalog document
    #[arg(long)]
    catalog: Option<String>,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an engine can run a model architecture
    Check(CheckArgs),
    /// List compatible engine versions with their resolved parsers
    Engines(EnginesArgs),
    /// Show the newest engine version for a device
    Latest(LatestArgs),
    /// Show how an engine's parser rules evaluate for a model
    Rules(RulesArgs),
    /// List catalog contents
    List(ListArgs),
}

#[derive(Parser)]
pub(crate) struct CheckArgs {
    /// Model architecture class, e.g. LlamaForCausalLM
    #[arg(short, long)]
    architecture: String,
    /// Device architecture (cuda, rocm, cpu, hpu)
    #[arg(short, long)]
    device: Option<DeviceArchitecture>,
    /// Engine name
    #[arg(short, long)]
    engine: Option<String>,
    /// Check this version instead of the latest one
    #[arg(short = 'v', long = "version")]
    engine_version: Option<String>,
}

#[derive(Parser)]
pub(crate) struct EnginesArgs {
    /// Model architecture class, e.g. LlamaForCausalLM
    #[arg(short, long)]
    architecture: String,
    /// Limit to one device architecture
    #[arg(short, long)]
    device: Option<DeviceArchitecture>,
    /// Limit to one engine
    #[arg(short, long)]
    engine: Option<String>,
    /// Limit to one engine version
    #[arg(short = 'v', long = "version")]
    engine_version: Option<String>,
    /// Model identifier that parser rules are matched against
    #[arg(short, long)]
    model: Option<String>,
    /// Endpoint the model is served under; may be repeated
    #[arg(long = "endpoint")]
    endpoints: Vec<ModelEndpoint>,
    /// Only consider the newest version per engine and device
    #[arg(long)]
    latest_only: bool,
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Parser)]
pub(crate) struct LatestArgs {
    /// Device architecture (cuda, rocm, cpu, hpu)
    #[arg(short, long)]
    device: Option<DeviceArchitecture>,
    /// Engine name
    #[arg(short, long)]
    engine: Option<String>,
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Parser)]
pub(crate) struct RulesArgs {
    /// Engine name
    #[arg(short, long)]
    engine: Option<String>,
    /// Model identifier to evaluate the rules against
    #[arg(short, long)]
    model: String,
    /// Which rules to evaluate
    #[arg(long = "type", default_value_t = RuleType::default())]
    rule_type: RuleType,
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Engine versions
    Engines,
    /// Model architecture classes
    Architectures,
    /// Models with metadata
    Models,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

/// Logs go to stderr. The filter comes from `ENGINECAT_LOG`, then the
/// config's `log_level`, then `warn`.
fn init_tracing(log_level: Option<&str>) {
    let filter = match EnvFilter::try_from_env(LOG_ENV_VAR) {
        Ok(filter) => filter,
        Err(_) => match EnvFilter::try_new(log_level.unwrap_or("warn")) {
            Ok(filter) => filter,
            Err(err) => {
                warning!("ignoring invalid log_level: {}", err);
                EnvFilter::new("warn")
            }
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    color::configure_color(ColorMode::resolve_auto(cli.color));

    let config = match config::read_config(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => die!("{}", err),
    };

    init_tracing(config.log_level.as_deref());

    let session = Session::open(config, cli.catalog.as_deref()).await;

    match &cli.command {
        Commands::Check(args) => check_cmd(&session, args).await,
        Commands::Engines(args) => engines_cmd(&session, args).await,
        Commands::Latest(args) => latest_cmd(&session, args).await,
        Commands::Rules(args) => rules_cmd(&session, args).await,
        Commands::List(args) => list_cmd(&session, args).await,
    }
}
