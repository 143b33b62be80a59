//! CLI argument definitions for the index management tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use ism_model::HttpMethod;

#[derive(Parser)]
#[command(
    name = "ism",
    version,
    about = "Index management helpers for OpenSearch Dashboards",
    long_about = "Edit index mappings, compare configurations and manage notification\n\
                  settings through the index management plugin of OpenSearch Dashboards."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Connection options; each overrides the settings file.
#[derive(Args)]
pub struct ServerArgs {
    /// Settings file (default: platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// OpenSearch Dashboards base URL.
    #[arg(long = "server", value_name = "URL", global = true)]
    pub server: Option<String>,

    /// Data source id for multi data source setups.
    #[arg(long = "data-source", value_name = "ID", global = true)]
    pub data_source: Option<String>,

    /// Request timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert and check index mappings.
    #[command(subcommand)]
    Mapping(MappingCommand),

    /// Compare two configurations and count unsaved changes.
    Diff(DiffArgs),

    /// Show or update the default notification settings.
    #[command(subcommand)]
    Notifications(NotificationsCommand),

    /// Create an index or add fields to an existing one.
    #[command(subcommand)]
    Index(IndexCommand),

    /// Send a raw call through the dashboards proxy.
    #[command(subcommand)]
    Api(ApiCommand),

    /// Show the effective settings and where they are stored.
    Settings,
}

#[derive(Subcommand)]
pub enum MappingCommand {
    /// Convert a mapping object to the ordered node list.
    Nodes(InputArgs),

    /// Convert a node list back to a mapping object.
    Object(InputArgs),

    /// Check a mapping against the mapping schema and list its fields.
    Check(CheckArgs),
}

#[derive(Args)]
pub struct InputArgs {
    /// JSON file to read ("-" for stdin).
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Mapping JSON file to check ("-" for stdin).
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: PathBuf,

    /// Saved mapping of the existing index; its fields are reported as locked.
    #[arg(long = "saved", value_name = "FILE")]
    pub saved: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Saved configuration (JSON list or object).
    #[arg(value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Edited configuration (JSON list or object).
    #[arg(value_name = "CURRENT")]
    pub current: PathBuf,

    /// Identity field of list entries.
    #[arg(long = "key", default_value = "action_name")]
    pub key: String,
}

#[derive(Subcommand)]
pub enum NotificationsCommand {
    /// List the default notification settings.
    Show,

    /// Change one action's settings and save all of them.
    Submit(NotificationSubmitArgs),
}

#[derive(Args)]
pub struct NotificationSubmitArgs {
    /// Action name, for example `indices:data/write/reindex`.
    #[arg(long = "action", value_name = "NAME")]
    pub action: String,

    /// Notify when the operation succeeds.
    #[arg(long = "success", value_name = "BOOL")]
    pub success: Option<bool>,

    /// Notify when the operation fails.
    #[arg(long = "failure", value_name = "BOOL")]
    pub failure: Option<bool>,

    /// Channel id to notify (repeat for several; replaces the current list).
    #[arg(long = "channel", value_name = "ID")]
    pub channels: Vec<String>,
}

#[derive(Subcommand)]
pub enum IndexCommand {
    /// Create a new index.
    Create(CreateIndexArgs),

    /// Add mapping fields to an existing index.
    PutMapping(PutMappingArgs),
}

#[derive(Args)]
pub struct CreateIndexArgs {
    /// Index name.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Number of primary shards.
    #[arg(long = "shards", default_value_t = 1)]
    pub shards: u64,

    /// Number of replicas.
    #[arg(long = "replicas", default_value_t = 1)]
    pub replicas: u64,

    /// Alias to add (repeat for several).
    #[arg(long = "alias", value_name = "NAME")]
    pub aliases: Vec<String>,

    /// JSON object of additional index settings.
    #[arg(long = "settings", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Mapping JSON file.
    #[arg(long = "mapping", value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Print the requests instead of sending them.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PutMappingArgs {
    /// Index name.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Saved mapping of the index.
    #[arg(long = "saved", value_name = "FILE")]
    pub saved: PathBuf,

    /// Full mapping including the saved fields.
    #[arg(long = "mapping", value_name = "FILE")]
    pub mapping: PathBuf,

    /// Print the requests instead of sending them.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum ApiCommand {
    /// Call an engine client endpoint such as `cat.indices`.
    Call(ApiCallArgs),
}

#[derive(Args)]
pub struct ApiCallArgs {
    /// Endpoint name.
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// HTTP method.
    #[arg(long = "method", value_enum, default_value = "get")]
    pub method: HttpMethodArg,

    /// JSON parameters passed to the endpoint.
    #[arg(long = "data", value_name = "JSON")]
    pub data: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HttpMethodArg {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl From<HttpMethodArg> for HttpMethod {
    fn from(method: HttpMethodArg) -> Self {
        match method {
            HttpMethodArg::Get => Self::Get,
            HttpMethodArg::Post => Self::Post,
            HttpMethodArg::Put => Self::Put,
            HttpMethodArg::Delete => Self::Delete,
            HttpMethodArg::Head => Self::Head,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
