//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "specchio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_ENTRIES_TABLE: &str = "specchio_entries";
const DEFAULT_SELECTOR: &str = "#app";
const DEFAULT_VARIABLE: &str = "specchioPrerender";
const DEFAULT_CACHE_BUSTER: &str = "specchio_prerender";
const DEFAULT_QUEUE_INTERVAL_SECS: u64 = 5;
const DEFAULT_QUEUE_BATCH: usize = 16;
const DEFAULT_SECRETS_FLUSH_INTERVAL_SECS: u64 = 300;
const DEFAULT_ENTRY_READ_CACHE_CAPACITY: usize = 512;
const DEFAULT_CHRONOLOGICAL_POST_TYPE: &str = "post";
const DEFAULT_POST_PATH: &str = "?p={id}";
const DEFAULT_AUTHOR_PATH: &str = "author/{id}/";
const DEFAULT_TERM_PATH: &str = "term/{id}/";
const DEFAULT_YEAR_PATH: &str = "{year}/";
const DEFAULT_MONTH_PATH: &str = "{year}/{month}/";
const DEFAULT_DAY_PATH: &str = "{year}/{month}/{day}/";

/// Command-line arguments for the specchio binary.
#[derive(Debug, Parser)]
#[command(name = "specchio", version, about = "Specchio prerender cache service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SPECCHIO_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the callback endpoint and the render dispatch loop.
    Serve(ServeArgs),
    /// Bump the HTML version token, staling every cached entry at once.
    Flush(FlushArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the render function endpoint.
    #[arg(long = "renderer-endpoint", value_name = "URL")]
    pub renderer_endpoint: Option<Url>,

    /// Override the public base URL used to build the callback return URL.
    #[arg(long = "public-base-url", value_name = "URL")]
    pub public_base_url: Option<Url>,
}

#[derive(Debug, Args, Clone)]
pub struct FlushArgs {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub renderer: RendererSettings,
    pub service: ServiceSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub entries_table: String,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub endpoint: Option<Url>,
    pub authorization: Option<String>,
    pub selector: String,
    pub variable: String,
    pub cache_buster: String,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub public_base_url: Option<Url>,
    pub queue_interval: Duration,
    pub queue_batch: usize,
    pub secrets_flush_interval: Duration,
    pub entry_read_cache_capacity: NonZeroUsize,
    pub chronological_post_type: String,
}

/// Public URL structure of the host site, for the pattern-based content
/// source.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub home_url: Url,
    pub post_path: String,
    pub author_path: String,
    pub term_path: String,
    pub year_path: String,
    pub month_path: String,
    pub day_path: String,
    pub post_types: Vec<PostTypeSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostTypeSettings {
    pub name: String,
    #[serde(default)]
    pub archive_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SPECCHIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Flush(args)) => {
            if let Some(url) = args.database_url.as_ref() {
                raw.database.url = Some(url.clone());
            }
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    renderer: RawRendererSettings,
    service: RawServiceSettings,
    site: RawSiteSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    entries_table: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    endpoint: Option<String>,
    authorization: Option<String>,
    selector: Option<String>,
    variable: Option<String>,
    cache_buster: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServiceSettings {
    public_base_url: Option<String>,
    queue_interval_seconds: Option<u64>,
    queue_batch: Option<usize>,
    secrets_flush_interval_seconds: Option<u64>,
    entry_read_cache_capacity: Option<usize>,
    chronological_post_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    home_url: Option<String>,
    post_path: Option<String>,
    author_path: Option<String>,
    term_path: Option<String>,
    year_path: Option<String>,
    month_path: Option<String>,
    day_path: Option<String>,
    post_types: Option<Vec<PostTypeSettings>>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(endpoint) = overrides.renderer_endpoint.as_ref() {
            self.renderer.endpoint = Some(endpoint.to_string());
        }
        if let Some(url) = overrides.public_base_url.as_ref() {
            self.service.public_base_url = Some(url.to_string());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            renderer,
            service,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            renderer: build_renderer_settings(renderer)?,
            service: build_service_settings(service)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database.max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        "database.max_connections",
    )?;

    let entries_table = database
        .entries_table
        .unwrap_or_else(|| DEFAULT_ENTRIES_TABLE.to_string());
    if !is_sql_identifier(&entries_table) {
        return Err(LoadError::invalid(
            "database.entries_table",
            "table name must be a plain SQL identifier",
        ));
    }

    Ok(DatabaseSettings {
        url,
        max_connections,
        entries_table,
    })
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let endpoint = renderer
        .endpoint
        .map(|value| {
            Url::parse(&value)
                .map_err(|err| LoadError::invalid("renderer.endpoint", err.to_string()))
        })
        .transpose()?;

    Ok(RendererSettings {
        endpoint,
        authorization: renderer.authorization,
        selector: renderer.selector.unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        variable: renderer.variable.unwrap_or_else(|| DEFAULT_VARIABLE.to_string()),
        cache_buster: renderer
            .cache_buster
            .unwrap_or_else(|| DEFAULT_CACHE_BUSTER.to_string()),
    })
}

fn build_service_settings(service: RawServiceSettings) -> Result<ServiceSettings, LoadError> {
    let public_base_url = service
        .public_base_url
        .map(|value| {
            Url::parse(&value)
                .map_err(|err| LoadError::invalid("service.public_base_url", err.to_string()))
        })
        .transpose()?;

    let queue_interval = Duration::from_secs(
        service
            .queue_interval_seconds
            .unwrap_or(DEFAULT_QUEUE_INTERVAL_SECS)
            .max(1),
    );

    let queue_batch = service.queue_batch.unwrap_or(DEFAULT_QUEUE_BATCH);
    if queue_batch == 0 {
        return Err(LoadError::invalid(
            "service.queue_batch",
            "must be greater than zero",
        ));
    }

    let secrets_flush_interval = Duration::from_secs(
        service
            .secrets_flush_interval_seconds
            .unwrap_or(DEFAULT_SECRETS_FLUSH_INTERVAL_SECS)
            .max(1),
    );

    let entry_read_cache_capacity = NonZeroUsize::new(
        service
            .entry_read_cache_capacity
            .unwrap_or(DEFAULT_ENTRY_READ_CACHE_CAPACITY),
    )
    .ok_or_else(|| {
        LoadError::invalid("service.entry_read_cache_capacity", "must be greater than zero")
    })?;

    Ok(ServiceSettings {
        public_base_url,
        queue_interval,
        queue_batch,
        secrets_flush_interval,
        entry_read_cache_capacity,
        chronological_post_type: service
            .chronological_post_type
            .unwrap_or_else(|| DEFAULT_CHRONOLOGICAL_POST_TYPE.to_string()),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let home_url = match site.home_url {
        Some(value) => Url::parse(&value)
            .map_err(|err| LoadError::invalid("site.home_url", err.to_string()))?,
        None => Url::parse("http://localhost/")
            .map_err(|err| LoadError::invalid("site.home_url", err.to_string()))?,
    };

    let post_types = site.post_types.unwrap_or_else(|| {
        vec![PostTypeSettings {
            name: DEFAULT_CHRONOLOGICAL_POST_TYPE.to_string(),
            archive_path: None,
        }]
    });

    Ok(SiteSettings {
        home_url,
        post_path: site.post_path.unwrap_or_else(|| DEFAULT_POST_PATH.to_string()),
        author_path: site
            .author_path
            .unwrap_or_else(|| DEFAULT_AUTHOR_PATH.to_string()),
        term_path: site.term_path.unwrap_or_else(|| DEFAULT_TERM_PATH.to_string()),
        year_path: site.year_path.unwrap_or_else(|| DEFAULT_YEAR_PATH.to_string()),
        month_path: site
            .month_path
            .unwrap_or_else(|| DEFAULT_MONTH_PATH.to_string()),
        day_path: site.day_path.unwrap_or_else(|| DEFAULT_DAY_PATH.to_string()),
        post_types,
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse `{host}:{port}`: {err}"))
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn is_sql_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        && !value.as_bytes()[0].is_ascii_digit()
}
