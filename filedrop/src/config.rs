//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FILEDROP_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, missing file is fine)
//! 2. **Environment variables** - Variables prefixed with `FILEDROP_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FILEDROP_UPLOADS__DIR=/var/lib/filedrop` sets the `uploads.dir` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use filedrop::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Uploads**: `uploads.dir`, `uploads.path_prefix`, `uploads.token_length` - where uploaded
//!   files land on disk and how their public paths look
//! - **Client**: `client.public_base_uri`, `client.title` - values baked into the UI page
//! - **CORS**: `cors.allowed_origins`, `cors.max_age`
//! - **GraphQL**: `graphql.playground` - serve GraphiQL on `GET /graphql`
//! - **Telemetry**: `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! FILEDROP_PORT=8080
//! FILEDROP_UPLOADS__PATH_PREFIX=/files
//! FILEDROP_CLIENT__PUBLIC_BASE_URI=https://files.example.com
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::errors::Error;

/// Top-level path segments owned by the router itself
const RESERVED_ROUTES: &[&str] = &["assets", "graphql", "healthz"];

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FILEDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Print the GraphQL schema (SDL) and exit.
    #[arg(long)]
    pub print_schema: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty (or absent) config file yields a runnable server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Upload namespace configuration
    pub uploads: UploadsConfig,
    /// Values handed to the browser client
    pub client: ClientConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// GraphQL endpoint configuration
    pub graphql: GraphqlConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Where uploaded files are written and under which URL prefix they are served.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Directory backing the upload namespace. Created on startup if missing.
    pub dir: PathBuf,
    /// URL prefix of the upload namespace, e.g. `/uploads`
    pub path_prefix: String,
    /// Number of random base-36 characters in a generated file name
    pub token_length: usize,
}

/// Client UI configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Prepended to each `publicUri` when the UI builds image sources.
    /// Empty means same-origin relative paths.
    pub public_base_uri: String,
    /// Heading shown above the uploads list
    pub title: String,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
///
/// Allowed methods are fixed to `POST, GET, OPTIONS, DELETE` and every request header is allowed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// GraphQL endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphqlConfig {
    /// Serve the GraphiQL IDE on `GET /graphql`
    pub playground: bool,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

/// RFC 3986 unreserved characters
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            uploads: UploadsConfig::default(),
            client: ClientConfig::default(),
            cors: CorsConfig::default(),
            graphql: GraphqlConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            path_prefix: "/uploads".to_string(),
            token_length: 9,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            public_base_uri: String::new(),
            title: "Uploads".to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: None,
        }
    }
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self { playground: true }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let prefix = &self.uploads.path_prefix;
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(Error::Internal {
                operation: format!("Config validation: uploads.path_prefix must start with '/' and must not end with '/', got '{prefix}'"),
            });
        }

        if prefix[1..].split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
            return Err(Error::Internal {
                operation: format!("Config validation: uploads.path_prefix contains an empty or relative segment: '{prefix}'"),
            });
        }

        // segments become part of an axum route, so `{`, `}` and `*` must never reach it
        if !prefix[1..].split('/').all(|segment| segment.bytes().all(is_unreserved)) {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: uploads.path_prefix may only contain letters, digits, '-', '.', '_' and '~' between slashes, got '{prefix}'"
                ),
            });
        }

        let first_segment = prefix[1..].split('/').next().unwrap_or_default();
        if RESERVED_ROUTES.contains(&first_segment) {
            return Err(Error::Internal {
                operation: format!("Config validation: uploads.path_prefix '{prefix}' collides with the built-in /{first_segment} route"),
            });
        }

        if self.uploads.token_length == 0 {
            return Err(Error::Internal {
                operation: "Config validation: uploads.token_length must be at least 1 (default: 9)".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("FILEDROP_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
            print_schema: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 4000);
            assert_eq!(config.uploads.path_prefix, "/uploads");
            assert_eq!(config.uploads.dir, PathBuf::from("uploads"));
            assert_eq!(config.uploads.token_length, 9);
            assert_eq!(config.client.public_base_uri, "");
            assert!(matches!(config.cors.allowed_origins.as_slice(), [CorsOrigin::Wildcard]));
            assert!(config.graphql.playground);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9000
uploads:
  dir: /srv/files
  path_prefix: /files
client:
  public_base_uri: http://localhost:9000
cors:
  allowed_origins:
    - "*"
    - https://app.example.com
  max_age: 600
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 9000);
            assert_eq!(config.uploads.dir, PathBuf::from("/srv/files"));
            assert_eq!(config.uploads.path_prefix, "/files");
            assert_eq!(config.uploads.token_length, 9); // still default
            assert_eq!(config.client.public_base_uri, "http://localhost:9000");
            assert_eq!(config.cors.allowed_origins.len(), 2);
            assert!(matches!(&config.cors.allowed_origins[1], CorsOrigin::Url(u) if u.as_str() == "https://app.example.com/"));
            assert_eq!(config.cors.max_age, Some(600));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 9000\n")?;

            jail.set_env("FILEDROP_HOST", "127.0.0.1");
            jail.set_env("FILEDROP_PORT", "8080");
            jail.set_env("FILEDROP_UPLOADS__PATH_PREFIX", "/static/uploads");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.uploads.path_prefix, "/static/uploads");
            assert_eq!(config.bind_address(), "127.0.0.1:8080");

            Ok(())
        });
    }

    #[test]
    fn test_config_path_env_is_not_a_field() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 9000\n")?;
            jail.set_env("FILEDROP_CONFIG", "test.yaml");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.port, 9000);

            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "uploads:\n  directory: /tmp\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_validation_prefix_must_be_absolute() {
        let mut config = Config::default();
        config.uploads.path_prefix = "uploads".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("path_prefix"));
    }

    #[test]
    fn test_validation_prefix_trailing_slash() {
        let mut config = Config::default();
        config.uploads.path_prefix = "/uploads/".to_string();
        assert!(config.validate().is_err());

        config.uploads.path_prefix = "/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_prefix_relative_segment() {
        let mut config = Config::default();
        config.uploads.path_prefix = "/a/../uploads".to_string();
        assert!(config.validate().is_err());

        config.uploads.path_prefix = "/a//uploads".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_prefix_route_syntax() {
        for prefix in ["/up{load", "/uploads/{id}", "/files/*", "/a b", "/up%20loads", "/up?x", "/über"] {
            let mut config = Config::default();
            config.uploads.path_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "{prefix}");
        }

        for prefix in ["/uploads", "/static/up-loads_v2", "/files.d/~me"] {
            let mut config = Config::default();
            config.uploads.path_prefix = prefix.to_string();
            assert!(config.validate().is_ok(), "{prefix}");
        }
    }

    #[test]
    fn test_validation_prefix_reserved_route() {
        for prefix in ["/graphql", "/assets/uploads", "/healthz"] {
            let mut config = Config::default();
            config.uploads.path_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "{prefix}");
        }

        let mut config = Config::default();
        config.uploads.path_prefix = "/files/graphql".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_token_length_zero() {
        let mut config = Config::default();
        config.uploads.token_length = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("token_length"));
    }

    #[test]
    fn test_validation_empty_cors_origins() {
        let mut config = Config::default();
        config.cors.allowed_origins.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
