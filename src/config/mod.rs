// Configuration module entry point
// Resolves caller options against the environment and built-in defaults

mod args;
mod env;
mod types;

use std::path::{Path, PathBuf};

pub use args::ServerArgs;
pub use env::{first_set, EnvSource, ProcessEnv};
pub use types::{Configuration, Options};

use crate::handler::Handler;

pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_LOG_FORMAT: &str = "dev";
pub const DEVELOPMENT: &str = "development";

/// Default config file looked up by the binary (extension inferred)
pub const DEFAULT_CONFIG_PATH: &str = "initserver";

/// Static assets live next to the crate, not in the caller's working directory
pub fn default_static_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("public")
}

impl Options {
    /// Load options from a config file path (without extension).
    /// A missing file yields empty options.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .build()?
            .try_deserialize()
    }
}

impl Configuration {
    /// Resolve every field as: explicit option, then environment, then default.
    ///
    /// Empty strings count as unset. Never fails.
    pub fn resolve(options: Option<&Options>, env: &impl EnvSource) -> Self {
        let explicit = |pick: fn(&Options) -> Option<&String>| {
            options
                .and_then(pick)
                .filter(|value| !value.is_empty())
                .cloned()
        };

        let port = explicit(|o| o.port.as_ref())
            .or_else(|| first_set(env, &["PORT"]))
            .unwrap_or_else(|| DEFAULT_PORT.to_string());

        let host = explicit(|o| o.host.as_ref())
            .or_else(|| first_set(env, &["HOST_ADDR", "HOST"]))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let log_format = explicit(|o| o.log_format.as_ref())
            .or_else(|| first_set(env, &["LOG_FORMAT"]))
            .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string());

        let environment =
            explicit(|o| o.environment.as_ref()).or_else(|| first_set(env, &["NODE_ENV"]));

        let static_root = options
            .and_then(|o| o.static_root.clone())
            .unwrap_or_else(default_static_root);

        Self {
            port,
            host,
            log_format,
            environment,
            static_root,
        }
    }
}

/// Split startup arguments into a resolved configuration and the ordered
/// caller handlers
pub fn resolve(args: impl Into<ServerArgs>, env: &impl EnvSource) -> (Configuration, Vec<Handler>) {
    let args = args.into();
    let config = Configuration::resolve(args.options.as_ref(), env);
    (config, args.handlers.into_vec())
}
