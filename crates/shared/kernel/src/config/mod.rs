use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides, e.g. `EVREG__DATABASE__URL`.
pub const ENV_PREFIX: &str = "EVREG";
/// Configuration file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "server.toml";

/// Custom error type for config loading.
#[evreg_derive::evreg_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from an optional file overlaid with environment variables.
///
/// 1. **Base File**: an explicit `path` must exist. Without one, `server.toml` is read
///    from the working directory if it is present.
/// 2. **Environment Overrides**: variables prefixed with `EVREG__`. Nested keys are
///    separated by double underscores (`EVREG__SERVER__PORT` maps to `server.port`).
///
/// Missing keys fall back to the `#[serde(default)]` values of `T`.
///
/// # Errors
/// * An explicitly given file cannot be read or parsed.
/// * The merged values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use evreg_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_with_env(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn load_with_env<T>(path: Option<impl AsRef<Path>>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (file, required) = match &path {
        Some(p) => (p.as_ref(), true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    info!(path = %file.display(), required, "Loading config");

    let config = Config::builder()
        .add_source(File::from(file).required(required))
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
