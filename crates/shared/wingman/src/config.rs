use crate::error::{WingmanError, WingmanErrorExt};
use config::{Config, Environment, File};
use mora_domain::config::HostConfig;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG: &str = "host";
const ENV_PREFIX: &str = "MORA";

/// Loads a configuration file and overlays `MORA__`-prefixed environment variables.
///
/// The file is required; without `path` the loader looks for `host` (any extension the
/// `config` crate recognises) in the working directory. Nested keys use `__`, so
/// `MORA__NEGOTIATION__MAX_PASSES=4` sets `negotiation.max_passes`.
///
/// # Errors
/// Returns [`WingmanError::Config`] if the file is missing or does not match `T`.
///
/// # Example
/// ```rust
/// use mora_wingman::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct Limits {
///     max_passes: u32,
/// }
///
/// let limits: Limits = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, WingmanError>
where
    T: DeserializeOwned,
{
    let effective_path =
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG), |p| p.as_ref().to_path_buf());

    info!(path = %effective_path.display(), "Loading configuration");

    Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

/// [`load_config`] for the host's own [`HostConfig`].
///
/// # Errors
/// See [`load_config`].
pub fn load_host_config(path: Option<impl AsRef<Path>>) -> Result<HostConfig, WingmanError> {
    load_config(path)
}
