use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[sbox_derive::sbox_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads layered configuration: a base file, then `SBOX__`-prefixed environment overrides.
///
/// Nested keys use double underscores, so `SBOX__STORAGE__DATA_DIR` maps to
/// `storage.data_dir`. Without a path the loader looks for a `strongbox` file
/// (`strongbox.toml`, `strongbox.json`, ...) in the working directory; when `required`
/// is `false`, a missing file yields defaults plus environment overrides.
///
/// # Errors
/// Returns [`ConfigError::Config`] if a required file is missing or the merged
/// values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use sbox_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct ClientConfig {
///     #[serde(default)]
///     data_dir: String,
/// }
///
/// let cfg: ClientConfig = load_config(Some("does/not/exist"), false).unwrap_or_default();
/// assert!(cfg.data_dir.is_empty());
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>, required: bool) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path =
        path.map_or_else(|| PathBuf::from("strongbox"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix("SBOX")
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
