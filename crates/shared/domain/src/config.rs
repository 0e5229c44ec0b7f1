use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration of a Strongbox client.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfigInner {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(flatten, default)]
    inner: Arc<StateConfigInner>,
}

impl Deref for StateConfig {
    type Target = StateConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for StateConfig {
    fn deref_mut(&mut self) -> &mut StateConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Where ciphertext state lives on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// `false` keeps everything in memory (tests, ephemeral sessions).
    pub persist: bool,
    /// LZ4-compress files at rest.
    pub compression: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub name: String,
    pub level: String,
    pub console: bool,
    pub path: Option<PathBuf>,
    pub json: bool,
    pub env_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherKind {
    #[default]
    Aes,
    Chacha,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub cipher: CipherKind,
    /// LZ4-compress plaintext before encryption. Only safe where ciphertext length is not observable.
    pub compress_payloads: bool,
}

/// Whether switching the active account locks the previously active one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPolicy {
    #[default]
    KeepUnlocked,
    LockPrevious,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub switch_policy: SwitchPolicy,
    pub password_history_limit: usize,
}

// --- Default ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), persist: true, compression: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "strongbox".to_owned(),
            level: "info".to_owned(),
            console: true,
            path: None,
            json: false,
            env_filter: None,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { cipher: CipherKind::Aes, compress_payloads: false }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { switch_policy: SwitchPolicy::KeepUnlocked, password_history_limit: 100 }
    }
}
