//! Account metadata: authentication status, profile, settings and tokens.
//!
//! Every mutable sub-record has a matching `*Patch` with one optional field per
//! attribute. Applying a patch only overwrites the fields it carries, so a multi-step
//! sign-in flow can fill a record piece by piece without clobbering earlier steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Per-account lifecycle state.
///
/// `LoggedOut -> Locked -> Unlocked -> Locked -> LoggedOut`, with
/// `Unlocked -> LoggedOut` also allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStatus {
    #[default]
    LoggedOut,
    Locked,
    Unlocked,
}

impl AuthenticationStatus {
    #[must_use]
    pub const fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

impl fmt::Display for AuthenticationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoggedOut => "logged_out",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        })
    }
}

/// What happens when the vault timeout elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultTimeoutAction {
    #[default]
    Lock,
    LogOut,
}

/// Key derivation function the server reports for the master password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdfKind {
    #[default]
    Pbkdf2Sha256,
    Argon2id,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub email_verified: bool,
    pub has_premium: bool,
    pub kdf: KdfKind,
    pub kdf_iterations: Option<u32>,
    pub force_password_reset: bool,
    pub ever_been_unlocked: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub email_verified: Option<bool>,
    pub has_premium: Option<bool>,
    pub kdf: Option<KdfKind>,
    pub kdf_iterations: Option<u32>,
    pub force_password_reset: Option<bool>,
    pub ever_been_unlocked: Option<bool>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn last_sync(mut self, at: DateTime<Utc>) -> Self {
        self.last_sync = Some(at);
        self
    }

    pub fn apply(self, profile: &mut AccountProfile) {
        if let Some(email) = self.email {
            profile.email = Some(email);
        }
        if let Some(name) = self.name {
            profile.name = Some(name);
        }
        if let Some(v) = self.email_verified {
            profile.email_verified = v;
        }
        if let Some(v) = self.has_premium {
            profile.has_premium = v;
        }
        if let Some(kdf) = self.kdf {
            profile.kdf = kdf;
        }
        if let Some(iterations) = self.kdf_iterations {
            profile.kdf_iterations = Some(iterations);
        }
        if let Some(v) = self.force_password_reset {
            profile.force_password_reset = v;
        }
        if let Some(v) = self.ever_been_unlocked {
            profile.ever_been_unlocked = v;
        }
        if let Some(at) = self.last_sync {
            profile.last_sync = Some(at);
        }
    }
}

/// Server endpoints for self-hosted installations. `None` means the hosted default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentUrls {
    pub base: Option<String>,
    pub api: Option<String>,
    pub identity: Option<String>,
    pub icons: Option<String>,
    pub notifications: Option<String>,
    pub events: Option<String>,
    pub web_vault: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountSettings {
    /// Minutes of inactivity before [`AccountSettings::vault_timeout_action`] runs.
    /// `None` means never.
    pub vault_timeout: Option<u32>,
    pub vault_timeout_action: VaultTimeoutAction,
    /// Seconds before copied secrets are cleared from the clipboard.
    pub clear_clipboard: Option<u32>,
    pub equivalent_domains: Vec<Vec<String>>,
    pub never_domains: BTreeSet<String>,
    pub collapsed_groupings: BTreeSet<String>,
    pub disable_badge_counter: bool,
    pub enable_gravatars: bool,
    pub environment_urls: EnvironmentUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub vault_timeout: Option<Option<u32>>,
    pub vault_timeout_action: Option<VaultTimeoutAction>,
    pub clear_clipboard: Option<Option<u32>>,
    pub equivalent_domains: Option<Vec<Vec<String>>>,
    pub never_domains: Option<BTreeSet<String>>,
    pub collapsed_groupings: Option<BTreeSet<String>>,
    pub disable_badge_counter: Option<bool>,
    pub enable_gravatars: Option<bool>,
    pub environment_urls: Option<EnvironmentUrls>,
}

impl SettingsPatch {
    #[must_use]
    pub const fn vault_timeout(mut self, minutes: Option<u32>, action: VaultTimeoutAction) -> Self {
        self.vault_timeout = Some(minutes);
        self.vault_timeout_action = Some(action);
        self
    }

    pub fn apply(self, settings: &mut AccountSettings) {
        if let Some(timeout) = self.vault_timeout {
            settings.vault_timeout = timeout;
        }
        if let Some(action) = self.vault_timeout_action {
            settings.vault_timeout_action = action;
        }
        if let Some(clear) = self.clear_clipboard {
            settings.clear_clipboard = clear;
        }
        if let Some(domains) = self.equivalent_domains {
            settings.equivalent_domains = domains;
        }
        if let Some(domains) = self.never_domains {
            settings.never_domains = domains;
        }
        if let Some(groupings) = self.collapsed_groupings {
            settings.collapsed_groupings = groupings;
        }
        if let Some(v) = self.disable_badge_counter {
            settings.disable_badge_counter = v;
        }
        if let Some(v) = self.enable_gravatars {
            settings.enable_gravatars = v;
        }
        if let Some(urls) = self.environment_urls {
            settings.environment_urls = urls;
        }
    }
}

/// Session tokens. Held in memory only and never written to disk.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccountTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub security_stamp: Option<String>,
}

impl fmt::Debug for AccountTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("security_stamp", &self.security_stamp)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokensPatch {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub security_stamp: Option<String>,
}

impl fmt::Debug for TokensPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokensPatch").finish_non_exhaustive()
    }
}

impl TokensPatch {
    pub fn apply(self, tokens: &mut AccountTokens) {
        if let Some(token) = self.access_token {
            tokens.access_token = Some(token);
        }
        if let Some(token) = self.refresh_token {
            tokens.refresh_token = Some(token);
        }
        if let Some(stamp) = self.security_stamp {
            tokens.security_stamp = Some(stamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_patch_only_touches_present_fields() {
        let mut profile = AccountProfile {
            email: Some("ada@example.com".to_owned()),
            kdf_iterations: Some(600_000),
            ..AccountProfile::default()
        };

        ProfilePatch::default().name("Ada").apply(&mut profile);

        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.kdf_iterations, Some(600_000));
    }

    #[test]
    fn settings_patch_can_clear_an_optional_value() {
        let mut settings = AccountSettings { vault_timeout: Some(15), ..Default::default() };

        SettingsPatch::default().vault_timeout(None, VaultTimeoutAction::LogOut).apply(&mut settings);

        assert_eq!(settings.vault_timeout, None);
        assert_eq!(settings.vault_timeout_action, VaultTimeoutAction::LogOut);
    }

    #[test]
    fn tokens_debug_never_prints_secrets() {
        let tokens = AccountTokens {
            access_token: Some("eyJhbGciOi".to_owned()),
            refresh_token: None,
            security_stamp: None,
        };
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("eyJhbGciOi"));
        assert!(rendered.contains("<redacted>"));
    }
}
