//! Versioned account records.
//!
//! Only profile and settings are persisted; tokens, keys and plaintext never are.
//! Records carry a `schema` tag. `v1` records hold settings as a loose camelCase map
//! and are migrated into the typed [`AccountSettings`] when read; everything is
//! written back as `v2`.

use crate::error::StateError;
use sbox_domain::{AccountProfile, AccountSettings, EnvironmentUrls, VaultTimeoutAction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// The persisted part of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRecord {
    pub profile: AccountProfile,
    pub settings: AccountSettings,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
enum StoredRecord {
    V1(RecordV1),
    V2(AccountRecord),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordV1 {
    profile: AccountProfile,
    settings: Map<String, Value>,
}

impl AccountRecord {
    /// # Errors
    /// Returns [`StateError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        Ok(serde_json::to_vec(&StoredRecord::V2(self.clone()))?)
    }

    /// Decodes any known schema, migrating older ones. Untagged records are `v1`.
    ///
    /// # Errors
    /// Returns [`StateError::Serialization`] for malformed JSON or an unknown schema.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StateError> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        if let Value::Object(object) = &mut value {
            object.entry("schema").or_insert_with(|| Value::from("v1"));
        }
        match serde_json::from_value(value)? {
            StoredRecord::V2(record) => Ok(record),
            StoredRecord::V1(legacy) => {
                debug!("Migrating v1 account record");
                Ok(Self { profile: legacy.profile, settings: migrate_settings(legacy.settings) })
            },
        }
    }
}

fn migrate_settings(legacy: Map<String, Value>) -> AccountSettings {
    let mut settings = AccountSettings::default();
    for (key, value) in legacy {
        match key.as_str() {
            "vaultTimeout" => settings.vault_timeout = as_u32(&value),
            "vaultTimeoutAction" => {
                settings.vault_timeout_action = match value.as_str() {
                    Some("logOut" | "log_out") => VaultTimeoutAction::LogOut,
                    _ => VaultTimeoutAction::Lock,
                };
            },
            "clearClipboard" => settings.clear_clipboard = as_u32(&value),
            "equivalentDomains" => {
                settings.equivalent_domains = value
                    .as_array()
                    .map(|groups| groups.iter().map(strings).collect())
                    .unwrap_or_default();
            },
            "neverDomains" => {
                settings.never_domains = match &value {
                    Value::Object(domains) => domains.keys().cloned().collect(),
                    other => strings(other).into_iter().collect(),
                };
            },
            "collapsedGroupings" => {
                settings.collapsed_groupings = strings(&value).into_iter().collect();
            },
            "disableBadgeCounter" => {
                settings.disable_badge_counter = value.as_bool().unwrap_or_default();
            },
            "enableGravitars" | "enableGravatars" => {
                settings.enable_gravatars = value.as_bool().unwrap_or_default();
            },
            "environmentUrls" => {
                settings.environment_urls = serde_json::from_value::<EnvironmentUrls>(value)
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "Discarding malformed legacy environment URLs");
                        EnvironmentUrls::default()
                    });
            },
            other => debug!(setting = other, "Dropping unknown legacy setting"),
        }
    }
    settings
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn current_records_roundtrip_as_v2() {
        let mut record = AccountRecord::default();
        record.profile.email = Some("ada@example.com".to_owned());
        record.settings.vault_timeout = Some(15);

        let bytes = record.to_bytes().unwrap();
        let raw: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(raw["schema"], "v2");
        assert_eq!(AccountRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn v1_settings_are_migrated() {
        let legacy = json!({
            "schema": "v1",
            "profile": { "email": "ada@example.com" },
            "settings": {
                "vaultTimeout": 30,
                "vaultTimeoutAction": "logOut",
                "clearClipboard": null,
                "neverDomains": { "example.com": null, "test.org": null },
                "equivalentDomains": [["a.com", "b.com"]],
                "collapsedGroupings": ["favorites"],
                "enableGravitars": true,
                "environmentUrls": { "base": "https://vault.example.com" },
                "someRetiredFlag": 1
            }
        });

        let record = AccountRecord::from_bytes(legacy.to_string().as_bytes()).unwrap();
        let settings = record.settings;

        assert_eq!(record.profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(settings.vault_timeout, Some(30));
        assert_eq!(settings.vault_timeout_action, VaultTimeoutAction::LogOut);
        assert_eq!(settings.clear_clipboard, None);
        assert!(settings.never_domains.contains("test.org"));
        assert_eq!(settings.equivalent_domains, vec![vec!["a.com".to_owned(), "b.com".to_owned()]]);
        assert!(settings.collapsed_groupings.contains("favorites"));
        assert!(settings.enable_gravatars);
        assert_eq!(settings.environment_urls.base.as_deref(), Some("https://vault.example.com"));
    }

    #[test]
    fn untagged_records_are_read_as_v1() {
        let legacy = json!({ "settings": { "disableBadgeCounter": true } });
        let record = AccountRecord::from_bytes(legacy.to_string().as_bytes()).unwrap();
        assert!(record.settings.disable_badge_counter);
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let result = AccountRecord::from_bytes(br#"{"schema":"v9"}"#);
        assert!(matches!(result, Err(StateError::Serialization { .. })));
    }
}
