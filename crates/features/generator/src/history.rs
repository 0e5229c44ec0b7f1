use chrono::{DateTime, Utc};
use sbox_domain::DataDomain;
use sbox_kernel::{AccountRegistry, CryptoContext, StateError, ValueDomain, ValueStateService};
use sbox_vault::EncString;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPasswordData {
    pub password: EncString,
    pub date: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedPassword {
    pub password: String,
    pub date: DateTime<Utc>,
}

impl fmt::Debug for GeneratedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedPassword")
            .field("password", &"[REDACTED]")
            .field("date", &self.date)
            .finish()
    }
}

/// Password history: one encrypted list per account, newest first.
#[derive(Debug)]
pub struct PasswordHistory;

impl ValueDomain for PasswordHistory {
    const DOMAIN: DataDomain = DataDomain::PasswordHistory;

    type Encrypted = Vec<GeneratedPasswordData>;
    type Decrypted = Vec<GeneratedPassword>;

    async fn decrypt(
        ctx: &CryptoContext,
        value: &Vec<GeneratedPasswordData>,
    ) -> Result<Vec<GeneratedPassword>, StateError> {
        let mut out = Vec::with_capacity(value.len());
        for entry in value {
            out.push(GeneratedPassword {
                password: ctx.decrypt_text(&entry.password).await?,
                date: entry.date,
            });
        }
        Ok(out)
    }
}

#[sbox_derive::sbox_service]
pub struct PasswordHistoryService {
    pub state: ValueStateService<PasswordHistory>,
    pub limit: usize,
}

impl PasswordHistoryService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry, limit: usize) -> Self {
        Self::new(PasswordHistoryServiceInner { state: ValueStateService::new(registry), limit })
    }

    /// Records a freshly generated password at the front of the history.
    ///
    /// Returns `false` when `password` repeats the newest entry; nothing is stored then.
    ///
    /// # Errors
    /// [`StateError::LockedAccount`] and friends from decrypting the current history,
    /// [`StateError::Encrypt`], or persistence errors.
    pub async fn add(&self, password: &str) -> Result<bool, StateError> {
        let account = self.state.registry().active()?;
        let current = self.state.get_decrypted_for(&account).await?;
        if current.first().is_some_and(|newest| newest.password == password) {
            return Ok(false);
        }

        let entry = GeneratedPasswordData {
            password: self.state.context_for(&account)?.encrypt_text(password).await?,
            date: Utc::now(),
        };
        let limit = self.limit;
        let len = self
            .state
            .update_for(&account, move |history| {
                history.insert(0, entry);
                history.truncate(limit);
                history.len()
            })
            .await?;
        debug!(entries = len, limit, "Password history updated");
        Ok(true)
    }

    /// # Errors
    /// See [`ValueStateService::get_decrypted`].
    pub async fn history(&self) -> Result<Vec<GeneratedPassword>, StateError> {
        self.state.get_decrypted().await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn clear(&self) -> Result<(), StateError> {
        self.state.clear().await
    }
}
