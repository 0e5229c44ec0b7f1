use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One category of user data, each with its own cache per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    Folders,
    Ciphers,
    Sends,
    Collections,
    Policies,
    PasswordHistory,
}

impl DataDomain {
    pub const ALL: [Self; 6] = [
        Self::Folders,
        Self::Ciphers,
        Self::Sends,
        Self::Collections,
        Self::Policies,
        Self::PasswordHistory,
    ];

    /// Stable tag used for storage file names, key derivation and AEAD context.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::Ciphers => "ciphers",
            Self::Sends => "sends",
            Self::Collections => "collections",
            Self::Policies => "policies",
            Self::PasswordHistory => "password_history",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }

    #[must_use]
    pub const fn flag(self) -> DomainSet {
        match self {
            Self::Folders => DomainSet::FOLDERS,
            Self::Ciphers => DomainSet::CIPHERS,
            Self::Sends => DomainSet::SENDS,
            Self::Collections => DomainSet::COLLECTIONS,
            Self::Policies => DomainSet::POLICIES,
            Self::PasswordHistory => DomainSet::PASSWORD_HISTORY,
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

bitflags! {
    /// A set of data domains, e.g. the domains touched by a sync.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DomainSet: u8 {
        const FOLDERS = 1 << 0;
        const CIPHERS = 1 << 1;
        const SENDS = 1 << 2;
        const COLLECTIONS = 1 << 3;
        const POLICIES = 1 << 4;
        const PASSWORD_HISTORY = 1 << 5;

        /// Domains the server owns and a full sync replaces.
        const SYNCED = Self::FOLDERS.bits()
            | Self::CIPHERS.bits()
            | Self::SENDS.bits()
            | Self::COLLECTIONS.bits()
            | Self::POLICIES.bits();
        const ALL = Self::SYNCED.bits() | Self::PASSWORD_HISTORY.bits();
    }
}

impl DomainSet {
    pub fn domains(self) -> impl Iterator<Item = DataDomain> {
        DataDomain::ALL.into_iter().filter(move |d| self.contains(d.flag()))
    }
}

impl From<DataDomain> for DomainSet {
    fn from(domain: DataDomain) -> Self {
        domain.flag()
    }
}

impl From<&str> for DomainSet {
    fn from(s: &str) -> Self {
        match s {
            "all" | "*" => Self::ALL,
            "synced" => Self::SYNCED,
            tag => DataDomain::from_tag(tag).map_or_else(Self::empty, DataDomain::flag),
        }
    }
}

impl Serialize for DomainSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for DomainSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
