use sbox_ciphers::CipherData;
use sbox_folders::FolderData;
use sbox_organization::{CollectionData, PolicyData};
use sbox_sends::SendData;
use serde::Deserialize;

/// Ciphertext payload of a full sync. Missing sections deserialize as empty, which
/// clears that domain for the account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncResponse {
    pub folders: Vec<FolderData>,
    pub ciphers: Vec<CipherData>,
    pub sends: Vec<SendData>,
    pub collections: Vec<CollectionData>,
    pub policies: Vec<PolicyData>,
}
