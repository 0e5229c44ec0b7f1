#![allow(dead_code)]

use sbox_domain::{AccountId, ItemId, ProfilePatch};
use sbox_kernel::AccountRegistry;
use sbox_organization::{CollectionData, CollectionService, PolicyData, PolicyService, PolicyType};
use sbox_vault::prelude::*;
use std::sync::Arc;

pub struct Harness {
    pub registry: AccountRegistry,
    pub collections: CollectionService,
    pub policies: PolicyService,
    pub account: AccountId,
}

impl Harness {
    pub async fn signed_in() -> Self {
        let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<Aes>::new())).build();
        let account = AccountId::new("lin@example.com");
        registry.add_or_update_account(account.clone(), ProfilePatch::default()).await.unwrap();
        registry.unlock(&account, keys()).unwrap();
        registry.switch_account(&account).unwrap();

        Self {
            collections: CollectionService::with_registry(registry.clone()),
            policies: PolicyService::with_registry(registry.clone()),
            registry,
            account,
        }
    }

    pub async fn collection(&self, id: &str, organization: &str, name: &str) -> CollectionData {
        let ctx = self.collections.state.context().unwrap();
        CollectionData {
            id: ItemId::new(id),
            organization_id: organization.to_owned(),
            name: ctx.encrypt_text(name).await.unwrap(),
            external_id: None,
            read_only: false,
        }
    }
}

pub fn keys() -> KeyMaterial {
    KeyMaterial::builder().derived("pw", "lin@example.com").unwrap().build().unwrap()
}

pub fn policy(id: &str, kind: PolicyType, enabled: bool) -> PolicyData {
    PolicyData {
        id: ItemId::new(id),
        organization_id: "org-1".to_owned(),
        kind,
        data: None,
        enabled,
    }
}
