//! Organization feature slice: collections and the policies organizations enforce.
//!
//! Both domains are read-only on the client and arrive through sync.

mod collections;
mod policies;

pub use collections::{
    CollectionData, CollectionService, CollectionServiceInner, CollectionView, Collections,
};
pub use policies::{Policies, Policy, PolicyData, PolicyService, PolicyServiceInner, PolicyType};
