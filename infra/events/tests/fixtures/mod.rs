#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountLocked(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ActiveAccount(pub Option<String>);
