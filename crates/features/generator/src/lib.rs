//! Generated-password history.

mod history;

pub use history::{
    GeneratedPassword, GeneratedPasswordData, PasswordHistory, PasswordHistoryService,
    PasswordHistoryServiceInner,
};
