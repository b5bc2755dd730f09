//! Accounts domain module (sellers, customers and operational staff).
//!
//! One account type tagged with a role-specific profile. Pure domain logic:
//! no IO, no HTTP, no storage.

pub mod account;

pub use account::{Account, NewAccount, Profile, normalize_email};
