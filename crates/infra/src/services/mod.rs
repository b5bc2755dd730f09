//! Use-case services.
//!
//! Each service method takes the caller's [`Principal`] when the operation is
//! role- or ownership-gated, validates input through the domain crates and
//! drives one or more repository calls. HTTP concerns stay in the API crate.

use std::sync::Arc;

use thiserror::Error;

use bazaar_auth::{AuthzError, JwtError, PasswordError, PasswordHasher, Principal, Role, TokenIssuer, require_role};
use bazaar_core::DomainError;

use crate::repository::{MarketplaceStore, RepositoryError};

mod accounts;
mod catalog;
mod inventory;
mod orders;
mod stores;
mod warehouses;

pub use accounts::{LoginOutcome, OnboardSeller, SignUp};
pub use inventory::InventoryAdded;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Not shown to callers; the API answers with an opaque message.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_credentials() -> Self {
        Self::Unauthorized("invalid email or password".to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound(what) => Self::NotFound(what),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unauthorized => Self::invalid_credentials(),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Invariant(msg) => Self::Validation(msg),
            e @ (RepositoryError::DanglingReference { .. } | RepositoryError::Backend(_)) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort(_) => Self::Validation(err.to_string()),
            PasswordError::Hash(msg) => Self::Internal(msg),
        }
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encode(msg) => Self::Internal(msg),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

/// Everything the HTTP layer needs, behind shared handles.
#[derive(Clone)]
pub struct Services {
    store: Arc<dyn MarketplaceStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl Services {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }
}

fn require(principal: &Principal, allowed: &[Role]) -> ServiceResult<()> {
    require_role(principal, allowed).map_err(ServiceError::from)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use bazaar_auth::{BcryptHasher, Hs256Jwt, Principal, Role};
    use bazaar_core::AccountId;

    use super::Services;
    use crate::repository::InMemoryStore;

    pub fn services() -> Services {
        Services::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(BcryptHasher::new(4)),
            Arc::new(Hs256Jwt::new("test-secret", chrono::Duration::minutes(5))),
        )
    }

    pub fn principal(role: Role) -> Principal {
        Principal::new(AccountId::new(), format!("test {role}"), role)
    }
}
