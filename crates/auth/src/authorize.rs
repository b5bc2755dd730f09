use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{actual}' may not perform this action")]
    Forbidden { actual: Role },
}

/// Check that the caller holds one of `allowed`.
///
/// - No IO
/// - No panics
/// - Pure policy check (ownership checks belong to the services)
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            actual: principal.role,
        })
    }
}
