use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::AccountId;

use crate::{Principal, Role};

/// JWT claims model.
///
/// `iat`/`exp` are UNIX seconds so the token stays readable by any standard
/// JWT library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the account id.
    pub sub: AccountId,

    /// Display name of the account at issue time.
    pub name: String,

    /// Role the account logged in as.
    pub role: Role,

    /// Issued-at timestamp (UNIX seconds).
    pub iat: i64,

    /// Expiration timestamp (UNIX seconds).
    pub exp: i64,
}

impl JwtClaims {
    /// Claims for `principal`, valid from `now` for `ttl`.
    pub fn for_principal(principal: &Principal, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: principal.user_id,
            name: principal.name.clone(),
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of JWT claims.
///
/// Signature verification happens in [`crate::jwt`]; this only checks the
/// claims against `now`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        let principal = Principal::new(AccountId::new(), "Asha", Role::Seller);
        JwtClaims::for_principal(&principal, now, Duration::minutes(10))
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now), now), Ok(()));
    }

    #[test]
    fn expired_claims_are_rejected() {
        let now = Utc::now();
        let later = now + Duration::minutes(11);
        assert_eq!(validate_claims(&claims(now), later), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_claims_are_rejected() {
        let now = Utc::now();
        let earlier = now - Duration::minutes(1);
        assert_eq!(
            validate_claims(&claims(now), earlier),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let mut c = claims(now);
        c.exp = c.iat;
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
