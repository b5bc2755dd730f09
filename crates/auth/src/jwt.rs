//! HS256 bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, Principal, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("malformed or unsigned token: {0}")]
    Decode(String),

    #[error("failed to sign token: {0}")]
    Encode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Mints bearer tokens for authenticated principals.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, JwtError>;
}

/// Shared-secret HS256 implementation of both token seams.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // The time window is checked against the injected `now` below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| JwtError::Decode(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl TokenIssuer for Hs256Jwt {
    fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = JwtClaims::for_principal(principal, now, self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use bazaar_core::AccountId;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new("test-secret", Duration::minutes(30))
    }

    #[test]
    fn issued_token_validates_and_carries_identity() {
        let principal = Principal::new(AccountId::new(), "Ravi", Role::Customer);
        let now = Utc::now();
        let token = jwt().issue(&principal, now).unwrap();

        let claims = jwt().validate(&token, now).unwrap();
        assert_eq!(Principal::from(claims), principal);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let principal = Principal::new(AccountId::new(), "Ravi", Role::Customer);
        let now = Utc::now();
        let token = Hs256Jwt::new("other-secret", Duration::minutes(30))
            .issue(&principal, now)
            .unwrap();

        assert!(matches!(jwt().validate(&token, now), Err(JwtError::Decode(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let principal = Principal::new(AccountId::new(), "Ravi", Role::Customer);
        let now = Utc::now();
        let token = jwt().issue(&principal, now).unwrap();

        let err = jwt().validate(&token, now + Duration::hours(1)).unwrap_err();
        assert_eq!(err, JwtError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(jwt().validate("not.a.jwt", Utc::now()), Err(JwtError::Decode(_))));
    }
}
