//! Authentication and authorization boundary.
//!
//! Knows nothing about HTTP or storage. It mints and verifies bearer tokens
//! and checks a caller's role; bcrypt hashing lives in [`password`].

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator, TokenIssuer};
pub use password::{BcryptHasher, PasswordError, PasswordHasher};
pub use principal::Principal;
pub use roles::Role;
