use serde::{Deserialize, Serialize};

use bazaar_core::AccountId;

use crate::{JwtClaims, Role};

/// Identity of an authenticated caller, decoded from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: AccountId,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: AccountId, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
        }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}
