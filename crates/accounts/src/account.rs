use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_auth::{Principal, Role};
use bazaar_core::{AccountId, DomainError, DomainResult, error::require_non_blank};

/// Role-specific profile fields.
///
/// The variant *is* the account's role; there is no separate role column to
/// drift out of sync with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    #[serde(rename_all = "camelCase")]
    Seller {
        business_name: Option<String>,
        gstin: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Customer { address: Option<String> },
    #[serde(rename_all = "camelCase")]
    OperationalGuy { employee_code: Option<String> },
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Seller { .. } => Role::Seller,
            Profile::Customer { .. } => Role::Customer,
            Profile::OperationalGuy { .. } => Role::OperationalGuy,
        }
    }
}

/// A persisted account.
///
/// The password hash never leaves the process: it is skipped on serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
    pub is_first_login: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.name.clone(), self.role())
    }
}

/// Input for creating an account (sign-up, onboarding, bootstrap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub profile: Profile,
}

impl NewAccount {
    /// Validate and normalize, then stamp identity and timestamps.
    ///
    /// `is_first_login` is true for accounts created on someone's behalf
    /// (onboarded sellers), false for self-registration.
    pub fn into_account(
        self,
        password_hash: String,
        is_first_login: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Account> {
        require_non_blank("name", &self.name)?;
        let email = normalize_email(&self.email)?;

        Ok(Account {
            id: AccountId::new(),
            email,
            password_hash,
            name: self.name.trim().to_string(),
            phone: self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            profile: self.profile,
            is_first_login,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Trim + lowercase, and reject obviously malformed addresses.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email is not a valid address"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller_input(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            name: "  Kiran Traders ".to_string(),
            phone: Some("   ".to_string()),
            profile: Profile::Seller {
                business_name: Some("Kiran Traders".to_string()),
                gstin: None,
            },
        }
    }

    #[test]
    fn into_account_normalizes_fields() {
        let account = seller_input(" Kiran@Example.COM ")
            .into_account("hash".to_string(), true, Utc::now())
            .unwrap();

        assert_eq!(account.email, "kiran@example.com");
        assert_eq!(account.name, "Kiran Traders");
        assert_eq!(account.phone, None);
        assert_eq!(account.role(), Role::Seller);
        assert!(account.is_first_login);
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "no-at-sign", "@example.com", "a@nodot", "a b@example.com", "a@.com"] {
            let err = seller_input(bad)
                .into_account("hash".to_string(), false, Utc::now())
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn serialization_hides_password_hash_and_tags_role() {
        let account = seller_input("kiran@example.com")
            .into_account("secret-hash".to_string(), false, Utc::now())
            .unwrap();
        let json = serde_json::to_value(&account).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "seller");
        assert_eq!(json["businessName"], "Kiran Traders");
        assert_eq!(json["isFirstLogin"], false);
    }

    #[test]
    fn principal_carries_role_from_profile() {
        let account = NewAccount {
            email: "ops@example.com".to_string(),
            name: "Ops".to_string(),
            phone: None,
            profile: Profile::OperationalGuy { employee_code: None },
        }
        .into_account("hash".to_string(), false, Utc::now())
        .unwrap();

        let principal = account.principal();
        assert_eq!(principal.role, Role::OperationalGuy);
        assert_eq!(principal.user_id, account.id);
    }
}
