use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use bazaar_accounts::{Account, NewAccount, Profile, normalize_email};
use bazaar_auth::{Principal, Role};

use super::{ServiceError, ServiceResult, Services, require};
use crate::config::BootstrapAdmin;

/// Customer self-registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Seller account created by operational staff.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardSeller {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub business_name: Option<String>,
    pub gstin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub is_first_login: bool,
    pub account: Account,
}

impl Services {
    async fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {e}")))?
            .map_err(ServiceError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {e}")))?
            .map_err(ServiceError::from)
    }

    async fn create_account(
        &self,
        input: NewAccount,
        password: &str,
        is_first_login: bool,
    ) -> ServiceResult<Account> {
        let hash = self.hash_password(password).await?;
        let account = input.into_account(hash, is_first_login, Utc::now())?;
        self.store.insert_account(&account).await?;
        info!(account_id = %account.id, role = %account.role(), "account created");
        Ok(account)
    }

    #[instrument(skip(self, req), err)]
    pub async fn sign_up(&self, req: SignUp) -> ServiceResult<Account> {
        let input = NewAccount {
            email: req.email,
            name: req.name,
            phone: req.phone,
            profile: Profile::Customer {
                address: req.address,
            },
        };
        self.create_account(input, &req.password, false).await
    }

    #[instrument(skip(self, req), fields(operator = %principal.user_id), err)]
    pub async fn onboard_seller(
        &self,
        principal: &Principal,
        req: OnboardSeller,
    ) -> ServiceResult<Account> {
        require(principal, &[Role::OperationalGuy])?;
        let input = NewAccount {
            email: req.email,
            name: req.name,
            phone: req.phone,
            profile: Profile::Seller {
                business_name: req.business_name,
                gstin: req.gstin,
            },
        };
        self.create_account(input, &req.password, true).await
    }

    /// Create the configured operational account unless it already exists.
    ///
    /// Returns whether an account was created.
    #[instrument(skip(self, admin), fields(email = %admin.email), err)]
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<bool> {
        let email = normalize_email(&admin.email)?;
        if self
            .store
            .account_by_email(Role::OperationalGuy, &email)
            .await?
            .is_some()
        {
            info!("bootstrap admin already exists");
            return Ok(false);
        }

        let input = NewAccount {
            email,
            name: admin.name.clone(),
            phone: None,
            profile: Profile::OperationalGuy { employee_code: None },
        };
        match self.create_account(input, &admin.password, false).await {
            Ok(_) => Ok(true),
            // Another instance won the race.
            Err(ServiceError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, email, password), err)]
    pub async fn login(&self, role: Role, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let email = normalize_email(email).map_err(|_| ServiceError::invalid_credentials())?;
        let Some(account) = self.store.account_by_email(role, &email).await? else {
            warn!("login for unknown account");
            return Err(ServiceError::invalid_credentials());
        };
        if !self.verify_password(password, &account.password_hash).await? {
            warn!(account_id = %account.id, "login with wrong password");
            return Err(ServiceError::invalid_credentials());
        }

        let token = self.tokens.issue(&account.principal(), Utc::now())?;
        info!(account_id = %account.id, "login succeeded");
        Ok(LoginOutcome {
            token,
            is_first_login: account.is_first_login,
            account,
        })
    }

    #[instrument(skip(self, current, new), fields(account_id = %principal.user_id), err)]
    pub async fn change_password(
        &self,
        principal: &Principal,
        current: &str,
        new: &str,
    ) -> ServiceResult<()> {
        let account = self.profile(principal).await?;
        if !self.verify_password(current, &account.password_hash).await? {
            return Err(ServiceError::Unauthorized("current password is incorrect".to_string()));
        }
        let hash = self.hash_password(new).await?;
        self.store.update_password(account.id, &hash, Utc::now()).await?;
        info!("password changed");
        Ok(())
    }

    pub async fn profile(&self, principal: &Principal) -> ServiceResult<Account> {
        self.store
            .account(principal.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("account"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{principal, services};

    fn sign_up(email: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "correct horse".to_string(),
            name: "Ravi".to_string(),
            phone: None,
            address: Some("12 MG Road".to_string()),
        }
    }

    #[tokio::test]
    async fn sign_up_then_login_issues_token() {
        let svc = services();
        svc.sign_up(sign_up("Ravi@Example.com")).await.unwrap();

        let outcome = svc
            .login(Role::Customer, " ravi@example.com ", "correct horse")
            .await
            .unwrap();
        assert!(!outcome.token.is_empty());
        assert!(!outcome.is_first_login);
        assert_eq!(outcome.account.email, "ravi@example.com");
    }

    #[tokio::test]
    async fn wrong_password_and_wrong_role_are_unauthorized() {
        let svc = services();
        svc.sign_up(sign_up("ravi@example.com")).await.unwrap();

        let err = svc.login(Role::Customer, "ravi@example.com", "battery staple").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = svc.login(Role::Seller, "ravi@example.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_for_same_role_conflicts() {
        let svc = services();
        svc.sign_up(sign_up("ravi@example.com")).await.unwrap();
        let err = svc.sign_up(sign_up("RAVI@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_is_a_validation_error() {
        let svc = services();
        let mut req = sign_up("ravi@example.com");
        req.password = "short".to_string();
        assert!(matches!(svc.sign_up(req).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn onboarded_seller_must_change_password() {
        let svc = services();
        let ops = principal(Role::OperationalGuy);
        let req = OnboardSeller {
            email: "kiran@example.com".to_string(),
            password: "initial-pass".to_string(),
            name: "Kiran".to_string(),
            phone: None,
            business_name: Some("Kiran Traders".to_string()),
            gstin: None,
        };

        let err = svc
            .onboard_seller(&principal(Role::Customer), req.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let seller = svc.onboard_seller(&ops, req).await.unwrap();
        assert!(seller.is_first_login);

        let outcome = svc.login(Role::Seller, "kiran@example.com", "initial-pass").await.unwrap();
        assert!(outcome.is_first_login);

        let me = seller.principal();
        svc.change_password(&me, "initial-pass", "a-better-pass").await.unwrap();
        let outcome = svc.login(Role::Seller, "kiran@example.com", "a-better-pass").await.unwrap();
        assert!(!outcome.is_first_login);

        let err = svc.change_password(&me, "initial-pass", "whatever-else").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let svc = services();
        let admin = BootstrapAdmin {
            email: "ops@example.com".to_string(),
            password: "change-me-now".to_string(),
            name: "Operations".to_string(),
        };
        assert!(svc.bootstrap_admin(&admin).await.unwrap());
        assert!(!svc.bootstrap_admin(&admin).await.unwrap());
        svc.login(Role::OperationalGuy, "ops@example.com", "change-me-now").await.unwrap();
    }
}
