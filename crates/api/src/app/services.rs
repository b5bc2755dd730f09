use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use bazaar_auth::{BcryptHasher, Hs256Jwt};
use bazaar_infra::repository::{InMemoryStore, MarketplaceStore, PostgresStore};
use bazaar_infra::{AppConfig, Services, StorageConfig};

/// Services plus the token service, which the auth middleware shares.
pub struct Wiring {
    pub services: Arc<Services>,
    pub jwt: Arc<Hs256Jwt>,
}

/// Build the services for `cfg`, connecting and migrating Postgres when
/// persistent stores are enabled.
pub async fn build_services(cfg: &AppConfig) -> anyhow::Result<Wiring> {
    let store: Arc<dyn MarketplaceStore> = match &cfg.storage {
        StorageConfig::InMemory => {
            info!("using in-memory stores");
            Arc::new(InMemoryStore::new())
        }
        StorageConfig::Postgres { database_url } => {
            let pg = PostgresStore::connect(database_url)
                .await
                .context("connecting to postgres")?;
            info!("using postgres stores");
            Arc::new(pg)
        }
    };

    let jwt = Arc::new(Hs256Jwt::new(cfg.jwt_secret.as_bytes(), cfg.token_ttl()));
    let services = Services::new(store, Arc::new(BcryptHasher::new(cfg.bcrypt_cost)), jwt.clone());

    if let Some(admin) = &cfg.bootstrap_admin {
        let created = services
            .bootstrap_admin(admin)
            .await
            .context("creating bootstrap operational account")?;
        if created {
            info!(email = %admin.email, "bootstrap operational account created");
        }
    }

    Ok(Wiring {
        services: Arc::new(services),
        jwt,
    })
}
