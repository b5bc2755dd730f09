use chrono::Utc;
use tracing::{info, instrument};

use bazaar_auth::{Principal, Role};
use bazaar_core::{StoreId, WarehouseId};
use bazaar_stores::{NewStore, Store, StoreUpdate};

use super::{ServiceError, ServiceResult, Services, require};

impl Services {
    #[instrument(skip(self, principal, input), fields(seller_id = %input.seller_id, warehouse_id = %input.warehouse_id), err)]
    pub async fn create_store(&self, principal: &Principal, input: NewStore) -> ServiceResult<Store> {
        require(principal, &[Role::OperationalGuy])?;
        self.warehouse(input.warehouse_id).await?;

        let seller = self
            .store
            .account(input.seller_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("seller"))?;
        if seller.role() != Role::Seller {
            return Err(ServiceError::Validation("sellerId does not belong to a seller".to_string()));
        }

        let store = input.into_store(Utc::now())?;
        self.store.insert_store(&store).await?;
        info!(store_id = %store.store_id, "store created");
        Ok(store)
    }

    pub async fn store(&self, id: StoreId) -> ServiceResult<Store> {
        self.store
            .store(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("store"))
    }

    pub async fn my_store(&self, principal: &Principal) -> ServiceResult<Store> {
        require(principal, &[Role::Seller])?;
        self.store
            .store_by_seller(principal.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("store"))
    }

    pub async fn stores_in_warehouse(&self, warehouse_id: WarehouseId) -> ServiceResult<Vec<Store>> {
        self.warehouse(warehouse_id).await?;
        Ok(self.store.stores_by_warehouse(warehouse_id).await?)
    }

    /// Partial update. The rack invariant is checked here against the loaded
    /// store and again by the repository as part of the write.
    #[instrument(skip(self, principal, update), err)]
    pub async fn update_store(
        &self,
        principal: &Principal,
        id: StoreId,
        update: StoreUpdate,
    ) -> ServiceResult<Store> {
        require(principal, &[Role::OperationalGuy])?;
        let current = self.store(id).await?;
        update.validate_against(&current)?;

        let store = self.store.update_store(id, &update, Utc::now()).await?;
        info!("store updated");
        Ok(store)
    }

    #[instrument(skip(self, principal), err)]
    pub async fn update_store_racks(
        &self,
        principal: &Principal,
        id: StoreId,
        occupied_racks: i64,
    ) -> ServiceResult<Store> {
        require(principal, &[Role::Seller, Role::OperationalGuy])?;
        let current = self.store(id).await?;
        if principal.is(Role::Seller) && current.seller_id != principal.user_id {
            return Err(ServiceError::Forbidden("store belongs to another seller".to_string()));
        }

        let update = StoreUpdate::racks(occupied_racks);
        update.validate_against(&current)?;
        let store = self.store.update_store(id, &update, Utc::now()).await?;
        info!(occupied_racks, free_racks = store.free_racks(), "store racks updated");
        Ok(store)
    }

    #[instrument(skip(self, principal), err)]
    pub async fn delete_store(&self, principal: &Principal, id: StoreId) -> ServiceResult<()> {
        require(principal, &[Role::OperationalGuy])?;
        self.store.delete_store(id).await?;
        info!("store deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::AccountId;
    use bazaar_stores::{Coordinates, NewWarehouse};

    use crate::services::OnboardSeller;
    use crate::services::testing::{principal, services};

    struct Fixture {
        svc: Services,
        ops: Principal,
        seller: Principal,
        warehouse_id: WarehouseId,
    }

    async fn fixture() -> Fixture {
        let svc = services();
        let ops = principal(Role::OperationalGuy);
        let warehouse = svc
            .create_warehouse(
                &ops,
                NewWarehouse {
                    name: "North Hub".to_string(),
                    address: "Plot 7".to_string(),
                    coordinates: Coordinates {
                        latitude: 28.6,
                        longitude: 77.2,
                    },
                    storage_capacity: 100,
                },
            )
            .await
            .unwrap();
        let seller = svc
            .onboard_seller(
                &ops,
                OnboardSeller {
                    email: "kiran@example.com".to_string(),
                    password: "initial-pass".to_string(),
                    name: "Kiran".to_string(),
                    phone: None,
                    business_name: None,
                    gstin: None,
                },
            )
            .await
            .unwrap()
            .principal();
        Fixture {
            svc,
            ops,
            seller,
            warehouse_id: warehouse.id,
        }
    }

    fn new_store(f: &Fixture, total: i64, occupied: i64) -> NewStore {
        NewStore {
            seller_id: f.seller.user_id,
            warehouse_id: f.warehouse_id,
            name: "Fresh Mart".to_string(),
            address: "Bay 4".to_string(),
            contact: None,
            number_of_racks: total,
            occupied_racks: occupied,
        }
    }

    #[tokio::test]
    async fn one_store_per_seller() {
        let f = fixture().await;
        let store = f.svc.create_store(&f.ops, new_store(&f, 10, 2)).await.unwrap();
        assert_eq!(f.svc.my_store(&f.seller).await.unwrap(), store);

        let err = f.svc.create_store(&f.ops, new_store(&f, 5, 0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let listed = f.svc.stores_in_warehouse(f.warehouse_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn store_needs_known_warehouse_and_seller() {
        let f = fixture().await;
        let mut input = new_store(&f, 10, 0);
        input.warehouse_id = WarehouseId::new();
        assert_eq!(
            f.svc.create_store(&f.ops, input).await.unwrap_err(),
            ServiceError::not_found("warehouse")
        );

        let mut input = new_store(&f, 10, 0);
        input.seller_id = AccountId::new();
        assert_eq!(
            f.svc.create_store(&f.ops, input).await.unwrap_err(),
            ServiceError::not_found("seller")
        );

        let err = f.svc.create_store(&f.seller, new_store(&f, 10, 0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rack_updates_respect_the_total() {
        let f = fixture().await;
        let store = f.svc.create_store(&f.ops, new_store(&f, 10, 2)).await.unwrap();

        let err = f
            .svc
            .update_store_racks(&f.seller, store.store_id, 11)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = f
            .svc
            .update_store_racks(&f.seller, store.store_id, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let updated = f.svc.update_store_racks(&f.seller, store.store_id, 10).await.unwrap();
        assert_eq!(updated.occupied_racks, 10);
        assert!(updated.updated_at >= store.updated_at);

        let other_seller = principal(Role::Seller);
        let err = f
            .svc
            .update_store_racks(&other_seller, store.store_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn partial_update_checks_against_same_request_total() {
        let f = fixture().await;
        let store = f.svc.create_store(&f.ops, new_store(&f, 10, 8)).await.unwrap();

        let shrink = StoreUpdate {
            number_of_racks: Some(5),
            ..StoreUpdate::default()
        };
        let err = f.svc.update_store(&f.ops, store.store_id, shrink).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let grow = StoreUpdate {
            name: Some("Fresh Mart Express".to_string()),
            number_of_racks: Some(20),
            occupied_racks: Some(15),
            ..StoreUpdate::default()
        };
        let updated = f.svc.update_store(&f.ops, store.store_id, grow).await.unwrap();
        assert_eq!((updated.number_of_racks, updated.occupied_racks), (20, 15));
        assert_eq!(updated.name, "Fresh Mart Express");
        assert_eq!(updated.address, "Bay 4");
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let f = fixture().await;
        let store = f.svc.create_store(&f.ops, new_store(&f, 10, 0)).await.unwrap();
        f.svc.delete_store(&f.ops, store.store_id).await.unwrap();
        assert_eq!(
            f.svc.store(store.store_id).await.unwrap_err(),
            ServiceError::not_found("store")
        );
        assert!(matches!(
            f.svc.delete_store(&f.ops, store.store_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
