use chrono::Utc;
use tracing::{info, instrument};

use bazaar_auth::{Principal, Role};
use bazaar_core::{Page, PageRequest, WarehouseId};
use bazaar_stores::{NewWarehouse, Warehouse, WarehouseUpdate};

use super::{ServiceError, ServiceResult, Services, require};

impl Services {
    /// The caller is recorded as the warehouse's operator.
    #[instrument(skip(self, principal, input), fields(operator = %principal.user_id), err)]
    pub async fn create_warehouse(
        &self,
        principal: &Principal,
        input: NewWarehouse,
    ) -> ServiceResult<Warehouse> {
        require(principal, &[Role::OperationalGuy])?;
        let warehouse = input.into_warehouse(principal.user_id, Utc::now())?;
        self.store.insert_warehouse(&warehouse).await?;
        info!(warehouse_id = %warehouse.id, "warehouse created");
        Ok(warehouse)
    }

    pub async fn warehouse(&self, id: WarehouseId) -> ServiceResult<Warehouse> {
        self.store
            .warehouse(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("warehouse"))
    }

    pub async fn warehouses(&self, page: PageRequest) -> ServiceResult<Page<Warehouse>> {
        Ok(self.store.warehouses(page).await?)
    }

    #[instrument(skip(self, principal, update), err)]
    pub async fn update_warehouse(
        &self,
        principal: &Principal,
        id: WarehouseId,
        update: WarehouseUpdate,
    ) -> ServiceResult<Warehouse> {
        require(principal, &[Role::OperationalGuy])?;
        update.validate()?;
        let mut warehouse = self.warehouse(id).await?;
        update.apply(&mut warehouse, Utc::now())?;
        self.store.save_warehouse(&warehouse).await?;
        info!("warehouse updated");
        Ok(warehouse)
    }

    #[instrument(skip(self, principal), err)]
    pub async fn delete_warehouse(&self, principal: &Principal, id: WarehouseId) -> ServiceResult<()> {
        require(principal, &[Role::OperationalGuy])?;
        self.store.delete_warehouse(id).await?;
        info!("warehouse deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_stores::Coordinates;

    use crate::services::testing::{principal, services};

    fn input(name: &str) -> NewWarehouse {
        NewWarehouse {
            name: name.to_string(),
            address: "Plot 7".to_string(),
            coordinates: Coordinates {
                latitude: 12.97,
                longitude: 77.59,
            },
            storage_capacity: 250,
        }
    }

    #[tokio::test]
    async fn create_list_update_delete() {
        let svc = services();
        let ops = principal(Role::OperationalGuy);

        let south = svc.create_warehouse(&ops, input("South Hub")).await.unwrap();
        svc.create_warehouse(&ops, input("North Hub")).await.unwrap();
        assert_eq!(south.operational_guy_id, ops.user_id);

        let page = svc.warehouses(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].name, "North Hub");

        let update = WarehouseUpdate {
            storage_capacity: Some(400),
            ..WarehouseUpdate::default()
        };
        let updated = svc.update_warehouse(&ops, south.id, update).await.unwrap();
        assert_eq!(updated.storage_capacity, 400);
        assert_eq!(svc.warehouse(south.id).await.unwrap().storage_capacity, 400);

        svc.delete_warehouse(&ops, south.id).await.unwrap();
        assert_eq!(
            svc.warehouse(south.id).await.unwrap_err(),
            ServiceError::not_found("warehouse")
        );
    }

    #[tokio::test]
    async fn only_operations_can_write() {
        let svc = services();
        let err = svc
            .create_warehouse(&principal(Role::Seller), input("Hub"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let svc = services();
        let mut bad = input("Hub");
        bad.coordinates.latitude = 120.0;
        let err = svc
            .create_warehouse(&principal(Role::OperationalGuy), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
