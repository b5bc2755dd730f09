use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use bazaar_auth::{Principal, Role};
use bazaar_core::{AccountId, InventoryId, InventoryProductId, Page, ProductId};
use bazaar_inventory::{
    Inventory, InventoryItemDetail, InventoryProduct, InventoryProductUpdate, InventoryQuery,
    InventoryView, NewInventoryLine,
};

use super::{ServiceError, ServiceResult, Services, require};
use crate::repository::RepositoryError;

/// Result of adding products: the (possibly new) header and the created lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdded {
    pub inventory: Inventory,
    pub products: Vec<InventoryProduct>,
}

impl Services {
    /// Resolve MRPs for the requested catalog products; every one must exist.
    async fn catalog_prices(&self, lines: &[NewInventoryLine]) -> ServiceResult<HashMap<ProductId, i64>> {
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let found: HashMap<ProductId, i64> = self
            .store
            .metadata_many(&ids)
            .await?
            .into_iter()
            .map(|m| (m.product_id, m.mrp))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(ServiceError::NotFound(format!("metadata {missing}")));
        }
        Ok(found)
    }

    fn build_lines(
        inventory_id: InventoryId,
        lines: Vec<NewInventoryLine>,
        prices: &HashMap<ProductId, i64>,
    ) -> ServiceResult<Vec<InventoryProduct>> {
        let now = Utc::now();
        lines
            .into_iter()
            .map(|line| {
                let mrp = prices.get(&line.product_id).copied().unwrap_or_default();
                line.into_product(inventory_id, mrp, now).map_err(ServiceError::from)
            })
            .collect()
    }

    /// Add catalog products to the caller's inventory, creating the inventory
    /// on first use. New lines start hidden with zero stock.
    #[instrument(skip(self, principal, lines), fields(seller_id = %principal.user_id, line_count = lines.len()), err)]
    pub async fn add_inventory(
        &self,
        principal: &Principal,
        lines: Vec<NewInventoryLine>,
    ) -> ServiceResult<InventoryAdded> {
        require(principal, &[Role::Seller])?;
        if lines.is_empty() {
            return Err(ServiceError::Validation("products cannot be empty".to_string()));
        }
        let prices = self.catalog_prices(&lines).await?;
        let seller_id = principal.user_id;

        if let Some(inventory) = self.store.inventory_by_seller(seller_id).await? {
            let products = Self::build_lines(inventory.inventory_id, lines, &prices)?;
            self.store.insert_products(inventory.inventory_id, &products).await?;
            info!(inventory_id = %inventory.inventory_id, "inventory lines added");
            return Ok(InventoryAdded { inventory, products });
        }

        let store = self.store.store_by_seller(seller_id).await?.ok_or_else(|| {
            ServiceError::Validation("seller has no store assigned".to_string())
        })?;
        let inventory = Inventory::new(seller_id, store.store_id, Utc::now());
        let products = Self::build_lines(inventory.inventory_id, lines.clone(), &prices)?;

        match self.store.create_inventory(&inventory, &products).await {
            Ok(()) => {
                info!(inventory_id = %inventory.inventory_id, "inventory created");
                Ok(InventoryAdded { inventory, products })
            }
            Err(RepositoryError::Conflict(_)) => {
                // A concurrent request created the header first; append to it.
                warn!("inventory created concurrently, appending lines");
                let inventory = self
                    .store
                    .inventory_by_seller(seller_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("inventory"))?;
                let products = Self::build_lines(inventory.inventory_id, lines, &prices)?;
                self.store.insert_products(inventory.inventory_id, &products).await?;
                Ok(InventoryAdded { inventory, products })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Paginated, searchable view of one seller's inventory.
    ///
    /// Sellers always see their own; operational staff name the seller.
    #[instrument(skip(self, principal, query), fields(caller = %principal.user_id), err)]
    pub async fn inventory_view(
        &self,
        principal: &Principal,
        seller_id: Option<AccountId>,
        query: InventoryQuery,
    ) -> ServiceResult<Page<InventoryView>> {
        require(principal, &[Role::Seller, Role::OperationalGuy])?;
        let seller_id = match principal.role {
            Role::Seller => principal.user_id,
            _ => seller_id.ok_or_else(|| ServiceError::Validation("sellerId is required".to_string()))?,
        };

        let inventory = self
            .store
            .inventory_by_seller(seller_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory"))?;
        Ok(self.store.list_view(&inventory, &query).await?)
    }

    async fn owned_inventory(
        &self,
        principal: &Principal,
        inventory_id: InventoryId,
    ) -> ServiceResult<Inventory> {
        let inventory = self
            .store
            .inventory(inventory_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory"))?;
        if principal.is(Role::Seller) && inventory.seller_id != principal.user_id {
            return Err(ServiceError::Forbidden("inventory belongs to another seller".to_string()));
        }
        Ok(inventory)
    }

    #[instrument(skip(self, principal, update), err)]
    pub async fn update_inventory_product(
        &self,
        principal: &Principal,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
        update: InventoryProductUpdate,
    ) -> ServiceResult<InventoryProduct> {
        require(principal, &[Role::Seller])?;
        update.validate()?;
        self.owned_inventory(principal, inventory_id).await?;

        let mut product = self
            .store
            .product(inventory_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory product"))?;
        update.apply(&mut product, Utc::now())?;
        self.store.save_product(&product).await?;
        info!("inventory line updated");
        Ok(product)
    }

    /// Remove a line item. Removing one that does not exist succeeds.
    #[instrument(skip(self, principal), err)]
    pub async fn delete_inventory_product(
        &self,
        principal: &Principal,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> ServiceResult<()> {
        require(principal, &[Role::Seller])?;
        match self.owned_inventory(principal, inventory_id).await {
            Ok(_) | Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let removed = self.store.delete_product(inventory_id, product_id).await?;
        info!(removed, "inventory line delete");
        Ok(())
    }

    /// Inventory → line item → catalog metadata.
    pub async fn inventory_item(
        &self,
        principal: &Principal,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> ServiceResult<InventoryItemDetail> {
        require(principal, &[Role::Seller, Role::OperationalGuy])?;
        let inventory = self.owned_inventory(principal, inventory_id).await?;
        let product = self
            .store
            .product(inventory_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory product"))?;
        let metadata = self
            .store
            .metadata(product.metadata_product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("metadata"))?;

        Ok(InventoryItemDetail {
            seller_id: inventory.seller_id,
            store_id: inventory.store_id,
            product,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{PageRequest, WarehouseId};
    use bazaar_inventory::InventorySort;
    use bazaar_stores::NewStore;

    use crate::services::catalog::tests::{product, seed_taxonomy};
    use crate::services::testing::{principal, services};

    async fn seller_with_store(svc: &Services) -> Principal {
        let seller = principal(Role::Seller);
        let store = NewStore {
            seller_id: seller.user_id,
            warehouse_id: WarehouseId::new(),
            name: "Fresh Mart".to_string(),
            address: "Bay 4".to_string(),
            contact: None,
            number_of_racks: 10,
            occupied_racks: 0,
        }
        .into_store(Utc::now())
        .unwrap();
        svc.store.insert_store(&store).await.unwrap();
        seller
    }

    async fn two_products(svc: &Services) -> (ProductId, ProductId) {
        let (c, s) = seed_taxonomy(svc).await;
        let ops = principal(Role::OperationalGuy);
        let a = svc
            .create_metadata(&ops, product(&c, &s, "1006", "Basmati Rice", 900))
            .await
            .unwrap();
        let b = svc
            .create_metadata(&ops, product(&c, &s, "1007", "Brown Rice", 400))
            .await
            .unwrap();
        (a.metadata.product_id, b.metadata.product_id)
    }

    fn line(product_id: ProductId) -> NewInventoryLine {
        NewInventoryLine {
            product_id,
            price: None,
        }
    }

    #[tokio::test]
    async fn first_add_creates_inventory_and_lists_two_items() {
        let svc = services();
        let seller = seller_with_store(&svc).await;
        let (a, b) = two_products(&svc).await;

        let added = svc.add_inventory(&seller, vec![line(a), line(b)]).await.unwrap();
        assert_eq!(added.inventory.seller_id, seller.user_id);
        assert!(added.products.iter().all(|p| !p.visibility && p.quantity == 0));

        let query = InventoryQuery {
            page: PageRequest::new(0, 10),
            ..InventoryQuery::default()
        };
        let page = svc.inventory_view(&seller, None, query).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages(), 1);
    }

    #[tokio::test]
    async fn second_add_reuses_the_inventory() {
        let svc = services();
        let seller = seller_with_store(&svc).await;
        let (a, b) = two_products(&svc).await;

        let first = svc.add_inventory(&seller, vec![line(a)]).await.unwrap();
        let second = svc.add_inventory(&seller, vec![line(b)]).await.unwrap();
        assert_eq!(first.inventory.inventory_id, second.inventory.inventory_id);

        let query = InventoryQuery {
            sort: InventorySort::MrpAsc,
            ..InventoryQuery::default()
        };
        let page = svc.inventory_view(&seller, None, query).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Brown Rice", "Basmati Rice"]);
    }

    #[tokio::test]
    async fn add_requires_store_products_and_known_metadata() {
        let svc = services();
        let (a, _) = two_products(&svc).await;

        let storeless = principal(Role::Seller);
        let err = svc.add_inventory(&storeless, vec![line(a)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let seller = seller_with_store(&svc).await;
        let err = svc.add_inventory(&seller, vec![]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc.add_inventory(&seller, vec![line(ProductId::new())]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn view_for_unknown_seller_is_not_found() {
        let svc = services();
        let ops = principal(Role::OperationalGuy);
        let err = svc
            .inventory_view(&ops, Some(AccountId::new()), InventoryQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::not_found("inventory"));

        let err = svc
            .inventory_view(&ops, None, InventoryQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_get_and_idempotent_delete() {
        let svc = services();
        let seller = seller_with_store(&svc).await;
        let (a, _) = two_products(&svc).await;
        let added = svc.add_inventory(&seller, vec![line(a)]).await.unwrap();
        let inventory_id = added.inventory.inventory_id;
        let line_id = added.products[0].inventory_product_id;

        let update = InventoryProductUpdate {
            visibility: Some(true),
            quantity: Some(25),
            ..InventoryProductUpdate::default()
        };
        let updated = svc
            .update_inventory_product(&seller, inventory_id, line_id, update)
            .await
            .unwrap();
        assert_eq!(updated.quantity, 25);

        let detail = svc.inventory_item(&seller, inventory_id, line_id).await.unwrap();
        assert!(detail.product.visibility);
        assert_eq!(detail.metadata.product_id, a);

        // A line id from another inventory pair does not resolve.
        let err = svc
            .inventory_item(&seller, inventory_id, InventoryProductId::new())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::not_found("inventory product"));

        svc.delete_inventory_product(&seller, inventory_id, line_id).await.unwrap();
        svc.delete_inventory_product(&seller, inventory_id, line_id).await.unwrap();
        svc.delete_inventory_product(&seller, InventoryId::new(), line_id).await.unwrap();
        assert!(svc.inventory_item(&seller, inventory_id, line_id).await.is_err());
    }

    #[tokio::test]
    async fn other_sellers_cannot_touch_the_inventory() {
        let svc = services();
        let seller = seller_with_store(&svc).await;
        let intruder = seller_with_store(&svc).await;
        let (a, _) = two_products(&svc).await;
        let added = svc.add_inventory(&seller, vec![line(a)]).await.unwrap();
        let inventory_id = added.inventory.inventory_id;
        let line_id = added.products[0].inventory_product_id;

        let update = InventoryProductUpdate {
            quantity: Some(1),
            ..InventoryProductUpdate::default()
        };
        let err = svc
            .update_inventory_product(&intruder, inventory_id, line_id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = svc
            .delete_inventory_product(&intruder, inventory_id, line_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
