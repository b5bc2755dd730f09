use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_accounts::Account;
use bazaar_auth::Role;
use bazaar_catalog::{Category, Metadata, MetadataFilter, Rating, Review, Subcategory};
use bazaar_core::{
    AccountId, CategoryId, DomainError, InventoryId, InventoryProductId, OrderId, Page,
    PageRequest, ProductId, StoreId, SubcategoryId, WarehouseId,
};
use bazaar_inventory::{Inventory, InventoryProduct, InventoryQuery, InventoryView, assemble_page};
use bazaar_orders::{Order, OrderWithProducts, OrderedItem, group_by_order};
use bazaar_stores::{Store, StoreUpdate, Warehouse};

use super::{
    AccountRepository, CatalogRepository, InventoryRepository, OrderRepository, RepoResult,
    RepositoryError, StoreRepository, WarehouseRepository,
};

#[derive(Debug, Default)]
struct Collections {
    accounts: HashMap<AccountId, Account>,
    account_emails: HashMap<(Role, String), AccountId>,

    categories: HashMap<CategoryId, Category>,
    subcategories: HashMap<SubcategoryId, Subcategory>,
    metadata: HashMap<ProductId, Metadata>,
    hsn_codes: HashMap<String, ProductId>,
    reviews: HashMap<ProductId, Review>,

    inventories: HashMap<InventoryId, Inventory>,
    inventory_by_seller: HashMap<AccountId, InventoryId>,
    inventory_products: HashMap<InventoryProductId, InventoryProduct>,

    orders: HashMap<OrderId, Order>,
    ordered_items: Vec<OrderedItem>,

    stores: HashMap<StoreId, Store>,
    store_by_seller: HashMap<AccountId, StoreId>,
    warehouses: HashMap<WarehouseId, Warehouse>,
}

impl Collections {
    /// Resolve one line item's metadata chain into a view row.
    fn join_view(&self, inventory: &Inventory, product: &InventoryProduct) -> RepoResult<InventoryView> {
        let metadata = self
            .metadata
            .get(&product.metadata_product_id)
            .ok_or_else(|| RepositoryError::dangling("metadata", product.metadata_product_id))?;
        let category = self
            .categories
            .get(&metadata.category_id)
            .ok_or_else(|| RepositoryError::dangling("categories", metadata.category_id))?;
        let subcategory = self
            .subcategories
            .get(&metadata.subcategory_id)
            .ok_or_else(|| RepositoryError::dangling("subcategories", metadata.subcategory_id))?;

        Ok(InventoryView::join(
            inventory,
            product,
            metadata,
            category,
            subcategory,
            self.reviews.get(&metadata.product_id),
        ))
    }

    fn items_for(&self, order_ids: &HashSet<OrderId>) -> Vec<OrderedItem> {
        self.ordered_items
            .iter()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect()
    }

    /// Headers newest first, children attached in one pass.
    fn with_items(&self, mut headers: Vec<Order>) -> Vec<OrderWithProducts> {
        sort_newest_first(&mut headers);
        let ids: HashSet<OrderId> = headers.iter().map(|o| o.order_id).collect();
        let items = self.items_for(&ids);
        group_by_order(headers, items)
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.ordered_at
            .cmp(&a.ordered_at)
            .then_with(|| b.order_id.cmp(&a.order_id))
    });
}

/// Process-local backend for development and tests.
///
/// All collections sit behind one `RwLock`; the lock is never held across an
/// `.await`, and each trait method takes it exactly once.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Collections>> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Collections>> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Backend("in-memory store lock poisoned".to_string()))
    }
}

fn guard_violation(err: DomainError) -> RepositoryError {
    match err {
        DomainError::Validation(msg) | DomainError::InvariantViolation(msg) => {
            RepositoryError::Invariant(msg)
        }
        other => RepositoryError::Invariant(other.to_string()),
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn insert_account(&self, account: &Account) -> RepoResult<()> {
        let mut c = self.write()?;
        let key = (account.role(), account.email.clone());
        if c.account_emails.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "a {} account with email {} already exists",
                account.role(),
                account.email
            )));
        }
        c.account_emails.insert(key, account.id);
        c.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account_by_email(&self, role: Role, email: &str) -> RepoResult<Option<Account>> {
        let c = self.read()?;
        Ok(c.account_emails
            .get(&(role, email.to_string()))
            .and_then(|id| c.accounts.get(id))
            .cloned())
    }

    async fn account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut c = self.write()?;
        let account = c
            .accounts
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound("account".to_string()))?;
        account.password_hash = password_hash.to_string();
        account.is_first_login = false;
        account.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn insert_category(&self, category: &Category) -> RepoResult<()> {
        self.write()?.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn categories(&self) -> RepoResult<Vec<Category>> {
        let mut all: Vec<Category> = self.read()?.categories.values().cloned().collect();
        all.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    }

    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn insert_subcategory(&self, subcategory: &Subcategory) -> RepoResult<()> {
        self.write()?
            .subcategories
            .insert(subcategory.id, subcategory.clone());
        Ok(())
    }

    async fn subcategories(&self, category_id: CategoryId) -> RepoResult<Vec<Subcategory>> {
        let mut all: Vec<Subcategory> = self
            .read()?
            .subcategories
            .values()
            .filter(|s| s.category_id == category_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    }

    async fn subcategory(&self, id: SubcategoryId) -> RepoResult<Option<Subcategory>> {
        Ok(self.read()?.subcategories.get(&id).cloned())
    }

    async fn insert_metadata(&self, metadata: &Metadata) -> RepoResult<()> {
        let mut c = self.write()?;
        if c.hsn_codes.contains_key(&metadata.hsn_code) {
            return Err(RepositoryError::Conflict(format!(
                "hsnCode {} already exists",
                metadata.hsn_code
            )));
        }
        c.hsn_codes.insert(metadata.hsn_code.clone(), metadata.product_id);
        c.metadata.insert(metadata.product_id, metadata.clone());
        c.reviews
            .insert(metadata.product_id, Review::empty(metadata.product_id));
        Ok(())
    }

    async fn metadata(&self, id: ProductId) -> RepoResult<Option<Metadata>> {
        Ok(self.read()?.metadata.get(&id).cloned())
    }

    async fn metadata_many(&self, ids: &[ProductId]) -> RepoResult<Vec<Metadata>> {
        let c = self.read()?;
        let unique: HashSet<&ProductId> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| c.metadata.get(id).cloned())
            .collect())
    }

    async fn list_metadata(
        &self,
        filter: &MetadataFilter,
        page: PageRequest,
    ) -> RepoResult<Page<Metadata>> {
        let mut matching: Vec<Metadata> = self
            .read()?
            .metadata
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        let total = matching.len() as u64;
        Ok(Page::new(page.slice(matching), total, page))
    }

    async fn save_metadata(&self, metadata: &Metadata) -> RepoResult<()> {
        let mut c = self.write()?;
        match c.metadata.get_mut(&metadata.product_id) {
            Some(existing) => {
                *existing = metadata.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound("metadata".to_string())),
        }
    }

    async fn review(&self, product_id: ProductId) -> RepoResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&product_id).cloned())
    }

    async fn add_review(&self, product_id: ProductId, rating: Rating) -> RepoResult<Review> {
        let mut c = self.write()?;
        if !c.metadata.contains_key(&product_id) {
            return Err(RepositoryError::NotFound("metadata".to_string()));
        }
        let review = c
            .reviews
            .entry(product_id)
            .or_insert_with(|| Review::empty(product_id));
        review.accumulate(rating);
        Ok(review.clone())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn inventory_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Inventory>> {
        let c = self.read()?;
        Ok(c.inventory_by_seller
            .get(&seller_id)
            .and_then(|id| c.inventories.get(id))
            .cloned())
    }

    async fn inventory(&self, id: InventoryId) -> RepoResult<Option<Inventory>> {
        Ok(self.read()?.inventories.get(&id).cloned())
    }

    async fn create_inventory(
        &self,
        inventory: &Inventory,
        products: &[InventoryProduct],
    ) -> RepoResult<()> {
        let mut c = self.write()?;
        if c.inventory_by_seller.contains_key(&inventory.seller_id) {
            return Err(RepositoryError::Conflict(
                "seller already has an inventory".to_string(),
            ));
        }
        c.inventory_by_seller
            .insert(inventory.seller_id, inventory.inventory_id);
        c.inventories
            .insert(inventory.inventory_id, inventory.clone());
        for product in products {
            c.inventory_products
                .insert(product.inventory_product_id, product.clone());
        }
        Ok(())
    }

    async fn insert_products(
        &self,
        inventory_id: InventoryId,
        products: &[InventoryProduct],
    ) -> RepoResult<()> {
        let mut c = self.write()?;
        if !c.inventories.contains_key(&inventory_id) {
            return Err(RepositoryError::NotFound("inventory".to_string()));
        }
        for product in products {
            c.inventory_products
                .insert(product.inventory_product_id, product.clone());
        }
        Ok(())
    }

    async fn product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<Option<InventoryProduct>> {
        Ok(self
            .read()?
            .inventory_products
            .get(&product_id)
            .filter(|p| p.inventory_id == inventory_id)
            .cloned())
    }

    async fn save_product(&self, product: &InventoryProduct) -> RepoResult<()> {
        let mut c = self.write()?;
        match c
            .inventory_products
            .get_mut(&product.inventory_product_id)
            .filter(|p| p.inventory_id == product.inventory_id)
        {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound("inventory product".to_string())),
        }
    }

    async fn delete_product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<bool> {
        let mut c = self.write()?;
        let owned = c
            .inventory_products
            .get(&product_id)
            .is_some_and(|p| p.inventory_id == inventory_id);
        if owned {
            c.inventory_products.remove(&product_id);
        }
        Ok(owned)
    }

    async fn list_view(
        &self,
        inventory: &Inventory,
        query: &InventoryQuery,
    ) -> RepoResult<Page<InventoryView>> {
        let c = self.read()?;
        let rows = c
            .inventory_products
            .values()
            .filter(|p| p.inventory_id == inventory.inventory_id)
            .map(|p| c.join_view(inventory, p))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(assemble_page(rows, query))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: &Order, items: &[OrderedItem]) -> RepoResult<()> {
        let mut c = self.write()?;
        if c.orders.contains_key(&order.order_id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.order_id
            )));
        }
        c.orders.insert(order.order_id, order.clone());
        c.ordered_items.extend_from_slice(items);
        Ok(())
    }

    async fn order(&self, id: OrderId) -> RepoResult<Option<OrderWithProducts>> {
        let c = self.read()?;
        Ok(c.orders
            .get(&id)
            .cloned()
            .and_then(|order| c.with_items(vec![order]).pop()))
    }

    async fn orders(&self, page: PageRequest) -> RepoResult<Page<OrderWithProducts>> {
        let c = self.read()?;
        let mut headers: Vec<Order> = c.orders.values().cloned().collect();
        sort_newest_first(&mut headers);
        let total = headers.len() as u64;
        let window = page.slice(headers);
        Ok(Page::new(c.with_items(window), total, page))
    }

    async fn orders_by_user(&self, user_id: AccountId) -> RepoResult<Vec<OrderWithProducts>> {
        let c = self.read()?;
        let headers: Vec<Order> = c
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(c.with_items(headers))
    }

    async fn orders_by_seller(&self, seller_id: AccountId) -> RepoResult<Vec<OrderWithProducts>> {
        let c = self.read()?;
        let items: Vec<OrderedItem> = c
            .ordered_items
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .cloned()
            .collect();
        let ids: HashSet<OrderId> = items.iter().map(|i| i.order_id).collect();
        let mut headers: Vec<Order> = ids.iter().filter_map(|id| c.orders.get(id).cloned()).collect();
        sort_newest_first(&mut headers);
        Ok(group_by_order(headers, items))
    }
}

#[async_trait]
impl StoreRepository for InMemoryStore {
    async fn insert_store(&self, store: &Store) -> RepoResult<()> {
        let mut c = self.write()?;
        if c.store_by_seller.contains_key(&store.seller_id) {
            return Err(RepositoryError::Conflict(
                "seller already owns a store".to_string(),
            ));
        }
        c.store_by_seller.insert(store.seller_id, store.store_id);
        c.stores.insert(store.store_id, store.clone());
        Ok(())
    }

    async fn store(&self, id: StoreId) -> RepoResult<Option<Store>> {
        Ok(self.read()?.stores.get(&id).cloned())
    }

    async fn store_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Store>> {
        let c = self.read()?;
        Ok(c.store_by_seller
            .get(&seller_id)
            .and_then(|id| c.stores.get(id))
            .cloned())
    }

    async fn stores_by_warehouse(&self, warehouse_id: WarehouseId) -> RepoResult<Vec<Store>> {
        let mut stores: Vec<Store> = self
            .read()?
            .stores
            .values()
            .filter(|s| s.warehouse_id == warehouse_id)
            .cloned()
            .collect();
        stores.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.store_id.cmp(&b.store_id))
        });
        Ok(stores)
    }

    async fn update_store(
        &self,
        id: StoreId,
        update: &StoreUpdate,
        now: DateTime<Utc>,
    ) -> RepoResult<Store> {
        // Check and write under the same write guard.
        let mut c = self.write()?;
        let store = c
            .stores
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound("store".to_string()))?;
        let mut next = store.clone();
        update.apply(&mut next, now).map_err(guard_violation)?;
        *store = next.clone();
        Ok(next)
    }

    async fn delete_store(&self, id: StoreId) -> RepoResult<()> {
        let mut c = self.write()?;
        let store = c
            .stores
            .remove(&id)
            .ok_or_else(|| RepositoryError::NotFound("store".to_string()))?;
        c.store_by_seller.remove(&store.seller_id);
        Ok(())
    }
}

#[async_trait]
impl WarehouseRepository for InMemoryStore {
    async fn insert_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()> {
        self.write()?
            .warehouses
            .insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn warehouse(&self, id: WarehouseId) -> RepoResult<Option<Warehouse>> {
        Ok(self.read()?.warehouses.get(&id).cloned())
    }

    async fn warehouses(&self, page: PageRequest) -> RepoResult<Page<Warehouse>> {
        let mut all: Vec<Warehouse> = self.read()?.warehouses.values().cloned().collect();
        all.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = all.len() as u64;
        Ok(Page::new(page.slice(all), total, page))
    }

    async fn save_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()> {
        let mut c = self.write()?;
        match c.warehouses.get_mut(&warehouse.id) {
            Some(existing) => {
                *existing = warehouse.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound("warehouse".to_string())),
        }
    }

    async fn delete_warehouse(&self, id: WarehouseId) -> RepoResult<()> {
        self.write()?
            .warehouses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound("warehouse".to_string()))
    }
}
