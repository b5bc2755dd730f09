//! Storage seams.
//!
//! Each repository is an async trait over one slice of the data model. Two
//! backends implement all of them:
//!
//! - [`InMemoryStore`]: every collection behind a single lock, so any
//!   multi-collection write is atomic.
//! - [`PostgresStore`]: sqlx over a `PgPool`; multi-table writes run in a
//!   transaction and uniqueness comes from table constraints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bazaar_accounts::Account;
use bazaar_auth::Role;
use bazaar_catalog::{Category, Metadata, MetadataFilter, Rating, Review, Subcategory};
use bazaar_core::{
    AccountId, CategoryId, InventoryId, InventoryProductId, OrderId, Page, PageRequest, ProductId,
    StoreId, SubcategoryId, WarehouseId,
};
use bazaar_inventory::{Inventory, InventoryProduct, InventoryQuery, InventoryView};
use bazaar_orders::{Order, OrderWithProducts, OrderedItem};
use bazaar_stores::{Store, StoreUpdate, Warehouse};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored record points at a record that does not exist.
    #[error("dangling reference: {collection} {id} does not exist")]
    DanglingReference { collection: &'static str, id: String },

    /// A guarded write found the stored state no longer satisfies its invariant.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn dangling(collection: &'static str, id: impl ToString) -> Self {
        Self::DanglingReference {
            collection,
            id: id.to_string(),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Conflict when the (role, email) pair is taken.
    async fn insert_account(&self, account: &Account) -> RepoResult<()>;
    async fn account_by_email(&self, role: Role, email: &str) -> RepoResult<Option<Account>>;
    async fn account(&self, id: AccountId) -> RepoResult<Option<Account>>;
    /// Store a new hash and clear `is_first_login`.
    async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<()>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_category(&self, category: &Category) -> RepoResult<()>;
    /// Ordered by name.
    async fn categories(&self) -> RepoResult<Vec<Category>>;
    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>>;

    async fn insert_subcategory(&self, subcategory: &Subcategory) -> RepoResult<()>;
    async fn subcategories(&self, category_id: CategoryId) -> RepoResult<Vec<Subcategory>>;
    async fn subcategory(&self, id: SubcategoryId) -> RepoResult<Option<Subcategory>>;

    /// Insert the metadata together with its empty review row.
    /// Conflict when the HSN code is taken.
    async fn insert_metadata(&self, metadata: &Metadata) -> RepoResult<()>;
    async fn metadata(&self, id: ProductId) -> RepoResult<Option<Metadata>>;
    /// Batch lookup; missing ids are simply absent from the result.
    async fn metadata_many(&self, ids: &[ProductId]) -> RepoResult<Vec<Metadata>>;
    /// Ordered by name, then product id.
    async fn list_metadata(
        &self,
        filter: &MetadataFilter,
        page: PageRequest,
    ) -> RepoResult<Page<Metadata>>;
    /// Overwrite an existing record; NotFound when absent.
    async fn save_metadata(&self, metadata: &Metadata) -> RepoResult<()>;

    async fn review(&self, product_id: ProductId) -> RepoResult<Option<Review>>;
    /// Atomically add one rating to the product's totals.
    async fn add_review(&self, product_id: ProductId, rating: Rating) -> RepoResult<Review>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn inventory_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Inventory>>;
    async fn inventory(&self, id: InventoryId) -> RepoResult<Option<Inventory>>;

    /// Create the header and its first line items in one write.
    /// Conflict when the seller already has an inventory.
    async fn create_inventory(
        &self,
        inventory: &Inventory,
        products: &[InventoryProduct],
    ) -> RepoResult<()>;
    async fn insert_products(
        &self,
        inventory_id: InventoryId,
        products: &[InventoryProduct],
    ) -> RepoResult<()>;

    async fn product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<Option<InventoryProduct>>;
    /// Overwrite an existing line item; NotFound when absent.
    async fn save_product(&self, product: &InventoryProduct) -> RepoResult<()>;
    /// Returns whether a row was removed.
    async fn delete_product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<bool>;

    /// Join the inventory's line items with the catalog and page the result.
    async fn list_view(
        &self,
        inventory: &Inventory,
        query: &InventoryQuery,
    ) -> RepoResult<Page<InventoryView>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Header and items in one write.
    async fn create_order(&self, order: &Order, items: &[OrderedItem]) -> RepoResult<()>;
    async fn order(&self, id: OrderId) -> RepoResult<Option<OrderWithProducts>>;
    /// Newest first.
    async fn orders(&self, page: PageRequest) -> RepoResult<Page<OrderWithProducts>>;
    /// Newest first.
    async fn orders_by_user(&self, user_id: AccountId) -> RepoResult<Vec<OrderWithProducts>>;
    /// Newest first; each order carries only this seller's items.
    async fn orders_by_seller(&self, seller_id: AccountId) -> RepoResult<Vec<OrderWithProducts>>;
}

#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Conflict when the seller already owns a store.
    async fn insert_store(&self, store: &Store) -> RepoResult<()>;
    async fn store(&self, id: StoreId) -> RepoResult<Option<Store>>;
    async fn store_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Store>>;
    async fn stores_by_warehouse(&self, warehouse_id: WarehouseId) -> RepoResult<Vec<Store>>;
    /// Apply a partial update, re-checking the rack invariant against the
    /// stored row as part of the same write. `Invariant` when it would break.
    async fn update_store(
        &self,
        id: StoreId,
        update: &StoreUpdate,
        now: DateTime<Utc>,
    ) -> RepoResult<Store>;
    async fn delete_store(&self, id: StoreId) -> RepoResult<()>;
}

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn insert_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()>;
    async fn warehouse(&self, id: WarehouseId) -> RepoResult<Option<Warehouse>>;
    /// Ordered by name, then id.
    async fn warehouses(&self, page: PageRequest) -> RepoResult<Page<Warehouse>>;
    async fn save_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()>;
    async fn delete_warehouse(&self, id: WarehouseId) -> RepoResult<()>;
}

/// Everything a backend has to provide.
pub trait MarketplaceStore:
    AccountRepository
    + CatalogRepository
    + InventoryRepository
    + OrderRepository
    + StoreRepository
    + WarehouseRepository
{
}

impl<T> MarketplaceStore for T where
    T: AccountRepository
        + CatalogRepository
        + InventoryRepository
        + OrderRepository
        + StoreRepository
        + WarehouseRepository
{
}
