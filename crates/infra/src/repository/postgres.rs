//! Postgres backend.
//!
//! ## Error mapping
//!
//! | Postgres code | `RepositoryError` | Scenario |
//! |---------------|-------------------|----------|
//! | `23505` | `Conflict` | duplicate email/role, HSN code, seller inventory or seller store |
//! | `23514` | `Invariant` | a CHECK constraint (rack bounds, non-negative money) rejected the row |
//! | other | `Backend` | connectivity, pool closed, decode failures |
//!
//! ## Atomicity
//!
//! Writes that touch more than one table (metadata + review row, inventory
//! header + line items, order header + items) run in a single transaction.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{info, instrument};
use uuid::Uuid;

use bazaar_accounts::{Account, Profile};
use bazaar_auth::Role;
use bazaar_catalog::{Category, Metadata, MetadataFilter, Rating, Review, Subcategory};
use bazaar_core::{
    AccountId, CategoryId, InventoryId, InventoryProductId, OrderId, Page, PageRequest, ProductId,
    StoreId, SubcategoryId, WarehouseId,
};
use bazaar_inventory::{Inventory, InventoryProduct, InventoryQuery, InventoryView, assemble_page};
use bazaar_orders::{Order, OrderWithProducts, OrderedItem, group_by_order};
use bazaar_stores::{Coordinates, Store, StoreUpdate, Warehouse};

use super::{
    AccountRepository, CatalogRepository, InventoryRepository, OrderRepository, RepoResult,
    RepositoryError, StoreRepository, WarehouseRepository,
};

const SCHEMA: &str = include_str!("../../migrations/0001_marketplace.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and apply the bootstrap schema.
    pub async fn connect(database_url: &str) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("database schema is up to date");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(match db_err.constraint() {
                    Some("accounts_role_email_key") => "an account with this email already exists".to_string(),
                    Some("metadata_hsn_code_key") => "hsnCode already exists".to_string(),
                    Some("inventories_seller_key") => "seller already has an inventory".to_string(),
                    Some("stores_seller_key") => "seller already owns a store".to_string(),
                    _ => msg,
                }),
                Some("23514") => RepositoryError::Invariant(msg),
                _ => RepositoryError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("{operation}: {other}")),
    }
}

fn uuids<T>(ids: impl IntoIterator<Item = T>, as_uuid: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    ids.into_iter().map(|id| as_uuid(&id)).collect()
}

// Row decoding

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let profile: Json<Profile> = row.try_get("profile")?;
    Ok(Account {
        id: AccountId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        profile: profile.0,
        is_first_login: row.try_get("is_first_login")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn subcategory_from_row(row: &PgRow) -> Result<Subcategory, sqlx::Error> {
    Ok(Subcategory {
        id: SubcategoryId::from_uuid(row.try_get("id")?),
        category_id: CategoryId::from_uuid(row.try_get("category_id")?),
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn metadata_from_row(row: &PgRow) -> Result<Metadata, sqlx::Error> {
    Ok(Metadata {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        hsn_code: row.try_get("hsn_code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        category_id: CategoryId::from_uuid(row.try_get("category_id")?),
        subcategory_id: SubcategoryId::from_uuid(row.try_get("subcategory_id")?),
        mrp: row.try_get("mrp")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        total_stars: row.try_get("total_stars")?,
        total_reviews: row.try_get("total_reviews")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<Inventory, sqlx::Error> {
    Ok(Inventory {
        inventory_id: InventoryId::from_uuid(row.try_get("inventory_id")?),
        seller_id: AccountId::from_uuid(row.try_get("seller_id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<InventoryProduct, sqlx::Error> {
    Ok(InventoryProduct {
        inventory_product_id: InventoryProductId::from_uuid(row.try_get("inventory_product_id")?),
        inventory_id: InventoryId::from_uuid(row.try_get("inventory_id")?),
        metadata_product_id: ProductId::from_uuid(row.try_get("metadata_product_id")?),
        visibility: row.try_get("visibility")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        expiry_date: row.try_get("expiry_date")?,
        manufacturing_date: row.try_get("manufacturing_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        user_id: AccountId::from_uuid(row.try_get("user_id")?),
        warehouse_id: WarehouseId::from_uuid(row.try_get("warehouse_id")?),
        address: row.try_get("address")?,
        order_total: row.try_get("order_total")?,
        ordered_at: row.try_get("ordered_at")?,
    })
}

fn ordered_item_from_row(row: &PgRow) -> Result<OrderedItem, sqlx::Error> {
    Ok(OrderedItem {
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        mrp: row.try_get("mrp")?,
        seller_id: AccountId::from_uuid(row.try_get("seller_id")?),
    })
}

fn store_from_row(row: &PgRow) -> Result<Store, sqlx::Error> {
    Ok(Store {
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        seller_id: AccountId::from_uuid(row.try_get("seller_id")?),
        warehouse_id: WarehouseId::from_uuid(row.try_get("warehouse_id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        contact: row.try_get("contact")?,
        number_of_racks: row.try_get("number_of_racks")?,
        occupied_racks: row.try_get("occupied_racks")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn warehouse_from_row(row: &PgRow) -> Result<Warehouse, sqlx::Error> {
    Ok(Warehouse {
        id: WarehouseId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        coordinates: Coordinates {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        storage_capacity: row.try_get("storage_capacity")?,
        operational_guy_id: AccountId::from_uuid(row.try_get("operational_guy_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decode one joined inventory row, failing on any unresolved reference.
fn view_from_row(inventory: &Inventory, row: &PgRow) -> RepoResult<InventoryView> {
    let decode = |e| map_sqlx_error("decode_inventory_view", e);
    let product = product_from_row(row).map_err(decode)?;

    let metadata_id: Option<Uuid> = row.try_get("m_product_id").map_err(decode)?;
    let Some(metadata_id) = metadata_id else {
        return Err(RepositoryError::dangling("metadata", product.metadata_product_id));
    };
    let category_id: Uuid = row.try_get("m_category_id").map_err(decode)?;
    let subcategory_id: Uuid = row.try_get("m_subcategory_id").map_err(decode)?;
    let category_name: Option<String> = row.try_get("category_name").map_err(decode)?;
    let Some(category_name) = category_name else {
        return Err(RepositoryError::dangling("categories", CategoryId::from_uuid(category_id)));
    };
    let subcategory_name: Option<String> = row.try_get("subcategory_name").map_err(decode)?;
    let Some(subcategory_name) = subcategory_name else {
        return Err(RepositoryError::dangling(
            "subcategories",
            SubcategoryId::from_uuid(subcategory_id),
        ));
    };
    let total_stars: Option<i64> = row.try_get("total_stars").map_err(decode)?;
    let total_reviews: Option<i64> = row.try_get("total_reviews").map_err(decode)?;

    Ok(InventoryView {
        inventory_id: inventory.inventory_id,
        inventory_product_id: product.inventory_product_id,
        seller_id: inventory.seller_id,
        store_id: inventory.store_id,
        product_id: ProductId::from_uuid(metadata_id),
        visibility: product.visibility,
        quantity: product.quantity,
        price: product.price,
        expiry_date: product.expiry_date,
        manufacturing_date: product.manufacturing_date,
        created_at: product.created_at,
        updated_at: product.updated_at,
        hsn_code: row.try_get("hsn_code").map_err(decode)?,
        name: row.try_get("m_name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        image: row.try_get("image").map_err(decode)?,
        mrp: row.try_get("mrp").map_err(decode)?,
        category_id: CategoryId::from_uuid(category_id),
        category_name,
        subcategory_id: SubcategoryId::from_uuid(subcategory_id),
        subcategory_name,
        total_stars: total_stars.unwrap_or(0),
        total_reviews: total_reviews.unwrap_or(0),
    })
}

fn decode_all<T>(
    operation: &str,
    rows: &[PgRow],
    decode: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> RepoResult<Vec<T>> {
    rows.iter()
        .map(|r| decode(r).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

const ORDER_COLUMNS: &str = "order_id, user_id, warehouse_id, address, order_total, ordered_at";
const ITEM_COLUMNS: &str = "order_id, product_id, quantity, price, mrp, seller_id";

impl PostgresStore {
    /// One batched child query for any number of headers.
    async fn attach_items(&self, headers: Vec<Order>) -> RepoResult<Vec<OrderWithProducts>> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let ids = uuids(headers.iter().map(|o| o.order_id), |id| *id.as_uuid());
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM ordered_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_ordered_items", e))?;
        let items = decode_all("decode_ordered_item", &rows, ordered_item_from_row)?;
        Ok(group_by_order(headers, items))
    }

    async fn insert_products_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        products: &[InventoryProduct],
    ) -> RepoResult<()> {
        for p in products {
            sqlx::query(
                r#"
                INSERT INTO inventory_products (
                    inventory_product_id, inventory_id, metadata_product_id, visibility,
                    quantity, price, expiry_date, manufacturing_date, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(p.inventory_product_id.as_uuid())
            .bind(p.inventory_id.as_uuid())
            .bind(p.metadata_product_id.as_uuid())
            .bind(p.visibility)
            .bind(p.quantity)
            .bind(p.price)
            .bind(p.expiry_date)
            .bind(p.manufacturing_date)
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_inventory_product", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PostgresStore {
    #[instrument(skip(self, account), fields(account_id = %account.id, role = %account.role()), err)]
    async fn insert_account(&self, account: &Account) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, role, password_hash, name, phone, profile,
                is_first_login, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(account.role().as_str())
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(&account.phone)
        .bind(Json(&account.profile))
        .bind(account.is_first_login)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    async fn account_by_email(&self, role: Role, email: &str) -> RepoResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE role = $1 AND email = $2")
            .bind(role.as_str())
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("account_by_email", e))?;
        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_account", e))
    }

    async fn account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("account", e))?;
        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_account", e))
    }

    async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, is_first_login = FALSE, updated_at = $3 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(password_hash)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_password", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("account".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn insert_category(&self, category: &Category) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, name, image, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.image)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY lower(name), id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("categories", e))?;
        decode_all("decode_category", &rows, category_from_row)
    }

    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("category", e))?;
        row.as_ref()
            .map(category_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_category", e))
    }

    async fn insert_subcategory(&self, subcategory: &Subcategory) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subcategories (id, category_id, name, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(subcategory.id.as_uuid())
        .bind(subcategory.category_id.as_uuid())
        .bind(&subcategory.name)
        .bind(&subcategory.image)
        .bind(subcategory.created_at)
        .bind(subcategory.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_subcategory", e))?;
        Ok(())
    }

    async fn subcategories(&self, category_id: CategoryId) -> RepoResult<Vec<Subcategory>> {
        let rows = sqlx::query("SELECT * FROM subcategories WHERE category_id = $1 ORDER BY lower(name), id")
            .bind(category_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("subcategories", e))?;
        decode_all("decode_subcategory", &rows, subcategory_from_row)
    }

    async fn subcategory(&self, id: SubcategoryId) -> RepoResult<Option<Subcategory>> {
        let row = sqlx::query("SELECT * FROM subcategories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("subcategory", e))?;
        row.as_ref()
            .map(subcategory_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_subcategory", e))
    }

    #[instrument(skip(self, metadata), fields(product_id = %metadata.product_id), err)]
    async fn insert_metadata(&self, metadata: &Metadata) -> RepoResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO metadata (
                product_id, hsn_code, name, description, image,
                category_id, subcategory_id, mrp, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(metadata.product_id.as_uuid())
        .bind(&metadata.hsn_code)
        .bind(&metadata.name)
        .bind(&metadata.description)
        .bind(&metadata.image)
        .bind(metadata.category_id.as_uuid())
        .bind(metadata.subcategory_id.as_uuid())
        .bind(metadata.mrp)
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_metadata", e))?;

        sqlx::query("INSERT INTO reviews (product_id, total_stars, total_reviews) VALUES ($1, 0, 0)")
            .bind(metadata.product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_review", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn metadata(&self, id: ProductId) -> RepoResult<Option<Metadata>> {
        let row = sqlx::query("SELECT * FROM metadata WHERE product_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("metadata", e))?;
        row.as_ref()
            .map(metadata_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_metadata", e))
    }

    async fn metadata_many(&self, ids: &[ProductId]) -> RepoResult<Vec<Metadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let unique: HashSet<ProductId> = ids.iter().copied().collect();
        let ids = uuids(unique, |id| *id.as_uuid());
        let rows = sqlx::query("SELECT * FROM metadata WHERE product_id = ANY($1)")
            .bind(&ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("metadata_many", e))?;
        decode_all("decode_metadata", &rows, metadata_from_row)
    }

    async fn list_metadata(
        &self,
        filter: &MetadataFilter,
        page: PageRequest,
    ) -> RepoResult<Page<Metadata>> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR category_id = $1)
              AND ($2::uuid IS NULL OR subcategory_id = $2)
              AND ($3::text IS NULL OR strpos(lower(name), lower($3)) > 0)
        "#;
        let category = filter.category_id.map(|id| *id.as_uuid());
        let subcategory = filter.subcategory_id.map(|id| *id.as_uuid());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM metadata {WHERE}"))
            .bind(category)
            .bind(subcategory)
            .bind(search)
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error("count_metadata", e))?;

        let rows = sqlx::query(&format!(
            "SELECT * FROM metadata {WHERE} ORDER BY lower(name), product_id LIMIT $4 OFFSET $5"
        ))
        .bind(category)
        .bind(subcategory)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_metadata", e))?;

        let items = decode_all("decode_metadata", &rows, metadata_from_row)?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn save_metadata(&self, metadata: &Metadata) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE metadata
            SET name = $2, description = $3, image = $4, mrp = $5, updated_at = $6
            WHERE product_id = $1
            "#,
        )
        .bind(metadata.product_id.as_uuid())
        .bind(&metadata.name)
        .bind(&metadata.description)
        .bind(&metadata.image)
        .bind(metadata.mrp)
        .bind(metadata.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_metadata", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("metadata".to_string()));
        }
        Ok(())
    }

    async fn review(&self, product_id: ProductId) -> RepoResult<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("review", e))?;
        row.as_ref()
            .map(review_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_review", e))
    }

    async fn add_review(&self, product_id: ProductId, rating: Rating) -> RepoResult<Review> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (product_id, total_stars, total_reviews)
            SELECT $1, $2, 1 WHERE EXISTS (SELECT 1 FROM metadata WHERE product_id = $1)
            ON CONFLICT (product_id) DO UPDATE
            SET total_stars = reviews.total_stars + EXCLUDED.total_stars,
                total_reviews = reviews.total_reviews + 1
            RETURNING product_id, total_stars, total_reviews
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(rating.stars())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_review", e))?;

        match row {
            Some(row) => review_from_row(&row).map_err(|e| map_sqlx_error("decode_review", e)),
            None => Err(RepositoryError::NotFound("metadata".to_string())),
        }
    }
}

#[async_trait]
impl InventoryRepository for PostgresStore {
    async fn inventory_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Inventory>> {
        let row = sqlx::query("SELECT * FROM inventories WHERE seller_id = $1")
            .bind(seller_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("inventory_by_seller", e))?;
        row.as_ref()
            .map(inventory_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_inventory", e))
    }

    async fn inventory(&self, id: InventoryId) -> RepoResult<Option<Inventory>> {
        let row = sqlx::query("SELECT * FROM inventories WHERE inventory_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("inventory", e))?;
        row.as_ref()
            .map(inventory_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_inventory", e))
    }

    #[instrument(
        skip(self, inventory, products),
        fields(inventory_id = %inventory.inventory_id, seller_id = %inventory.seller_id, product_count = products.len()),
        err
    )]
    async fn create_inventory(
        &self,
        inventory: &Inventory,
        products: &[InventoryProduct],
    ) -> RepoResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            "INSERT INTO inventories (inventory_id, seller_id, store_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(inventory.inventory_id.as_uuid())
        .bind(inventory.seller_id.as_uuid())
        .bind(inventory.store_id.as_uuid())
        .bind(inventory.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_inventory", e))?;

        Self::insert_products_in(&mut tx, products).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn insert_products(
        &self,
        inventory_id: InventoryId,
        products: &[InventoryProduct],
    ) -> RepoResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let exists = sqlx::query("SELECT 1 FROM inventories WHERE inventory_id = $1")
            .bind(inventory_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("inventory_exists", e))?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound("inventory".to_string()));
        }

        Self::insert_products_in(&mut tx, products).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<Option<InventoryProduct>> {
        let row = sqlx::query(
            "SELECT * FROM inventory_products WHERE inventory_id = $1 AND inventory_product_id = $2",
        )
        .bind(inventory_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_product", e))?;
        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_inventory_product", e))
    }

    async fn save_product(&self, product: &InventoryProduct) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_products
            SET visibility = $3, quantity = $4, price = $5, expiry_date = $6,
                manufacturing_date = $7, updated_at = $8
            WHERE inventory_id = $1 AND inventory_product_id = $2
            "#,
        )
        .bind(product.inventory_id.as_uuid())
        .bind(product.inventory_product_id.as_uuid())
        .bind(product.visibility)
        .bind(product.quantity)
        .bind(product.price)
        .bind(product.expiry_date)
        .bind(product.manufacturing_date)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_inventory_product", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("inventory product".to_string()));
        }
        Ok(())
    }

    async fn delete_product(
        &self,
        inventory_id: InventoryId,
        product_id: InventoryProductId,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "DELETE FROM inventory_products WHERE inventory_id = $1 AND inventory_product_id = $2",
        )
        .bind(inventory_id.as_uuid())
        .bind(product_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_inventory_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, inventory, query), fields(inventory_id = %inventory.inventory_id, sort = query.sort.as_str()), err)]
    async fn list_view(
        &self,
        inventory: &Inventory,
        query: &InventoryQuery,
    ) -> RepoResult<Page<InventoryView>> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.inventory_product_id, p.inventory_id, p.metadata_product_id, p.visibility,
                p.quantity, p.price, p.expiry_date, p.manufacturing_date, p.created_at, p.updated_at,
                m.product_id AS m_product_id, m.hsn_code, m.name AS m_name, m.description,
                m.image, m.mrp, m.category_id AS m_category_id, m.subcategory_id AS m_subcategory_id,
                c.name AS category_name,
                s.name AS subcategory_name,
                r.total_stars, r.total_reviews
            FROM inventory_products p
            LEFT JOIN metadata m ON m.product_id = p.metadata_product_id
            LEFT JOIN categories c ON c.id = m.category_id
            LEFT JOIN subcategories s ON s.id = m.subcategory_id
            LEFT JOIN reviews r ON r.product_id = m.product_id
            WHERE p.inventory_id = $1
            "#,
        )
        .bind(inventory.inventory_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory_view", e))?;

        let views = rows
            .iter()
            .map(|row| view_from_row(inventory, row))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(assemble_page(views, query))
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    #[instrument(skip(self, order, items), fields(order_id = %order.order_id, item_count = items.len()), err)]
    async fn create_order(&self, order: &Order, items: &[OrderedItem]) -> RepoResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(order.order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.warehouse_id.as_uuid())
        .bind(&order.address)
        .bind(order.order_total)
        .bind(order.ordered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in items {
            sqlx::query(&format!(
                "INSERT INTO ordered_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.mrp)
            .bind(item.seller_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_ordered_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn order(&self, id: OrderId) -> RepoResult<Option<OrderWithProducts>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let header = order_from_row(&row).map_err(|e| map_sqlx_error("decode_order", e))?;
        Ok(self.attach_items(vec![header]).await?.pop())
    }

    async fn orders(&self, page: PageRequest) -> RepoResult<Page<OrderWithProducts>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM orders")
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error("count_orders", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY ordered_at DESC, order_id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders", e))?;

        let headers = decode_all("decode_order", &rows, order_from_row)?;
        let items = self.attach_items(headers).await?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn orders_by_user(&self, user_id: AccountId) -> RepoResult<Vec<OrderWithProducts>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY ordered_at DESC, order_id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_by_user", e))?;
        let headers = decode_all("decode_order", &rows, order_from_row)?;
        self.attach_items(headers).await
    }

    async fn orders_by_seller(&self, seller_id: AccountId) -> RepoResult<Vec<OrderWithProducts>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM ordered_items WHERE seller_id = $1 ORDER BY id"
        ))
        .bind(seller_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ordered_items_by_seller", e))?;
        let items = decode_all("decode_ordered_item", &rows, ordered_item_from_row)?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: HashSet<OrderId> = items.iter().map(|i| i.order_id).collect();
        let ids = uuids(order_ids, |id| *id.as_uuid());
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ANY($1) ORDER BY ordered_at DESC, order_id DESC"
        ))
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_by_ids", e))?;
        let headers = decode_all("decode_order", &rows, order_from_row)?;

        Ok(group_by_order(headers, items))
    }
}

#[async_trait]
impl StoreRepository for PostgresStore {
    async fn insert_store(&self, store: &Store) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stores (
                store_id, seller_id, warehouse_id, name, address, contact,
                number_of_racks, occupied_racks, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(store.store_id.as_uuid())
        .bind(store.seller_id.as_uuid())
        .bind(store.warehouse_id.as_uuid())
        .bind(&store.name)
        .bind(&store.address)
        .bind(&store.contact)
        .bind(store.number_of_racks)
        .bind(store.occupied_racks)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_store", e))?;
        Ok(())
    }

    async fn store(&self, id: StoreId) -> RepoResult<Option<Store>> {
        let row = sqlx::query("SELECT * FROM stores WHERE store_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("store", e))?;
        row.as_ref()
            .map(store_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_store", e))
    }

    async fn store_by_seller(&self, seller_id: AccountId) -> RepoResult<Option<Store>> {
        let row = sqlx::query("SELECT * FROM stores WHERE seller_id = $1")
            .bind(seller_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("store_by_seller", e))?;
        row.as_ref()
            .map(store_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_store", e))
    }

    async fn stores_by_warehouse(&self, warehouse_id: WarehouseId) -> RepoResult<Vec<Store>> {
        let rows = sqlx::query("SELECT * FROM stores WHERE warehouse_id = $1 ORDER BY lower(name), store_id")
            .bind(warehouse_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stores_by_warehouse", e))?;
        decode_all("decode_store", &rows, store_from_row)
    }

    #[instrument(skip(self, update), fields(store_id = %id), err)]
    async fn update_store(
        &self,
        id: StoreId,
        update: &StoreUpdate,
        now: DateTime<Utc>,
    ) -> RepoResult<Store> {
        // The WHERE clause re-checks the rack bounds against the row being
        // updated, so a concurrent writer cannot slip past the invariant.
        let row = sqlx::query(
            r#"
            UPDATE stores SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact = COALESCE($4, contact),
                number_of_racks = COALESCE($5, number_of_racks),
                occupied_racks = COALESCE($6, occupied_racks),
                updated_at = $7
            WHERE store_id = $1
              AND COALESCE($6, occupied_racks) >= 0
              AND COALESCE($6, occupied_racks) <= COALESCE($5, number_of_racks)
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.address.as_deref().map(str::trim))
        .bind(update.contact.as_deref())
        .bind(update.number_of_racks)
        .bind(update.occupied_racks)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_store", e))?;

        if let Some(row) = row {
            return store_from_row(&row).map_err(|e| map_sqlx_error("decode_store", e));
        }

        match self.store(id).await? {
            Some(_) => Err(RepositoryError::Invariant(
                "occupiedRacks must stay within 0..=numberOfRacks".to_string(),
            )),
            None => Err(RepositoryError::NotFound("store".to_string())),
        }
    }

    async fn delete_store(&self, id: StoreId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM stores WHERE store_id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_store", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("store".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WarehouseRepository for PostgresStore {
    async fn insert_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (
                id, name, address, latitude, longitude, storage_capacity,
                operational_guy_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(warehouse.coordinates.latitude)
        .bind(warehouse.coordinates.longitude)
        .bind(warehouse.storage_capacity)
        .bind(warehouse.operational_guy_id.as_uuid())
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_warehouse", e))?;
        Ok(())
    }

    async fn warehouse(&self, id: WarehouseId) -> RepoResult<Option<Warehouse>> {
        let row = sqlx::query("SELECT * FROM warehouses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("warehouse", e))?;
        row.as_ref()
            .map(warehouse_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_warehouse", e))
    }

    async fn warehouses(&self, page: PageRequest) -> RepoResult<Page<Warehouse>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM warehouses")
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error("count_warehouses", e))?;
        let rows = sqlx::query("SELECT * FROM warehouses ORDER BY lower(name), id LIMIT $1 OFFSET $2")
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("warehouses", e))?;
        let items = decode_all("decode_warehouse", &rows, warehouse_from_row)?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn save_warehouse(&self, warehouse: &Warehouse) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE warehouses
            SET name = $2, address = $3, latitude = $4, longitude = $5,
                storage_capacity = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(warehouse.coordinates.latitude)
        .bind(warehouse.coordinates.longitude)
        .bind(warehouse.storage_capacity)
        .bind(warehouse.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_warehouse", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("warehouse".to_string()));
        }
        Ok(())
    }

    async fn delete_warehouse(&self, id: WarehouseId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_warehouse", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("warehouse".to_string()));
        }
        Ok(())
    }
}
