//! Denormalized inventory read model.
//!
//! A view row flattens one line item together with its catalog metadata,
//! taxonomy names and review totals. The join itself needs IO and lives in the
//! storage adapters; the search/sort/pagination rules live here so every
//! adapter behaves the same way.

use core::cmp::Ordering;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bazaar_catalog::{Category, Metadata, Review, Subcategory};
use bazaar_core::{
    AccountId, CategoryId, DomainError, InventoryId, InventoryProductId, Page, PageRequest,
    ProductId, StoreId, SubcategoryId,
};

use crate::{Inventory, InventoryProduct};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    pub inventory_id: InventoryId,
    pub inventory_product_id: InventoryProductId,
    pub seller_id: AccountId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub visibility: bool,
    pub quantity: i64,
    pub price: i64,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hsn_code: String,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub mrp: i64,
    pub category_id: CategoryId,
    pub category_name: String,
    pub subcategory_id: SubcategoryId,
    pub subcategory_name: String,
    pub total_stars: i64,
    pub total_reviews: i64,
}

impl InventoryView {
    /// Flatten one fully resolved join chain.
    pub fn join(
        inventory: &Inventory,
        product: &InventoryProduct,
        metadata: &Metadata,
        category: &Category,
        subcategory: &Subcategory,
        review: Option<&Review>,
    ) -> Self {
        Self {
            inventory_id: inventory.inventory_id,
            inventory_product_id: product.inventory_product_id,
            seller_id: inventory.seller_id,
            store_id: inventory.store_id,
            product_id: metadata.product_id,
            visibility: product.visibility,
            quantity: product.quantity,
            price: product.price,
            expiry_date: product.expiry_date,
            manufacturing_date: product.manufacturing_date,
            created_at: product.created_at,
            updated_at: product.updated_at,
            hsn_code: metadata.hsn_code.clone(),
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            image: metadata.image.clone(),
            mrp: metadata.mrp,
            category_id: category.id,
            category_name: category.name.clone(),
            subcategory_id: subcategory.id,
            subcategory_name: subcategory.name.clone(),
            total_stars: review.map(|r| r.total_stars).unwrap_or(0),
            total_reviews: review.map(|r| r.total_reviews).unwrap_or(0),
        }
    }
}

/// Sort keys accepted by the inventory listing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySort {
    /// Newest line item first.
    #[default]
    Default,
    NameAsc,
    NameDesc,
    MrpAsc,
    MrpDesc,
    /// Oldest line item first.
    Oldest,
}

impl InventorySort {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventorySort::Default => "default",
            InventorySort::NameAsc => "name_asc",
            InventorySort::NameDesc => "name_desc",
            InventorySort::MrpAsc => "mrp_asc",
            InventorySort::MrpDesc => "mrp_desc",
            InventorySort::Oldest => "oldest",
        }
    }

    /// Total order: the sort key, then `inventory_product_id` ascending.
    pub fn compare(&self, a: &InventoryView, b: &InventoryView) -> Ordering {
        let primary = match self {
            InventorySort::Default => b.created_at.cmp(&a.created_at),
            InventorySort::Oldest => a.created_at.cmp(&b.created_at),
            InventorySort::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            InventorySort::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            InventorySort::MrpAsc => a.mrp.cmp(&b.mrp),
            InventorySort::MrpDesc => b.mrp.cmp(&a.mrp),
        };
        primary.then_with(|| a.inventory_product_id.cmp(&b.inventory_product_id))
    }
}

impl FromStr for InventorySort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(InventorySort::Default),
            "name_asc" => Ok(InventorySort::NameAsc),
            "name_desc" => Ok(InventorySort::NameDesc),
            "mrp_asc" => Ok(InventorySort::MrpAsc),
            "mrp_desc" => Ok(InventorySort::MrpDesc),
            "oldest" => Ok(InventorySort::Oldest),
            other => Err(DomainError::validation(format!(
                "unknown sort '{other}'; expected one of: default, name_asc, name_desc, mrp_asc, mrp_desc, oldest"
            ))),
        }
    }
}

/// Search/sort/page parameters for one inventory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub sort: InventorySort,
    pub page: PageRequest,
}

impl InventoryQuery {
    /// The trimmed, lowercased search needle, if any.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Case-insensitive substring match on product name OR subcategory name.
    pub fn matches(&self, view: &InventoryView) -> bool {
        match self.needle() {
            Some(needle) => {
                view.name.to_lowercase().contains(&needle)
                    || view.subcategory_name.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Filter, sort, count and slice fully joined rows.
pub fn assemble_page(rows: Vec<InventoryView>, query: &InventoryQuery) -> Page<InventoryView> {
    let mut matching: Vec<InventoryView> = rows.into_iter().filter(|v| query.matches(v)).collect();
    matching.sort_by(|a, b| query.sort.compare(a, b));

    let total = matching.len() as u64;
    Page::new(query.page.slice(matching), total, query.page)
}

/// Result of a point lookup: the line item with its header and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDetail {
    pub seller_id: AccountId,
    pub store_id: StoreId,
    #[serde(flatten)]
    pub product: InventoryProduct,
    pub metadata: Metadata,
}
