//! Shared building blocks for the marketplace domain.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and pagination rules.

pub mod error;
pub mod id;
pub mod pagination;

pub use error::{DomainError, DomainResult};
pub use id::{
    AccountId, CategoryId, InventoryId, InventoryProductId, OrderId, ProductId, StoreId,
    SubcategoryId, WarehouseId,
};
pub use pagination::{DEFAULT_LIMIT, Page, PageRequest};
