//! Inventory domain module.
//!
//! A seller owns one inventory header and many line items. This crate holds
//! the records, their write-side validation and the denormalized read model
//! (filter, sort and pagination rules), implemented purely as deterministic
//! logic (no IO, no HTTP, no storage).

pub mod inventory;
pub mod view;

pub use inventory::{Inventory, InventoryProduct, InventoryProductUpdate, NewInventoryLine};
pub use view::{InventoryItemDetail, InventoryQuery, InventorySort, InventoryView, assemble_page};
