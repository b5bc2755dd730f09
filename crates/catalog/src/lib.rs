//! Catalog domain module: the two-level taxonomy, product metadata and
//! accumulated reviews.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod metadata;
pub mod review;

pub use category::{Category, NewCategory, NewSubcategory, Subcategory};
pub use metadata::{Metadata, MetadataDetail, MetadataFilter, MetadataUpdate, NewMetadata};
pub use review::{Rating, Review};
