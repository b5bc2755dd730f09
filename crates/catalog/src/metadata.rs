use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    CategoryId, DomainError, DomainResult, ProductId, SubcategoryId,
    error::{require_non_blank, require_non_negative},
};

use crate::{Category, Review, Subcategory};

/// A catalog product ("metadata" in seller-facing terms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub product_id: ProductId,
    /// Harmonized System of Nomenclature code; unique across the catalog.
    pub hsn_code: String,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    /// Maximum retail price, smallest currency unit.
    pub mrp: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMetadata {
    pub hsn_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    pub category_id: CategoryId,
    pub subcategory_id: SubcategoryId,
    pub mrp: i64,
}

impl NewMetadata {
    /// Validate against the resolved taxonomy and build the record.
    ///
    /// HSN uniqueness is not checked here: the storage layer owns that
    /// constraint and reports a conflict on insert.
    pub fn into_metadata(
        self,
        category: &Category,
        subcategory: &Subcategory,
        now: DateTime<Utc>,
    ) -> DomainResult<Metadata> {
        require_non_blank("hsnCode", &self.hsn_code)?;
        require_non_blank("name", &self.name)?;
        require_non_negative("mrp", self.mrp)?;

        if category.id != self.category_id || subcategory.id != self.subcategory_id {
            return Err(DomainError::invariant("resolved taxonomy does not match request"));
        }
        if subcategory.category_id != category.id {
            return Err(DomainError::validation(
                "subcategory does not belong to the given category",
            ));
        }

        Ok(Metadata {
            product_id: ProductId::new(),
            hsn_code: self.hsn_code.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            image: self.image,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            mrp: self.mrp,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub mrp: Option<i64>,
}

impl MetadataUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(mrp) = self.mrp {
            require_non_negative("mrp", mrp)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.image.is_none() && self.mrp.is_none()
    }

    pub fn apply(&self, metadata: &mut Metadata, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            metadata.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(image) = &self.image {
            metadata.image = Some(image.clone());
        }
        if let Some(mrp) = self.mrp {
            metadata.mrp = mrp;
        }
        metadata.updated_at = now;
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

impl MetadataFilter {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        if self.category_id.is_some_and(|c| c != metadata.category_id) {
            return false;
        }
        if self.subcategory_id.is_some_and(|s| s != metadata.subcategory_id) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => metadata
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// Metadata joined with its review totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDetail {
    #[serde(flatten)]
    pub metadata: Metadata,
    pub total_stars: i64,
    pub total_reviews: i64,
    pub average_rating: Option<f64>,
}

impl MetadataDetail {
    pub fn new(metadata: Metadata, review: Option<&Review>) -> Self {
        let (total_stars, total_reviews, average_rating) = match review {
            Some(r) => (r.total_stars, r.total_reviews, r.average()),
            None => (0, 0, None),
        };
        Self {
            metadata,
            total_stars,
            total_reviews,
            average_rating,
        }
    }
}
