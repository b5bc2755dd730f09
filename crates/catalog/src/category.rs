use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, DomainResult, SubcategoryId, error::require_non_blank};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub image: Option<String>,
}

impl NewCategory {
    pub fn into_category(self, now: DateTime<Utc>) -> DomainResult<Category> {
        require_non_blank("name", &self.name)?;
        Ok(Category {
            id: CategoryId::new(),
            name: self.name.trim().to_string(),
            image: self.image,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubcategory {
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
}

impl NewSubcategory {
    /// The parent category's existence is checked by the caller (it needs IO).
    pub fn into_subcategory(self, now: DateTime<Utc>) -> DomainResult<Subcategory> {
        require_non_blank("name", &self.name)?;
        Ok(Subcategory {
            id: SubcategoryId::new(),
            category_id: self.category_id,
            name: self.name.trim().to_string(),
            image: self.image,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::DomainError;

    #[test]
    fn category_name_is_trimmed() {
        let category = NewCategory {
            name: "  Dairy ".to_string(),
            image: None,
        }
        .into_category(Utc::now())
        .unwrap();
        assert_eq!(category.name, "Dairy");
    }

    #[test]
    fn blank_subcategory_name_is_rejected() {
        let err = NewSubcategory {
            category_id: CategoryId::new(),
            name: "".to_string(),
            image: None,
        }
        .into_subcategory(Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
