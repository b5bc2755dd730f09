use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AccountId, DomainError, DomainResult, InventoryId, InventoryProductId, ProductId, StoreId,
    error::require_non_negative,
};

/// Inventory header: one per seller, stamped with the seller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub inventory_id: InventoryId,
    pub seller_id: AccountId,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
}

impl Inventory {
    pub fn new(seller_id: AccountId, store_id: StoreId, now: DateTime<Utc>) -> Self {
        Self {
            inventory_id: InventoryId::new(),
            seller_id,
            store_id,
            created_at: now,
        }
    }
}

/// One stocked catalog product inside an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryProduct {
    pub inventory_product_id: InventoryProductId,
    pub inventory_id: InventoryId,
    pub metadata_product_id: ProductId,
    pub visibility: bool,
    pub quantity: i64,
    /// Selling price, smallest currency unit.
    pub price: i64,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product to add to an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryLine {
    pub product_id: ProductId,
    /// Defaults to the catalog MRP when absent.
    pub price: Option<i64>,
}

impl NewInventoryLine {
    /// New line items start hidden with zero stock.
    pub fn into_product(
        self,
        inventory_id: InventoryId,
        mrp: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<InventoryProduct> {
        let price = self.price.unwrap_or(mrp);
        require_non_negative("price", price)?;

        Ok(InventoryProduct {
            inventory_product_id: InventoryProductId::new(),
            inventory_id,
            metadata_product_id: self.product_id,
            visibility: false,
            quantity: 0,
            price,
            expiry_date: None,
            manufacturing_date: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a line item; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryProductUpdate {
    pub visibility: Option<bool>,
    pub quantity: Option<i64>,
    pub price: Option<i64>,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
}

impl InventoryProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.visibility.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.expiry_date.is_none()
            && self.manufacturing_date.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(quantity) = self.quantity {
            require_non_negative("quantity", quantity)?;
        }
        if let Some(price) = self.price {
            require_non_negative("price", price)?;
        }
        Ok(())
    }

    /// Apply onto `product`, checking the merged date range.
    pub fn apply(&self, product: &mut InventoryProduct, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate()?;

        let expiry = self.expiry_date.or(product.expiry_date);
        let manufactured = self.manufacturing_date.or(product.manufacturing_date);
        if let (Some(expiry), Some(manufactured)) = (expiry, manufactured) {
            if manufactured > expiry {
                return Err(DomainError::validation(
                    "manufacturingDate cannot be after expiryDate",
                ));
            }
        }

        if let Some(visibility) = self.visibility {
            product.visibility = visibility;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        product.expiry_date = expiry;
        product.manufacturing_date = manufactured;
        product.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> InventoryProduct {
        NewInventoryLine {
            product_id: ProductId::new(),
            price: None,
        }
        .into_product(InventoryId::new(), 4_500, Utc::now())
        .unwrap()
    }

    #[test]
    fn new_lines_start_hidden_with_zero_stock_at_mrp() {
        let p = product();
        assert!(!p.visibility);
        assert_eq!(p.quantity, 0);
        assert_eq!(p.price, 4_500);
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn explicit_negative_price_is_rejected() {
        let err = NewInventoryLine {
            product_id: ProductId::new(),
            price: Some(-5),
        }
        .into_product(InventoryId::new(), 100, Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_sets_only_present_fields() {
        let mut p = product();
        let update = InventoryProductUpdate {
            visibility: Some(true),
            quantity: Some(12),
            ..InventoryProductUpdate::default()
        };
        update.apply(&mut p, Utc::now()).unwrap();
        assert!(p.visibility);
        assert_eq!(p.quantity, 12);
        assert_eq!(p.price, 4_500);
    }

    #[test]
    fn update_rejects_negative_quantity() {
        let mut p = product();
        let update = InventoryProductUpdate {
            quantity: Some(-1),
            ..InventoryProductUpdate::default()
        };
        assert!(update.apply(&mut p, Utc::now()).is_err());
        assert_eq!(p.quantity, 0);
    }

    #[test]
    fn update_checks_merged_date_range() {
        let mut p = product();
        p.expiry_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let update = InventoryProductUpdate {
            manufacturing_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..InventoryProductUpdate::default()
        };
        assert!(update.apply(&mut p, Utc::now()).is_err());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(InventoryProductUpdate::default().validate().is_err());
    }
}
