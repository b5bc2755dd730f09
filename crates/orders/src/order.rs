use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AccountId, DomainError, DomainResult, OrderId, ProductId, WarehouseId,
    error::{require_non_blank, require_non_negative},
};

/// Order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    /// The buying customer.
    pub user_id: AccountId,
    pub warehouse_id: WarehouseId,
    pub address: String,
    /// Σ price × quantity over the line items, smallest currency unit.
    pub order_total: i64,
    pub ordered_at: DateTime<Utc>,
}

/// Order line item; `order_id` is its only link back to the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: i64,
    pub mrp: i64,
    pub seller_id: AccountId,
}

/// Header with its (possibly seller-filtered) line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithProducts {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<OrderedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: i64,
    pub mrp: i64,
    pub seller_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub warehouse_id: WarehouseId,
    pub address: String,
    pub products: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Validate and stamp one order id + timestamp shared by header and items.
    pub fn place(
        self,
        user_id: AccountId,
        now: DateTime<Utc>,
    ) -> DomainResult<(Order, Vec<OrderedItem>)> {
        require_non_blank("address", &self.address)?;
        if self.products.is_empty() {
            return Err(DomainError::validation("order must contain at least one product"));
        }

        let order_id = OrderId::new();
        let mut order_total: i64 = 0;
        let mut items = Vec::with_capacity(self.products.len());

        for line in self.products {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            require_non_negative("price", line.price)?;
            require_non_negative("mrp", line.mrp)?;

            order_total = line
                .price
                .checked_mul(line.quantity)
                .and_then(|subtotal| order_total.checked_add(subtotal))
                .ok_or_else(|| DomainError::validation("order total overflows"))?;

            items.push(OrderedItem {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                mrp: line.mrp,
                seller_id: line.seller_id,
            });
        }

        let order = Order {
            order_id,
            user_id,
            warehouse_id: self.warehouse_id,
            address: self.address.trim().to_string(),
            order_total,
            ordered_at: now,
        };
        Ok((order, items))
    }
}

/// Attach line items to their headers, preserving the header order.
///
/// Items whose header is not in `headers` are dropped; headers without items
/// get an empty product list.
pub fn group_by_order(headers: Vec<Order>, items: Vec<OrderedItem>) -> Vec<OrderWithProducts> {
    let mut by_order: HashMap<OrderId, Vec<OrderedItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    headers
        .into_iter()
        .map(|order| {
            let products = by_order.remove(&order.order_id).unwrap_or_default();
            OrderWithProducts { order, products }
        })
        .collect()
}
