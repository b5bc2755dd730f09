use chrono::Utc;
use tracing::{info, instrument};

use bazaar_auth::{Principal, Role};
use bazaar_core::{OrderId, Page, PageRequest};
use bazaar_orders::{NewOrder, OrderWithProducts};

use super::{ServiceError, ServiceResult, Services, require};

impl Services {
    /// Place an order: one header and its line items, written together.
    #[instrument(skip(self, principal, order), fields(user_id = %principal.user_id, item_count = order.products.len()), err)]
    pub async fn place_order(
        &self,
        principal: &Principal,
        order: NewOrder,
    ) -> ServiceResult<OrderWithProducts> {
        require(principal, &[Role::Customer])?;
        let (order, items) = order.place(principal.user_id, Utc::now())?;
        self.store.create_order(&order, &items).await?;
        info!(order_id = %order.order_id, order_total = order.order_total, "order placed");
        Ok(OrderWithProducts {
            order,
            products: items,
        })
    }

    /// Buyers see their own orders, sellers see orders carrying their items,
    /// operational staff see everything.
    pub async fn order(&self, principal: &Principal, id: OrderId) -> ServiceResult<OrderWithProducts> {
        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))?;

        match principal.role {
            Role::OperationalGuy => {}
            Role::Customer if order.order.user_id == principal.user_id => {}
            Role::Seller => {
                order.products.retain(|item| item.seller_id == principal.user_id);
                if order.products.is_empty() {
                    return Err(ServiceError::not_found("order"));
                }
            }
            _ => return Err(ServiceError::not_found("order")),
        }
        Ok(order)
    }

    pub async fn orders(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> ServiceResult<Page<OrderWithProducts>> {
        require(principal, &[Role::OperationalGuy])?;
        Ok(self.store.orders(page).await?)
    }

    pub async fn my_orders(&self, principal: &Principal) -> ServiceResult<Vec<OrderWithProducts>> {
        require(principal, &[Role::Customer])?;
        Ok(self.store.orders_by_user(principal.user_id).await?)
    }

    /// Orders containing the caller's items; each carries only those items.
    pub async fn seller_orders(&self, principal: &Principal) -> ServiceResult<Vec<OrderWithProducts>> {
        require(principal, &[Role::Seller])?;
        Ok(self.store.orders_by_seller(principal.user_id).await?)
    }
}
