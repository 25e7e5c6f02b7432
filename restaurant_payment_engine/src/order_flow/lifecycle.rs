use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatus},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

/// Enforces the order status state machine against the persistence layer.
///
/// The transition table itself lives on [`OrderStatus`]; this type adds the conditional
/// persistence step, so that two concurrent transitions on the same order cannot both win.
#[derive(Clone)]
pub struct OrderLifecycle<B> {
    db: B,
}

impl<B: PaymentGatewayDatabase> OrderLifecycle<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Moves the order to `target`, failing with `InvalidTransition` if the edge is not in
    /// the transition table. The write is conditional on the status the order was read at, so
    /// a concurrent transition that gets there first also surfaces as `InvalidTransition`.
    ///
    /// Persistence only; notifying subscribers is the caller's responsibility.
    pub async fn transition(&self, order_id: &OrderId, target: OrderStatus) -> Result<Order, PaymentGatewayError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        if !order.status.can_transition_to(target) {
            return Err(PaymentGatewayError::InvalidTransition { from: order.status, to: target });
        }
        let updated = self
            .db
            .update_order_status(order_id, order.status, target)
            .await?
            .ok_or(PaymentGatewayError::InvalidTransition { from: order.status, to: target })?;
        debug!("🔄️ Order [{order_id}] moved from {} to {target}", order.status);
        Ok(updated)
    }

    /// Advances a freshly settled order to `confirmed`. Unlike [`Self::transition`], this is
    /// idempotent: an order that is already confirmed or further along (a duplicate success
    /// callback, or the kitchen moving faster than the gateway) is returned unchanged.
    pub async fn confirm_after_settlement(&self, order_id: &OrderId) -> Result<Order, PaymentGatewayError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatus::Pending => {
                match self.db.update_order_status(order_id, OrderStatus::Pending, OrderStatus::Confirmed).await? {
                    Some(order) => {
                        debug!("🔄️ Order [{order_id}] confirmed after settlement");
                        Ok(order)
                    },
                    // lost the race; whoever won has already moved the order on
                    None => self
                        .db
                        .fetch_order(order_id)
                        .await?
                        .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone())),
                }
            },
            OrderStatus::Cancelled => {
                warn!("🔄️ Order [{order_id}] was settled after cancellation; leaving it cancelled");
                Ok(order)
            },
            _ => Ok(order),
        }
    }
}
