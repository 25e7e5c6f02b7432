use std::{collections::HashMap, sync::Arc};

use log::*;
use rpe_common::Money;
use telebirr_gateway::GatewayClient;

use super::{
    strategies::{CardSettlement, CashSettlement, MobileMoneySettlement, SettlementOutcome, SettlementStrategy},
    OrderLifecycle,
};
use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewPayment,
        Order,
        OrderId,
        OrderRequest,
        OrderStatus,
        Payment,
        PaymentId,
        PaymentMethod,
        PaymentReceipt,
        PaymentStatus,
        ProcessPaymentRequest,
    },
    events::{Event, NotificationHub, SubscriberRole},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

/// The client-facing order and payment API.
///
/// Ties together order intake, the per-method settlement strategies, the order lifecycle, and
/// real-time notifications. Cheap to clone; all state lives in the backend and the hub.
#[derive(Clone)]
pub struct PaymentFlowApi<B> {
    db: B,
    lifecycle: OrderLifecycle<B>,
    strategies: Arc<HashMap<PaymentMethod, Box<dyn SettlementStrategy<B>>>>,
    hub: NotificationHub,
}

impl<B: PaymentGatewayDatabase> PaymentFlowApi<B> {
    /// Wires up the standard strategy set: cash and card settle synchronously, mobile money
    /// goes through the gateway.
    pub fn new(db: B, gateway: Arc<dyn GatewayClient>, hub: NotificationHub) -> Self {
        let mut strategies: HashMap<PaymentMethod, Box<dyn SettlementStrategy<B>>> = HashMap::new();
        strategies.insert(PaymentMethod::Cash, Box::new(CashSettlement));
        strategies.insert(PaymentMethod::Card, Box::new(CardSettlement));
        strategies.insert(PaymentMethod::MobileMoney, Box::new(MobileMoneySettlement::new(gateway)));
        Self { lifecycle: OrderLifecycle::new(db.clone()), db, strategies: Arc::new(strategies), hub }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn lifecycle(&self) -> &OrderLifecycle<B> {
        &self.lifecycle
    }

    /// Prices the requested line items against the menu and stores the order in `pending`
    /// status. The order total is computed here, from menu prices only; any amounts a client
    /// might try to supply are ignored by construction ([`OrderRequest`] has no price fields).
    ///
    /// Kitchen subscribers are notified of the new order.
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, PaymentGatewayError> {
        if request.items.is_empty() {
            return Err(PaymentGatewayError::InvalidOrder("An order must contain at least one item".to_string()));
        }
        let mut items = Vec::with_capacity(request.items.len());
        let mut total = Money::default();
        for line in &request.items {
            if line.quantity < 1 {
                return Err(PaymentGatewayError::InvalidOrder(format!(
                    "Quantity for menu item {} must be at least 1",
                    line.menu_item_id
                )));
            }
            let item = self
                .db
                .fetch_menu_item(&line.menu_item_id)
                .await?
                .filter(|item| item.available)
                .ok_or_else(|| PaymentGatewayError::MenuItemNotFound(line.menu_item_id.clone()))?;
            // quantities are client input; an overflowing total is a malformed order, not a panic
            let overflow =
                || PaymentGatewayError::InvalidOrder(format!("Quantity for menu item {} is too large", line.menu_item_id));
            let line_total = item.price.checked_mul(line.quantity).ok_or_else(overflow)?;
            total = total.checked_add(line_total).ok_or_else(overflow)?;
            items.push(NewOrderItem {
                menu_item_id: item.id,
                name: item.name,
                unit_price: item.price,
                quantity: line.quantity,
                line_total,
            });
        }
        let new_order = NewOrder {
            order_id: OrderId::random(),
            customer_id: request.customer_id,
            items,
            total_amount: total,
        };
        let order = self.db.insert_order(new_order).await?;
        info!("🗃️ Order [{}] placed by {} for {}", order.order_id, order.customer_id, order.total_amount);
        self.hub.broadcast_to_role(Event::NewOrder(order.clone()), SubscriberRole::Kitchen);
        Ok(order)
    }

    /// Runs a payment for the order through the strategy for its method.
    ///
    /// The charged amount is always the order's stored total. A fresh payment row is created
    /// per attempt, so a failed attempt can simply be retried; an order with a `completed`
    /// payment refuses further attempts.
    pub async fn process_payment(&self, request: ProcessPaymentRequest) -> Result<PaymentReceipt, PaymentGatewayError> {
        let order = self
            .db
            .fetch_order(&request.order_id)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(request.order_id.clone()))?;
        let settled = self
            .db
            .fetch_payments_for_order(&order.order_id)
            .await?
            .iter()
            .any(|p| p.status == PaymentStatus::Completed);
        if settled {
            return Err(PaymentGatewayError::OrderAlreadySettled(order.order_id));
        }
        let strategy = self
            .strategies
            .get(&request.method)
            .ok_or_else(|| PaymentGatewayError::UnsupportedMethod(request.method.to_string()))?;
        let new_payment = NewPayment::new(order.order_id.clone(), order.total_amount, request.method, request.phone_number);
        let payment = self.db.insert_payment(new_payment).await?;
        info!("💳️ Payment [{}] of {} via {} started for order [{}]", payment.id, payment.amount, payment.method, order.order_id);

        let receipt = match strategy.settle(&self.db, &order, &payment).await? {
            SettlementOutcome::Settled { payment, message } => {
                self.lifecycle.confirm_after_settlement(&order.order_id).await?;
                PaymentReceipt::new(&payment, message, None)
            },
            SettlementOutcome::AwaitingGateway { payment, checkout_url, message } => {
                PaymentReceipt::new(&payment, message, Some(checkout_url))
            },
        };
        self.hub.broadcast(Event::PaymentProcessed(receipt.clone()));
        Ok(receipt)
    }

    /// The current state of a payment, by merchant payment id.
    pub async fn payment_status(&self, id: &PaymentId) -> Result<Payment, PaymentGatewayError> {
        self.db.fetch_payment(id).await?.ok_or_else(|| PaymentGatewayError::PaymentNotFound(id.to_string()))
    }

    /// Moves an order along its lifecycle (kitchen and staff actions) and notifies every
    /// subscriber of the change.
    pub async fn update_order_status(&self, order_id: &OrderId, target: OrderStatus) -> Result<Order, PaymentGatewayError> {
        let order = self.lifecycle.transition(order_id, target).await?;
        self.hub.broadcast(Event::OrderStatusUpdated(order.clone()));
        Ok(order)
    }
}
