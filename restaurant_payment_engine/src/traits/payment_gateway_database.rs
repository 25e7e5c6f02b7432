use async_trait::async_trait;
use telebirr_gateway::GatewayError;
use thiserror::Error;

use crate::{
    db_types::{MenuItem, NewOrder, NewPayment, Order, OrderId, OrderStatus, Payment, PaymentId, PaymentStatus},
    traits::SettlementUpdate,
};

/// The storage behaviour backends must provide to support the payment engine.
///
/// All update primitives are atomic and conditional; see the per-method contracts.
#[async_trait]
pub trait PaymentGatewayDatabase: Clone + Send + Sync + 'static {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a fully priced order, with its line items, in a single atomic transaction.
    /// The order is created in `pending` status.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;

    /// Moves the order to `to` only if it is still in `from`. Returns `None` when the
    /// precondition no longer held (a concurrent writer moved the order first); the caller
    /// decides whether that is an error or an acceptable race outcome.
    async fn update_order_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, PaymentGatewayError>;

    /// Stores a new payment in `processing` status.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentGatewayError>;

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, PaymentGatewayError>;

    /// Looks a payment up by the gateway-assigned trade number.
    async fn fetch_payment_by_transaction_id(&self, txid: &str) -> Result<Option<Payment>, PaymentGatewayError>;

    /// All payments recorded against an order, oldest first. Retries create new payment rows,
    /// so an order can accumulate several; at most one may ever be `completed`.
    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, PaymentGatewayError>;

    /// Records the gateway trade number and moves the payment from `processing` to `pending`
    /// (awaiting the callback). If the payment already left `processing` — a fast callback can
    /// settle it before the initiation response lands — the row is left untouched and returned
    /// as it currently stands.
    async fn mark_payment_pending(&self, id: &PaymentId, trade_no: &str) -> Result<Payment, PaymentGatewayError>;

    /// Writes a terminal payment status, atomically and conditionally: the write only happens
    /// while the current status is `processing` or `pending`, and the transaction id is only
    /// backfilled when it was previously empty. A payment already in a terminal state is
    /// returned unchanged with `updated == false`. Calling this twice with the same arguments
    /// therefore converges on the same row state.
    async fn settle_payment(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
        trade_no: Option<&str>,
    ) -> Result<SettlementUpdate, PaymentGatewayError>;

    async fn fetch_menu_item(&self, id: &str) -> Result<Option<MenuItem>, PaymentGatewayError>;

    /// Inserts or replaces a menu item. The engine itself only reads the menu; this exists for
    /// seeding and for the (out-of-core) administration surface.
    async fn upsert_menu_item(&self, item: MenuItem) -> Result<(), PaymentGatewayError>;
}

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has already been settled")]
    OrderAlreadySettled(OrderId),
    #[error("Order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("No payment matches {0}")]
    PaymentNotFound(String),
    #[error("Menu item {0} does not exist or is unavailable")]
    MenuItemNotFound(String),
    #[error("Invalid order request: {0}")]
    InvalidOrder(String),
    #[error("Cannot update payment status. {0}")]
    PaymentStatusUpdateError(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
