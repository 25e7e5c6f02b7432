use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rpe_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// A fresh, collision-improbable order identifier.
    pub fn random() -> Self {
        Self(format!("ord-{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------       PaymentId       -------------------------------------------------------
/// The merchant-side payment identifier. This doubles as the trade reference (`outTradeNo`)
/// sent to the gateway, which is how callbacks are correlated back to a payment row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn random() -> Self {
        Self(format!("pay-{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Newly placed; no settled payment yet.
    Pending,
    /// A payment has settled; the kitchen may start on it.
    Confirmed,
    Preparing,
    Ready,
    /// Picked up and paid for. Terminal; retained for audit.
    Completed,
    /// Terminal; retained for audit.
    Cancelled,
}

impl OrderStatus {
    /// The outgoing edges of the order status state machine. Only the listed transitions are
    /// legal; everything else fails with `InvalidTransition`.
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Just created; the settlement strategy has not run yet.
    Processing,
    /// Awaiting external confirmation after a gateway redirect.
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Completed and Failed are terminal. The persistence layer's settlement primitive refuses
    /// to overwrite a terminal status, which is what makes callback handling idempotent.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Processing => "processing",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------     PaymentMethod     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    Cash,
    Card,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile_money" | "mobile-money" => Ok(Self::MobileMoney),
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            s => Err(ConversionError(format!("Unsupported payment method: {s}"))),
        }
    }
}

//--------------------------------------       MenuItem        -------------------------------------------------------
/// Read-only price authority for order-total computation. Menu administration lives elsewhere.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub available: bool,
}

//--------------------------------------       OrderItem       -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: String,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    /// Always the sum of the persisted line totals; recomputed server-side at creation and
    /// never taken from the client.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// A fully priced order, ready for insertion. Produced by the order intake flow after every
/// line item has been resolved against the menu.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
    pub total_amount: Money,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

//--------------------------------------     OrderRequest      -------------------------------------------------------
/// What a client submits to place an order. Prices are deliberately absent; the menu is the
/// only price authority.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: String,
    pub quantity: i64,
}

//--------------------------------------        Payment        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Copied from the order total at creation time; immutable thereafter.
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// The gateway-assigned trade number. Null until the gateway assigns one; once set it is
    /// never overwritten.
    pub transaction_id: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment       -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub phone_number: Option<String>,
}

impl NewPayment {
    pub fn new(order_id: OrderId, amount: Money, method: PaymentMethod, phone_number: Option<String>) -> Self {
        Self { id: PaymentId::random(), order_id, amount, method, phone_number }
    }
}

//-------------------------------------- ProcessPaymentRequest -------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    #[serde(default)]
    pub phone_number: Option<String>,
}

//--------------------------------------    PaymentReceipt     -------------------------------------------------------
/// The client-facing view of a processed payment. Also the payload of `payment_processed`
/// events pushed to real-time subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

impl PaymentReceipt {
    pub fn new(payment: &Payment, message: impl Into<String>, checkout_url: Option<String>) -> Self {
        Self {
            id: payment.id.clone(),
            order_id: payment.order_id.clone(),
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
            message: message.into(),
            checkout_url,
        }
    }
}
