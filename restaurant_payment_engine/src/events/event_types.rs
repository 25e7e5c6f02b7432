use serde::Serialize;

use crate::db_types::{Order, PaymentReceipt};

/// The envelope pushed to real-time subscribers. Serializes as
/// `{"type": "payment_processed", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    NewOrder(Order),
    OrderStatusUpdated(Order),
    PaymentProcessed(PaymentReceipt),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NewOrder(_) => "new_order",
            Event::OrderStatusUpdated(_) => "order_status_updated",
            Event::PaymentProcessed(_) => "payment_processed",
        }
    }
}
