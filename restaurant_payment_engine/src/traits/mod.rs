//! # Persistence contracts
//!
//! This module defines the interface the payment engine expects from a storage backend.
//!
//! The engine never does read-modify-write on payment or order status at the application
//! level. Every status change goes through one of the backend's *conditional update*
//! primitives ([`PaymentGatewayDatabase::settle_payment`],
//! [`PaymentGatewayDatabase::update_order_status`]), which only write when the row is still in
//! the expected prior state. That is what keeps a race between the payment initiation path and
//! the gateway callback path from producing an inconsistent terminal state.
mod data_objects;
mod payment_gateway_database;

pub use data_objects::SettlementUpdate;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
