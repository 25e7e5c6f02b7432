//! # Restaurant Payment Engine
//!
//! The core of the restaurant ordering system: the order status state machine, payment
//! orchestration across settlement methods, reconciliation of asynchronous gateway callbacks,
//! and the real-time notification fan-out that keeps kitchen and customer clients in sync.
//!
//! The library is divided into three main sections:
//! 1. Persistence ([`mod@traits`] and the SQLite backend). The engine never talks SQL at its
//!    call sites; everything goes through [`PaymentGatewayDatabase`], whose update primitives
//!    are atomic conditional writes. That contract is what makes a race between a slow gateway
//!    initiation response and a fast callback safe.
//! 2. The flow APIs: [`PaymentFlowApi`] drives order intake and payment processing,
//!    [`CallbackReconciler`] idempotently matches gateway callbacks to pending payments, and
//!    [`OrderLifecycle`] enforces the order status transition table.
//! 3. Events ([`mod@events`]). State changes are published to the [`events::NotificationHub`],
//!    an actor-style fan-out that delivers best-effort to connected real-time clients,
//!    partitioned by role. A slow subscriber loses events; it never blocks a payment.
//!
//! Everything around this core (HTTP routing, authentication, menu administration) is expected
//! to live in a thin server layer that calls into these APIs.
pub mod db_types;
pub mod events;
mod order_flow;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use order_flow::{
    CallbackReconciler,
    CashSettlement,
    CardSettlement,
    MobileMoneySettlement,
    OrderLifecycle,
    PaymentFlowApi,
    SettlementOutcome,
    SettlementStrategy,
};
pub use traits::{PaymentGatewayDatabase, PaymentGatewayError, SettlementUpdate};
