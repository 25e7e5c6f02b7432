//! The order and payment flow APIs.
//!
//! [`PaymentFlowApi`] handles order intake and payment processing in response to client
//! requests; [`CallbackReconciler`] handles the gateway's asynchronous settlement callbacks;
//! [`OrderLifecycle`] enforces the order status transition table both of them rely on.
mod lifecycle;
mod payment_flow_api;
mod reconciler;
mod strategies;

pub use lifecycle::OrderLifecycle;
pub use payment_flow_api::PaymentFlowApi;
pub use reconciler::CallbackReconciler;
pub use strategies::{CardSettlement, CashSettlement, MobileMoneySettlement, SettlementOutcome, SettlementStrategy};
