//! Real-time notification fan-out.
//!
//! State changes in the engine are pushed to connected clients (kitchen displays, customer
//! apps) as [`Event`]s through the [`NotificationHub`]. Delivery is best-effort and
//! fire-and-forget: a dropped event costs a UI refresh, never payment or order state.
mod event_types;
mod hub;

pub use event_types::Event;
pub use hub::{NotificationHub, SubscriberRole, Subscription};
