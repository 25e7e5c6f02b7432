//! # Telebirr gateway integration
//!
//! This crate talks to the Telebirr mobile-money gateway on behalf of the restaurant payment
//! engine. It owns the three protocol concerns the gateway imposes:
//!
//! 1. **Request signing** ([`mod@signing`]). Every outbound parameter set is signed with
//!    HMAC-SHA256 over the lexicographically sorted `key=value` concatenation, using the
//!    merchant's shared secret.
//! 2. **Payment initiation** ([`mod@client`]). A signed request is POSTed to the gateway, which
//!    answers with a checkout URL the customer is redirected to, plus a gateway-assigned trade
//!    number. Transport failures and gateway rejections are distinguishable so callers can mark
//!    the payment failed instead of leaving it in limbo.
//! 3. **Callback verification and normalization** ([`mod@callback`]). The gateway confirms final
//!    payment outcomes with an asynchronous HTTP push. Callbacks are signature-checked with the
//!    same scheme (fail closed), and the loosely-named payload fields are normalized into one
//!    canonical [`CallbackNotice`] shape at the boundary.
//!
//! The [`GatewayClient`] trait is the seam the engine consumes, so tests can substitute a mock
//! without an HTTP stack.
mod callback;
mod client;
mod config;
mod error;
pub mod signing;

pub use callback::{CallbackNotice, CallbackOutcome, SUCCESS_VOCABULARY};
pub use client::{CheckoutIntent, GatewayClient, InitiateRequest, TelebirrGateway};
pub use config::GatewayConfig;
pub use error::GatewayError;
