use std::{collections::HashMap, sync::Arc};

use log::*;
use telebirr_gateway::{CallbackOutcome, GatewayClient};

use super::OrderLifecycle;
use crate::{
    db_types::{Payment, PaymentReceipt, PaymentStatus},
    events::{Event, NotificationHub},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

/// Applies the gateway's asynchronous settlement callbacks to the payment records.
///
/// Callbacks are hostile input until proven otherwise: the signature is verified before
/// anything is read, and nothing in the database changes on a verification failure. Verified
/// callbacks are applied idempotently; the gateway may retry a notification any number of
/// times and every delivery after the first is a no-op.
#[derive(Clone)]
pub struct CallbackReconciler<B> {
    db: B,
    lifecycle: OrderLifecycle<B>,
    gateway: Arc<dyn GatewayClient>,
    hub: NotificationHub,
}

impl<B: PaymentGatewayDatabase> CallbackReconciler<B> {
    pub fn new(db: B, gateway: Arc<dyn GatewayClient>, hub: NotificationHub) -> Self {
        Self { lifecycle: OrderLifecycle::new(db.clone()), db, gateway, hub }
    }

    /// Verifies, matches and applies one callback delivery.
    ///
    /// The payment is matched by our trade reference first and by the gateway's trade number
    /// as a fallback, since dialects differ in which identifier they echo back. Settlement
    /// goes through the conditional settlement primitive, so a payment that is already
    /// terminal is left exactly as it stands.
    pub async fn handle_callback(&self, params: &HashMap<String, String>) -> Result<PaymentReceipt, PaymentGatewayError> {
        let notice = self.gateway.decode_callback(params)?;
        let payment = self.resolve_payment(notice.trade_ref.as_deref(), notice.trade_no.as_deref()).await?;
        let target = match notice.outcome {
            CallbackOutcome::Success => PaymentStatus::Completed,
            CallbackOutcome::Failure => PaymentStatus::Failed,
        };
        let update = self.db.settle_payment(&payment.id, target, notice.trade_no.as_deref()).await?;
        if update.updated {
            info!("💰️ Payment [{}] settled as {} by gateway callback", update.payment.id, update.payment.status);
        } else {
            debug!(
                "💰️ Duplicate callback for payment [{}]; already {}",
                update.payment.id, update.payment.status
            );
        }
        if update.payment.status == PaymentStatus::Completed {
            self.lifecycle.confirm_after_settlement(&update.payment.order_id).await?;
        }
        let message = match update.payment.status {
            PaymentStatus::Completed => "Payment completed",
            PaymentStatus::Failed => "Payment failed",
            _ => "Payment pending",
        };
        let receipt = PaymentReceipt::new(&update.payment, message, None);
        self.hub.broadcast(Event::PaymentProcessed(receipt.clone()));
        Ok(receipt)
    }

    async fn resolve_payment(
        &self,
        trade_ref: Option<&str>,
        trade_no: Option<&str>,
    ) -> Result<Payment, PaymentGatewayError> {
        if let Some(reference) = trade_ref {
            if let Some(payment) = self.db.fetch_payment(&reference.into()).await? {
                return Ok(payment);
            }
        }
        if let Some(txid) = trade_no {
            if let Some(payment) = self.db.fetch_payment_by_transaction_id(txid).await? {
                return Ok(payment);
            }
        }
        let hint = trade_ref.or(trade_no).unwrap_or("<none>").to_string();
        warn!("💰️ Callback references unknown payment: {hint}");
        Err(PaymentGatewayError::PaymentNotFound(hint))
    }
}
