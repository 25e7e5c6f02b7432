//! Per-method settlement strategies.
//!
//! The payment-method dispatch is a closed set, one strategy per variant. Adding a method
//! means adding a strategy and registering it in [`super::PaymentFlowApi::new`]; the
//! orchestrator itself does not change.

use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use telebirr_gateway::{GatewayClient, InitiateRequest};

use crate::{
    db_types::{Order, Payment, PaymentStatus},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

/// What a settlement attempt produced.
#[derive(Debug)]
pub enum SettlementOutcome {
    /// The payment settled synchronously; the order can be confirmed right away.
    Settled { payment: Payment, message: String },
    /// The gateway accepted the initiation; final settlement arrives later via callback.
    /// The order is not advanced yet.
    AwaitingGateway { payment: Payment, checkout_url: String, message: String },
}

#[async_trait]
pub trait SettlementStrategy<B: PaymentGatewayDatabase>: Send + Sync {
    /// Attempts to settle the given `processing` payment. Implementations must leave the
    /// payment in a well-defined state on every path: settled, awaiting callback, or failed —
    /// never silently stuck in `processing`.
    async fn settle(&self, db: &B, order: &Order, payment: &Payment) -> Result<SettlementOutcome, PaymentGatewayError>;
}

/// Cash is taken at pickup; there is no external confirmation to wait for.
pub struct CashSettlement;

#[async_trait]
impl<B: PaymentGatewayDatabase> SettlementStrategy<B> for CashSettlement {
    async fn settle(
        &self,
        db: &B,
        _order: &Order,
        payment: &Payment,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let update = db.settle_payment(&payment.id, PaymentStatus::Completed, None).await?;
        Ok(SettlementOutcome::Settled {
            payment: update.payment,
            message: "Cash payment received - order confirmed".to_string(),
        })
    }
}

/// Card payments settle locally. A real acquirer integration would slot in here the same way
/// the mobile-money strategy wraps its gateway.
pub struct CardSettlement;

#[async_trait]
impl<B: PaymentGatewayDatabase> SettlementStrategy<B> for CardSettlement {
    async fn settle(
        &self,
        db: &B,
        _order: &Order,
        payment: &Payment,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let update = db.settle_payment(&payment.id, PaymentStatus::Completed, None).await?;
        Ok(SettlementOutcome::Settled {
            payment: update.payment,
            message: "Payment processed successfully via card".to_string(),
        })
    }
}

/// Mobile money goes through the gateway: initiate, hand the customer a checkout URL, and
/// wait for the asynchronous callback to settle.
pub struct MobileMoneySettlement {
    gateway: Arc<dyn GatewayClient>,
}

impl MobileMoneySettlement {
    pub fn new(gateway: Arc<dyn GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<B: PaymentGatewayDatabase> SettlementStrategy<B> for MobileMoneySettlement {
    async fn settle(&self, db: &B, order: &Order, payment: &Payment) -> Result<SettlementOutcome, PaymentGatewayError> {
        let request = InitiateRequest {
            out_trade_no: payment.id.to_string(),
            subject: format!("Restaurant order {}", order.order_id),
            amount: payment.amount,
            msisdn: payment.phone_number.clone(),
        };
        match self.gateway.initiate(&request).await {
            Ok(intent) => {
                let payment = db.mark_payment_pending(&payment.id, &intent.trade_no).await?;
                Ok(SettlementOutcome::AwaitingGateway {
                    payment,
                    checkout_url: intent.checkout_url,
                    message: "Proceed to Telebirr to complete payment".to_string(),
                })
            },
            Err(e) => {
                warn!("💰️ Gateway initiation for payment [{}] failed: {e}", payment.id);
                // the payment must not be left `processing` after a known initiation failure
                db.settle_payment(&payment.id, PaymentStatus::Failed, None).await?;
                Err(e.into())
            },
        }
    }
}
