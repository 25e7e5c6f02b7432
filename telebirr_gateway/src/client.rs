use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use reqwest::Client;
use rpe_common::Money;
use serde::Deserialize;

use crate::{
    signing::{sign_params, verify_params, SIGN_FIELD},
    CallbackNotice,
    GatewayConfig,
    GatewayError,
};

const INITIATE_PATH: &str = "/payment/v1/merchantPay";
/// Response codes the gateway uses to signal acceptance of an initiation request.
const SUCCESS_CODES: [&str; 2] = ["SUCCESS", "200"];

/// A request to start a mobile-money payment.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    /// The merchant-side trade reference, used to correlate the eventual callback.
    pub out_trade_no: String,
    /// Human-readable subject line shown on the customer's checkout page.
    pub subject: String,
    pub amount: Money,
    /// The payer's phone number, if the client supplied one.
    pub msisdn: Option<String>,
}

/// What the gateway hands back for an accepted initiation.
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    /// Where the customer must be redirected to complete the payment.
    pub checkout_url: String,
    /// The gateway-assigned trade number for this payment attempt.
    pub trade_no: String,
}

/// The seam between the payment engine and the gateway wire protocol. The engine's mobile-money
/// strategy and callback reconciler only ever see this trait, so tests can swap in a mock.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Builds, signs and submits an initiation request, returning the checkout redirect.
    async fn initiate(&self, request: &InitiateRequest) -> Result<CheckoutIntent, GatewayError>;

    /// Verifies a callback's signature and normalizes its payload. Fails closed on any
    /// signature mismatch; callers must not mutate state in that case.
    fn decode_callback(&self, params: &HashMap<String, String>) -> Result<CallbackNotice, GatewayError>;
}

#[derive(Deserialize)]
struct GatewayResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: GatewayResponseData,
}

#[derive(Deserialize, Default)]
struct GatewayResponseData {
    #[serde(rename = "toPayUrl", default)]
    to_pay_url: String,
    #[serde(rename = "tradeNo", default)]
    trade_no: String,
}

/// The production [`GatewayClient`] backed by an HTTP client with an explicit timeout.
#[derive(Clone)]
pub struct TelebirrGateway {
    config: GatewayConfig,
    client: Client,
}

impl TelebirrGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Assembles the signed parameter set for an initiation request. The nonce is a fresh
    /// random value per request; the amount is rendered as a fixed two-decimal string.
    fn build_params(&self, request: &InitiateRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("appId".to_string(), self.config.app_id.clone()),
            ("outTradeNo".to_string(), request.out_trade_no.clone()),
            ("subject".to_string(), request.subject.clone()),
            ("totalAmount".to_string(), request.amount.to_string()),
            ("shortCode".to_string(), self.config.short_code.clone()),
            ("nonceStr".to_string(), rand::random::<u64>().to_string()),
            ("timestamp".to_string(), Utc::now().timestamp().to_string()),
            ("returnUrl".to_string(), self.config.return_url.clone()),
            ("notifyUrl".to_string(), self.config.notify_url.clone()),
        ];
        if let Some(msisdn) = &request.msisdn {
            params.push(("msisdn".to_string(), msisdn.clone()));
        }
        let sign =
            sign_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())), self.config.app_secret.reveal());
        params.push((SIGN_FIELD.to_string(), sign));
        params
    }
}

#[async_trait]
impl GatewayClient for TelebirrGateway {
    async fn initiate(&self, request: &InitiateRequest) -> Result<CheckoutIntent, GatewayError> {
        let url = format!("{}{INITIATE_PATH}", self.config.api_base);
        let body: HashMap<String, String> = self.build_params(request).into_iter().collect();
        trace!("💳️ Initiating payment [{}] at {url}", request.out_trade_no);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let response: GatewayResponse =
            response.json().await.map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !SUCCESS_CODES.contains(&response.code.as_str()) {
            warn!("💳️ Gateway rejected payment [{}]: {}", request.out_trade_no, response.msg);
            return Err(GatewayError::Rejected(response.msg));
        }
        debug!(
            "💳️ Payment [{}] accepted by gateway. Trade number {}",
            request.out_trade_no, response.data.trade_no
        );
        Ok(CheckoutIntent { checkout_url: response.data.to_pay_url, trade_no: response.data.trade_no })
    }

    fn decode_callback(&self, params: &HashMap<String, String>) -> Result<CallbackNotice, GatewayError> {
        let supplied_sign = params.get(SIGN_FIELD).map(|s| s.as_str());
        verify_params(
            params.iter().filter(|(k, _)| k.as_str() != SIGN_FIELD).map(|(k, v)| (k.as_str(), v.as_str())),
            supplied_sign,
            self.config.app_secret.reveal(),
        )?;
        CallbackNotice::from_params(params)
    }
}
