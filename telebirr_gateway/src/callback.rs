//! Callback payload normalization.
//!
//! Field names in gateway callbacks vary by integration version (`outTradeNo` vs `out_trade_no`,
//! `status` vs `result`). All of that dialect handling happens here, once, at the boundary; the
//! rest of the system only ever sees a [`CallbackNotice`].

use std::collections::HashMap;

use crate::GatewayError;

/// Status values the gateway uses to report a successful settlement. Anything outside this list
/// is treated as a failure, not as "unknown" — there is no pending-retry state at this layer.
/// Real integrations may define further codes (partial refunds, timeouts); extending this list
/// is the place to handle them.
pub const SUCCESS_VOCABULARY: [&str; 4] = ["SUCCESS", "SUCCEED", "COMPLETED", "PAID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success,
    Failure,
}

/// The canonical shape of a gateway callback, after signature verification.
#[derive(Debug, Clone)]
pub struct CallbackNotice {
    /// The merchant-side trade reference (`outTradeNo`), i.e. our payment id.
    pub trade_ref: Option<String>,
    /// The gateway-assigned trade number (`tradeNo`).
    pub trade_no: Option<String>,
    pub outcome: CallbackOutcome,
}

impl CallbackNotice {
    /// Normalizes a raw callback parameter map. At least one of the two identifiers must be
    /// present, otherwise the callback cannot be matched to anything.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, GatewayError> {
        let trade_ref = first_of(params, &["outTradeNo", "out_trade_no"]);
        let trade_no = first_of(params, &["tradeNo", "trade_no"]);
        if trade_ref.is_none() && trade_no.is_none() {
            return Err(GatewayError::InvalidCallback(
                "callback carries neither outTradeNo nor tradeNo".to_string(),
            ));
        }
        let status = first_of(params, &["status", "result"]).unwrap_or_default();
        let outcome = if SUCCESS_VOCABULARY.contains(&status.to_uppercase().as_str()) {
            CallbackOutcome::Success
        } else {
            CallbackOutcome::Failure
        };
        Ok(Self { trade_ref, trade_no, outcome })
    }
}

fn first_of(params: &HashMap<String, String>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| params.get(*name)).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn camel_case_dialect_is_normalized() {
        let notice =
            CallbackNotice::from_params(&params(&[("outTradeNo", "pay-1"), ("tradeNo", "TB-9"), ("status", "SUCCESS")]))
                .unwrap();
        assert_eq!(notice.trade_ref.as_deref(), Some("pay-1"));
        assert_eq!(notice.trade_no.as_deref(), Some("TB-9"));
        assert_eq!(notice.outcome, CallbackOutcome::Success);
    }

    #[test]
    fn snake_case_dialect_is_normalized() {
        let notice =
            CallbackNotice::from_params(&params(&[("out_trade_no", "pay-1"), ("trade_no", "TB-9"), ("result", "paid")]))
                .unwrap();
        assert_eq!(notice.trade_ref.as_deref(), Some("pay-1"));
        assert_eq!(notice.trade_no.as_deref(), Some("TB-9"));
        assert_eq!(notice.outcome, CallbackOutcome::Success);
    }

    #[test]
    fn success_vocabulary_is_case_insensitive() {
        for word in ["SUCCESS", "succeed", "Completed", "PAID"] {
            let notice = CallbackNotice::from_params(&params(&[("outTradeNo", "pay-1"), ("status", word)])).unwrap();
            assert_eq!(notice.outcome, CallbackOutcome::Success, "{word} should count as success");
        }
    }

    #[test]
    fn anything_else_is_a_failure_not_unknown() {
        for word in ["FAILED", "CANCELLED", "TIMEOUT", "", "banana"] {
            let notice = CallbackNotice::from_params(&params(&[("outTradeNo", "pay-1"), ("status", word)])).unwrap();
            assert_eq!(notice.outcome, CallbackOutcome::Failure, "{word:?} should count as failure");
        }
    }

    #[test]
    fn a_callback_without_identifiers_is_rejected() {
        let result = CallbackNotice::from_params(&params(&[("status", "SUCCESS")]));
        assert!(matches!(result, Err(GatewayError::InvalidCallback(_))));
    }

    #[test]
    fn empty_identifier_values_count_as_absent() {
        let result = CallbackNotice::from_params(&params(&[("outTradeNo", ""), ("tradeNo", ""), ("status", "SUCCESS")]));
        assert!(matches!(result, Err(GatewayError::InvalidCallback(_))));
    }
}
