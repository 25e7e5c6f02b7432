use crate::db_types::Payment;

/// The result of a settlement write.
///
/// `updated` is `false` when the conditional update matched no row because the payment was
/// already in a terminal state. Callers treat that as "someone got here first", not an error;
/// duplicate gateway callbacks land on this path.
#[derive(Debug, Clone)]
pub struct SettlementUpdate {
    pub payment: Payment,
    pub updated: bool,
}
