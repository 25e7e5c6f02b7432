use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentId, PaymentStatus},
    traits::{PaymentGatewayError, SettlementUpdate},
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentGatewayError> {
    let now = Utc::now();
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (id, order_id, amount, method, status, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.amount)
    .bind(payment.method)
    .bind(PaymentStatus::Processing)
    .bind(&payment.phone_number)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment(id: &PaymentId, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_payment_by_transaction_id(
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1").bind(txid).fetch_optional(conn).await
}

pub async fn fetch_payments_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at, id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

/// Records the gateway trade number and moves the payment from `processing` to `pending`. If a
/// fast callback already settled the payment, the row is returned as it stands, with the trade
/// number backfilled if it was still empty.
pub async fn mark_payment_pending(
    id: &PaymentId,
    trade_no: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let updated: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = CASE WHEN status = 'processing' THEN 'pending' ELSE status END,
                transaction_id = COALESCE(transaction_id, $1),
                updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(trade_no)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or_else(|| PaymentGatewayError::PaymentNotFound(id.to_string()))
}

/// The settlement primitive. Writes the terminal `status` only while the payment is still
/// `processing` or `pending`, and backfills the trade number only when it is empty. A payment
/// that is already terminal is returned unchanged with `updated == false`, which is what makes
/// duplicate callbacks harmless.
pub async fn settle_payment(
    id: &PaymentId,
    status: PaymentStatus,
    trade_no: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<SettlementUpdate, PaymentGatewayError> {
    if !status.is_terminal() {
        return Err(PaymentGatewayError::PaymentStatusUpdateError(format!(
            "{status} is not a terminal payment status"
        )));
    }
    let updated: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = $1,
                transaction_id = COALESCE(transaction_id, $2),
                updated_at = $3
            WHERE id = $4 AND status IN ('processing', 'pending')
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(trade_no)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(payment) => Ok(SettlementUpdate { payment, updated: true }),
        None => {
            let payment = fetch_payment(id, conn)
                .await?
                .ok_or_else(|| PaymentGatewayError::PaymentNotFound(id.to_string()))?;
            debug!("🗃️ Payment [{}] is already {}; settlement left it untouched", payment.id, payment.status);
            Ok(SettlementUpdate { payment, updated: false })
        },
    }
}
