use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatus},
    traits::PaymentGatewayError,
};

/// Inserts the order row and its line items using the given connection. This is not atomic on
/// its own; callers wrap it in a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let now = Utc::now();
    let mut inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, customer_id, total_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.customer_id)
    .bind(order.total_amount)
    .bind(OrderStatus::Pending)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        let row: OrderItem = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, menu_item_id, name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *;
            "#,
        )
        .bind(&order.order_id)
        .bind(&item.menu_item_id)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.line_total)
        .fetch_one(&mut *conn)
        .await?;
        inserted.items.push(row);
    }
    debug!("🗃️ Order [{}] inserted with {} items", inserted.order_id, inserted.items.len());
    Ok(inserted)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id).fetch_optional(&mut *conn).await?;
    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(Some(order))
}

/// Conditionally advances the order status. The `WHERE status = $from` clause makes the update
/// atomic; `None` means the precondition no longer held.
pub async fn update_order_status(
    order_id: &OrderId,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE order_id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(Utc::now())
    .bind(order_id)
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(mut order) = updated else {
        return Ok(None);
    };
    order.items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(Some(order))
}
