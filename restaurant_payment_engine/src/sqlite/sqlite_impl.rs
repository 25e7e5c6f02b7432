//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`crate::traits`] module's
//! [`PaymentGatewayDatabase`] trait. The conditional-update contracts are discharged by the
//! SQL itself; see the [`db`](super::db) query modules.
use std::fmt::Debug;

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::db::{create_schema, db_url, menu, new_pool, orders, payments};
use crate::{
    db_types::{MenuItem, NewOrder, NewPayment, Order, OrderId, OrderStatus, Payment, PaymentId, PaymentStatus},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, SettlementUpdate},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database given by the `RPE_DATABASE_URL` environment variable, creating
    /// the file and the schema if needed.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        create_schema(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::update_order_status(id, from, to, &mut conn).await?)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment(id, &mut conn).await?)
    }

    async fn fetch_payment_by_transaction_id(&self, txid: &str) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_transaction_id(txid, &mut conn).await?)
    }

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_order(order_id, &mut conn).await?)
    }

    async fn mark_payment_pending(&self, id: &PaymentId, trade_no: &str) -> Result<Payment, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::mark_payment_pending(id, trade_no, &mut conn).await
    }

    async fn settle_payment(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
        trade_no: Option<&str>,
    ) -> Result<SettlementUpdate, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::settle_payment(id, status, trade_no, &mut conn).await
    }

    async fn fetch_menu_item(&self, id: &str) -> Result<Option<MenuItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(menu::fetch_menu_item(id, &mut conn).await?)
    }

    async fn upsert_menu_item(&self, item: MenuItem) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(menu::upsert_menu_item(item, &mut conn).await?)
    }
}
