//! Shared fixtures for the integration tests: a throwaway SQLite database seeded with a small
//! menu, and a mockable gateway client.
use std::collections::HashMap;

use async_trait::async_trait;
use mockall::mock;
use restaurant_payment_engine::{db_types::MenuItem, SqliteDatabase};
use rpe_common::Money;
use telebirr_gateway::{CallbackNotice, CheckoutIntent, GatewayClient, GatewayError, InitiateRequest};
use tempfile::TempDir;

mock! {
    pub Gateway {}

    #[async_trait]
    impl GatewayClient for Gateway {
        async fn initiate(&self, request: &InitiateRequest) -> Result<CheckoutIntent, GatewayError>;
        fn decode_callback(&self, params: &HashMap<String, String>) -> Result<CallbackNotice, GatewayError>;
    }
}

pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// A fresh file-backed database with the schema applied and the test menu seeded. The
/// `TempDir` must be held for as long as the database is in use.
pub async fn new_db() -> (SqliteDatabase, TempDir) {
    let dir = TempDir::new().expect("could not create a temporary directory");
    let url = format!("sqlite://{}/test.db", dir.path().display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("could not open the test database");
    seed_menu(&db).await;
    (db, dir)
}

async fn seed_menu(db: &SqliteDatabase) {
    use restaurant_payment_engine::traits::PaymentGatewayDatabase;
    let menu = [
        MenuItem { id: "burger".into(), name: "Beef Burger".into(), price: Money::from_cents(1599), available: true },
        MenuItem { id: "fries".into(), name: "Fries".into(), price: Money::from_cents(450), available: true },
        MenuItem { id: "special".into(), name: "Off-menu Special".into(), price: Money::from_cents(2500), available: false },
    ];
    for item in menu {
        db.upsert_menu_item(item).await.expect("could not seed the menu");
    }
}
