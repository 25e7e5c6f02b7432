//! End-to-end flows over a real SQLite database: order intake, synchronous and asynchronous
//! settlement, callback reconciliation, and the order status state machine.
mod common;

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::{init_logging, new_db, MockGateway};
use restaurant_payment_engine::{
    db_types::{OrderLineRequest, OrderRequest, OrderStatus, PaymentMethod, PaymentStatus, ProcessPaymentRequest},
    events::{Event, NotificationHub, SubscriberRole, Subscription},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
    CallbackReconciler,
    PaymentFlowApi,
};
use rpe_common::Money;
use telebirr_gateway::{
    signing::{sign_params, SIGN_FIELD},
    CheckoutIntent,
    GatewayConfig,
    GatewayError,
    TelebirrGateway,
};
use tokio::time::timeout;

const TEST_SECRET: &str = "integration-test-secret";

fn two_burger_order() -> OrderRequest {
    OrderRequest {
        customer_id: "cust-1".to_string(),
        items: vec![OrderLineRequest { menu_item_id: "burger".to_string(), quantity: 2 }],
    }
}

fn real_gateway() -> Arc<TelebirrGateway> {
    let config = GatewayConfig { app_secret: TEST_SECRET.into(), ..GatewayConfig::default() };
    Arc::new(TelebirrGateway::new(config).expect("could not build the gateway client"))
}

/// A success callback in the gateway's camelCase dialect, signed with the test secret.
fn signed_callback(out_trade_no: &str, trade_no: &str, status: &str) -> HashMap<String, String> {
    let mut params = HashMap::from([
        ("outTradeNo".to_string(), out_trade_no.to_string()),
        ("tradeNo".to_string(), trade_no.to_string()),
        ("status".to_string(), status.to_string()),
    ]);
    let sign = sign_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())), TEST_SECRET);
    params.insert(SIGN_FIELD.to_string(), sign);
    params
}

async fn expect_event(subscription: &mut Subscription) -> Event {
    timeout(Duration::from_secs(1), subscription.recv()).await.expect("timed out waiting for event").expect("hub closed")
}

async fn expect_silence(subscription: &mut Subscription) {
    assert!(timeout(Duration::from_millis(100), subscription.recv()).await.is_err(), "unexpected event");
}

#[tokio::test]
async fn cash_payment_settles_immediately_and_confirms_the_order() {
    init_logging();
    let (db, _dir) = new_db().await;
    let hub = NotificationHub::new(16);
    let mut kitchen = hub.subscribe(SubscriberRole::Kitchen).await.unwrap();
    let mut customer = hub.subscribe(SubscriberRole::Unrestricted).await.unwrap();
    let api = PaymentFlowApi::new(db.clone(), Arc::new(MockGateway::new()), hub);

    let order = api.place_order(two_burger_order()).await.unwrap();
    assert_eq!(order.total_amount, Money::from_cents(3198));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].line_total, Money::from_cents(3198));

    // only the kitchen hears about new orders
    assert_eq!(expect_event(&mut kitchen).await.kind(), "new_order");
    expect_silence(&mut customer).await;

    let receipt = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::Cash,
            phone_number: None,
        })
        .await
        .unwrap();
    assert_eq!(receipt.status, PaymentStatus::Completed);
    assert_eq!(receipt.amount, Money::from_cents(3198));
    assert_eq!(receipt.message, "Cash payment received - order confirmed");
    assert!(receipt.checkout_url.is_none());

    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    assert_eq!(expect_event(&mut kitchen).await.kind(), "payment_processed");
    assert_eq!(expect_event(&mut customer).await.kind(), "payment_processed");
}

#[tokio::test]
async fn the_order_total_comes_from_the_menu_not_the_client() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db, Arc::new(MockGateway::new()), NotificationHub::new(16));

    let order = api
        .place_order(OrderRequest {
            customer_id: "cust-2".to_string(),
            items: vec![
                OrderLineRequest { menu_item_id: "burger".to_string(), quantity: 1 },
                OrderLineRequest { menu_item_id: "fries".to_string(), quantity: 3 },
            ],
        })
        .await
        .unwrap();
    assert_eq!(order.total_amount, Money::from_cents(1599 + 3 * 450));
}

#[tokio::test]
async fn unavailable_and_unknown_menu_items_are_rejected() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db, Arc::new(MockGateway::new()), NotificationHub::new(16));

    let unavailable = OrderRequest {
        customer_id: "cust-3".to_string(),
        items: vec![OrderLineRequest { menu_item_id: "special".to_string(), quantity: 1 }],
    };
    assert!(matches!(api.place_order(unavailable).await, Err(PaymentGatewayError::MenuItemNotFound(id)) if id == "special"));

    let unknown = OrderRequest {
        customer_id: "cust-3".to_string(),
        items: vec![OrderLineRequest { menu_item_id: "sushi".to_string(), quantity: 1 }],
    };
    assert!(matches!(api.place_order(unknown).await, Err(PaymentGatewayError::MenuItemNotFound(_))));

    let empty = OrderRequest { customer_id: "cust-3".to_string(), items: vec![] };
    assert!(matches!(api.place_order(empty).await, Err(PaymentGatewayError::InvalidOrder(_))));
}

#[tokio::test]
async fn an_overflowing_quantity_is_rejected_not_wrapped() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db, Arc::new(MockGateway::new()), NotificationHub::new(16));

    let hostile = OrderRequest {
        customer_id: "cust-4".to_string(),
        items: vec![OrderLineRequest { menu_item_id: "burger".to_string(), quantity: i64::MAX }],
    };
    assert!(matches!(api.place_order(hostile).await, Err(PaymentGatewayError::InvalidOrder(_))));
}

#[tokio::test]
async fn a_gateway_rejection_fails_the_payment_and_leaves_the_order_pending() {
    init_logging();
    let (db, _dir) = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().returning(|_| Err(GatewayError::Rejected("insufficient merchant balance".into())));
    let api = PaymentFlowApi::new(db.clone(), Arc::new(gateway), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    let result = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::MobileMoney,
            phone_number: Some("+251900000000".to_string()),
        })
        .await;
    assert!(matches!(result, Err(PaymentGatewayError::Gateway(GatewayError::Rejected(_)))));

    // the attempt is recorded as failed, and the order is untouched and retryable
    let payments = db.fetch_payments_for_order(&order.order_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Failed);
    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn mobile_money_settles_via_callback_and_duplicates_are_harmless() {
    init_logging();
    let (db, _dir) = new_db().await;
    let hub = NotificationHub::new(16);
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().returning(|_| {
        Ok(CheckoutIntent { checkout_url: "https://checkout.telebirr.com/xyz".to_string(), trade_no: "TB-100".to_string() })
    });
    let api = PaymentFlowApi::new(db.clone(), Arc::new(gateway), hub.clone());
    let reconciler = CallbackReconciler::new(db.clone(), real_gateway(), hub);

    let order = api.place_order(two_burger_order()).await.unwrap();
    let receipt = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::MobileMoney,
            phone_number: Some("+251900000000".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(receipt.status, PaymentStatus::Pending);
    assert_eq!(receipt.checkout_url.as_deref(), Some("https://checkout.telebirr.com/xyz"));
    assert_eq!(receipt.transaction_id.as_deref(), Some("TB-100"));
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatus::Pending);

    let callback = signed_callback(receipt.id.as_str(), "TB-100", "SUCCESS");
    let settled = reconciler.handle_callback(&callback).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatus::Confirmed);

    // the gateway may redeliver; the second application changes nothing and raises no error
    let again = reconciler.handle_callback(&callback).await.unwrap();
    assert_eq!(again.status, PaymentStatus::Completed);
    let payments = db.fetch_payments_for_order(&order.order_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].transaction_id.as_deref(), Some("TB-100"));
}

#[tokio::test]
async fn callbacks_can_match_by_trade_number_alone() {
    init_logging();
    let (db, _dir) = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().returning(|_| {
        Ok(CheckoutIntent { checkout_url: "https://checkout.telebirr.com/abc".to_string(), trade_no: "TB-200".to_string() })
    });
    let api = PaymentFlowApi::new(db.clone(), Arc::new(gateway), NotificationHub::new(16));
    let reconciler = CallbackReconciler::new(db.clone(), real_gateway(), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    api.process_payment(ProcessPaymentRequest {
        order_id: order.order_id.clone(),
        method: PaymentMethod::MobileMoney,
        phone_number: None,
    })
    .await
    .unwrap();

    // no merchant trade reference in the payload, only the gateway's trade number
    let mut params = HashMap::from([("tradeNo".to_string(), "TB-200".to_string()), ("status".to_string(), "PAID".to_string())]);
    let sign = sign_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())), TEST_SECRET);
    params.insert(SIGN_FIELD.to_string(), sign);

    let receipt = reconciler.handle_callback(&params).await.unwrap();
    assert_eq!(receipt.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn a_failure_callback_fails_the_payment_without_touching_the_order() {
    init_logging();
    let (db, _dir) = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().returning(|_| {
        Ok(CheckoutIntent { checkout_url: "https://checkout.telebirr.com/def".to_string(), trade_no: "TB-300".to_string() })
    });
    let api = PaymentFlowApi::new(db.clone(), Arc::new(gateway), NotificationHub::new(16));
    let reconciler = CallbackReconciler::new(db.clone(), real_gateway(), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    let receipt = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::MobileMoney,
            phone_number: None,
        })
        .await
        .unwrap();

    let callback = signed_callback(receipt.id.as_str(), "TB-300", "FAILED");
    let settled = reconciler.handle_callback(&callback).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Failed);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn a_tampered_callback_changes_nothing() {
    init_logging();
    let (db, _dir) = new_db().await;
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().returning(|_| {
        Ok(CheckoutIntent { checkout_url: "https://checkout.telebirr.com/ghi".to_string(), trade_no: "TB-400".to_string() })
    });
    let api = PaymentFlowApi::new(db.clone(), Arc::new(gateway), NotificationHub::new(16));
    let reconciler = CallbackReconciler::new(db.clone(), real_gateway(), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    let receipt = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::MobileMoney,
            phone_number: None,
        })
        .await
        .unwrap();

    let mut callback = signed_callback(receipt.id.as_str(), "TB-400", "SUCCESS");
    callback.insert("status".to_string(), "FAILED".to_string());
    let result = reconciler.handle_callback(&callback).await;
    assert!(matches!(result, Err(PaymentGatewayError::Gateway(GatewayError::SignatureMismatch))));

    let payment = api.payment_status(&receipt.id).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn a_settled_order_refuses_further_payment_attempts() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db, Arc::new(MockGateway::new()), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    let request =
        ProcessPaymentRequest { order_id: order.order_id.clone(), method: PaymentMethod::Cash, phone_number: None };
    api.process_payment(request.clone()).await.unwrap();
    let result = api.process_payment(request).await;
    assert!(matches!(result, Err(PaymentGatewayError::OrderAlreadySettled(id)) if id == order.order_id));
}

#[tokio::test]
async fn settlement_never_overwrites_a_terminal_payment() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db.clone(), Arc::new(MockGateway::new()), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    let receipt = api
        .process_payment(ProcessPaymentRequest {
            order_id: order.order_id.clone(),
            method: PaymentMethod::Card,
            phone_number: None,
        })
        .await
        .unwrap();
    assert_eq!(receipt.status, PaymentStatus::Completed);

    // a late failure report loses the race against the completed settlement
    let update = db.settle_payment(&receipt.id, PaymentStatus::Failed, None).await.unwrap();
    assert!(!update.updated);
    assert_eq!(update.payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn the_order_lifecycle_rejects_backward_transitions() {
    init_logging();
    let (db, _dir) = new_db().await;
    let api = PaymentFlowApi::new(db.clone(), Arc::new(MockGateway::new()), NotificationHub::new(16));

    let order = api.place_order(two_burger_order()).await.unwrap();
    api.process_payment(ProcessPaymentRequest {
        order_id: order.order_id.clone(),
        method: PaymentMethod::Cash,
        phone_number: None,
    })
    .await
    .unwrap();

    api.update_order_status(&order.order_id, OrderStatus::Preparing).await.unwrap();
    api.update_order_status(&order.order_id, OrderStatus::Ready).await.unwrap();

    let result = api.update_order_status(&order.order_id, OrderStatus::Preparing).await;
    assert!(matches!(
        result,
        Err(PaymentGatewayError::InvalidTransition { from: OrderStatus::Ready, to: OrderStatus::Preparing })
    ));
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatus::Ready);

    api.update_order_status(&order.order_id, OrderStatus::Completed).await.unwrap();
    let result = api.update_order_status(&order.order_id, OrderStatus::Cancelled).await;
    assert!(matches!(result, Err(PaymentGatewayError::InvalidTransition { .. })));
}

#[tokio::test]
async fn status_updates_are_broadcast_to_everyone() {
    init_logging();
    let (db, _dir) = new_db().await;
    let hub = NotificationHub::new(16);
    let api = PaymentFlowApi::new(db, Arc::new(MockGateway::new()), hub.clone());

    let order = api.place_order(two_burger_order()).await.unwrap();
    api.process_payment(ProcessPaymentRequest {
        order_id: order.order_id.clone(),
        method: PaymentMethod::Cash,
        phone_number: None,
    })
    .await
    .unwrap();

    let mut customer = hub.subscribe(SubscriberRole::Unrestricted).await.unwrap();
    api.update_order_status(&order.order_id, OrderStatus::Preparing).await.unwrap();
    match expect_event(&mut customer).await {
        Event::OrderStatusUpdated(order) => assert_eq!(order.status, OrderStatus::Preparing),
        other => panic!("expected an order status event, got {}", other.kind()),
    }
}
