//! Integration tests for the assembled storefront.

use std::time::Duration;

use common::{ProductCode, Run, ShipmentStatus};
use domain::{DomainError, RegistrationForm};
use futures_util::StreamExt;
use store::SqliteStore;
use storefront::{Config, Storefront};

fn config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..Config::default()
    }
}

async fn seeded() -> Storefront<SqliteStore> {
    let store = SqliteStore::in_memory().await.unwrap();
    Storefront::with_store(store, &config()).await.unwrap()
}

#[tokio::test]
async fn seeded_storefront_dashboard() {
    let storefront = seeded().await;
    let stats = storefront.dashboard().await.unwrap();

    assert_eq!(stats.total_products, 10);
    assert_eq!(stats.critical_stock, 4);
    assert_eq!(stats.out_of_stock, 0);
    assert_eq!(stats.total_accounts, 10);
    assert_eq!(stats.admins, 1);
    assert_eq!(stats.total_orders, 15);
}

#[tokio::test]
async fn seeding_is_skipped_when_disabled() {
    let store = SqliteStore::in_memory().await.unwrap();
    let config = Config {
        seed_on_start: false,
        ..config()
    };
    let storefront = Storefront::with_store(store, &config).await.unwrap();
    assert_eq!(storefront.dashboard().await.unwrap().total_products, 0);
}

#[tokio::test]
async fn register_shop_and_check_out() {
    let storefront = seeded().await;
    let account = storefront
        .accounts()
        .register(RegistrationForm {
            run: "11.111.111-1".to_string(),
            name: "Camila".to_string(),
            surnames: "Torres Reyes".to_string(),
            email: "camila.torres@duoc.cl".to_string(),
            password: "camila1".to_string(),
            password_confirmation: "camila1".to_string(),
            phone: String::new(),
            birth_date: "14-02-1999".to_string(),
            region: "Valparaíso".to_string(),
            comuna: "Quilpué".to_string(),
            address: "Los Aromos 55".to_string(),
        })
        .await
        .unwrap();

    let user = storefront
        .accounts()
        .authenticate("camila.torres@duoc.cl", "camila1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.run, account.run);

    let mut session = storefront.new_session();
    session.add_to_cart(&ProductCode::new("AC001"), 2).await.unwrap();
    session.apply_discount("SV1000");
    assert!(session.check_institutional(&user.run).await.unwrap());

    // (2 * 5990 - 1000) * 0.8
    let order = session.checkout(&user.run).await.unwrap();
    assert_eq!(order.number.as_str(), "SO1016");
    assert_eq!(order.total.amount(), 8784);

    let history = storefront.orders().orders_for(&user.run).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].lines.len(), 1);

    let keychain = storefront
        .catalog()
        .product(&ProductCode::new("AC001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(keychain.stock, 74);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let storefront = seeded().await;
    let err = storefront
        .accounts()
        .register(RegistrationForm {
            run: "15.113.196-9".to_string(),
            email: "someone@gmail.com".to_string(),
            ..RegistrationForm::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn customer_order_feed_follows_status_changes() {
    let storefront = seeded().await;
    let customer = Run::new("206947953");
    let mut feed = storefront.orders().watch_orders(Some(customer.clone()));

    let initial = feed.next().await.unwrap().unwrap();
    assert_eq!(initial.len(), 2);

    let pending = &initial[1].order;
    assert_eq!(pending.status, ShipmentStatus::Pending);
    storefront
        .orders()
        .update_status(&pending.number, ShipmentStatus::Shipped)
        .await
        .unwrap();

    let updated = feed.next().await.unwrap().unwrap();
    assert_eq!(updated[1].order.status, ShipmentStatus::Shipped);
}

#[tokio::test]
async fn sweeper_reclaims_abandoned_holds() {
    let store = SqliteStore::in_memory().await.unwrap();
    let config = Config {
        cart_hold_ttl: Duration::ZERO,
        ..config()
    };
    let storefront = Storefront::with_store(store, &config).await.unwrap();
    let code = ProductCode::new("PE001");

    let mut session = storefront.new_session();
    session.add_to_cart(&code, 3).await.unwrap();
    assert_eq!(session.available_stock(&code).await.unwrap(), Some(0));

    tokio::time::sleep(Duration::from_millis(5)).await;
    let sweeper = storefront.spawn_hold_sweeper(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    sweeper.abort();

    assert_eq!(storefront.ledger().held(&code), 0);
    assert_eq!(session.available_stock(&code).await.unwrap(), Some(3));
}
