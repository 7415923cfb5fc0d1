//! Integration tests for the cart workflows.
//!
//! Each test runs against a fresh in-memory SQLite database with
//! migrations applied, so tests are fully isolated.

use chrono::Utc;
use uuid::Uuid;

use bookshop_core::{CoreError, Item, ItemStatus, User, UserRole};
use bookshop_db::{Database, DbConfig, DbError};

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn seed_customer(db: &Database, username: &str, n: u32) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: format!("Customer {}", username),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: "not-a-real-hash".to_string(),
        address: None,
        telephone: format!("555000{:04}", n),
        role: UserRole::Customer,
        created_at: Utc::now(),
    };
    db.users().insert(&user).await.unwrap()
}

async fn seed_item(db: &Database, name: &str, price_cents: i64, stock: i64) -> Item {
    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: None,
        price_cents,
        stock_quantity: stock,
        status: ItemStatus::Active,
        created_at: now,
        updated_at: now,
    };
    db.items().insert(&item).await.unwrap()
}

#[tokio::test]
async fn get_or_create_returns_same_cart() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;

    let first = db.carts().get_or_create(&customer.id).await.unwrap();
    let second = db.carts().get_or_create(&customer.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.total_cents, 0);
}

#[tokio::test]
async fn get_or_create_unknown_customer_fails() {
    let db = test_db().await;

    let err = db.carts().get_or_create("no-such-user").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn add_item_freezes_name_and_price() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 10).await;

    let line = db.carts().add_item(&customer.id, &item.id, 2).await.unwrap();
    assert_eq!(line.unit_price_cents, 1000);
    assert_eq!(line.total_price_cents, 2000);
    assert_eq!(line.name_snapshot, "Widget");

    // A later price and name change must not rewrite the existing line
    db.items()
        .update(&item.id, "Widget Deluxe", None, 9999)
        .await
        .unwrap();

    let (_, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_price_cents, 1000);
    assert_eq!(lines[0].name_snapshot, "Widget");
}

#[tokio::test]
async fn repeat_adds_merge_into_one_line() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 500, 10).await;

    db.carts().add_item(&customer.id, &item.id, 2).await.unwrap();
    let line = db.carts().add_item(&customer.id, &item.id, 3).await.unwrap();

    assert_eq!(line.quantity, 5);
    assert_eq!(line.total_price_cents, 2500);

    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(cart.total_cents, 2500);
}

#[tokio::test]
async fn cart_total_is_sum_of_line_totals() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 10).await;
    let gadget = seed_item(&db, "Gadget", 2550, 10).await;

    db.carts().add_item(&customer.id, &widget.id, 3).await.unwrap();
    db.carts().add_item(&customer.id, &gadget.id, 2).await.unwrap();

    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    let sum: i64 = lines.iter().map(|l| l.total_price_cents).sum();
    assert_eq!(cart.total_cents, sum);
    assert_eq!(cart.total_cents, 3 * 1000 + 2 * 2550);
}

#[tokio::test]
async fn merge_add_beyond_stock_is_rejected() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 5).await;

    db.carts().add_item(&customer.id, &item.id, 3).await.unwrap();

    // 3 already in the cart + 3 more > 5 in stock
    let err = db
        .carts()
        .add_item(&customer.id, &item.id, 3)
        .await
        .unwrap_err();

    match err {
        DbError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // The cart is unchanged
    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(lines[0].quantity, 3);
    assert_eq!(cart.total_cents, 3000);
}

#[tokio::test]
async fn inactive_and_out_of_stock_items_cannot_be_added() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;

    let shelved = seed_item(&db, "Shelved", 1000, 10).await;
    db.items()
        .set_status(&shelved.id, ItemStatus::Inactive)
        .await
        .unwrap();

    let err = db
        .carts()
        .add_item(&customer.id, &shelved.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::ItemUnavailable { .. })
    ));

    let gone = seed_item(&db, "Gone", 1000, 1).await;
    db.items().set_stock(&gone.id, 0).await.unwrap();

    let err = db
        .carts()
        .add_item(&customer.id, &gone.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::ItemUnavailable { .. })
    ));
}

#[tokio::test]
async fn invalid_quantities_are_rejected() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 10).await;

    for quantity in [0, -3] {
        let err = db
            .carts()
            .add_item(&customer.id, &item.id, quantity)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidQuantity { requested }) if requested == quantity
        ));
    }
}

#[tokio::test]
async fn update_quantity_keeps_frozen_price() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 10).await;

    db.carts().add_item(&customer.id, &item.id, 2).await.unwrap();
    db.items().update(&item.id, "Widget", None, 5000).await.unwrap();

    db.carts()
        .update_quantity(&customer.id, &item.id, 4)
        .await
        .unwrap();

    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(lines[0].quantity, 4);
    assert_eq!(lines[0].unit_price_cents, 1000);
    assert_eq!(lines[0].total_price_cents, 4000);
    assert_eq!(cart.total_cents, 4000);
}

#[tokio::test]
async fn update_quantity_rejects_non_positive() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 10).await;

    db.carts().add_item(&customer.id, &item.id, 2).await.unwrap();

    for quantity in [0, -2] {
        let err = db
            .carts()
            .update_quantity(&customer.id, &item.id, quantity)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidQuantity { requested }) if requested == quantity
        ));
    }

    // The line is untouched; removal is its own operation
    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(cart.total_cents, 2000);
}

#[tokio::test]
async fn remove_item_is_idempotent() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let item = seed_item(&db, "Widget", 1000, 10).await;

    db.carts().add_item(&customer.id, &item.id, 2).await.unwrap();
    db.carts().remove_item(&customer.id, &item.id).await.unwrap();
    // Removing again is a no-op, not an error
    db.carts().remove_item(&customer.id, &item.id).await.unwrap();

    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert!(lines.is_empty());
    assert_eq!(cart.total_cents, 0);
}

#[tokio::test]
async fn clear_empties_the_cart() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 10).await;
    let gadget = seed_item(&db, "Gadget", 2000, 10).await;

    db.carts().add_item(&customer.id, &widget.id, 1).await.unwrap();
    db.carts().add_item(&customer.id, &gadget.id, 1).await.unwrap();
    db.carts().clear(&customer.id).await.unwrap();

    let (cart, lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert!(lines.is_empty());
    assert_eq!(cart.total_cents, 0);
}

#[tokio::test]
async fn checkout_empty_cart_fails() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;

    let err = db.carts().checkout(&customer.id).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));

    // No bill was created
    assert_eq!(db.bills().count().await.unwrap(), 0);
}

#[tokio::test]
async fn checkout_creates_draft_bill_and_keeps_cart() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 10).await;
    let gadget = seed_item(&db, "Gadget", 2500, 10).await;

    db.carts().add_item(&customer.id, &widget.id, 2).await.unwrap();
    db.carts().add_item(&customer.id, &gadget.id, 1).await.unwrap();

    let bill = db.carts().checkout(&customer.id).await.unwrap();

    assert_eq!(bill.status, bookshop_core::BillStatus::Draft);
    assert_eq!(bill.customer_id, customer.id);
    assert_eq!(bill.total_cents, 4500);
    assert_eq!(bill.tax_cents, 450); // 10% flat
    assert_eq!(bill.discount_cents, 0);
    assert_eq!(bill.final_cents, 4950);

    let (_, bill_lines) = db.bills().get_with_items(&bill.id).await.unwrap();
    assert_eq!(bill_lines.len(), 2);

    // Stock untouched until confirmation
    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 10);

    // The cart keeps its lines until the caller clears it post-confirm
    let (cart, cart_lines) = db.carts().get_with_items(&customer.id).await.unwrap();
    assert_eq!(cart_lines.len(), 2);
    assert_eq!(cart.total_cents, 4500);
}
