//! Integration tests for the bill lifecycle: draft editing, confirmation
//! with the conditional stock decrement, payment, and cancellation.

use chrono::Utc;
use uuid::Uuid;

use bookshop_core::{BillStatus, CoreError, Item, ItemStatus, User, UserRole};
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

// =============================================================================
// Draft editing
// =============================================================================

#[tokio::test]
async fn draft_bill_line_edits_recompute_totals() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;
    let gadget = seed_item(&db, "Gadget", 2000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    assert_eq!(bill.final_cents, 0);

    db.bills().add_line(&bill.id, &widget.id, 3).await.unwrap();
    db.bills().add_line(&bill.id, &gadget.id, 1).await.unwrap();

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.total_cents, 5000);
    assert_eq!(bill.tax_cents, 500);
    assert_eq!(bill.final_cents, 5500);

    db.bills().update_line(&bill.id, &widget.id, 1).await.unwrap();
    db.bills().remove_line(&bill.id, &gadget.id).await.unwrap();

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.total_cents, 1000);
    assert_eq!(bill.tax_cents, 100);
    assert_eq!(bill.final_cents, 1100);
}

#[tokio::test]
async fn bill_line_quantities_must_be_positive() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 2).await.unwrap();

    let err = db.bills().add_line(&bill.id, &widget.id, 0).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidQuantity { requested: 0 })
    ));

    let err = db
        .bills()
        .update_line(&bill.id, &widget.id, -1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidQuantity { requested: -1 })
    ));

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.total_cents, 2000);
}

#[tokio::test]
async fn bill_lines_freeze_price_at_add_time() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 2).await.unwrap();

    db.items().update(&widget.id, "Widget", None, 8000).await.unwrap();

    let (bill, lines) = db.bills().get_with_items(&bill.id).await.unwrap();
    assert_eq!(lines[0].unit_price_cents, 1000);
    assert_eq!(bill.total_cents, 2000);
}

#[tokio::test]
async fn set_discount_recomputes_final_amount() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 10000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 1).await.unwrap();

    let bill = db.bills().set_discount(&bill.id, 1500).await.unwrap();
    assert_eq!(bill.total_cents, 10000);
    assert_eq!(bill.tax_cents, 1000);
    assert_eq!(bill.discount_cents, 1500);
    assert_eq!(bill.final_cents, 9500);

    // A later line edit preserves the discount
    db.bills().add_line(&bill.id, &widget.id, 1).await.unwrap();
    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.discount_cents, 1500);
    assert_eq!(bill.final_cents, 20000 + 2000 - 1500);
}

#[tokio::test]
async fn confirm_recomputes_totals_keeping_discount() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 2).await.unwrap();
    db.bills().set_discount(&bill.id, 500).await.unwrap();

    let bill = db.bills().confirm(&bill.id).await.unwrap();
    assert_eq!(bill.status, BillStatus::Confirmed);
    assert_eq!(bill.total_cents, 2000);
    assert_eq!(bill.tax_cents, 200);
    assert_eq!(bill.discount_cents, 500);
    assert_eq!(bill.final_cents, 1700);
}

#[tokio::test]
async fn negative_discount_is_rejected() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let bill = db.bills().create(&customer.id).await.unwrap();

    let err = db.bills().set_discount(&bill.id, -100).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn line_edits_are_draft_only() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 1).await.unwrap();
    db.bills().confirm(&bill.id).await.unwrap();

    let err = db
        .bills()
        .add_line(&bill.id, &widget.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));

    let err = db
        .bills()
        .update_line(&bill.id, &widget.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));

    let err = db.bills().set_discount(&bill.id, 100).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));
}

// =============================================================================
// Confirmation and stock
// =============================================================================

#[tokio::test]
async fn confirm_decrements_stock_exactly_once() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 10).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 3).await.unwrap();

    let bill = db.bills().confirm(&bill.id).await.unwrap();
    assert_eq!(bill.status, BillStatus::Confirmed);
    // Payment is taken at confirmation
    assert!(bill.paid_at.is_some());

    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 7);
    assert_eq!(widget_now.status, ItemStatus::Active);

    // A second confirm must not decrement again
    let err = db.bills().confirm(&bill.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));

    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 7);
}

#[tokio::test]
async fn full_order_scenario_with_stock_exhaustion() {
    // The canonical walkthrough: $10.00 item, stock 5, customer orders 5.
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 5).await;

    db.carts().add_item(&customer.id, &widget.id, 5).await.unwrap();
    let bill = db.carts().checkout(&customer.id).await.unwrap();

    assert_eq!(bill.total_cents, 5000);
    assert_eq!(bill.tax_cents, 500);
    assert_eq!(bill.final_cents, 5500);

    let bill = db.bills().confirm(&bill.id).await.unwrap();
    assert_eq!(bill.status, BillStatus::Confirmed);
    db.carts().clear(&customer.id).await.unwrap();

    // Stock is gone and the item flipped to out_of_stock in the same write
    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 0);
    assert_eq!(widget_now.status, ItemStatus::OutOfStock);

    // Restocking reactivates it
    let restocked = db.items().set_stock(&widget.id, 8).await.unwrap();
    assert_eq!(restocked.status, ItemStatus::Active);
}

#[tokio::test]
async fn confirm_empty_bill_fails_without_mutation() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    let err = db.bills().confirm(&bill.id).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::EmptyOrder)));

    let bill = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Draft);
}

#[tokio::test]
async fn losing_confirm_rolls_back_every_decrement() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    // Plenty of widgets, few gadgets: the gadget line must fail and undo
    // the widget decrement taken earlier in the same confirm.
    let widget = seed_item(&db, "Widget", 1000, 100).await;
    let gadget = seed_item(&db, "Gadget", 2000, 5).await;

    let first = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&first.id, &widget.id, 10).await.unwrap();
    db.bills().add_line(&first.id, &gadget.id, 4).await.unwrap();

    let second = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&second.id, &widget.id, 10).await.unwrap();
    db.bills().add_line(&second.id, &gadget.id, 4).await.unwrap();

    db.bills().confirm(&first.id).await.unwrap();

    let err = db.bills().confirm(&second.id).await.unwrap_err();
    match err {
        DbError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 1);
            assert_eq!(requested, 4);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // The losing bill's widget decrement was rolled back
    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 90);
    let gadget_now = db.items().get_by_id(&gadget.id).await.unwrap().unwrap();
    assert_eq!(gadget_now.stock_quantity, 1);

    let second = db.bills().get_by_id(&second.id).await.unwrap().unwrap();
    assert_eq!(second.status, BillStatus::Draft);
}

#[tokio::test]
async fn concurrent_confirms_cannot_oversell() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 5).await;

    // Two draft bills each want 4 of the 5 in stock
    let first = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&first.id, &widget.id, 4).await.unwrap();
    let second = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&second.id, &widget.id, 4).await.unwrap();

    let bills_a = db.bills();
    let bills_b = db.bills();
    let (res_a, res_b) = tokio::join!(bills_a.confirm(&first.id), bills_b.confirm(&second.id));

    // Exactly one confirm wins
    assert!(res_a.is_ok() != res_b.is_ok());

    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 1);
    assert!(widget_now.stock_quantity >= 0);
}

// =============================================================================
// Payment and cancellation
// =============================================================================

#[tokio::test]
async fn mark_paid_requires_confirmed() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 1).await.unwrap();

    // Draft cannot be paid
    let err = db.bills().mark_paid(&bill.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));

    db.bills().confirm(&bill.id).await.unwrap();
    let bill = db.bills().mark_paid(&bill.id).await.unwrap();
    assert_eq!(bill.status, BillStatus::Paid);
    assert!(bill.paid_at.is_some());
}

#[tokio::test]
async fn cancel_allowed_from_draft_and_confirmed_only() {
    let db = test_db().await;
    let customer = seed_customer(&db, "alice", 1).await;
    let widget = seed_item(&db, "Widget", 1000, 20).await;

    // Draft → cancelled
    let draft = db.bills().create(&customer.id).await.unwrap();
    let cancelled = db.bills().cancel(&draft.id).await.unwrap();
    assert_eq!(cancelled.status, BillStatus::Cancelled);

    // Confirmed → cancelled (stock stays taken)
    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 2).await.unwrap();
    db.bills().confirm(&bill.id).await.unwrap();
    db.bills().cancel(&bill.id).await.unwrap();

    let widget_now = db.items().get_by_id(&widget.id).await.unwrap().unwrap();
    assert_eq!(widget_now.stock_quantity, 18);

    // Paid is terminal
    let bill = db.bills().create(&customer.id).await.unwrap();
    db.bills().add_line(&bill.id, &widget.id, 1).await.unwrap();
    db.bills().confirm(&bill.id).await.unwrap();
    db.bills().mark_paid(&bill.id).await.unwrap();

    let err = db.bills().cancel(&bill.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InvalidOrderStatus { .. })
    ));
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn bill_listings_are_newest_first() {
    let db = test_db().await;
    let alice = seed_customer(&db, "alice", 1).await;
    let bob = seed_customer(&db, "bob", 2).await;

    let b1 = db.bills().create(&alice.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let b2 = db.bills().create(&bob.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let b3 = db.bills().create(&alice.id).await.unwrap();

    let all = db.bills().list_all(100).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, b3.id);
    assert_eq!(all[2].id, b1.id);

    let alices = db.bills().list_by_customer(&alice.id).await.unwrap();
    assert_eq!(alices.len(), 2);
    assert_eq!(alices[0].id, b3.id);
    assert_eq!(alices[1].id, b1.id);

    let drafts = db.bills().list_by_status(BillStatus::Draft).await.unwrap();
    assert_eq!(drafts.len(), 3);

    let by_number = db.bills().get_by_number(&b2.bill_number).await.unwrap();
    assert_eq!(by_number.unwrap().id, b2.id);
}
