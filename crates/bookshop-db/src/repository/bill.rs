//! # Bill Repository
//!
//! Database operations for bills (orders) and their lines.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                        │
//! │     └── create() / carts().checkout() → Bill { status: Draft }          │
//! │                                                                         │
//! │  2. EDIT (DRAFT only)                                                   │
//! │     └── add_line() / update_line() / remove_line() / set_discount()     │
//! │     └── every edit recomputes total, tax, and final in-transaction      │
//! │                                                                         │
//! │  3. CONFIRM                                                             │
//! │     └── confirm() → conditional stock decrement per line, then          │
//! │         status Confirmed. Any line short on stock rolls the whole       │
//! │         transaction back.                                               │
//! │                                                                         │
//! │  4. PAY / CANCEL                                                        │
//! │     └── mark_paid() → Paid (from Confirmed)                             │
//! │     └── cancel()    → Cancelled (from Draft or Confirmed)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Conditional Decrement
//! Confirmation never reads stock and then writes it. Each line runs
//!
//! ```sql
//! UPDATE items SET stock_quantity = stock_quantity - ?
//! WHERE id = ? AND stock_quantity >= ?
//! ```
//!
//! and a zero row count means another order won the stock first. That
//! closes the oversell race without any application-level locking.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bookshop_core::validation;
use bookshop_core::{
    Bill, BillItem, BillStatus, BillTotals, CoreError, Item, ItemStatus, Money, MAX_ITEM_QUANTITY,
};

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Creates an empty DRAFT bill for a customer.
    ///
    /// Staff use this to build an order directly, without a cart.
    pub async fn create(&self, customer_id: &str) -> DbResult<Bill> {
        let now = Utc::now();

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(DbError::not_found("User", customer_id));
        }

        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: generate_bill_number(),
            customer_id: customer_id.to_string(),
            total_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            final_cents: 0,
            status: BillStatus::Draft,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        debug!(bill_id = %bill.id, bill_number = %bill.bill_number, "Creating draft bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_id, total_cents, tax_cents,
                discount_cents, final_cents, status, created_at, updated_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(&bill.customer_id)
        .bind(bill.total_cents)
        .bind(bill.tax_cents)
        .bind(bill.discount_cents)
        .bind(bill.final_cents)
        .bind(bill.status)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .bind(bill.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by its business identifier.
    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE bill_number = ?1
            "#,
        )
        .bind(bill_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill together with its lines.
    pub async fn get_with_items(&self, id: &str) -> DbResult<(Bill, Vec<BillItem>)> {
        let bill = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id))?;

        let items = self.get_items(id).await?;
        Ok((bill, items))
    }

    /// Gets a bill's lines, oldest first.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, created_at
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists all bills, newest first.
    pub async fn list_all(&self, limit: u32) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists a customer's bills, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists bills in a given status, newest first.
    pub async fn list_by_status(&self, status: BillStatus) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE status = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Adds a quantity of an item to a DRAFT bill.
    ///
    /// Merges with an existing line for the same item and freezes the
    /// item's current name and price into new lines, like the cart does.
    /// Stock is checked advisorily; confirmation decides for real.
    pub async fn add_line(&self, bill_id: &str, item_id: &str, quantity: i64) -> DbResult<BillItem> {
        validation::validate_quantity(quantity)
            .map_err(|_| CoreError::InvalidQuantity { requested: quantity })?;

        debug!(bill_id = %bill_id, item_id = %item_id, quantity, "Adding bill line");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let bill = fetch_draft_bill(&mut tx, bill_id).await?;
        let item = fetch_item(&mut tx, item_id).await?;

        if item.status != ItemStatus::Active {
            return Err(CoreError::ItemUnavailable { name: item.name }.into());
        }

        let existing = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, created_at
            FROM bill_items
            WHERE bill_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(&bill.id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let new_quantity = existing.as_ref().map_or(0, |line| line.quantity) + quantity;

        if new_quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::InvalidQuantity {
                requested: new_quantity,
            }
            .into());
        }

        if item.stock_quantity < new_quantity {
            return Err(CoreError::InsufficientStock {
                name: item.name,
                available: item.stock_quantity,
                requested: new_quantity,
            }
            .into());
        }

        let line = match existing {
            Some(line) => {
                let total_price = Money::from_cents(line.unit_price_cents) * new_quantity;

                sqlx::query(
                    r#"
                    UPDATE bill_items SET
                        quantity = ?2,
                        total_price_cents = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&line.id)
                .bind(new_quantity)
                .bind(total_price.cents())
                .execute(&mut *tx)
                .await?;

                BillItem {
                    quantity: new_quantity,
                    total_price_cents: total_price.cents(),
                    ..line
                }
            }
            None => {
                let total_price = Money::from_cents(item.price_cents) * quantity;
                let line = BillItem {
                    id: Uuid::new_v4().to_string(),
                    bill_id: bill.id.clone(),
                    item_id: item.id.clone(),
                    name_snapshot: item.name.clone(),
                    quantity,
                    unit_price_cents: item.price_cents,
                    total_price_cents: total_price.cents(),
                    created_at: now,
                };

                sqlx::query(
                    r#"
                    INSERT INTO bill_items (
                        id, bill_id, item_id, name_snapshot, quantity,
                        unit_price_cents, total_price_cents, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )
                .bind(&line.id)
                .bind(&line.bill_id)
                .bind(&line.item_id)
                .bind(&line.name_snapshot)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(line.total_price_cents)
                .bind(line.created_at)
                .execute(&mut *tx)
                .await?;

                line
            }
        };

        recompute_totals(&mut tx, &bill.id, bill.discount_cents).await?;
        tx.commit().await?;

        Ok(line)
    }

    /// Sets the quantity of a bill line on a DRAFT bill. Non-positive
    /// quantities are rejected; `remove_line` drops a line.
    pub async fn update_line(&self, bill_id: &str, item_id: &str, quantity: i64) -> DbResult<()> {
        validation::validate_quantity(quantity)
            .map_err(|_| CoreError::InvalidQuantity { requested: quantity })?;

        let mut tx = self.pool.begin().await?;

        let bill = fetch_draft_bill(&mut tx, bill_id).await?;

        let line = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, created_at
            FROM bill_items
            WHERE bill_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(&bill.id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Bill line", item_id))?;

        let item = fetch_item(&mut tx, item_id).await?;
        if item.stock_quantity < quantity {
            return Err(CoreError::InsufficientStock {
                name: item.name,
                available: item.stock_quantity,
                requested: quantity,
            }
            .into());
        }

        let total_price = Money::from_cents(line.unit_price_cents) * quantity;

        sqlx::query(
            r#"
            UPDATE bill_items SET
                quantity = ?2,
                total_price_cents = ?3
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(quantity)
        .bind(total_price.cents())
        .execute(&mut *tx)
        .await?;

        recompute_totals(&mut tx, &bill.id, bill.discount_cents).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Removes a line from a DRAFT bill. Idempotent.
    pub async fn remove_line(&self, bill_id: &str, item_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let bill = fetch_draft_bill(&mut tx, bill_id).await?;

        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1 AND item_id = ?2")
            .bind(&bill.id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        recompute_totals(&mut tx, &bill.id, bill.discount_cents).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Sets the discount on a DRAFT bill and recomputes its totals.
    ///
    /// Negative discounts are rejected. A discount larger than the taxed
    /// total is allowed; staff comp an order down to zero (or below) this
    /// way, and the final amount simply reflects it.
    pub async fn set_discount(&self, bill_id: &str, discount_cents: i64) -> DbResult<Bill> {
        if discount_cents < 0 {
            return Err(CoreError::Validation(
                bookshop_core::ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: i64::MAX,
                },
            )
            .into());
        }

        debug!(bill_id = %bill_id, discount_cents, "Setting bill discount");

        let mut tx = self.pool.begin().await?;

        let bill = fetch_draft_bill(&mut tx, bill_id).await?;

        recompute_totals(&mut tx, &bill.id, discount_cents).await?;
        tx.commit().await?;

        self.get_by_id(bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_id))
    }

    /// Confirms a DRAFT bill, durably decrementing stock.
    ///
    /// ## What This Does
    /// 1. Requires the bill to be DRAFT with at least one line
    /// 2. For each line, conditionally decrements the item's stock; a zero
    ///    row count means the stock is gone and the whole transaction rolls
    ///    back with `InsufficientStock`
    /// 3. Items whose stock hits zero flip to OUT_OF_STOCK in the same
    ///    UPDATE
    /// 4. Recomputes the totals from the lines, keeping the discount
    /// 5. Marks the bill CONFIRMED and records `paid_at`
    ///
    /// Either every line's stock is taken and the bill is confirmed, or
    /// nothing changed.
    pub async fn confirm(&self, bill_id: &str) -> DbResult<Bill> {
        debug!(bill_id = %bill_id, "Confirming bill");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let bill = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Bill", bill_id))?;

        if !bill.status.can_transition_to(BillStatus::Confirmed) {
            return Err(invalid_status(&bill).into());
        }

        let lines = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, created_at
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CoreError::EmptyOrder.into());
        }

        for line in &lines {
            // Decrement only if enough stock remains; losing the race means
            // zero rows affected, and dropping the transaction rolls back
            // the decrements already applied for earlier lines.
            let result = sqlx::query(
                r#"
                UPDATE items SET
                    stock_quantity = stock_quantity - ?2,
                    status = CASE
                        WHEN stock_quantity - ?2 = 0 THEN 'out_of_stock'
                        ELSE status
                    END,
                    updated_at = ?3
                WHERE id = ?1 AND stock_quantity >= ?2
                "#,
            )
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: i64 = sqlx::query_scalar(
                    "SELECT COALESCE((SELECT stock_quantity FROM items WHERE id = ?1), 0)",
                )
                .bind(&line.item_id)
                .fetch_one(&mut *tx)
                .await?;

                return Err(CoreError::InsufficientStock {
                    name: line.name_snapshot.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        // The cached columns are maintained by every line edit, but the
        // confirmed amounts are the durable record; derive them once more
        // from the lines before sealing the bill.
        recompute_totals(&mut tx, bill_id, bill.discount_cents).await?;

        // Payment is taken at confirmation; PAID is a later bookkeeping flip.
        sqlx::query(
            r#"
            UPDATE bills SET status = 'confirmed', paid_at = ?2, updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(bill_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let confirmed = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, bill_number, customer_id, total_cents, tax_cents,
                   discount_cents, final_cents, status, created_at, updated_at, paid_at
            FROM bills
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            bill_id = %bill_id,
            bill_number = %confirmed.bill_number,
            final_cents = confirmed.final_cents,
            "Bill confirmed"
        );

        Ok(confirmed)
    }

    /// Marks a CONFIRMED bill as PAID.
    pub async fn mark_paid(&self, bill_id: &str) -> DbResult<Bill> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE bills SET status = 'paid', paid_at = COALESCE(paid_at, ?2), updated_at = ?2
            WHERE id = ?1 AND status = 'confirmed'
            "#,
        )
        .bind(bill_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let bill = self
                .get_by_id(bill_id)
                .await?
                .ok_or_else(|| DbError::not_found("Bill", bill_id))?;
            return Err(invalid_status(&bill).into());
        }

        info!(bill_id = %bill_id, "Bill paid");

        self.get_by_id(bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_id))
    }

    /// Cancels a DRAFT or CONFIRMED bill.
    ///
    /// Stock taken by a confirmed bill is *not* restored; returns go
    /// through a staff restock, which keeps an audit trail.
    pub async fn cancel(&self, bill_id: &str) -> DbResult<Bill> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE bills SET status = 'cancelled', updated_at = ?2
            WHERE id = ?1 AND status IN ('draft', 'confirmed')
            "#,
        )
        .bind(bill_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let bill = self
                .get_by_id(bill_id)
                .await?
                .ok_or_else(|| DbError::not_found("Bill", bill_id))?;
            return Err(invalid_status(&bill).into());
        }

        info!(bill_id = %bill_id, "Bill cancelled");

        self.get_by_id(bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_id))
    }

    /// Counts all bills.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates a bill number: `B-YYMMDD-HHMMSS-NNNN`.
///
/// The NNNN suffix comes from the clock's sub-second component; the UNIQUE
/// index on bill_number is the real collision guard.
pub(crate) fn generate_bill_number() -> String {
    let now = Utc::now();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let suffix: u16 = (nanos % 10000) as u16;
    format!("B-{}-{:04}", now.format("%y%m%d-%H%M%S"), suffix)
}

/// Fetches a bill inside a transaction and requires it to be DRAFT.
async fn fetch_draft_bill(tx: &mut Transaction<'_, Sqlite>, bill_id: &str) -> DbResult<Bill> {
    let bill = sqlx::query_as::<_, Bill>(
        r#"
        SELECT id, bill_number, customer_id, total_cents, tax_cents,
               discount_cents, final_cents, status, created_at, updated_at, paid_at
        FROM bills
        WHERE id = ?1
        "#,
    )
    .bind(bill_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| DbError::not_found("Bill", bill_id))?;

    if !bill.status.allows_line_edits() {
        return Err(invalid_status(&bill).into());
    }

    Ok(bill)
}

/// Fetches an item inside a transaction, or NotFound.
async fn fetch_item(tx: &mut Transaction<'_, Sqlite>, item_id: &str) -> DbResult<Item> {
    sqlx::query_as::<_, Item>(
        r#"
        SELECT id, name, description, price_cents, stock_quantity,
               status, created_at, updated_at
        FROM items
        WHERE id = ?1
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| DbError::not_found("Item", item_id))
}

fn invalid_status(bill: &Bill) -> CoreError {
    CoreError::InvalidOrderStatus {
        bill_id: bill.id.clone(),
        current_status: format!("{:?}", bill.status).to_lowercase(),
    }
}

/// Recomputes a bill's cached totals from its lines and the given discount.
///
/// Always derived from SUM over the lines plus [`BillTotals::compute`];
/// nothing adjusts the cached columns incrementally.
async fn recompute_totals(
    tx: &mut Transaction<'_, Sqlite>,
    bill_id: &str,
    discount_cents: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let subtotal: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_price_cents), 0) FROM bill_items WHERE bill_id = ?1",
    )
    .bind(bill_id)
    .fetch_one(&mut **tx)
    .await?;

    let totals = BillTotals::compute(Money::from_cents(subtotal), Money::from_cents(discount_cents));

    sqlx::query(
        r#"
        UPDATE bills SET
            total_cents = ?2,
            tax_cents = ?3,
            discount_cents = ?4,
            final_cents = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(bill_id)
    .bind(totals.total_cents)
    .bind(totals.tax_cents)
    .bind(totals.discount_cents)
    .bind(totals.final_cents)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
