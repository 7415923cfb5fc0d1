//! # Cart Repository
//!
//! Per-customer cart workflows.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Lifecycle                                    │
//! │                                                                         │
//! │  1. LAZY CREATION                                                       │
//! │     └── get_or_create() → Cart (one per customer)                       │
//! │                                                                         │
//! │  2. MUTATION (each op = one transaction)                                │
//! │     └── add_item()        → merge quantities on repeat adds             │
//! │     └── update_quantity() → rejects quantities below 1                  │
//! │     └── remove_item()     → idempotent                                  │
//! │     └── clear()           → drop every line                             │
//! │     Every mutation ends by recomputing total_cents from the lines.      │
//! │                                                                         │
//! │  3. CHECKOUT                                                            │
//! │     └── checkout() → DRAFT Bill with the cart's lines copied over       │
//! │         (the cart survives; callers clear it once the bill confirms)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Checks Are Advisory Here
//! `add_item` rejects quantities beyond live stock for early feedback, but
//! the authoritative check is the conditional decrement at bill
//! confirmation. A cart line is a reservation request, not a reservation.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::bill::generate_bill_number;
use bookshop_core::validation;
use bookshop_core::{
    Bill, BillStatus, BillTotals, Cart, CartItem, CoreError, Item, ItemStatus, Money,
    MAX_CART_ITEMS, MAX_ITEM_QUANTITY,
};

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets the customer's cart, creating an empty one if none exists.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such customer
    pub async fn get_or_create(&self, customer_id: &str) -> DbResult<Cart> {
        let mut tx = self.pool.begin().await?;
        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Gets the customer's cart together with its lines, oldest first.
    pub async fn get_with_items(&self, customer_id: &str) -> DbResult<(Cart, Vec<CartItem>)> {
        let cart = self.get_or_create(customer_id).await?;

        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, added_at
            FROM cart_items
            WHERE cart_id = ?1
            ORDER BY added_at
            "#,
        )
        .bind(&cart.id)
        .fetch_all(&self.pool)
        .await?;

        Ok((cart, items))
    }

    /// Adds a quantity of an item to the customer's cart.
    ///
    /// ## What This Does
    /// 1. Validates the quantity (1..=999)
    /// 2. Checks the item is ACTIVE
    /// 3. Merges with an existing line for the same item, checking the
    ///    *combined* quantity against live stock
    /// 4. Freezes the item's name and unit price into the line
    /// 5. Recomputes the cart total, all in one transaction
    ///
    /// ## Returns
    /// * `Ok(CartItem)` - The new or merged line
    /// * `Err(DbError::Core(ItemUnavailable))` - Item is INACTIVE or OUT_OF_STOCK
    /// * `Err(DbError::Core(InsufficientStock))` - Combined quantity exceeds stock
    /// * `Err(DbError::Core(CartTooLarge))` - Too many distinct lines
    pub async fn add_item(
        &self,
        customer_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<CartItem> {
        validation::validate_quantity(quantity)
            .map_err(|_| CoreError::InvalidQuantity { requested: quantity })?;

        debug!(customer_id = %customer_id, item_id = %item_id, quantity, "Adding item to cart");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;

        let item = fetch_item(&mut tx, item_id).await?;
        if item.status != ItemStatus::Active {
            return Err(CoreError::ItemUnavailable { name: item.name }.into());
        }

        // Merge with an existing line for the same item
        let existing = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, added_at
            FROM cart_items
            WHERE cart_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(&cart.id)
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

        // The quantity already in the cart counts against available stock
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
                    UPDATE cart_items SET
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

                CartItem {
                    quantity: new_quantity,
                    total_price_cents: total_price.cents(),
                    ..line
                }
            }
            None => {
                let line_count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = ?1")
                        .bind(&cart.id)
                        .fetch_one(&mut *tx)
                        .await?;

                if line_count as usize >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    }
                    .into());
                }

                let total_price = Money::from_cents(item.price_cents) * quantity;
                let line = CartItem {
                    id: Uuid::new_v4().to_string(),
                    cart_id: cart.id.clone(),
                    item_id: item.id.clone(),
                    name_snapshot: item.name.clone(),
                    quantity,
                    unit_price_cents: item.price_cents,
                    total_price_cents: total_price.cents(),
                    added_at: now,
                };

                sqlx::query(
                    r#"
                    INSERT INTO cart_items (
                        id, cart_id, item_id, name_snapshot, quantity,
                        unit_price_cents, total_price_cents, added_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )
                .bind(&line.id)
                .bind(&line.cart_id)
                .bind(&line.item_id)
                .bind(&line.name_snapshot)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(line.total_price_cents)
                .bind(line.added_at)
                .execute(&mut *tx)
                .await?;

                line
            }
        };

        recompute_total(&mut tx, &cart.id).await?;
        tx.commit().await?;

        Ok(line)
    }

    /// Sets the quantity of a cart line. Non-positive quantities are
    /// rejected; removal is its own operation.
    ///
    /// The frozen unit price is kept; only quantity and the line total move.
    pub async fn update_quantity(
        &self,
        customer_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        validation::validate_quantity(quantity)
            .map_err(|_| CoreError::InvalidQuantity { requested: quantity })?;

        let mut tx = self.pool.begin().await?;

        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;

        let line = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, added_at
            FROM cart_items
            WHERE cart_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(&cart.id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Cart line", item_id))?;

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
            UPDATE cart_items SET
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

        recompute_total(&mut tx, &cart.id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Removes an item's line from the cart. Idempotent: removing an item
    /// that isn't in the cart is a no-op.
    pub async fn remove_item(&self, customer_id: &str, item_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1 AND item_id = ?2")
            .bind(&cart.id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        recompute_total(&mut tx, &cart.id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Empties the cart.
    pub async fn clear(&self, customer_id: &str) -> DbResult<()> {
        debug!(customer_id = %customer_id, "Clearing cart");

        let mut tx = self.pool.begin().await?;

        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(&cart.id)
            .execute(&mut *tx)
            .await?;

        recompute_total(&mut tx, &cart.id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Converts the cart into a DRAFT bill.
    ///
    /// ## What This Does
    /// 1. Reads the cart lines; an empty cart is rejected
    /// 2. Creates a DRAFT bill with a fresh bill number
    /// 3. Copies each cart line into a bill line (snapshots carry over)
    /// 4. Computes the bill totals (flat tax, no discount yet)
    ///
    /// The cart is left intact. Stock is untouched; that happens at
    /// confirmation.
    ///
    /// ## Returns
    /// * `Ok(Bill)` - The new DRAFT bill
    /// * `Err(DbError::Core(EmptyCart))` - Cart has no lines
    pub async fn checkout(&self, customer_id: &str) -> DbResult<Bill> {
        debug!(customer_id = %customer_id, "Checking out cart");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let cart = self.get_or_create_in_tx(&mut tx, customer_id).await?;

        let lines = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, item_id, name_snapshot, quantity,
                   unit_price_cents, total_price_cents, added_at
            FROM cart_items
            WHERE cart_id = ?1
            ORDER BY added_at
            "#,
        )
        .bind(&cart.id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let subtotal: i64 = lines.iter().map(|line| line.total_price_cents).sum();
        let totals = BillTotals::compute(Money::from_cents(subtotal), Money::zero());

        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: generate_bill_number(),
            customer_id: customer_id.to_string(),
            total_cents: totals.total_cents,
            tax_cents: totals.tax_cents,
            discount_cents: totals.discount_cents,
            final_cents: totals.final_cents,
            status: BillStatus::Draft,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

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
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, item_id, name_snapshot, quantity,
                    unit_price_cents, total_price_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill.id)
            .bind(&line.item_id)
            .bind(&line.name_snapshot)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.total_price_cents)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(bill_id = %bill.id, bill_number = %bill.bill_number, "Checkout created draft bill");
        Ok(bill)
    }

    /// Fetches the customer's cart inside a transaction, creating it if
    /// missing. Verifies the customer exists first.
    async fn get_or_create_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        customer_id: &str,
    ) -> DbResult<Cart> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, customer_id, total_cents, created_at, updated_at
            FROM carts
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(cart) = cart {
            return Ok(cart);
        }

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await?;

        if exists.is_none() {
            return Err(DbError::not_found("User", customer_id));
        }

        let now = Utc::now();
        let cart = Cart {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            total_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(customer_id = %customer_id, cart_id = %cart.id, "Creating cart");

        sqlx::query(
            r#"
            INSERT INTO carts (id, customer_id, total_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.customer_id)
        .bind(cart.total_cents)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(cart)
    }
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

/// Rewrites the cart's cached total from its lines.
///
/// Always a full SUM, never an incremental adjustment; the cache cannot
/// drift from the lines it summarizes.
async fn recompute_total(tx: &mut Transaction<'_, Sqlite>, cart_id: &str) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE carts SET
            total_cents = (
                SELECT COALESCE(SUM(total_price_cents), 0)
                FROM cart_items
                WHERE cart_id = ?1
            ),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(cart_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
