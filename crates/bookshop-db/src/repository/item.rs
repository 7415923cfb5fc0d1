//! # Item Repository
//!
//! Database operations for the item catalog.
//!
//! ## Key Operations
//! - CRUD with case-sensitive unique names
//! - Case-insensitive name search (LIKE, indexed catalog is small)
//! - Stock adjustment that re-applies the stock/status invariant
//!
//! ## Stock/Status Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_quantity == 0  ⇒  status = out_of_stock                          │
//! │  restock of out_of_stock  ⇒  status = active                            │
//! │  inactive is a manual state, preserved while stocked                    │
//! │                                                                         │
//! │  set_stock() re-applies this in the same UPDATE that writes the stock,  │
//! │  so no reader can observe stock 0 with status active.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bookshop_core::validation;
use bookshop_core::{CoreError, Item, ItemStatus, ValidationError};

/// Repository for catalog item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ItemRepository::new(pool);
///
/// // Browse the storefront
/// let items = repo.list_active().await?;
///
/// // Restock
/// let item = repo.set_stock(&item_id, 25).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Lists every item in the catalog, sorted by name.
    ///
    /// Administrative view: includes inactive and out-of-stock items.
    pub async fn list_all(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sellable items, sorted by name.
    ///
    /// Storefront view: only ACTIVE items appear.
    pub async fn list_active(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE status = 'active'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Searches items by name, case-insensitively.
    ///
    /// ## Arguments
    /// * `query` - Search term (matched as a substring)
    /// * `limit` - Maximum results to return
    pub async fn search_by_name(&self, query: &str, limit: u32) -> DbResult<Vec<Item>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching items");

        if query.is_empty() {
            return self.list_active().await;
        }

        // Escape LIKE metacharacters so "100%" matches literally
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE name LIKE ?1 ESCAPE '\'
              AND status = 'active'
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Search returned items");
        Ok(items)
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Item))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item by its business identifier (exact, case-sensitive name).
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE name = ?1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new item.
    ///
    /// The status passed in is reconciled against the initial stock, so a
    /// caller cannot create an ACTIVE item with zero stock.
    ///
    /// ## Returns
    /// * `Ok(Item)` - Inserted item
    /// * `Err(DbError::UniqueViolation)` - Name already exists
    /// * `Err(DbError::Core(Validation))` - Bad name, price, or stock
    pub async fn insert(&self, item: &Item) -> DbResult<Item> {
        validation::validate_item_name(&item.name).map_err(CoreError::from)?;
        validation::validate_price_cents(item.price_cents).map_err(CoreError::from)?;
        validation::validate_stock_quantity(item.stock_quantity).map_err(CoreError::from)?;

        debug!(name = %item.name, "Inserting item");

        let status = item.status.reconcile(item.stock_quantity);

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, description, price_cents, stock_quantity,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_cents)
        .bind(item.stock_quantity)
        .bind(status)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(Item {
            status,
            ..item.clone()
        })
    }

    /// Updates an item's name, description, and price.
    ///
    /// Stock and status are deliberately excluded: stock moves through
    /// [`set_stock`](Self::set_stock) so the invariant is re-applied, and
    /// price changes never rewrite existing cart or bill lines (snapshot
    /// pattern).
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Item doesn't exist
    /// * `Err(DbError::UniqueViolation)` - New name already taken
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        price_cents: i64,
    ) -> DbResult<()> {
        validation::validate_item_name(name).map_err(CoreError::from)?;
        validation::validate_price_cents(price_cents).map_err(CoreError::from)?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Sets an item's stock to an absolute quantity.
    ///
    /// ## What This Does
    /// 1. Validates the new quantity (must be >= 0)
    /// 2. Writes stock and the reconciled status in one UPDATE
    /// 3. Returns the updated item
    ///
    /// Hitting zero forces OUT_OF_STOCK; restocking an OUT_OF_STOCK item
    /// restores ACTIVE. A manually INACTIVE item stays inactive.
    pub async fn set_stock(&self, id: &str, stock_quantity: i64) -> DbResult<Item> {
        validation::validate_stock_quantity(stock_quantity).map_err(CoreError::from)?;

        debug!(id = %id, stock_quantity, "Adjusting item stock");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Item", id))?;

        let status = item.status.reconcile(stock_quantity);

        sqlx::query(
            r#"
            UPDATE items SET
                stock_quantity = ?2,
                status = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(stock_quantity)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Item {
            stock_quantity,
            status,
            updated_at: now,
            ..item
        })
    }

    /// Sets an item's sale status (ACTIVE / INACTIVE).
    ///
    /// OUT_OF_STOCK is derived from the stock level and cannot be requested
    /// directly. The requested status is reconciled against current stock,
    /// so an item with zero stock cannot be forced ACTIVE.
    pub async fn set_status(&self, id: &str, status: ItemStatus) -> DbResult<Item> {
        if status == ItemStatus::OutOfStock {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: "out_of_stock is derived from the stock level".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price_cents, stock_quantity,
                   status, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Item", id))?;

        let status = status.reconcile(item.stock_quantity);

        sqlx::query(
            r#"
            UPDATE items SET status = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Item {
            status,
            updated_at: now,
            ..item
        })
    }

    /// Deletes an item.
    ///
    /// ## Returns
    /// * `Ok(())` - Item deleted
    /// * `Err(DbError::NotFound)` - Item doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - Item is still referenced by
    ///   cart or bill lines; deactivate it instead
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Counts all items in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
