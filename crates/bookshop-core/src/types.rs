//! # Domain Types
//!
//! Core domain types used throughout the bookshop backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │     Item      │   │     Cart      │   │     Bill      │         │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │         │
//! │  │  id (UUID)    │   │  id (UUID)    │   │  id (UUID)    │         │
//! │  │  name (biz)   │   │  customer_id  │   │  bill_number  │         │
//! │  │  price_cents  │   │  total_cents  │   │  status       │         │
//! │  │  stock, status│   │  CartItem[]   │   │  BillItem[]   │         │
//! │  └───────────────┘   └───────────────┘   └───────────────┘         │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │     User      │   │  ItemStatus   │   │  BillStatus   │         │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │         │
//! │  │  id (UUID)    │   │  Active       │   │  Draft        │         │
//! │  │  username     │   │  Inactive     │   │  Confirmed    │         │
//! │  │  role         │   │  OutOfStock   │   │  Paid/Canc.   │         │
//! │  └───────────────┘   └───────────────┘   └───────────────┘         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (item name, bill_number, username) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::DEFAULT_TAX_RATE_BPS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (the shop's flat sales tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Item Status
// =============================================================================

/// Whether an item can currently be sold.
///
/// ## Invariant
/// `OutOfStock` iff `stock_quantity == 0`. This is not statically enforced;
/// every stock writer must re-apply it via [`ItemStatus::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Listed and sellable.
    Active,
    /// Withdrawn from sale by staff (stock may remain).
    Inactive,
    /// Stock has hit zero.
    OutOfStock,
}

impl ItemStatus {
    /// Re-applies the stock/status invariant after a stock mutation.
    ///
    /// - stock 0 forces `OutOfStock`
    /// - positive stock on an `OutOfStock` item restores `Active`
    /// - `Inactive` is a manual state and is preserved while stocked
    pub fn reconcile(self, stock_quantity: i64) -> ItemStatus {
        if stock_quantity == 0 {
            ItemStatus::OutOfStock
        } else if self == ItemStatus::OutOfStock {
            ItemStatus::Active
        } else {
            self
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Active
    }
}

// =============================================================================
// Item
// =============================================================================

/// A sellable catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name - business identifier, unique across the catalog.
    pub name: String,

    /// Optional description for item details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit). Always positive.
    pub price_cents: i64,

    /// Current stock level. Never negative.
    pub stock_quantity: i64,

    /// Sale status, kept in sync with `stock_quantity`.
    pub status: ItemStatus,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` of this item can be sold right now.
    ///
    /// Advisory only - the authoritative check is the conditional decrement
    /// performed at bill confirmation.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.status == ItemStatus::Active && self.stock_quantity >= quantity
    }
}

// =============================================================================
// User Role
// =============================================================================

/// Account role with an explicit capability table.
///
/// ## Why a capability table?
/// Scattered `role == Admin` checks drift apart over time. Each handler asks
/// for the capability it needs; which roles grant it lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full control: catalog, accounts, orders.
    Admin,
    /// Day-to-day operations: stock, order lifecycle.
    Staff,
    /// Shops, owns a cart and bills.
    Customer,
}

impl UserRole {
    /// Create, edit, and delete catalog items.
    pub fn can_manage_items(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Adjust stock quantities on existing items.
    pub fn can_adjust_stock(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Staff)
    }

    /// Create, edit, and delete user accounts.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Confirm, pay out, or cancel any bill.
    pub fn can_manage_orders(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Staff)
    }

    /// Browse the catalog and place orders for themselves.
    pub fn can_place_orders(&self) -> bool {
        matches!(self, UserRole::Customer)
    }
}

// =============================================================================
// User
// =============================================================================

/// An account in the directory.
///
/// The password is stored only as an argon2 digest; this type never carries
/// plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    /// Business identifier, unique.
    pub username: String,
    /// Unique.
    pub email: String,
    /// Argon2 digest, never plaintext.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: Option<String>,
    /// Unique, exactly 10 digits.
    pub telephone: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

/// A customer's persisted shopping cart. One per customer, created lazily.
///
/// `total_cents` is a cache of the sum of line totals. It is recomputed in
/// the same transaction as every structural mutation and must never be
/// adjusted incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub customer_id: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Returns the cart total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line in a cart: a quantity of one item at a frozen unit price.
///
/// ## Snapshot Pattern
/// `unit_price_cents` and `name_snapshot` are copied from the item at add
/// time. Later catalog edits do not alter existing lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub item_id: String,
    /// Item name at time of adding (frozen).
    pub name_snapshot: String,
    /// Quantity in cart, always >= 1.
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity, recomputed on every quantity change.
    pub total_price_cents: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// The status of a bill (an order).
///
/// ```text
/// DRAFT ──confirm──► CONFIRMED ──mark_paid──► PAID
///   │                    │
///   └──────cancel────────┴────► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Order is open; lines may be added, edited, and removed.
    Draft,
    /// Stock has been durably decremented; the bill is read-only.
    Confirmed,
    /// Closed out by staff; payment was taken at confirmation.
    Paid,
    /// Abandoned or voided by staff.
    Cancelled,
}

impl BillStatus {
    /// Line items may be mutated only while the bill is a draft.
    pub fn allows_line_edits(&self) -> bool {
        matches!(self, BillStatus::Draft)
    }

    /// Whether the bill can transition to `next` from this state.
    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        use BillStatus::*;
        matches!(
            (self, next),
            (Draft, Confirmed) | (Confirmed, Paid) | (Draft, Cancelled) | (Confirmed, Cancelled)
        )
    }
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Draft
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A bill: a priced, stateful order tied to one customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    /// Human-readable business identifier, e.g. `B-260830-142233-0421`.
    pub bill_number: String,
    /// Immutable once set.
    pub customer_id: String,
    /// Sum of line totals.
    pub total_cents: i64,
    /// total × tax rate, half-up at the cent. Never negative.
    pub tax_cents: i64,
    /// Set by staff before confirmation. Never negative.
    pub discount_cents: i64,
    /// total + tax − discount.
    pub final_cents: i64,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set at confirmation, when payment is taken.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// Returns the final amount as Money.
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_cents)
    }
}

/// A line in a bill. Same snapshot pattern as [`CartItem`]: the unit price
/// is frozen at add time, independent of later item price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub item_id: String,
    /// Item name at time of adding (frozen).
    pub name_snapshot: String,
    /// Quantity ordered, always >= 1.
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity.
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Bill Totals
// =============================================================================

/// Derived bill totals, computed in one place so the cached columns on
/// `bills` can never disagree with the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub total_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub final_cents: i64,
}

impl BillTotals {
    /// Computes totals from a subtotal and a discount.
    ///
    /// `total = subtotal`; `tax = total × flat rate (half-up)`;
    /// `final = total + tax − discount`. Discounts are clamped at zero -
    /// a negative discount would be a surcharge, which the shop does not do.
    pub fn compute(subtotal: Money, discount: Money) -> BillTotals {
        let discount = if discount.is_negative() {
            Money::zero()
        } else {
            discount
        };
        let tax = subtotal.calculate_tax(TaxRate::default());
        let final_amount = subtotal + tax - discount;
        BillTotals {
            total_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            discount_cents: discount.cents(),
            final_cents: final_amount.cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_status_reconcile_zero_stock() {
        assert_eq!(
            ItemStatus::Active.reconcile(0),
            ItemStatus::OutOfStock,
        );
        assert_eq!(
            ItemStatus::Inactive.reconcile(0),
            ItemStatus::OutOfStock,
        );
    }

    #[test]
    fn test_item_status_reconcile_restock() {
        // Restocking an out-of-stock item reactivates it
        assert_eq!(ItemStatus::OutOfStock.reconcile(5), ItemStatus::Active);
        // A manually deactivated item stays inactive while stocked
        assert_eq!(ItemStatus::Inactive.reconcile(5), ItemStatus::Inactive);
        assert_eq!(ItemStatus::Active.reconcile(5), ItemStatus::Active);
    }

    #[test]
    fn test_can_sell() {
        let item = Item {
            id: "i1".to_string(),
            name: "Widget".to_string(),
            description: None,
            price_cents: 1000,
            stock_quantity: 5,
            status: ItemStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(item.can_sell(5));
        assert!(!item.can_sell(6));

        let inactive = Item {
            status: ItemStatus::Inactive,
            ..item
        };
        assert!(!inactive.can_sell(1));
    }

    #[test]
    fn test_role_capabilities() {
        assert!(UserRole::Admin.can_manage_items());
        assert!(!UserRole::Staff.can_manage_items());
        assert!(UserRole::Staff.can_adjust_stock());
        assert!(UserRole::Staff.can_manage_orders());
        assert!(!UserRole::Customer.can_manage_orders());
        assert!(UserRole::Customer.can_place_orders());
        assert!(!UserRole::Admin.can_place_orders());
    }

    #[test]
    fn test_bill_status_transitions() {
        use BillStatus::*;
        assert!(Draft.can_transition_to(Confirmed));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Paid));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Confirmed.can_transition_to(Draft));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));

        assert!(Draft.allows_line_edits());
        assert!(!Confirmed.allows_line_edits());
    }

    #[test]
    fn test_bill_totals_widget_scenario() {
        // $50.00 subtotal, no discount: tax $5.00, final $55.00
        let totals = BillTotals::compute(Money::from_cents(5000), Money::zero());
        assert_eq!(totals.total_cents, 5000);
        assert_eq!(totals.tax_cents, 500);
        assert_eq!(totals.final_cents, 5500);
    }

    #[test]
    fn test_bill_totals_with_discount() {
        let totals = BillTotals::compute(Money::from_cents(10000), Money::from_cents(1500));
        assert_eq!(totals.tax_cents, 1000);
        assert_eq!(totals.final_cents, 9500);

        // Negative discounts are clamped
        let totals = BillTotals::compute(Money::from_cents(10000), Money::from_cents(-500));
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.final_cents, 11000);
    }
}
