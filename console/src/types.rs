//! Core domain types for the console.
//!
//! Orders progress through PENDING → ACCEPTED → DISPATCHED → DELIVERED.
//! FAILED is a second terminal status that only arrives from ingestion.

use crate::error::OrderError;
use chrono::{DateTime, Utc};
use merchant_console_core::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an order
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new `OrderId` from a string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the customer who placed an order
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId` from a string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a catalog product
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new `ProductId` from a string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh random product id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a command with the action that resolves it
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh random request id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount in paise (to avoid floating point issues)
///
/// ```
/// use merchant_console::Money;
///
/// assert_eq!(Money::from_rupees(45).to_string(), "₹45.00");
/// assert_eq!(Money::from_paise(1_999).to_string(), "₹19.99");
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero rupees
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from paise
    #[must_use]
    pub const fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    /// Creates a new money amount from whole rupees
    #[must_use]
    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees.saturating_mul(100))
    }

    /// Returns the value in paise
    #[must_use]
    pub const fn paise(self) -> i64 {
        self.0
    }

    /// True for amounts below zero
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64` bounds
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// `self × quantity`, or `None` on overflow
    #[must_use]
    pub const fn checked_times(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as i64) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// `self + rhs`, or `None` on overflow
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }
}

/// Saturating; ingestion and revenue use [`Money::checked_add`]
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
    }
}

/// Status of an order in its fulfillment lifecycle
///
/// Serialized and parsed as the upper-case name (`"PENDING"`, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed by the customer, not yet looked at
    Pending,
    /// Accepted by the merchant
    Accepted,
    /// Handed to delivery
    Dispatched,
    /// Received by the customer (terminal)
    Delivered,
    /// Failed upstream (terminal)
    Failed,
}

impl OrderStatus {
    /// Every status in workflow order. Used for display tabs only.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Accepted,
        Self::Dispatched,
        Self::Delivered,
        Self::Failed,
    ];

    /// Upper-case wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Dispatched => "DISPATCHED",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }

    /// Human-readable badge text
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Dispatched => "Dispatched",
            Self::Delivered => "Delivered",
            Self::Failed => "Failed",
        }
    }

    /// Text of the button that advances an order out of this status
    ///
    /// `None` for terminal statuses, which have no advance action.
    #[must_use]
    pub const fn advance_label(self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("Accept"),
            Self::Accepted => Some("Dispatch"),
            Self::Dispatched => Some("Mark Delivered"),
            Self::Delivered | Self::Failed => None,
        }
    }

    /// True for DELIVERED and FAILED
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// A single line of an order, frozen at purchase time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Line identifier
    pub id: String,
    /// Catalog product this line was bought from (may no longer exist)
    pub product_id: ProductId,
    /// Product name at purchase time
    pub product_name: String,
    /// Units bought, always positive once ingested
    pub quantity: u32,
    /// Unit price at purchase time
    pub price_at_purchase: Money,
}

impl OrderItem {
    /// Creates a new order line
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        price_at_purchase: Money,
    ) -> Self {
        Self {
            id: id.into(),
            product_id,
            product_name: product_name.into(),
            quantity,
            price_at_purchase,
        }
    }

    /// `quantity × price_at_purchase`
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.price_at_purchase.times(self.quantity)
    }
}

/// An ingested order
///
/// Created once by ingestion, then changed only by status transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique, non-empty order id
    pub id: OrderId,
    /// Customer who placed the order
    pub user_id: UserId,
    /// Customer phone number, searchable
    pub user_phone: String,
    /// Equals the sum of the item subtotals
    pub total_amount: Money,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
    /// Order lines in purchase order
    pub items: Vec<OrderItem>,
    /// Starts at 1 and increments on every status change
    pub version: Version,
}

impl Order {
    /// Sum of the item subtotals
    #[must_use]
    pub fn item_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// An order as it arrives from upstream, before validation
///
/// `status` is kept as text until [`NewOrder::validate`] so that unknown
/// statuses are reported instead of silently coerced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Order id
    pub id: String,
    /// Customer id
    pub user_id: String,
    /// Customer phone number
    pub user_phone: String,
    /// Declared total
    pub total_amount: Money,
    /// Status text, one of the five upper-case names
    pub status: String,
    /// Placement time; stamped from the clock when absent
    pub created_at: Option<DateTime<Utc>>,
    /// Order lines
    pub items: Vec<OrderItem>,
}

impl NewOrder {
    /// Starts an order with no items and a zero total
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        user_phone: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            user_phone: user_phone.into(),
            total_amount: Money::ZERO,
            status: status.into(),
            created_at: None,
            items: Vec::new(),
        }
    }

    /// Appends a line and adds its subtotal to the declared total
    #[must_use]
    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.total_amount = self.total_amount + item.subtotal();
        self.items.push(item);
        self
    }

    /// Overrides the declared total
    #[must_use]
    pub const fn with_total(mut self, total: Money) -> Self {
        self.total_amount = total;
        self
    }

    /// Sets the placement time
    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Validates the order and converts it into a stored [`Order`] at version 1
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] for a blank id, a negative amount or a
    ///   zero quantity
    /// - [`OrderError::UnknownStatus`] for status text outside the five names
    /// - [`OrderError::TotalMismatch`] when the total is not the item sum
    pub fn validate(self, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if self.id.trim().is_empty() {
            return Err(OrderError::Validation("order id must not be empty".to_string()));
        }

        let status = self.status.parse::<OrderStatus>()?;

        if self.total_amount.is_negative() {
            return Err(OrderError::Validation(format!(
                "order {} has negative total {}",
                self.id, self.total_amount
            )));
        }

        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "item '{}' of order {} has zero quantity",
                    item.product_name, self.id
                )));
            }
            if item.price_at_purchase.is_negative() {
                return Err(OrderError::Validation(format!(
                    "item '{}' of order {} has negative price",
                    item.product_name, self.id
                )));
            }
        }

        let computed = self
            .items
            .iter()
            .try_fold(Money::ZERO, |sum, item| {
                item.price_at_purchase
                    .checked_times(item.quantity)
                    .and_then(|subtotal| sum.checked_add(subtotal))
            })
            .ok_or_else(|| {
                OrderError::Validation(format!("item total of order {} overflows", self.id))
            })?;

        let id = OrderId::new(self.id);
        if computed != self.total_amount {
            return Err(OrderError::TotalMismatch {
                order_id: id,
                declared: self.total_amount,
                computed,
            });
        }

        Ok(Order {
            id,
            user_id: UserId::new(self.user_id),
            user_phone: self.user_phone,
            total_amount: self.total_amount,
            status,
            created_at: self.created_at.unwrap_or(now),
            items: self.items,
            version: Version::INITIAL.next(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use merchant_console_core::environment::Clock;
    use merchant_console_testing::test_clock;

    fn milk(quantity: u32) -> OrderItem {
        OrderItem::new("i-1", ProductId::new("p-milk"), "Milk 1L", quantity, Money::from_rupees(60))
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_paise(0).to_string(), "₹0.00");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::from_paise(123_456).to_string(), "₹1234.56");
        assert_eq!(Money::from_paise(-250).to_string(), "-₹2.50");
    }

    #[test]
    fn money_sum() {
        let total: Money = [Money::from_rupees(100), Money::from_rupees(50)].into_iter().sum();
        assert_eq!(total, Money::from_rupees(150));
    }

    #[test]
    fn item_subtotal() {
        assert_eq!(milk(3).subtotal(), Money::from_rupees(180));
    }

    #[test]
    fn status_wire_names_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(
            "SHIPPED".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus("SHIPPED".to_string()))
        );
        assert!("pending".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn advance_labels() {
        assert_eq!(OrderStatus::Pending.advance_label(), Some("Accept"));
        assert_eq!(OrderStatus::Accepted.advance_label(), Some("Dispatch"));
        assert_eq!(OrderStatus::Dispatched.advance_label(), Some("Mark Delivered"));
        assert_eq!(OrderStatus::Delivered.advance_label(), None);
        assert_eq!(OrderStatus::Failed.advance_label(), None);
    }

    #[test]
    fn validate_accepts_consistent_order() {
        let now = test_clock().now();
        let order = NewOrder::new("O1", "u-1", "9900001111", "PENDING")
            .with_item(milk(2))
            .validate(now)
            .unwrap();

        assert_eq!(order.id, OrderId::new("O1"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Money::from_rupees(120));
        assert_eq!(order.created_at, now);
        assert_eq!(order.version, Version::new(1));
    }

    #[test]
    fn validate_rejects_total_mismatch() {
        let result = NewOrder::new("O1", "u-1", "99", "PENDING")
            .with_item(milk(2))
            .with_total(Money::from_rupees(100))
            .validate(test_clock().now());

        assert_eq!(
            result,
            Err(OrderError::TotalMismatch {
                order_id: OrderId::new("O1"),
                declared: Money::from_rupees(100),
                computed: Money::from_rupees(120),
            })
        );
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let now = test_clock().now();

        let blank = NewOrder::new("  ", "u-1", "99", "PENDING").validate(now);
        assert!(matches!(blank, Err(OrderError::Validation(_))));

        let zero_qty = NewOrder::new("O1", "u-1", "99", "PENDING").with_item(milk(0)).validate(now);
        assert!(matches!(zero_qty, Err(OrderError::Validation(_))));

        let negative = NewOrder::new("O1", "u-1", "99", "PENDING")
            .with_total(Money::from_paise(-1))
            .validate(now);
        assert!(matches!(negative, Err(OrderError::Validation(_))));

        let unknown = NewOrder::new("O1", "u-1", "99", "CANCELLED").validate(now);
        assert_eq!(unknown, Err(OrderError::UnknownStatus("CANCELLED".to_string())));
    }

    #[test]
    fn validate_rejects_overflowing_item_total() {
        let huge = OrderItem::new(
            "i-1",
            ProductId::new("p-gold"),
            "Gold Bar",
            2,
            Money::from_paise(i64::MAX / 2 + 1),
        );

        let result = NewOrder::new("O1", "u-1", "99", "PENDING")
            .with_item(huge)
            .with_total(Money::from_paise(i64::MAX))
            .validate(test_clock().now());

        assert!(matches!(result, Err(OrderError::Validation(msg)) if msg.contains("overflows")));
    }

    #[test]
    fn checked_money_ops() {
        assert_eq!(Money::from_rupees(3).checked_times(4), Some(Money::from_rupees(12)));
        assert_eq!(Money::from_paise(i64::MAX).checked_times(2), None);
        assert_eq!(Money::from_paise(i64::MAX).checked_add(Money::from_paise(1)), None);
    }

    #[test]
    fn empty_order_needs_zero_total() {
        let now = test_clock().now();
        assert!(NewOrder::new("O1", "u-1", "99", "FAILED").validate(now).is_ok());

        let result = NewOrder::new("O2", "u-1", "99", "FAILED")
            .with_total(Money::from_rupees(1))
            .validate(now);
        assert!(matches!(result, Err(OrderError::TotalMismatch { .. })));
    }
}
