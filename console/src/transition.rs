//! The fulfillment transition table.

use crate::types::OrderStatus;

/// Status an order moves to when advanced, or `None` from a terminal status
///
/// ```
/// use merchant_console::{next_status, OrderStatus};
///
/// assert_eq!(next_status(OrderStatus::Pending), Some(OrderStatus::Accepted));
/// assert_eq!(next_status(OrderStatus::Failed), None);
/// ```
#[must_use]
pub const fn next_status(current: OrderStatus) -> Option<OrderStatus> {
    match current {
        OrderStatus::Pending => Some(OrderStatus::Accepted),
        OrderStatus::Accepted => Some(OrderStatus::Dispatched),
        OrderStatus::Dispatched => Some(OrderStatus::Delivered),
        OrderStatus::Delivered | OrderStatus::Failed => None,
    }
}
