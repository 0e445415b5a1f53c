//! Status tabs and free-text search over the order list.

use crate::error::OrderError;
use crate::types::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which status tab is selected
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFilter {
    /// Every order
    #[default]
    All,
    /// Orders in exactly this status
    Only(OrderStatus),
}

impl StatusFilter {
    /// True if an order in `status` belongs to this tab
    #[must_use]
    pub fn admits(self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl From<OrderStatus> for StatusFilter {
    fn from(status: OrderStatus) -> Self {
        Self::Only(status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

/// Parses `"ALL"` or one of the five status names
impl FromStr for StatusFilter {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// True if `query` is empty, is a case-insensitive substring of the order
/// id, or is a literal substring of the customer phone number.
#[must_use]
pub fn matches_query(order: &Order, query: &str) -> bool {
    query.is_empty()
        || order
            .id
            .as_str()
            .to_lowercase()
            .contains(&query.to_lowercase())
        || order.user_phone.contains(query)
}

/// Orders in the selected tab that match the search text, in store order
///
/// ```ignore
/// let pending = visible_orders(&book.orders, StatusFilter::Only(OrderStatus::Pending), "");
/// ```
#[must_use]
pub fn visible_orders<'a>(
    orders: &'a [Order],
    filter: StatusFilter,
    query: &str,
) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|order| filter.admits(order.status) && matches_query(order, query))
        .collect()
}

/// Number of orders in `status`, over the full unfiltered list
#[must_use]
pub fn count(orders: &[Order], status: OrderStatus) -> usize {
    orders.iter().filter(|order| order.status == status).count()
}

/// Badge counts for every status tab
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// PENDING orders
    pub pending: usize,
    /// ACCEPTED orders
    pub accepted: usize,
    /// DISPATCHED orders
    pub dispatched: usize,
    /// DELIVERED orders
    pub delivered: usize,
    /// FAILED orders
    pub failed: usize,
}

impl StatusCounts {
    /// Counts every status in one pass
    #[must_use]
    pub fn tally(orders: &[Order]) -> Self {
        orders.iter().fold(Self::default(), |mut counts, order| {
            *counts.slot(order.status) += 1;
            counts
        })
    }

    /// Count for one status
    #[must_use]
    pub const fn get(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Accepted => self.accepted,
            OrderStatus::Dispatched => self.dispatched,
            OrderStatus::Delivered => self.delivered,
            OrderStatus::Failed => self.failed,
        }
    }

    /// Count for a tab; `All` is the total
    #[must_use]
    pub const fn for_filter(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.total(),
            StatusFilter::Only(status) => self.get(status),
        }
    }

    /// Sum over all statuses
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.accepted + self.dispatched + self.delivered + self.failed
    }

    fn slot(&mut self, status: OrderStatus) -> &mut usize {
        match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Accepted => &mut self.accepted,
            OrderStatus::Dispatched => &mut self.dispatched,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Failed => &mut self.failed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::NewOrder;
    use merchant_console_core::environment::Clock;
    use merchant_console_testing::test_clock;

    fn order(id: &str, phone: &str, status: &str) -> Order {
        NewOrder::new(id, "u-1", phone, status)
            .validate(test_clock().now())
            .unwrap()
    }

    fn sample() -> Vec<Order> {
        vec![
            order("ORD-A1", "9900001111", "PENDING"),
            order("ord-b2", "9900002222", "DELIVERED"),
            order("ORD-C3", "9811112222", "PENDING"),
            order("ORD-D4", "9700003333", "FAILED"),
        ]
    }

    fn ids(orders: &[&Order]) -> Vec<String> {
        orders.iter().map(|o| o.id.to_string()).collect()
    }

    #[test]
    fn parse_filter() {
        assert_eq!("ALL".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "DISPATCHED".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(OrderStatus::Dispatched)
        );
        assert!("EVERYTHING".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::Only(OrderStatus::Failed).to_string(), "FAILED");
    }

    #[test]
    fn empty_query_and_all_is_identity() {
        let orders = sample();
        let visible = visible_orders(&orders, StatusFilter::All, "");
        assert_eq!(ids(&visible), ["ORD-A1", "ord-b2", "ORD-C3", "ORD-D4"]);
    }

    #[test]
    fn id_search_is_case_insensitive() {
        let orders = sample();
        assert_eq!(ids(&visible_orders(&orders, StatusFilter::All, "B2")), ["ord-b2"]);
        assert_eq!(ids(&visible_orders(&orders, StatusFilter::All, "ord-c")), ["ORD-C3"]);
    }

    #[test]
    fn phone_search_is_substring() {
        let orders = sample();
        assert_eq!(
            ids(&visible_orders(&orders, StatusFilter::All, "2222")),
            ["ord-b2", "ORD-C3"]
        );
    }

    #[test]
    fn status_and_search_combine() {
        let orders = sample();
        let visible = visible_orders(&orders, OrderStatus::Pending.into(), "2222");
        assert_eq!(ids(&visible), ["ORD-C3"]);
    }

    #[test]
    fn counts_cover_every_order() {
        let orders = sample();
        let counts = StatusCounts::tally(&orders);

        assert_eq!(counts.pending, 2);
        assert_eq!(counts.delivered, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.accepted, 0);
        assert_eq!(counts.total(), orders.len());
        assert_eq!(counts.for_filter(StatusFilter::All), 4);
        for status in OrderStatus::ALL {
            assert_eq!(counts.get(status), count(&orders, status));
        }
    }
}
