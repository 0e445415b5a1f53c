//! Dashboard aggregation over the order set.
//!
//! Everything here is recomputed from the store on demand; nothing is cached.

use crate::catalog::ProductDirectory;
use crate::types::{Money, Order, OrderStatus, ProductId};
use serde::{Deserialize, Serialize};

/// Headline numbers for the dashboard
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Every order in the store
    pub total_orders: usize,
    /// Booked revenue: every order except FAILED ones
    pub total_revenue: Money,
    /// Catalog size, active or not
    pub total_products: usize,
    /// Orders waiting to be accepted
    pub pending_orders: usize,
}

/// Computes the dashboard numbers
///
/// # Example
///
/// ```
/// use merchant_console::{compute_stats, NewOrder, Product};
/// use chrono::Utc;
///
/// let failed = NewOrder::new("O1", "u-1", "9900001111", "FAILED");
/// let orders = vec![failed.validate(Utc::now()).unwrap()];
/// let products: Vec<Product> = Vec::new();
/// let stats = compute_stats(&orders, &products);
/// assert_eq!(stats.total_orders, 1);
/// assert_eq!(stats.total_revenue.paise(), 0);
/// ```
#[must_use]
pub fn compute_stats<P>(orders: &[Order], products: &P) -> DashboardStats
where
    P: ProductDirectory + ?Sized,
{
    let total_revenue = booked_revenue(orders).unwrap_or_else(|| {
        tracing::warn!(orders = orders.len(), "Booked revenue overflows, reporting the maximum");
        Money::from_paise(i64::MAX)
    });

    DashboardStats {
        total_orders: orders.len(),
        total_revenue,
        total_products: products.product_count(),
        pending_orders: orders
            .iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .count(),
    }
}

/// Sum of `total_amount` over every order except FAILED ones, or `None`
/// if the sum does not fit in [`Money`]
#[must_use]
pub fn booked_revenue(orders: &[Order]) -> Option<Money> {
    orders
        .iter()
        .filter(|order| order.status != OrderStatus::Failed)
        .try_fold(Money::ZERO, |sum, order| sum.checked_add(order.total_amount))
}

/// The `limit` newest orders, newest first
///
/// Orders placed at the same instant keep their store order.
#[must_use]
pub fn recent_orders(orders: &[Order], limit: usize) -> Vec<&Order> {
    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(limit);
    recent
}

/// One row of the order detail view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Order item id
    pub item_id: String,
    /// Product the line was bought from
    pub product_id: ProductId,
    /// Name at purchase time
    pub product_name: String,
    /// Units bought
    pub quantity: u32,
    /// Price paid per unit
    pub unit_price: Money,
    /// `quantity × unit_price`
    pub subtotal: Money,
    /// False once the product has been removed from the catalog
    pub in_catalog: bool,
}

/// Detail rows for an order, in item order
#[must_use]
pub fn order_lines<P>(order: &Order, products: &P) -> Vec<OrderLine>
where
    P: ProductDirectory + ?Sized,
{
    order
        .items
        .iter()
        .map(|item| OrderLine {
            item_id: item.id.clone(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.price_at_purchase,
            subtotal: item.subtotal(),
            in_catalog: products.find_product(&item.product_id).is_some(),
        })
        .collect()
}

/// Stats plus the recent-orders table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Headline numbers
    pub stats: DashboardStats,
    /// Newest orders first
    pub recent: Vec<Order>,
}

impl Dashboard {
    /// Builds the dashboard view
    #[must_use]
    pub fn build<P>(orders: &[Order], products: &P, recent_limit: usize) -> Self
    where
        P: ProductDirectory + ?Sized,
    {
        Self {
            stats: compute_stats(orders, products),
            recent: recent_orders(orders, recent_limit)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::catalog::{Category, Product};
    use crate::types::{NewOrder, OrderItem};
    use chrono::Duration;
    use merchant_console_testing::mocks::test_epoch;

    fn order(id: &str, status: &str, rupees: i64, minutes: i64) -> Order {
        NewOrder::new(id, "u-1", "9900001111", status)
            .with_item(OrderItem::new(
                format!("{id}-1"),
                ProductId::new("p-rice"),
                "Sona Masoori Rice",
                1,
                Money::from_rupees(rupees),
            ))
            .created_at(test_epoch() + Duration::minutes(minutes))
            .validate(test_epoch())
            .unwrap()
    }

    fn rice() -> Product {
        Product {
            id: ProductId::new("p-rice"),
            name: "Sona Masoori Rice".to_string(),
            category: Category::Staples,
            price: Money::from_rupees(70),
            stock_count: 0,
            image_url: String::new(),
            is_active: false,
        }
    }

    #[test]
    fn revenue_excludes_failed_orders() {
        let orders = vec![order("O1", "DELIVERED", 100, 0), order("O2", "FAILED", 50, 1)];
        let stats = compute_stats(&orders, &Vec::<Product>::new());
        assert_eq!(stats.total_revenue, Money::from_rupees(100));
        assert_eq!(stats.total_orders, 2);
    }

    #[test]
    fn revenue_includes_undelivered_orders() {
        let orders = vec![
            order("O1", "PENDING", 200, 0),
            order("O2", "DELIVERED", 300, 1),
            order("O3", "DISPATCHED", 25, 2),
        ];
        let stats = compute_stats(&orders, &vec![rice()]);

        assert_eq!(
            stats,
            DashboardStats {
                total_orders: 3,
                total_revenue: Money::from_rupees(525),
                total_products: 1,
                pending_orders: 1,
            }
        );
    }

    #[test]
    fn revenue_overflow_is_detected() {
        let orders = vec![
            order("O1", "PENDING", 0, 0),
            order("O2", "ACCEPTED", 0, 1),
        ]
        .into_iter()
        .map(|mut o| {
            o.total_amount = Money::from_paise(i64::MAX);
            o
        })
        .collect::<Vec<_>>();

        assert_eq!(booked_revenue(&orders), None);
        assert_eq!(
            compute_stats(&orders, &Vec::<Product>::new()).total_revenue,
            Money::from_paise(i64::MAX)
        );
        assert_eq!(booked_revenue(&orders[..1]), Some(Money::from_paise(i64::MAX)));
    }

    #[test]
    fn empty_store() {
        let stats = compute_stats(&[], &Vec::<Product>::new());
        assert_eq!(stats, DashboardStats::default());
        assert!(recent_orders(&[], 5).is_empty());
    }

    #[test]
    fn recent_orders_newest_first_and_truncated() {
        let orders = vec![
            order("O1", "PENDING", 10, 5),
            order("O2", "PENDING", 10, 30),
            order("O3", "PENDING", 10, 5),
            order("O4", "PENDING", 10, 10),
        ];

        let recent: Vec<&str> = recent_orders(&orders, 3).iter().map(|o| o.id.as_str()).collect();
        assert_eq!(recent, ["O2", "O4", "O1"]);

        let all: Vec<&str> = recent_orders(&orders, 10).iter().map(|o| o.id.as_str()).collect();
        assert_eq!(all, ["O2", "O4", "O1", "O3"]);
    }

    #[test]
    fn order_lines_flag_removed_products() {
        let placed = NewOrder::new("O9", "u-2", "9900002222", "ACCEPTED")
            .with_item(OrderItem::new(
                "i-1",
                ProductId::new("p-rice"),
                "Sona Masoori Rice",
                2,
                Money::from_rupees(70),
            ))
            .with_item(OrderItem::new(
                "i-2",
                ProductId::new("p-gone"),
                "Old Biscuits",
                3,
                Money::from_paise(1050),
            ))
            .validate(test_epoch())
            .unwrap();

        let lines = order_lines(&placed, &vec![rice()]);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].in_catalog);
        assert_eq!(lines[0].subtotal, Money::from_rupees(140));
        assert!(!lines[1].in_catalog);
        assert_eq!(lines[1].product_name, "Old Biscuits");
        assert_eq!(lines[1].subtotal, Money::from_paise(3150));
    }

    #[test]
    fn dashboard_combines_stats_and_recent() {
        let orders = vec![order("O1", "PENDING", 10, 0), order("O2", "ACCEPTED", 20, 1)];
        let dashboard = Dashboard::build(&orders, &vec![rice()], 1);

        assert_eq!(dashboard.stats.total_orders, 2);
        assert_eq!(dashboard.recent.len(), 1);
        assert_eq!(dashboard.recent[0].id.as_str(), "O2");
    }
}
