//! Merchant console demo.
//!
//! Seeds a small shop, logs the operator in, prints the dashboard and walks
//! one order through its lifecycle.
//!
//! # Usage
//!
//! ```bash
//! CONSOLE_LOG_LEVEL=debug CONSOLE_RECENT_ORDERS_LIMIT=3 cargo run --bin merchant-console
//! ```

use anyhow::Context;
use chrono::Duration;
use merchant_console::{
    AdminSession, CatalogState, Category, ConsoleConfig, InMemorySessionStore,
    LengthCredentialCheck, Money, NewOrder, OrderBook, OrderConsole, OrderEnvironment, OrderItem,
    OrderStatus, Product, ProductDraft, ProductId, StatusFilter,
};
use merchant_console_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_EMAIL: &str = "admin@kirana.in";
const DEMO_PASSWORD: &str = "kirana123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::from_env().context("loading console configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== Merchant Console ===");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut session = AdminSession::restore(
        Arc::new(LengthCredentialCheck::new(config.min_password_length)),
        Arc::new(InMemorySessionStore::new()),
        Arc::clone(&clock),
    )?;
    session.login(DEMO_EMAIL, DEMO_PASSWORD)?;

    let catalog = seed_catalog();
    let book = seed_orders(&catalog, clock.as_ref())?;
    let console = OrderConsole::start_with(
        &session,
        config,
        OrderEnvironment::new(Arc::clone(&clock)),
        book,
        catalog,
    )?;

    let dashboard = console.dashboard().await;
    info!(dashboard = %serde_json::to_string_pretty(&dashboard)?, "Dashboard");

    let counts = console.status_counts().await;
    for status in OrderStatus::ALL {
        info!(status = status.label(), count = counts.get(status), "Tab");
    }

    // Walk the newest pending order to delivery, then once more
    let pending = console
        .visible_orders(StatusFilter::Only(OrderStatus::Pending), "")
        .await;
    if let Some(order) = pending.last() {
        for _ in 0..4 {
            let outcome = console.advance(&order.id).await?;
            info!(order_id = %order.id, ?outcome, "Advance");
        }
        for line in console.order_lines(&order.id).await? {
            info!(
                product = %line.product_name,
                quantity = line.quantity,
                subtotal = %line.subtotal,
                in_catalog = line.in_catalog,
                "Line"
            );
        }
    }

    let bread = console
        .create_product(
            ProductDraft::new("Harvest Gold Bread", "Bakery", Money::from_rupees(50))
                .with_stock(20),
        )
        .await?;
    info!(product_id = %bread.id, "Added product");
    info!(
        matches = console.search_products("bak").await.len(),
        "Search 'bak'"
    );

    let by_phone = console.visible_orders(StatusFilter::All, "2222").await;
    info!(
        orders = ?by_phone.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
        "Search '2222'"
    );

    info!(dashboard = %serde_json::to_string(&console.dashboard().await.stats)?, "Final stats");

    console.logout(&mut session).await?;
    info!(authenticated = session.is_authenticated(), "Logged out");
    Ok(())
}

fn seed_catalog() -> CatalogState {
    let product = |id: &str, name: &str, category, rupees, stock_count| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category,
        price: Money::from_rupees(rupees),
        stock_count,
        image_url: String::new(),
        is_active: true,
    };

    CatalogState::with_products(vec![
        product("p-milk", "Amul Taaza Milk 1L", Category::Dairy, 68, 40),
        product("p-atta", "Aashirvaad Atta 5kg", Category::Staples, 245, 12),
        product("p-chips", "Lays Magic Masala", Category::Snacks, 20, 0),
        product("p-banana", "Robusta Banana (dozen)", Category::Fruits, 60, 25),
    ])
}

fn seed_orders(catalog: &CatalogState, clock: &dyn Clock) -> anyhow::Result<OrderBook> {
    let now = clock.now();
    let line = |n: u32, product_id: &str, quantity| -> anyhow::Result<OrderItem> {
        let product = catalog
            .products
            .iter()
            .find(|p| p.id.as_str() == product_id)
            .with_context(|| format!("seed product {product_id} missing"))?;
        Ok(OrderItem::new(
            format!("item-{n}"),
            product.id.clone(),
            product.name.clone(),
            quantity,
            product.price,
        ))
    };

    let orders = [
        NewOrder::new("ORD-1001", "u-17", "9900001111", "PENDING")
            .with_item(line(1, "p-milk", 2)?)
            .with_item(line(2, "p-atta", 1)?)
            .created_at(now - Duration::hours(3)),
        NewOrder::new("ORD-1002", "u-23", "9900002222", "DELIVERED")
            .with_item(line(3, "p-banana", 1)?)
            .created_at(now - Duration::days(1)),
        NewOrder::new("ORD-1003", "u-17", "9900001111", "FAILED")
            .with_item(line(4, "p-chips", 5)?)
            .created_at(now - Duration::hours(30)),
        NewOrder::new("ORD-1004", "u-41", "9811112222", "PENDING")
            .with_item(line(5, "p-milk", 1)?)
            .created_at(now - Duration::minutes(20)),
    ];

    let mut book = OrderBook::new();
    for order in orders {
        book.ingest(order, now)?;
    }

    Ok(book)
}
