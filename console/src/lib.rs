//! Merchant admin console core.
//!
//! An operator logs in, watches sales numbers, manages the product catalog
//! and moves orders through a fixed fulfillment lifecycle:
//!
//! ```text
//! PENDING ──▶ ACCEPTED ──▶ DISPATCHED ──▶ DELIVERED
//! FAILED (terminal, set upstream)
//! ```
//!
//! # Architecture
//!
//! 1. **Order book** ([`OrderBook`]) is the single source of truth, held by a
//!    runtime `Store` and changed only by [`OrderReducer`]
//! 2. **Transitions** ([`next_status`]) are a fixed table; advancing a
//!    terminal order is a no-op
//! 3. **Views** ([`visible_orders`], [`StatusCounts`], [`compute_stats`],
//!    [`recent_orders`]) are pure functions over the order list
//! 4. **Catalog** ([`CatalogState`]) lives in a second store with its own
//!    reducer
//! 5. **Console** ([`OrderConsole`]) ties both stores to a logged-in
//!    [`AdminSession`]
//!
//! # Example Usage
//!
//! ```no_run
//! use merchant_console::{
//!     AdminSession, ConsoleConfig, InMemorySessionStore, LengthCredentialCheck, NewOrder,
//!     OrderConsole, OrderEnvironment, OrderId, StatusFilter,
//! };
//! use merchant_console_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConsoleConfig::default();
//! let mut session = AdminSession::restore(
//!     Arc::new(LengthCredentialCheck::new(config.min_password_length)),
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(SystemClock),
//! )?;
//! session.login("admin@kirana.in", "secret123")?;
//!
//! let environment = OrderEnvironment::new(Arc::new(SystemClock));
//! let console = OrderConsole::start(&session, config, environment)?;
//! console.ingest(NewOrder::new("ORD-1", "u-1", "9900001111", "PENDING")).await?;
//! console.advance(&OrderId::new("ORD-1")).await?;
//!
//! let accepted = console.visible_orders(StatusFilter::All, "ord").await;
//! assert_eq!(accepted.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod filter;
pub mod reducer;
pub mod session;
pub mod stats;
pub mod transition;
pub mod types;

// Re-export commonly used types
pub use catalog::{
    search_products, CatalogAction, CatalogReducer, CatalogState, Category, Product,
    ProductDirectory, ProductDraft,
};
pub use config::ConsoleConfig;
pub use console::OrderConsole;
pub use error::{AuthError, CatalogError, ConfigError, ConsoleError, OrderError};
pub use filter::{count, matches_query, visible_orders, StatusCounts, StatusFilter};
pub use reducer::{AdvanceOutcome, OrderAction, OrderBook, OrderEnvironment, OrderReducer};
pub use session::{
    AdminSession, CredentialCheck, InMemorySessionStore, LengthCredentialCheck, SessionRecord,
    SessionStore,
};
pub use stats::{
    booked_revenue, compute_stats, order_lines, recent_orders, Dashboard, DashboardStats, OrderLine,
};
pub use transition::next_status;
pub use types::{
    Money, NewOrder, Order, OrderId, OrderItem, OrderStatus, ProductId, RequestId, UserId,
};
