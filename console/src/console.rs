//! The console facade: one order store and one catalog store behind a
//! logged-in operator.
//!
//! Reads take the store's read lock and return owned snapshots. Writes are
//! sent as commands tagged with a [`RequestId`]; the call waits for the event
//! carrying the same id and turns it back into a `Result`.

use crate::catalog::{self, CatalogAction, CatalogReducer, CatalogState, Product, ProductDraft};
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, OrderError};
use crate::filter::{self, StatusCounts, StatusFilter};
use crate::reducer::{AdvanceOutcome, OrderAction, OrderBook, OrderEnvironment, OrderReducer};
use crate::session::AdminSession;
use crate::stats::{self, Dashboard, OrderLine};
use crate::types::{NewOrder, Order, OrderId, ProductId, RequestId};
use merchant_console_core::version::Version;
use merchant_console_runtime::Store;

/// Store holding the order book
pub type OrderStore = Store<OrderBook, OrderAction, OrderEnvironment, OrderReducer>;

/// Store holding the product catalog
pub type CatalogStore = Store<CatalogState, CatalogAction, (), CatalogReducer>;

/// A running console session
pub struct OrderConsole {
    config: ConsoleConfig,
    orders: OrderStore,
    catalog: CatalogStore,
    admin_email: String,
}

impl OrderConsole {
    /// Opens the console with empty stores
    ///
    /// # Errors
    ///
    /// [`ConsoleError::NotAuthenticated`] unless `session` is logged in.
    pub fn start(
        session: &AdminSession,
        config: ConsoleConfig,
        env: OrderEnvironment,
    ) -> Result<Self, ConsoleError> {
        Self::start_with(session, config, env, OrderBook::new(), CatalogState::default())
    }

    /// Opens the console over existing order and catalog state
    ///
    /// # Errors
    ///
    /// [`ConsoleError::NotAuthenticated`] unless `session` is logged in.
    pub fn start_with(
        session: &AdminSession,
        config: ConsoleConfig,
        env: OrderEnvironment,
        book: OrderBook,
        catalog: CatalogState,
    ) -> Result<Self, ConsoleError> {
        let admin_email = session
            .admin_email()
            .ok_or(ConsoleError::NotAuthenticated)?
            .to_string();

        tracing::info!(
            admin = %admin_email,
            orders = book.orders.len(),
            products = catalog.products.len(),
            "Console started"
        );

        let store_config = config.store_config();
        Ok(Self {
            orders: Store::with_config(book, OrderReducer::new(), env, store_config.clone()),
            catalog: Store::with_config(catalog, CatalogReducer, (), store_config),
            config,
            admin_email,
        })
    }

    /// Operator the console was opened for
    #[must_use]
    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    // ========== Orders: reads ==========

    /// Every order, in store order
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.state(|book| book.orders.clone()).await
    }

    /// One order by id
    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.orders.state(|book| book.get(id).cloned()).await
    }

    /// Orders in the selected tab that match the search text
    pub async fn visible_orders(&self, status: StatusFilter, query: &str) -> Vec<Order> {
        self.orders
            .state(|book| {
                filter::visible_orders(&book.orders, status, query)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Badge counts for every status tab
    pub async fn status_counts(&self) -> StatusCounts {
        self.orders.state(|book| StatusCounts::tally(&book.orders)).await
    }

    /// Stats plus the configured number of recent orders
    pub async fn dashboard(&self) -> Dashboard {
        let products = self.products().await;
        let limit = self.config.recent_orders_limit;
        self.orders
            .state(|book| Dashboard::build(&book.orders, &products, limit))
            .await
    }

    /// Detail rows for one order
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for an unknown id.
    pub async fn order_lines(&self, id: &OrderId) -> Result<Vec<OrderLine>, ConsoleError> {
        let order = self
            .order(id)
            .await
            .ok_or_else(|| OrderError::NotFound(id.clone()))?;
        Ok(self
            .catalog
            .state(|state| stats::order_lines(&order, state))
            .await)
    }

    // ========== Orders: writes ==========

    /// Moves an order one step along its lifecycle
    ///
    /// Terminal orders come back as [`AdvanceOutcome::Unchanged`].
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for an unknown id, or a store failure.
    pub async fn advance(&self, id: &OrderId) -> Result<AdvanceOutcome, ConsoleError> {
        self.advance_expecting(id, None).await
    }

    /// Like [`OrderConsole::advance`], but only if the order is still at
    /// `expected_version`
    ///
    /// # Errors
    ///
    /// Additionally [`OrderError::VersionConflict`] on a version mismatch.
    pub async fn advance_expecting(
        &self,
        id: &OrderId,
        expected_version: Option<Version>,
    ) -> Result<AdvanceOutcome, ConsoleError> {
        let request_id = RequestId::new();
        let command = OrderAction::AdvanceOrder {
            request_id,
            order_id: id.clone(),
            expected_version,
        };

        match self.request_order(command, request_id).await? {
            OrderAction::AdvanceResolved { result, .. } => Ok(result?),
            other => Err(ConsoleError::UnexpectedResponse(other.event_type())),
        }
    }

    /// Validates and stores an order
    ///
    /// # Errors
    ///
    /// Any ingestion [`OrderError`], or a store failure.
    pub async fn ingest(&self, order: NewOrder) -> Result<Order, ConsoleError> {
        let request_id = RequestId::new();
        let command = OrderAction::IngestOrder { request_id, order };

        match self.request_order(command, request_id).await? {
            OrderAction::IngestResolved { result, .. } => Ok(result?),
            other => Err(ConsoleError::UnexpectedResponse(other.event_type())),
        }
    }

    async fn request_order(
        &self,
        command: OrderAction,
        request_id: RequestId,
    ) -> Result<OrderAction, ConsoleError> {
        Ok(self
            .orders
            .send_and_wait_for(
                command,
                |action| action.resolves(request_id),
                self.config.request_timeout(),
            )
            .await?)
    }

    // ========== Catalog ==========

    /// Every product, in catalog order
    pub async fn products(&self) -> Vec<Product> {
        self.catalog.state(|state| state.products.clone()).await
    }

    /// Products whose name or category contains `query`
    pub async fn search_products(&self, query: &str) -> Vec<Product> {
        self.catalog
            .state(|state| {
                catalog::search_products(&state.products, query)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Adds a product under a fresh id
    ///
    /// # Errors
    ///
    /// Any [`crate::error::CatalogError`], or a store failure.
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, ConsoleError> {
        let request_id = RequestId::new();
        self.request_catalog(
            CatalogAction::CreateProduct {
                request_id,
                id: ProductId::generate(),
                draft,
            },
            request_id,
        )
        .await
    }

    /// Replaces a product's editable fields
    ///
    /// # Errors
    ///
    /// Any [`crate::error::CatalogError`], or a store failure.
    pub async fn update_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, ConsoleError> {
        let request_id = RequestId::new();
        self.request_catalog(
            CatalogAction::UpdateProduct {
                request_id,
                id: id.clone(),
                draft,
            },
            request_id,
        )
        .await
    }

    /// Removes a product; existing order lines keep their snapshot
    ///
    /// # Errors
    ///
    /// Any [`crate::error::CatalogError`], or a store failure.
    pub async fn delete_product(&self, id: &ProductId) -> Result<Product, ConsoleError> {
        let request_id = RequestId::new();
        self.request_catalog(
            CatalogAction::DeleteProduct {
                request_id,
                id: id.clone(),
            },
            request_id,
        )
        .await
    }

    /// Toggles a product's active flag
    ///
    /// # Errors
    ///
    /// Any [`crate::error::CatalogError`], or a store failure.
    pub async fn set_product_active(
        &self,
        id: &ProductId,
        active: bool,
    ) -> Result<Product, ConsoleError> {
        let request_id = RequestId::new();
        self.request_catalog(
            CatalogAction::SetProductActive {
                request_id,
                id: id.clone(),
                active,
            },
            request_id,
        )
        .await
    }

    async fn request_catalog(
        &self,
        command: CatalogAction,
        request_id: RequestId,
    ) -> Result<Product, ConsoleError> {
        let response = self
            .catalog
            .send_and_wait_for(
                command,
                |action| action.resolves(request_id),
                self.config.request_timeout(),
            )
            .await?;

        match response {
            CatalogAction::ProductSaved { product, .. }
            | CatalogAction::ProductDeleted { product, .. } => Ok(product),
            CatalogAction::CatalogRejected { error, .. } => Err(error.into()),
            other => Err(ConsoleError::UnexpectedResponse(other.event_type())),
        }
    }

    // ========== Lifecycle ==========

    /// Waits for in-flight effects on both stores
    ///
    /// # Errors
    ///
    /// [`merchant_console_runtime::StoreError::ShutdownTimeout`] if effects
    /// are still running after the configured grace period.
    pub async fn shutdown(&self) -> Result<(), ConsoleError> {
        let timeout = self.config.shutdown_timeout();
        self.orders.shutdown(timeout).await?;
        self.catalog.shutdown(timeout).await?;
        tracing::info!(admin = %self.admin_email, "Console shut down");
        Ok(())
    }

    /// Shuts the console down and ends the operator session
    ///
    /// The stores are dropped even when shutdown fails; the session is
    /// cleared either way.
    ///
    /// # Errors
    ///
    /// The first of the shutdown or session-store failures.
    pub async fn logout(self, session: &mut AdminSession) -> Result<(), ConsoleError> {
        let shutdown = self.shutdown().await;
        let cleared = session.logout();
        shutdown?;
        Ok(cleared?)
    }
}

impl std::fmt::Debug for OrderConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderConsole")
            .field("admin_email", &self.admin_email)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
