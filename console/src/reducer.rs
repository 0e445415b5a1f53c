//! The order store and the reducer that owns every write to it.
//!
//! `OrderBook` holds orders in ingestion order. Its two mutators, `ingest`
//! and `advance`, are plain synchronous methods; `OrderReducer` runs them for
//! `IngestOrder` and `AdvanceOrder` commands and reports the outcome through a
//! feedback event tagged with the command's request id.

use crate::error::OrderError;
use crate::transition::next_status;
use crate::types::{NewOrder, Order, OrderId, OrderStatus, RequestId};
use chrono::{DateTime, Utc};
use merchant_console_core::effect::Effect;
use merchant_console_core::environment::Clock;
use merchant_console_core::reducer::Reducer;
use merchant_console_core::version::Version;
use merchant_console_core::{smallvec, SmallVec};
use merchant_console_macros::{Action, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a successful `advance`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    /// The order moved one step forward
    Advanced {
        /// Status before the transition
        from: OrderStatus,
        /// Status after the transition
        to: OrderStatus,
        /// Order version after the transition
        version: Version,
    },
    /// The order is terminal and was left untouched
    Unchanged {
        /// The terminal status the order is in
        status: OrderStatus,
    },
}

/// In-memory order store
///
/// Exclusively owns its orders. Orders are never removed.
#[derive(State, Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrderBook {
    /// Orders in ingestion order
    pub orders: Vec<Order>,
    /// Incremented on every accepted write
    #[version]
    pub revision: Option<Version>,
    /// Error of the most recent command, cleared when a command succeeds
    pub last_error: Option<String>,
}

impl OrderBook {
    /// Creates an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            orders: Vec::new(),
            revision: None,
            last_error: None,
        }
    }

    /// Looks up an order by id
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Validates and appends an order at version 1
    ///
    /// `now` stamps orders that arrive without a placement time.
    ///
    /// # Errors
    ///
    /// Any validation error from [`NewOrder::validate`], or
    /// [`OrderError::DuplicateOrder`] when the id is already stored.
    pub fn ingest(
        &mut self,
        new_order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<&Order, OrderError> {
        let order = new_order.validate(now)?;
        if self.get(&order.id).is_some() {
            return Err(OrderError::DuplicateOrder(order.id));
        }

        self.bump_revision();
        let index = self.orders.len();
        self.orders.push(order);
        Ok(&self.orders[index])
    }

    /// Moves one order to the next status in the fulfillment chain
    ///
    /// Terminal orders are left as they are and reported as
    /// [`AdvanceOutcome::Unchanged`]. Only the status and version of the
    /// target order change; nothing else in the store is touched.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] if no order has this id
    /// - [`OrderError::VersionConflict`] if `expected_version` is given and
    ///   differs from the stored version
    ///
    /// No state changes on error.
    pub fn advance(
        &mut self,
        order_id: &OrderId,
        expected_version: Option<Version>,
    ) -> Result<AdvanceOutcome, OrderError> {
        let order = self
            .orders
            .iter_mut()
            .find(|order| &order.id == order_id)
            .ok_or_else(|| OrderError::NotFound(order_id.clone()))?;

        if let Some(expected) = expected_version {
            if expected != order.version {
                return Err(OrderError::VersionConflict {
                    order_id: order_id.clone(),
                    expected,
                    actual: order.version,
                });
            }
        }

        let from = order.status;
        let Some(to) = next_status(from) else {
            return Ok(AdvanceOutcome::Unchanged { status: from });
        };

        order.status = to;
        order.version = order.version.next();
        let version = order.version;
        self.bump_revision();

        Ok(AdvanceOutcome::Advanced { from, to, version })
    }

    fn bump_revision(&mut self) {
        let next = self.revision.unwrap_or(Version::INITIAL).next();
        self.set_version(next);
    }
}

/// Commands accepted by the order store and the events that resolve them
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderAction {
    // ========== Commands ==========
    /// Command: validate and store a new order
    #[command]
    IngestOrder {
        /// Correlates this command with its `IngestResolved` event
        request_id: RequestId,
        /// The order as received from upstream
        order: NewOrder,
    },

    /// Command: move an order one step forward
    #[command]
    AdvanceOrder {
        /// Correlates this command with its `AdvanceResolved` event
        request_id: RequestId,
        /// Order to advance
        order_id: OrderId,
        /// Reject the command if the order is not at this version
        expected_version: Option<Version>,
    },

    // ========== Events ==========
    /// Event: an `IngestOrder` command finished
    #[event]
    IngestResolved {
        /// Id of the command
        request_id: RequestId,
        /// Stored order, or why it was rejected
        result: Result<Order, OrderError>,
        /// When the command was processed
        timestamp: DateTime<Utc>,
    },

    /// Event: an `AdvanceOrder` command finished
    #[event]
    AdvanceResolved {
        /// Id of the command
        request_id: RequestId,
        /// Order the command targeted
        order_id: OrderId,
        /// What happened, or why it was rejected
        result: Result<AdvanceOutcome, OrderError>,
        /// When the command was processed
        timestamp: DateTime<Utc>,
    },
}

impl OrderAction {
    /// Request id carried by every variant
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::IngestOrder { request_id, .. }
            | Self::AdvanceOrder { request_id, .. }
            | Self::IngestResolved { request_id, .. }
            | Self::AdvanceResolved { request_id, .. } => *request_id,
        }
    }

    /// True if this is the event that resolves the command `request_id`
    #[must_use]
    pub fn resolves(&self, request_id: RequestId) -> bool {
        self.is_event() && self.request_id() == request_id
    }
}

/// Environment for the order reducer
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for event timestamps and missing placement times
    pub clock: Arc<dyn Clock>,
}

impl OrderEnvironment {
    /// Creates a new order environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

/// Reducer for the order store
#[derive(Clone, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Creates a new order reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn record_failure(state: &mut OrderBook, error: &OrderError) {
        tracing::warn!(%error, "Order command rejected");
        state.last_error = Some(error.to_string());
    }
}

impl Reducer for OrderReducer {
    type State = OrderBook;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            OrderAction::IngestOrder { request_id, order } => {
                let now = env.clock.now();
                let result = state.ingest(order, now).cloned();

                match &result {
                    Ok(order) => {
                        tracing::info!(
                            order_id = %order.id,
                            status = %order.status,
                            total = %order.total_amount,
                            "Order ingested"
                        );
                        state.last_error = None;
                    },
                    Err(error) => Self::record_failure(state, error),
                }

                smallvec![Effect::feedback(OrderAction::IngestResolved {
                    request_id,
                    result,
                    timestamp: now,
                })]
            },

            OrderAction::AdvanceOrder {
                request_id,
                order_id,
                expected_version,
            } => {
                let result = state.advance(&order_id, expected_version);

                match &result {
                    Ok(AdvanceOutcome::Advanced { from, to, version }) => tracing::info!(
                        order_id = %order_id,
                        %from,
                        %to,
                        %version,
                        "Order advanced"
                    ),
                    Ok(AdvanceOutcome::Unchanged { status }) => tracing::debug!(
                        order_id = %order_id,
                        %status,
                        "Order is terminal, advance ignored"
                    ),
                    Err(error) => Self::record_failure(state, error),
                }
                if result.is_ok() {
                    state.last_error = None;
                }

                smallvec![Effect::feedback(OrderAction::AdvanceResolved {
                    request_id,
                    order_id,
                    result,
                    timestamp: env.clock.now(),
                })]
            },

            // ========== Events ==========
            // State was already updated when the command ran
            OrderAction::IngestResolved { request_id, .. }
            | OrderAction::AdvanceResolved { request_id, .. } => {
                tracing::trace!(%request_id, "Resolution observed");
                smallvec![Effect::None]
            },
        }
    }
}
