//! Error types for the console.
//!
//! Every failure is a recoverable value. Advancing an order that is already
//! in a terminal status is not an error and has no variant here.

use crate::types::{Money, OrderId, ProductId};
use merchant_console_core::version::Version;
use merchant_console_runtime::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the order store and its ingestion boundary
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderError {
    /// No order with this id exists
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// An order with this id was already ingested
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    /// A field failed validation
    #[error("invalid order: {0}")]
    Validation(String),

    /// Declared total does not equal the sum of the item lines
    #[error("order {order_id} total {declared} does not match item sum {computed}")]
    TotalMismatch {
        /// Order being ingested
        order_id: OrderId,
        /// Total the order claims
        declared: Money,
        /// Σ quantity × price over the items
        computed: Money,
    },

    /// Status text is not one of the five known statuses
    #[error("unknown order status {0:?}")]
    UnknownStatus(String),

    /// The order changed since the caller last read it
    #[error("order {order_id} is at version {actual}, expected {expected}")]
    VersionConflict {
        /// Order being advanced
        order_id: OrderId,
        /// Version the caller observed
        expected: Version,
        /// Version currently stored
        actual: Version,
    },
}

/// Errors raised by the product catalog
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogError {
    /// No product with this id exists
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A product with this id already exists
    #[error("product {0} already exists")]
    AlreadyExists(ProductId),

    /// A field failed validation
    #[error("invalid product: {0}")]
    Validation(String),

    /// Category is not in the fixed category list
    #[error("unknown product category {0:?}")]
    UnknownCategory(String),
}

/// Errors raised by the session gate
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Credential check rejected the email/password pair
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session record could not be read or written
    #[error("session store failure: {0}")]
    SessionStore(String),
}

/// Errors surfaced by [`crate::console::OrderConsole`]
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The console was started without a logged-in operator
    #[error("no authenticated session")]
    NotAuthenticated,

    /// Order store rejected the request
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Catalog rejected the request
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Session gate failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Runtime failure (shutdown, timeout, closed channel)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A store answered with an action that does not resolve the request
    #[error("unexpected response action {0}")]
    UnexpectedResponse(&'static str),
}

/// Errors raised while loading [`crate::config::ConsoleConfig`]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("{var}={value:?} is not valid: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// A value parsed but is out of range
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
