//! Operator session gate.
//!
//! The console only needs two things from authentication: a yes/no answer
//! for an email/password pair, and somewhere to keep the logged-in record
//! between restarts. Both sit behind traits.

use crate::error::AuthError;
use chrono::{DateTime, Utc};
use merchant_console_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Opaque credential check
pub trait CredentialCheck: Send + Sync {
    /// True if the pair is accepted
    fn verify(&self, email: &str, password: &str) -> bool;
}

/// Accepts any non-empty email whose password is long enough
#[derive(Debug, Clone, Copy)]
pub struct LengthCredentialCheck {
    /// Minimum password length in characters
    pub min_password_length: usize,
}

impl LengthCredentialCheck {
    /// Creates a check with the given minimum length
    #[must_use]
    pub const fn new(min_password_length: usize) -> Self {
        Self { min_password_length }
    }
}

impl Default for LengthCredentialCheck {
    fn default() -> Self {
        Self::new(6)
    }
}

impl CredentialCheck for LengthCredentialCheck {
    fn verify(&self, email: &str, password: &str) -> bool {
        !email.trim().is_empty() && password.chars().count() >= self.min_password_length
    }
}

/// Persisted login
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Operator email
    pub admin_email: String,
    /// When the operator logged in
    pub started_at: DateTime<Utc>,
}

/// Session persistence
pub trait SessionStore: Send + Sync {
    /// Reads the stored session, if any
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionStore`] if the backing store fails.
    fn load(&self) -> Result<Option<SessionRecord>, AuthError>;

    /// Replaces the stored session
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionStore`] if the backing store fails.
    fn save(&self, record: &SessionRecord) -> Result<(), AuthError>;

    /// Removes the stored session
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionStore`] if the backing store fails.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Session store held in process memory
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    slot: Arc<Mutex<Option<SessionRecord>>>,
}

impl InMemorySessionStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<T>(
        &self,
        f: impl FnOnce(&mut Option<SessionRecord>) -> T,
    ) -> Result<T, AuthError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AuthError::SessionStore("session lock poisoned".to_string()))?;
        Ok(f(&mut slot))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, AuthError> {
        self.with_slot(|slot| slot.clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<(), AuthError> {
        self.with_slot(|slot| *slot = Some(record.clone()))
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.with_slot(|slot| *slot = None)
    }
}

/// The operator's login state
#[derive(Clone)]
pub struct AdminSession {
    credentials: Arc<dyn CredentialCheck>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    current: Option<SessionRecord>,
}

impl AdminSession {
    /// Picks up a previously persisted login, if there is one
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError::SessionStore`] from the store.
    pub fn restore(
        credentials: Arc<dyn CredentialCheck>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let current = store.load()?;
        if let Some(record) = &current {
            tracing::info!(admin = %record.admin_email, "Session restored");
        }
        Ok(Self {
            credentials,
            store,
            clock,
            current,
        })
    }

    /// Checks the credentials and persists the new session
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] when the check fails (the previous
    /// session, if any, is kept), or a store failure.
    pub fn login(&mut self, email: &str, password: &str) -> Result<&SessionRecord, AuthError> {
        if !self.credentials.verify(email, password) {
            tracing::warn!(email, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let record = SessionRecord {
            admin_email: email.trim().to_string(),
            started_at: self.clock.now(),
        };
        self.store.save(&record)?;
        tracing::info!(admin = %record.admin_email, "Logged in");

        Ok(self.current.insert(record))
    }

    /// Forgets the session here and in the store
    ///
    /// # Errors
    ///
    /// Store failure; the in-memory session is cleared regardless.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let Some(record) = self.current.take() {
            tracing::info!(admin = %record.admin_email, "Logged out");
        }
        self.store.clear()
    }

    /// True while someone is logged in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Email of the logged-in operator
    #[must_use]
    pub fn admin_email(&self) -> Option<&str> {
        self.current.as_ref().map(|record| record.admin_email.as_str())
    }

    /// The current session record
    #[must_use]
    pub const fn record(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
