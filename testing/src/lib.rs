//! # Merchant Console Testing
//!
//! Testing utilities and helpers for the merchant console.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then builder for reducers
//! - Helpers for resolving feedback effects without a runtime
//!
//! ## Example
//!
//! ```ignore
//! use merchant_console_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(OrderReducer::new())
//!     .with_env(OrderEnvironment::new(test_clock()))
//!     .given_state(seeded_book())
//!     .when_action(OrderAction::AdvanceOrder { .. })
//!     .then_state(|book| assert_eq!(book.orders[0].status, OrderStatus::Accepted))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use merchant_console_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use merchant_console_testing::mocks::FixedClock;
    /// use merchant_console_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every read
    ///
    /// Useful when a test needs distinct, ordered timestamps.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` after each read
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = match self.next.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let current = *next;
            *next = current + self.step;
            current
        }
    }

    /// The instant every test clock starts from: 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

/// Helpers for inspecting effects in synchronous tests
pub mod helpers {
    use merchant_console_core::effect::Effect;

    /// Run every effect to completion on a throwaway executor and collect
    /// the actions they would feed back, in order.
    #[must_use]
    pub fn resolve_feedback<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::None => None,
                Effect::Future(fut) => tokio_test::block_on(fut),
            })
            .collect()
    }
}

pub use helpers::resolve_feedback;
pub use mocks::{test_clock, FixedClock, SteppingClock};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;
    use merchant_console_core::effect::Effect;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = SteppingClock::new(mocks::test_epoch(), Duration::minutes(5));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::minutes(5));
    }

    #[test]
    fn test_resolve_feedback_keeps_order() {
        let effects = vec![
            Effect::feedback(1_u8),
            Effect::None,
            Effect::Future(Box::pin(async { None })),
            Effect::feedback(2),
        ];

        assert_eq!(resolve_feedback(effects), vec![1, 2]);
    }
}
