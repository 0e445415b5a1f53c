//! Tests for #[derive(State)] macro

use merchant_console_core::version::Version;
use merchant_console_macros::State;

#[derive(State, Clone, Debug)]
struct ShelfState {
    pub product_ids: Vec<String>,
    #[version]
    pub revision: Option<Version>,
}

#[derive(State, Clone, Debug)]
struct BadgeState {
    pub pending: u32,
}

#[test]
fn test_version_accessor() {
    let state = ShelfState {
        product_ids: vec!["p-1".to_string()],
        revision: Some(Version::new(5)),
    };

    assert_eq!(state.version(), Some(Version::new(5)));
}

#[test]
fn test_set_version() {
    let mut state = ShelfState {
        product_ids: Vec::new(),
        revision: None,
    };

    assert_eq!(state.version(), None);

    state.set_version(Version::new(10));
    assert_eq!(state.version(), Some(Version::new(10)));
    assert_eq!(state.revision, Some(Version::new(10)));
}

#[test]
fn test_state_without_version_compiles() {
    let state = BadgeState { pending: 2 };
    assert_eq!(state.pending, 2);
}
