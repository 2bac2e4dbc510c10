//! End-to-end tests for the app against the in-memory backends.
//!
//! - `harness.rs`   - builds an app over memory stores and waits on its state
//! - `scenarios.rs` - sign-up, adding items, sign-out with writes in flight
//! - `restart.rs`   - session persistence across app restarts on disk

mod scenarios;
