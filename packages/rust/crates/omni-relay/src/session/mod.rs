//! Session namespace: turn store, store errors, and per-session gate.

mod error;
mod gate;
mod store;
mod valkey_backend;

pub use error::StoreError;
pub use gate::{SessionGate, SessionGuard};
pub use store::TurnStore;
