//! askrelay core: transport-agnostic wire contracts and the shared error type.
//!
//! This crate defines the tagged envelope exchanged with operator peers, the
//! content items a human reply may carry, and the call result handed back to
//! blocked agents. It carries no runtime or transport dependencies so the
//! gateway, tests, and client tooling can share it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed peer input surfaces as `RelayError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, RelayError, Result};
