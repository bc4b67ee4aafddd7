//! Lightweight in-process metrics (dependency-free).
//!
//! Stored as atomics in `DashMap`s and rendered by the `/metrics` handler in
//! Prometheus text format.

pub mod metrics;

pub use metrics::RelayMetrics;
