//! Inbound command dispatch.
//!
//! Maps each decoded peer envelope onto a router operation.

pub mod dispatcher;

pub use dispatcher::CommandDispatcher;
