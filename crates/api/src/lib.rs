//! HTTP API: server wiring, authentication middleware and JSON handlers.

pub mod app;
pub mod context;
pub mod middleware;
