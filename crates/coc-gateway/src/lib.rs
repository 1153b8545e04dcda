//! Development gateway for the custody ledger.
//!
//! Exposes the gateway HTTP contract (batch submission, state reads,
//! committed transactions, batch statuses) over axum, verifies envelopes on
//! intake and runs the custody handler against an in-memory store after a
//! configurable commit delay.

pub mod config;
pub mod error;
pub mod handler;
pub mod processor;
pub mod router;
pub mod server;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use processor::BatchProcessor;
pub use server::GatewayServer;
