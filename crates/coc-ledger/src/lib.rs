//! Ledger core for the chain-of-custody ledger.
//!
//! This crate is the heart of the system. It provides:
//! - `AddressCodec`, the deterministic case → address mapping
//! - `RecordCodec`, the state and payload encodings
//! - `CustodyLedgerHandler`, the validator-side append logic
//! - `StateReader` / `StateWriter` trait boundaries
//! - `InMemoryStateStore` for tests and the development gateway

pub mod address;
pub mod codec;
pub mod error;
pub mod handler;
pub mod memory;
pub mod traits;

pub use address::AddressCodec;
pub use codec::RecordCodec;
pub use error::{LedgerError, LedgerResult};
pub use handler::{AddressCheck, ApplyRequest, CustodyLedgerHandler, HandlerConfig, StateDelta};
pub use memory::InMemoryStateStore;
pub use traits::{StateReader, StateWriter};
