//! Foundation types for the chain-of-custody ledger.
//!
//! This crate holds the data model shared by every other `coc-*` crate:
//! custody records as they appear on the wire and in state, the per-address
//! ledger state, and the validated ledger address.
//!
//! # Key Types
//!
//! - [`CustodyEvent`]: Typed custody event built by callers
//! - [`CustodyRecord`]: Nullable wire/state form of one custody event
//! - [`LedgerState`]: Append-only list of records stored at one address
//! - [`LedgerAddress`]: 70-character hex state key

pub mod address;
pub mod error;
pub mod record;
pub mod state;

pub use address::{LedgerAddress, ADDRESS_LEN};
pub use error::TypeError;
pub use record::{parse_registration_time, CustodyEvent, CustodyRecord, CustodyStatus, DeviceType};
pub use state::LedgerState;

/// Transaction family served by the custody handler.
pub const FAMILY_NAME: &str = "coc";
/// Version of the custody transaction family.
pub const FAMILY_VERSION: &str = "1.0";
