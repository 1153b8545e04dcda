//! Client SDK for the chain-of-custody ledger.
//!
//! Wraps the gateway's HTTP surface behind [`LedgerGateway`], waits for
//! eventual consistency with [`ConfirmationPoller`], and exposes the custody
//! flows (register, update, search, history) through [`CustodyClient`].

pub mod client;
pub mod config;
pub mod custody;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod query;
pub mod session;

pub use client::HttpLedgerClient;
pub use config::{ClientConfig, PollerConfig};
pub use custody::{Confirmed, CustodyClient, Submission};
pub use error::{SdkError, SdkResult};
pub use gateway::{LedgerGateway, SubmissionReceipt};
pub use poller::ConfirmationPoller;
pub use query::{CaseHistory, SignedRecord, TransactionQuery, TransactionSummary};
pub use session::Session;

pub use coc_types::{CustodyEvent, CustodyRecord, CustodyStatus, DeviceType, LedgerAddress, LedgerState};
pub use tokio_util::sync::CancellationToken;
