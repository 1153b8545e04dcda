use serde::{Deserialize, Serialize};

use crate::record::CustodyRecord;

/// The full value stored at one ledger address: an append-only list of
/// custody records, oldest first. The last entry is the current status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub entries: Vec<CustodyRecord>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent record, i.e. the current custody status.
    pub fn latest(&self) -> Option<&CustodyRecord> {
        self.entries.last()
    }

    /// Append a record. Existing entries are never touched.
    pub fn append(&mut self, record: CustodyRecord) {
        self.entries.push(record);
    }
}

impl From<Vec<CustodyRecord>> for LedgerState {
    fn from(entries: Vec<CustodyRecord>) -> Self {
        Self { entries }
    }
}
