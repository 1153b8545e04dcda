use coc_types::LedgerAddress;

use crate::error::LedgerResult;
use crate::handler::StateDelta;

/// Read boundary for ledger state. Values are the raw encoded bytes stored
/// at an address.
pub trait StateReader: Send + Sync {
    fn get(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>>;

    fn addresses(&self) -> LedgerResult<Vec<LedgerAddress>>;
}

/// Write boundary for ledger state.
pub trait StateWriter: Send + Sync {
    /// Replace the value at the delta's address.
    fn apply_delta(&self, delta: &StateDelta) -> LedgerResult<()>;
}
