use std::collections::BTreeMap;
use std::sync::RwLock;

use coc_types::LedgerAddress;

use crate::error::{LedgerError, LedgerResult};
use crate::handler::StateDelta;
use crate::traits::{StateReader, StateWriter};

/// In-memory state store for tests, the development gateway, and embedding.
#[derive(Default)]
pub struct InMemoryStateStore {
    inner: RwLock<BTreeMap<LedgerAddress, Vec<u8>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of populated addresses.
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(
        &self,
    ) -> LedgerResult<std::sync::RwLockReadGuard<'_, BTreeMap<LedgerAddress, Vec<u8>>>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::StoreError("state read lock poisoned".into()))
    }
}

impl StateReader for InMemoryStateStore {
    fn get(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.read()?.get(address).cloned())
    }

    fn addresses(&self) -> LedgerResult<Vec<LedgerAddress>> {
        Ok(self.read()?.keys().cloned().collect())
    }
}

impl StateWriter for InMemoryStateStore {
    fn apply_delta(&self, delta: &StateDelta) -> LedgerResult<()> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| LedgerError::StoreError("state write lock poisoned".into()))?;
        state.insert(delta.address.clone(), delta.value.clone());
        tracing::debug!(address = %delta.address.short(), bytes = delta.value.len(), "state delta applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressCodec;

    #[test]
    fn get_missing_is_none() {
        let store = InMemoryStateStore::new();
        let addr = AddressCodec::custody("c", "i");
        assert!(store.get(&addr).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn apply_delta_replaces_value() {
        let store = InMemoryStateStore::new();
        let addr = AddressCodec::custody("c", "i");
        store
            .apply_delta(&StateDelta { address: addr.clone(), value: b"one".to_vec() })
            .unwrap();
        store
            .apply_delta(&StateDelta { address: addr.clone(), value: b"two".to_vec() })
            .unwrap();
        assert_eq!(store.get(&addr).unwrap().unwrap(), b"two");
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.addresses().unwrap(), vec![addr]);
    }
}
