use coc_types::{LedgerAddress, LedgerState, FAMILY_NAME, FAMILY_VERSION};
use serde::{Deserialize, Serialize};

use crate::address::AddressCodec;
use crate::codec::RecordCodec;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::StateReader;

/// How a transaction's declared inputs/outputs must cover the address its
/// payload is written to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressCheck {
    /// The derived address must appear verbatim in both inputs and outputs.
    #[default]
    Strict,
    /// Any declared input/output that is a prefix of the derived address is
    /// enough, which admits namespace-wide declarations.
    Legacy,
}

/// Handler configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub address_check: AddressCheck,
}

/// Everything the handler needs from a verified transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyRequest {
    pub signer_public_key: String,
    pub family_name: String,
    pub family_version: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub payload: Vec<u8>,
}

/// A single state write produced by a successful apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateDelta {
    pub address: LedgerAddress,
    pub value: Vec<u8>,
}

impl StateDelta {
    /// Decode the written value.
    pub fn state(&self) -> LedgerResult<LedgerState> {
        RecordCodec::decode(&self.value)
    }
}

/// Validator-side logic for the custody transaction family.
///
/// Per address the state moves `Absent -> [r1] -> [r1, r2] -> ...`; entries
/// are only ever appended. `apply` is deterministic: no clock, no randomness,
/// and on any error nothing is written.
#[derive(Clone, Debug, Default)]
pub struct CustodyLedgerHandler {
    config: HandlerConfig,
}

impl CustodyLedgerHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    pub fn family_name(&self) -> &'static str {
        FAMILY_NAME
    }

    pub fn family_versions(&self) -> &'static [&'static str] {
        &[FAMILY_VERSION]
    }

    /// State namespaces this handler writes under.
    pub fn namespaces(&self) -> Vec<String> {
        vec![AddressCodec::namespace_prefix()]
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Validate a transaction against current state and compute the write.
    pub fn apply<R: StateReader + ?Sized>(
        &self,
        request: &ApplyRequest,
        state: &R,
    ) -> LedgerResult<StateDelta> {
        if request.family_name != FAMILY_NAME
            || !self.family_versions().contains(&request.family_version.as_str())
        {
            return Err(invalid(format!(
                "unsupported family {}/{}",
                request.family_name, request.family_version
            )));
        }
        if request.signer_public_key.trim().is_empty() {
            return Err(invalid("missing signer public key"));
        }

        let record = RecordCodec::decode_payload(&request.payload)
            .map_err(|e| invalid(format!("malformed payload: {e}")))?;

        let address = AddressCodec::for_record(&record).map_err(|e| invalid(e.to_string()))?;
        self.check_declared(&address, request)?;

        let mut current = match state.get(&address)? {
            Some(bytes) if !bytes.is_empty() => RecordCodec::decode(&bytes).map_err(|e| {
                tracing::warn!(address = %address.short(), error = %e, "stored state is corrupt");
                invalid(format!("existing state at {} is unreadable", address.short()))
            })?,
            _ => LedgerState::new(),
        };

        record
            .validate(!current.is_empty())
            .map_err(|e| invalid(e.to_string()))?;

        current.append(record.with_owner(request.signer_public_key.clone()));
        let value = RecordCodec::encode(&current)?;

        tracing::debug!(
            address = %address.short(),
            entries = current.len(),
            "custody record appended"
        );
        Ok(StateDelta { address, value })
    }

    fn check_declared(&self, address: &LedgerAddress, request: &ApplyRequest) -> LedgerResult<()> {
        let covers = |declared: &[String]| match self.config.address_check {
            AddressCheck::Strict => declared.iter().any(|a| a == address.as_str()),
            AddressCheck::Legacy => declared
                .iter()
                .any(|a| !a.is_empty() && address.as_str().starts_with(a.as_str())),
        };
        if !covers(&request.inputs) {
            return Err(invalid(format!("address {} not declared in inputs", address.short())));
        }
        if !covers(&request.outputs) {
            return Err(invalid(format!("address {} not declared in outputs", address.short())));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidTransaction(reason.into())
}
