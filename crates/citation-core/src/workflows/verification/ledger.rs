use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{ReconciliationRecord, UnmatchedEvent};
use crate::persist::{read_json, write_json_atomic, PersistError};
use crate::workflows::submission::AttemptId;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Everything the correlator has decided so far. Replaying an inbox against
/// the same ledger never produces a second record for a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLedger {
    #[serde(default)]
    pub processed_ids: BTreeSet<String>,
    #[serde(default)]
    pub reconciliations: Vec<ReconciliationRecord>,
    #[serde(default)]
    pub unmatched: Vec<UnmatchedEvent>,
}

impl VerificationLedger {
    /// Loads the ledger, starting empty when none has been written.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        Ok(read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        write_json_atomic(path, self)?;
        Ok(())
    }

    pub fn is_processed(&self, message_id: &str) -> bool {
        self.processed_ids.contains(message_id)
    }

    pub fn is_reconciled(&self, attempt_id: &AttemptId) -> bool {
        self.reconciliations
            .iter()
            .any(|record| &record.attempt_id == attempt_id)
    }

    pub fn reconciled_for<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = &'a ReconciliationRecord> + 'a {
        self.reconciliations
            .iter()
            .filter(move |record| record.target.eq_ignore_ascii_case(target))
    }
}
