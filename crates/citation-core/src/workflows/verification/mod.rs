//! Verification mail: find it, pull out the link or code, and tie it back to
//! the pending attempt it confirms.

pub mod correlator;
pub mod domain;
pub mod extract;
pub mod identity;
pub mod inbox;
pub mod ledger;

pub use correlator::{CorrelationReport, VerificationCorrelator};
pub use domain::{
    ReconciliationRecord, TargetIdentity, UnmatchedEvent, UnmatchedReason, VerificationEvent,
    VerificationPayload,
};
pub use extract::payload_from_body;
pub use identity::IdentityTable;
pub use inbox::{InboxClient, InboxError, InboxMessage, InboxQuery, JsonInboxExport};
pub use ledger::{LedgerError, VerificationLedger};
