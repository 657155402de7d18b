//! The two record shapes the execution core itself writes to the
//! deterministic database. Every other write a transaction produces flows
//! through the virtual machine's `ApplyContext`, not through this crate.

use crate::primitives::{AccountName, TimePoint};
use crate::tx::TransactionId;

/// A delayed transaction persisted instead of executed immediately.
/// Primary key: `sender_id`; secondary index on `delay_until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTransactionRecord {
    pub trx_id: TransactionId,
    pub payer: AccountName,
    /// Zero for transactions originated by the chain itself rather than by
    /// another contract's deferred send.
    pub sender: AccountName,
    pub sender_id: u128,
    pub published: TimePoint,
    pub delay_until: TimePoint,
    pub expiration: TimePoint,
    pub serialized_trx: Vec<u8>,
}

/// Dedup record preventing replay of an already-seen input transaction id.
/// Primary key: `trx_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionDedupRecord {
    pub trx_id: TransactionId,
    pub expiration: TimePoint,
}
