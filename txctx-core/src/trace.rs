//! Accumulating audit record for a transaction's execution. Owned
//! exclusively by the `TransactionContext` until `finalize` returns; must
//! not escape before then.

use smallvec::SmallVec;

use crate::primitives::{AccountName, Bytes, Microseconds};

/// Receipt attached to a single action invocation: what was actually
/// billed, independent of the action's own side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReceipt {
    pub receiver: AccountName,
    pub act_digest: [u8; 32],
    pub global_sequence: u64,
    pub recv_sequence: u64,
    pub net_usage_words: u64,
}

/// One dispatched action's trace entry. `inline_traces` holds the traces of
/// any actions it sent recursively, in dispatch order, immediately following
/// the parent's own entry.
#[derive(Debug, Clone, Default)]
pub struct ActionTrace {
    pub receiver: AccountName,
    pub context_free: bool,
    pub receipt: Option<ActionReceipt>,
    pub console: String,
    pub elapsed: Microseconds,
    pub inline_traces: Vec<ActionTrace>,
    pub except: Option<String>,
}

/// The transaction-wide trace, accumulated across `exec` and completed by
/// `finalize`.
#[derive(Debug, Clone, Default)]
pub struct TransactionTrace {
    pub action_traces: Vec<ActionTrace>,
    pub net_usage: Bytes,
    pub elapsed: Microseconds,
    pub scheduled: bool,
    /// Populated only when the transaction ultimately failed; the name of
    /// the exception that was raised (mirrors `TxException::name()`).
    pub except: Option<String>,
    /// Inline execution notes useful to an embedding node's logs, capped by
    /// convention (not enforced here) at a small constant so a misbehaving
    /// contract cannot inflate the trace without bound.
    pub notes: SmallVec<[String; 4]>,
}

impl TransactionTrace {
    pub fn push_action(&mut self, trace: ActionTrace) -> &mut ActionTrace {
        self.action_traces.push(trace);
        self.action_traces
            .last_mut()
            .expect("just pushed an entry")
    }

    pub fn mark_failed(&mut self, exception_name: &'static str) {
        self.except = Some(exception_name.to_string());
    }
}
