//! Protocol-wide tunables, the Rust analogue of EOSIO's `chain_config`
//! struct exposed through `Controller::global_properties().configuration`.
//! Handed to `TransactionContext::init_for_*` via the `ChainController`
//! collaborator rather than read from a global, so the same context can run
//! against independently-configured chains in the same process.

use serde::{Deserialize, Serialize};

use crate::primitives::{Bytes, Microseconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfiguration {
    /// Hard cap on net usage any single transaction may be billed,
    /// regardless of the block's remaining capacity.
    pub max_transaction_net_usage: Bytes,
    /// Hard cap on CPU time any single transaction may be billed.
    pub max_transaction_cpu_usage: Microseconds,
    /// Minimum CPU time billed to any successfully-finalized transaction.
    pub min_transaction_cpu_usage: Microseconds,
    /// Net usage charged to every transaction regardless of payload, to
    /// cover fixed per-transaction overhead (receipt, signatures metadata).
    pub base_per_transaction_net_usage: Bytes,
    /// Extra net usage charged when a transaction carries a `delay_sec`,
    /// covering the cost of persisting its id for deduplication replay.
    pub transaction_id_net_usage: Bytes,
    /// Small net-usage margin granted on top of what billed accounts can
    /// strictly afford, so transactions at the very edge of their stake
    /// are not rejected due to rounding.
    pub net_usage_leeway: Bytes,
    /// Discount numerator/denominator applied to a transaction's prunable
    /// (context-free) payload size; discount applies only when
    /// `0 < num < den`.
    pub context_free_discount_net_usage_num: u64,
    pub context_free_discount_net_usage_den: u64,
    /// Window after `delay_until` before a deferred transaction expires if
    /// never executed.
    pub deferred_trx_expiration_window: Microseconds,
    /// Upper bound on inline-action recursion depth the dispatcher will
    /// follow before raising a defect, keeping recursive sends from
    /// contract code deterministic across implementations.
    pub max_inline_action_depth: u32,
    /// Subjective CPU margin added when shrinking the deadline to what the
    /// payers can afford; promoted to a configuration value so it can be
    /// tuned without recompiling.
    pub subjective_cpu_leeway: Microseconds,
}

impl ProtocolConfiguration {
    /// Whether the context-free discount fraction is active: applies only
    /// when `0 < num < den`.
    pub fn context_free_discount_active(&self) -> bool {
        self.context_free_discount_net_usage_num > 0
            && self.context_free_discount_net_usage_num < self.context_free_discount_net_usage_den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_inactive_when_num_zero_or_ge_den() {
        let mut cfg = ProtocolConfiguration {
            max_transaction_net_usage: Bytes(1_000_000),
            max_transaction_cpu_usage: Microseconds::from_milliseconds(150),
            min_transaction_cpu_usage: Microseconds(100),
            base_per_transaction_net_usage: Bytes(12),
            transaction_id_net_usage: Bytes(32),
            net_usage_leeway: Bytes(4096),
            context_free_discount_net_usage_num: 0,
            context_free_discount_net_usage_den: 2,
            deferred_trx_expiration_window: Microseconds::from_seconds(120),
            max_inline_action_depth: 4,
            subjective_cpu_leeway: Microseconds(3_000),
        };
        assert!(!cfg.context_free_discount_active());
        cfg.context_free_discount_net_usage_num = 2;
        assert!(!cfg.context_free_discount_active());
        cfg.context_free_discount_net_usage_num = 1;
        assert!(cfg.context_free_discount_active());
    }
}
