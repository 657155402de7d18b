//! A pure function that folds block limits, transaction-header limits, and
//! already-resolved per-payer allowances into one deadline-and-cap envelope.
//! Kept free of any collaborator trait so it can be unit-tested with bare
//! values, the same separation `magicblock-bank::bank_helpers` draws between
//! pure arithmetic helpers and the `Bank` methods that call out to
//! collaborators.

use txctx_core::error::DeadlineExceptionKind;
use txctx_core::primitives::{Bytes, Microseconds, TimePoint};
use txctx_core::{CpuCapKind, ProtocolConfiguration, TransactionHeader, TxException, TxResult};

#[derive(Debug, Clone, Copy)]
pub struct LimitEnvelope {
    pub net_limit: Bytes,
    pub eager_net_limit: Bytes,
    pub objective_duration_limit: Microseconds,
    pub initial_objective_duration_limit: Microseconds,
    pub deadline: TimePoint,
    pub billing_timer_duration_limit: Microseconds,
    pub deadline_exception_code: DeadlineExceptionKind,
    pub billing_timer_exception_code: DeadlineExceptionKind,
    pub net_limit_due_to_block: bool,
    pub net_limit_due_to_greylist: bool,
    pub cpu_limit_due_to_greylist: bool,
}

/// Per-payer affordances already folded to a minimum across every billed
/// account; `None` means no payer constrains this resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayerAffordance {
    pub net: Option<Bytes>,
    pub cpu: Option<Microseconds>,
    pub net_greylisted: bool,
    pub cpu_greylisted: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn build_envelope(
    start: TimePoint,
    block_net_limit: Bytes,
    block_cpu_limit: Microseconds,
    config: &ProtocolConfiguration,
    header: &TransactionHeader,
    caller_deadline: TimePoint,
    explicit_billed_cpu_time: Option<Microseconds>,
    payer: PayerAffordance,
) -> TxResult<LimitEnvelope> {
    // Step 1: start from the block's own caps.
    let mut net_limit = block_net_limit;
    let mut objective_duration_limit = block_cpu_limit;
    let mut deadline = start + objective_duration_limit;
    let mut net_limit_due_to_block = true;
    let mut billing_timer_exception_code = DeadlineExceptionKind::BlockCpuUsageExceeded;

    // Step 2: clamp by global protocol configuration.
    if config.max_transaction_net_usage <= net_limit {
        net_limit = config.max_transaction_net_usage;
        net_limit_due_to_block = false;
    }
    if config.max_transaction_cpu_usage <= objective_duration_limit {
        objective_duration_limit = config.max_transaction_cpu_usage;
        billing_timer_exception_code = DeadlineExceptionKind::TxCpuUsageExceeded;
        deadline = start + objective_duration_limit;
    }

    // Step 3: clamp by the transaction header's own explicit caps.
    if header.max_net_usage_words > 0 {
        let trx_specified = Bytes(header.max_net_usage_words as u64 * 8);
        if trx_specified <= net_limit {
            net_limit = trx_specified;
            net_limit_due_to_block = false;
        }
    }
    if header.max_cpu_usage_ms > 0 {
        let trx_specified_cpu = Microseconds::from_milliseconds(header.max_cpu_usage_ms as i64);
        if trx_specified_cpu <= objective_duration_limit {
            objective_duration_limit = trx_specified_cpu;
            billing_timer_exception_code = DeadlineExceptionKind::TxCpuUsageExceeded;
            deadline = start + objective_duration_limit;
        }
    }

    // Step 4: capture the pre-payer limit and fail fast if the caller's
    // explicit billed figure is already unaffordable.
    let initial_objective_duration_limit = objective_duration_limit;
    if let Some(billed) = explicit_billed_cpu_time {
        if billed > Microseconds::ZERO {
            validate_cpu_usage_to_bill(
                billed,
                false,
                objective_duration_limit,
                billing_timer_exception_code,
                payer.cpu_greylisted,
                config.min_transaction_cpu_usage,
            )?;
        }
    }

    // Steps 5-6 (bill-to-accounts + per-payer affordance queries) happen in
    // the caller before this function is invoked; `payer` already holds the
    // fold.
    let net_limit_due_to_greylist = payer.net_greylisted;
    let cpu_limit_due_to_greylist = payer.cpu_greylisted;

    // Step 7: the billed accounts' own stake may tighten net_limit further.
    let mut eager_net_limit = net_limit;
    if let Some(account_net) = payer.net {
        let candidate = account_net.saturating_add(config.net_usage_leeway);
        let new_eager = eager_net_limit.min(candidate);
        if new_eager < eager_net_limit {
            eager_net_limit = new_eager;
            net_limit_due_to_block = false;
        }
    }

    // Step 8: shrink the deadline if the payers can't afford the full
    // objective duration even with a small subjective leeway.
    if let Some(account_cpu) = payer.cpu {
        let candidate = account_cpu + config.subjective_cpu_leeway;
        if candidate <= (deadline - start) {
            deadline = start + candidate;
            billing_timer_exception_code = DeadlineExceptionKind::LeewayDeadlineException;
        }
    }

    let billing_timer_duration_limit = deadline - start;

    // Step 10: the caller's hard wall-clock deadline always wins when it is
    // tighter, or when an explicit billed figure sidesteps timing entirely.
    let deadline_exception_code = if explicit_billed_cpu_time.is_some() || caller_deadline < deadline
    {
        deadline = caller_deadline;
        DeadlineExceptionKind::DeadlineException
    } else {
        billing_timer_exception_code
    };

    // Step 11: round down to a whole number of net-usage words.
    let eager_net_limit = eager_net_limit.round_down_to_word();

    Ok(LimitEnvelope {
        net_limit,
        eager_net_limit,
        objective_duration_limit,
        initial_objective_duration_limit,
        deadline,
        billing_timer_duration_limit,
        deadline_exception_code,
        billing_timer_exception_code,
        net_limit_due_to_block,
        net_limit_due_to_greylist,
        cpu_limit_due_to_greylist,
    })
}

/// Shared by `init` (pre-flight, `check_minimum = false`) and `finalize`
/// (post-execution, `check_minimum = true`).
pub fn validate_cpu_usage_to_bill(
    billed: Microseconds,
    check_minimum: bool,
    objective_duration_limit: Microseconds,
    billing_timer_exception_code: DeadlineExceptionKind,
    cpu_limit_due_to_greylist: bool,
    min_transaction_cpu_usage: Microseconds,
) -> TxResult<()> {
    if check_minimum && billed < min_transaction_cpu_usage {
        return Err(TxException::CpuUsageUnderMinimum {
            billed,
            minimum: min_transaction_cpu_usage,
        });
    }
    if billed > objective_duration_limit {
        let kind = match billing_timer_exception_code {
            DeadlineExceptionKind::BlockCpuUsageExceeded => CpuCapKind::Block,
            _ if cpu_limit_due_to_greylist => CpuCapKind::Greylist,
            _ => CpuCapKind::Transaction,
        };
        return Err(TxException::CpuUsageOverBillable {
            billed,
            billable: objective_duration_limit,
            kind,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ProtocolConfiguration {
        ProtocolConfiguration {
            max_transaction_net_usage: Bytes(1_000_000),
            max_transaction_cpu_usage: Microseconds::from_milliseconds(150),
            min_transaction_cpu_usage: Microseconds(100),
            base_per_transaction_net_usage: Bytes(12),
            transaction_id_net_usage: Bytes(32),
            net_usage_leeway: Bytes(0),
            context_free_discount_net_usage_num: 0,
            context_free_discount_net_usage_den: 0,
            deferred_trx_expiration_window: Microseconds::from_seconds(120),
            subjective_cpu_leeway: Microseconds(3_000),
            max_inline_action_depth: 4,
        }
    }

    fn base_header() -> TransactionHeader {
        TransactionHeader {
            expiration: TimePoint(0),
            ref_block_num: 0,
            ref_block_prefix: 0,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        }
    }

    #[test]
    fn net_round_down_to_word() {
        let cfg = base_config();
        let header = base_header();
        let envelope = build_envelope(
            TimePoint(0),
            Bytes(100),
            Microseconds::from_milliseconds(200),
            &cfg,
            &header,
            TimePoint(u64::MAX),
            None,
            PayerAffordance {
                net: Some(Bytes(97)),
                cpu: None,
                net_greylisted: false,
                cpu_greylisted: false,
            },
        )
        .unwrap();
        assert_eq!(envelope.eager_net_limit, Bytes(96));
    }

    #[test]
    fn cpu_header_clamp_switches_exception_code() {
        let mut cfg = base_config();
        cfg.max_transaction_cpu_usage = Microseconds::from_milliseconds(150);
        let mut header = base_header();
        header.max_cpu_usage_ms = 50;
        let envelope = build_envelope(
            TimePoint(0),
            Bytes(1_000_000),
            Microseconds::from_milliseconds(200),
            &cfg,
            &header,
            TimePoint(u64::MAX),
            None,
            PayerAffordance::default(),
        )
        .unwrap();
        assert_eq!(
            envelope.objective_duration_limit,
            Microseconds::from_milliseconds(50)
        );
        assert_eq!(
            envelope.billing_timer_exception_code,
            DeadlineExceptionKind::TxCpuUsageExceeded
        );
    }

    #[test]
    fn explicit_billed_cpu_time_must_fit_cap() {
        let cfg = base_config();
        let header = base_header();
        let err = build_envelope(
            TimePoint(0),
            Bytes(1_000_000),
            Microseconds::from_milliseconds(200),
            &cfg,
            &header,
            TimePoint(u64::MAX),
            Some(Microseconds::from_milliseconds(999)),
            PayerAffordance::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TxException::CpuUsageOverBillable { .. }));
    }
}
