//! The two boundary checks every limit update runs through: spec.md §4.3.
//! Both take their operands as plain values so they stay unit-testable
//! without a `ChainController` in scope; `TransactionContext` wraps them with
//! the `skip_trx_checks` no-op path.

use txctx_core::error::{DeadlineExceptionKind, NetLimitExceededKind};
use txctx_core::primitives::{Bytes, TimePoint};
use txctx_core::{TxException, TxResult};

/// Fails with the kind identified by whichever cap is currently binding:
/// block, greylist, or the transaction's own header/config cap.
pub fn check_net_usage(
    net_usage: Bytes,
    eager_net_limit: Bytes,
    net_limit_due_to_block: bool,
    net_limit_due_to_greylist: bool,
) -> TxResult<()> {
    if net_usage <= eager_net_limit {
        return Ok(());
    }
    let kind = if net_limit_due_to_block {
        NetLimitExceededKind::Block
    } else if net_limit_due_to_greylist {
        NetLimitExceededKind::Greylist
    } else {
        NetLimitExceededKind::Transaction
    };
    Err(match kind {
        NetLimitExceededKind::Block => TxException::BlockNetUsageExceeded {
            net_usage,
            limit: eager_net_limit,
        },
        NetLimitExceededKind::Greylist => TxException::GreylistNetUsageExceeded {
            net_usage,
            limit: eager_net_limit,
        },
        NetLimitExceededKind::Transaction => TxException::TransactionNetUsageExceeded {
            net_usage,
            limit: eager_net_limit,
        },
    })
}

/// Fails with the kind carried by `deadline_exception_code` once `now`
/// passes `deadline`. The match is exhaustive over every
/// `DeadlineExceptionKind` variant, so an unrecognized code is a compile
/// error rather than the "unexpected deadline code" runtime defect the
/// original source falls back to.
///
/// `cpu_limit_due_to_greylist` downgrades `TxCpuUsageExceeded` to
/// `GreylistCpuUsageExceeded` at the moment of firing, matching
/// `chain/transaction_context.go`'s `CheckTime`, which only distinguishes
/// the two at the throw site rather than encoding greylisting into
/// `deadline_exception_code` itself.
pub fn check_time(
    now: TimePoint,
    deadline: TimePoint,
    start: TimePoint,
    deadline_exception_code: DeadlineExceptionKind,
    cpu_limit_due_to_greylist: bool,
) -> TxResult<()> {
    if now <= deadline {
        return Ok(());
    }
    Err(match deadline_exception_code {
        DeadlineExceptionKind::BlockCpuUsageExceeded => TxException::BlockCpuUsageExceeded {
            now,
            deadline,
            start,
        },
        DeadlineExceptionKind::TxCpuUsageExceeded if cpu_limit_due_to_greylist => {
            TxException::GreylistCpuUsageExceeded {
                now,
                deadline,
                start,
            }
        }
        DeadlineExceptionKind::TxCpuUsageExceeded => TxException::TransactionCpuUsageExceeded {
            now,
            deadline,
            start,
        },
        DeadlineExceptionKind::GreylistCpuUsageExceeded => {
            TxException::GreylistCpuUsageExceeded {
                now,
                deadline,
                start,
            }
        }
        DeadlineExceptionKind::LeewayDeadlineException => TxException::LeewayDeadlineException {
            now,
            deadline,
            start,
        },
        DeadlineExceptionKind::DeadlineException => TxException::DeadlineException {
            now,
            deadline,
            start,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_usage_within_limit_is_ok() {
        assert!(check_net_usage(Bytes(96), Bytes(96), true, false).is_ok());
    }

    #[test]
    fn net_usage_over_block_limit_fails_with_block_kind() {
        let err = check_net_usage(Bytes(97), Bytes(96), true, false).unwrap_err();
        assert!(matches!(err, TxException::BlockNetUsageExceeded { .. }));
    }

    #[test]
    fn net_usage_over_greylisted_limit_fails_with_greylist_kind() {
        let err = check_net_usage(Bytes(97), Bytes(96), false, true).unwrap_err();
        assert!(matches!(err, TxException::GreylistNetUsageExceeded { .. }));
    }

    #[test]
    fn net_usage_over_transaction_limit_is_the_default_kind() {
        let err = check_net_usage(Bytes(97), Bytes(96), false, false).unwrap_err();
        assert!(matches!(err, TxException::TransactionNetUsageExceeded { .. }));
    }

    #[test]
    fn time_within_deadline_is_ok() {
        assert!(check_time(
            TimePoint(10),
            TimePoint(10),
            TimePoint(0),
            DeadlineExceptionKind::BlockCpuUsageExceeded,
            false,
        )
        .is_ok());
    }

    #[test]
    fn time_past_deadline_fails_with_the_carried_kind() {
        let err = check_time(
            TimePoint(11),
            TimePoint(10),
            TimePoint(0),
            DeadlineExceptionKind::LeewayDeadlineException,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, TxException::LeewayDeadlineException { .. }));
    }

    #[test]
    fn tx_cpu_exceeded_downgrades_to_greylist_kind_when_caller_is_greylisted() {
        let err = check_time(
            TimePoint(11),
            TimePoint(10),
            TimePoint(0),
            DeadlineExceptionKind::TxCpuUsageExceeded,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, TxException::GreylistCpuUsageExceeded { .. }));
    }

    #[test]
    fn tx_cpu_exceeded_stays_transaction_kind_when_not_greylisted() {
        let err = check_time(
            TimePoint(11),
            TimePoint(10),
            TimePoint(0),
            DeadlineExceptionKind::TxCpuUsageExceeded,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, TxException::TransactionCpuUsageExceeded { .. }));
    }
}
