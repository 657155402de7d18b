//! Consensus-relevant failure taxonomy for the transaction execution core.
//!
//! Codes are stable and must never be renumbered once shipped, since they
//! are wire-visible and consensus-relevant: every validator must agree
//! whether and why a transaction failed.

use crate::primitives::{Bytes, Microseconds, TimePoint};

pub type TxResult<T> = Result<T, TxException>;

/// Which cap was binding when the deadline fired. Stored on
/// `TransactionContext` instead of a raw integer so `check_time` is an
/// exhaustive match rather than a chain of `if`/`else if` that can silently
/// fall through an unrecognized code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineExceptionKind {
    BlockCpuUsageExceeded,
    TxCpuUsageExceeded,
    GreylistCpuUsageExceeded,
    LeewayDeadlineException,
    DeadlineException,
}

/// Which cap was binding when `net_usage` outgrew `eager_net_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetLimitExceededKind {
    Block,
    Greylist,
    Transaction,
}

/// Which cap was binding when a billed CPU figure outgrew the billable
/// objective duration (`validate_cpu_usage_to_bill`). Raises the identical
/// exception types as `check_time`'s deadline comparison, just against a
/// billed-time-vs-cap comparison instead of a wall-clock-vs-deadline one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuCapKind {
    Block,
    Greylist,
    Transaction,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TxException {
    #[error("not enough space left in block: {net_usage} > {limit}")]
    BlockNetUsageExceeded { net_usage: Bytes, limit: Bytes },

    #[error("greylisted transaction net usage is too high: {net_usage} > {limit}")]
    GreylistNetUsageExceeded { net_usage: Bytes, limit: Bytes },

    #[error("transaction net usage is too high: {net_usage} > {limit}")]
    TransactionNetUsageExceeded { net_usage: Bytes, limit: Bytes },

    #[error(
        "not enough time left in block to complete executing transaction, \
         now {now} deadline {deadline} start {start}"
    )]
    BlockCpuUsageExceeded {
        now: TimePoint,
        deadline: TimePoint,
        start: TimePoint,
    },

    #[error(
        "transaction was executing for too long, now {now} deadline {deadline} start {start}"
    )]
    TransactionCpuUsageExceeded {
        now: TimePoint,
        deadline: TimePoint,
        start: TimePoint,
    },

    #[error(
        "greylisted transaction was executing for too long, \
         now {now} deadline {deadline} start {start}"
    )]
    GreylistCpuUsageExceeded {
        now: TimePoint,
        deadline: TimePoint,
        start: TimePoint,
    },

    #[error(
        "the transaction was unable to complete by deadline, but it is possible it could \
         have succeeded if it were allowed to run to completion, \
         now {now} deadline {deadline} start {start}"
    )]
    LeewayDeadlineException {
        now: TimePoint,
        deadline: TimePoint,
        start: TimePoint,
    },

    #[error("deadline exceeded, now {now} deadline {deadline} start {start}")]
    DeadlineException {
        now: TimePoint,
        deadline: TimePoint,
        start: TimePoint,
    },

    #[error("billed CPU time ({billed}) is greater than the billable CPU time left ({billable})")]
    CpuUsageOverBillable {
        billed: Microseconds,
        billable: Microseconds,
        kind: CpuCapKind,
    },

    #[error("cannot bill CPU time less than the minimum of {minimum}, billed {billed}")]
    CpuUsageUnderMinimum {
        billed: Microseconds,
        minimum: Microseconds,
    },

    #[error("transaction has no authorizations")]
    TxNoAuths,

    #[error("transaction's supplied signatures do not satisfy required authorizations")]
    UnsatisfiedAuthorization,

    #[error("context-free action invoked a stateful host function")]
    InaccessibleApi,

    #[error("assertion failure with message: {0}")]
    EosioAssertMessage(String),

    #[error("account {account} ram usage exceeds its limit")]
    RamUsageExceeded { account: crate::primitives::AccountName },

    /// Defensive catch-all for invariant violations: double-`init`,
    /// `exec`/`finalize` before `init`, or an unrecognized
    /// `deadline_exception_code` reaching `check_time`.
    #[error("transaction exception: {0}")]
    Defect(&'static str),
}

impl TxException {
    /// Stable integer code. Consensus-relevant: never renumber a shipped
    /// variant.
    pub fn code(&self) -> u32 {
        match self {
            TxException::BlockNetUsageExceeded { .. } => 3080002,
            TxException::GreylistNetUsageExceeded { .. } => 3080003,
            TxException::TransactionNetUsageExceeded { .. } => 3080004,
            TxException::BlockCpuUsageExceeded { .. } => 3080005,
            TxException::TransactionCpuUsageExceeded { .. } => 3080006,
            TxException::GreylistCpuUsageExceeded { .. } => 3080007,
            TxException::LeewayDeadlineException { .. } => 3080008,
            TxException::DeadlineException { .. } => 3080001,
            TxException::CpuUsageOverBillable { kind, .. } => match kind {
                CpuCapKind::Block => 3080005,
                CpuCapKind::Greylist => 3080007,
                CpuCapKind::Transaction => 3080006,
            },
            TxException::CpuUsageUnderMinimum { .. } => 3080010,
            TxException::TxNoAuths => 3090003,
            TxException::UnsatisfiedAuthorization => 3090001,
            TxException::InaccessibleApi => 3090004,
            TxException::EosioAssertMessage(_) => 3050003,
            TxException::RamUsageExceeded { .. } => 3070001,
            TxException::Defect(_) => 3100000,
        }
    }

    /// Symbolic name, stable across implementations.
    pub fn name(&self) -> &'static str {
        match self {
            TxException::BlockNetUsageExceeded { .. } => "block_net_usage_exceeded",
            TxException::GreylistNetUsageExceeded { .. } => "greylist_net_usage_exceeded",
            TxException::TransactionNetUsageExceeded { .. } => "tx_net_usage_exceeded",
            TxException::BlockCpuUsageExceeded { .. } => "block_cpu_usage_exceeded",
            TxException::TransactionCpuUsageExceeded { .. } => "tx_cpu_usage_exceeded",
            TxException::GreylistCpuUsageExceeded { .. } => "greylist_cpu_usage_exceeded",
            TxException::LeewayDeadlineException { .. } => "leeway_deadline_exception",
            TxException::DeadlineException { .. } => "deadline_exception",
            TxException::CpuUsageOverBillable { kind, .. } => match kind {
                CpuCapKind::Block => "block_cpu_usage_exceeded",
                CpuCapKind::Greylist => "greylist_cpu_usage_exceeded",
                CpuCapKind::Transaction => "tx_cpu_usage_exceeded",
            },
            TxException::CpuUsageUnderMinimum { .. } => "transaction_exception",
            TxException::TxNoAuths => "tx_no_auths",
            TxException::UnsatisfiedAuthorization => "unsatisfied_authorization",
            TxException::InaccessibleApi => "unaccessible_api",
            TxException::EosioAssertMessage(_) => "eosio_assert_message_exception",
            TxException::RamUsageExceeded { .. } => "transaction_exception",
            TxException::Defect(_) => "transaction_exception",
        }
    }
}
