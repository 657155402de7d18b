//! Narrow collaborator contracts the transaction execution core depends on
//! but does not implement: the resource-limits manager, the authorization
//! manager, the block-producing controller, the deterministic database, and
//! the virtual machine. `txctx-engine` is generic over these traits;
//! `txctx-test-support` supplies one deterministic, in-memory implementation
//! of each for tests.
//!
//! This mirrors how `magicblock-bank::bank::Bank` implements
//! `TransactionProcessingCallback` as a seam into the account-loading layer
//! rather than owning accounts-db outright: the core depends on behavior,
//! not on a concrete persistence or VM implementation.

use crate::config::ProtocolConfiguration;
use crate::error::TxResult;
use crate::primitives::{AccountName, Bytes, Microseconds, TimePoint};
use crate::trace::ActionTrace;
use crate::tx::{Action, AuthorizationLevel, Transaction};

/// Tracks and enforces per-account and per-block resource stakes. Elastic
/// limits expand with idle network capacity; greylisted accounts are
/// restricted to their non-elastic ("hard") allowance (glossary: "Elastic
/// limit", "Greylisted").
pub trait ResourceLimitsManager {
    fn block_net_limit(&self) -> Bytes;
    fn block_cpu_limit(&self) -> Microseconds;

    /// Bumps the usage-window clock for every billed account so the next
    /// affordance query reflects this block's timestamp.
    fn update_account_usage(&mut self, accounts: &[AccountName], time_slot: u32);

    /// `None` means the account has no constraint on this resource (an
    /// unlimited stake) and should be skipped when folding a minimum across
    /// payers.
    fn account_net_limit(&self, account: AccountName, elastic: bool) -> Option<Bytes>;
    fn account_cpu_limit(&self, account: AccountName, elastic: bool) -> Option<Microseconds>;

    fn add_pending_ram_usage(&mut self, account: AccountName, delta: i64);
    fn verify_account_ram_usage(&self, account: AccountName) -> TxResult<()>;

    fn add_transaction_usage(
        &mut self,
        accounts: &[AccountName],
        cpu: Microseconds,
        net: Bytes,
        time_slot: u32,
    );
}

/// Opaque handle to a resolved permission, returned by `get_permission` and
/// fed back to `update_permission_usage` once the transaction using it has
/// finalized successfully.
pub trait AuthorizationManager {
    type Permission;

    fn get_permission(&self, level: AuthorizationLevel) -> Self::Permission;
    fn update_permission_usage(&mut self, permission: Self::Permission);
}

/// The block-producing controller: pending-block context, producer policy
/// queries, protocol configuration, and accessors to the resource-limits
/// manager, authorization manager, database and virtual machine it owns.
/// Threaded explicitly through every `TransactionContext` operation rather
/// than resolved from a global singleton: `TransactionContext` borrows
/// `&mut C` for the duration of each call instead of storing a permanent
/// back-reference to it.
pub trait ChainController {
    type ResourceLimits: ResourceLimitsManager;
    type Authorization: AuthorizationManager;
    type Database: UndoDatabase;
    type Vm: VirtualMachine;
    type Serializer: TransactionSerializer;

    fn resource_limits(&self) -> &Self::ResourceLimits;
    fn resource_limits_mut(&mut self) -> &mut Self::ResourceLimits;
    fn authorization_mut(&mut self) -> &mut Self::Authorization;
    fn database_mut(&mut self) -> &mut Self::Database;
    fn vm_mut(&mut self) -> &mut Self::Vm;
    fn serializer(&self) -> &Self::Serializer;

    /// Wall-clock "now", distinct from `pending_block_time`: the former
    /// drives `check_time`/the billing timer, the latter stamps `published`.
    fn now(&self) -> TimePoint;
    fn pending_block_time(&self) -> TimePoint;
    fn pending_block_slot(&self) -> u32;
    fn is_producing_block(&self) -> bool;
    fn is_resource_greylisted(&self, account: AccountName) -> bool;

    /// Fast-replay mode for already-validated blocks: `check_time` and
    /// `check_net_usage` become no-ops.
    fn skip_trx_checks(&self) -> bool;
    /// Fast-replay mode: undo sessions are not opened.
    fn skip_db_sessions(&self) -> bool;

    fn validate_expiration(&self, trx: &Transaction) -> TxResult<()>;
    fn validate_tapos(&self, trx: &Transaction) -> TxResult<()>;
    fn validate_referenced_accounts(&self, trx: &Transaction) -> TxResult<()>;

    fn configuration(&self) -> &ProtocolConfiguration;
}

/// A nested database savepoint. `squash` folds it into its parent; `undo`
/// discards it. `#[must_use]` rather than a `Drop` impl: the controller must
/// explicitly call exactly one of the two on every path, and a silent
/// implicit rollback on scope exit would hide that bug.
#[must_use = "an undo session must be explicitly squashed or undone"]
pub trait Session {
    fn squash(self);
    fn undo(self);
}

pub trait UndoDatabase {
    type Session: Session;

    fn start_session(&mut self) -> Self::Session;
    fn insert_generated_transaction(
        &mut self,
        record: crate::persisted::GeneratedTransactionRecord,
    );
    fn insert_transaction_dedup(&mut self, record: crate::persisted::TransactionDedupRecord);
}

/// The contract virtual machine and host-function dispatch surface. Byte
/// code verification and host-function implementations are out of scope;
/// this is the seam the core calls through.
///
/// Rather than handing the VM a live callback into the dispatcher (which
/// would require the dispatcher to hold a second, aliasing mutable borrow of
/// the controller while the first is already lent to `vm_mut()`), an
/// invocation returns the actions it sent inline alongside its own trace;
/// `txctx-engine::dispatcher` walks that list afterwards, recursing with a
/// deeper `recurse_depth`. This keeps the dispatcher single-owner of the
/// controller borrow at every call site instead of threading a trait object
/// through untrusted contract code.
pub trait VirtualMachine {
    fn exec(
        &mut self,
        action: &Action,
        receiver: AccountName,
        context_free: bool,
        recurse_depth: u32,
    ) -> TxResult<(ActionTrace, Vec<Action>)>;
}

/// Canonical serialization stays out of scope; this is the one seam the
/// deferred-transaction scheduler and the input-transaction net usage
/// calculation need into it.
pub trait TransactionSerializer {
    /// Full wire encoding of `trx`, used to size a persisted
    /// generated-transaction record.
    fn serialize(&self, trx: &Transaction) -> Vec<u8>;
    /// Size of the part of `trx` that is never pruned (header, actions and
    /// their authorizations) — billed in full.
    fn unprunable_size(&self, trx: &Transaction) -> Bytes;
    /// Size of the part of `trx` that may be pruned after execution
    /// (context-free action payloads) — billed at the configured discount.
    fn prunable_size(&self, trx: &Transaction) -> Bytes;
}
