//! A deterministic, in-memory implementation of every collaborator trait in
//! `txctx_core::collaborators`, the same role `magicblock-bank`'s
//! `bank_dev_utils` fixtures play against a real `solana-accounts-db` in
//! production: enough behavior to drive `txctx-engine`'s test suite without
//! a real resource-limits manager, authorization manager, database or VM.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use txctx_core::persisted::{GeneratedTransactionRecord, TransactionDedupRecord};
use txctx_core::primitives::{AccountName, Bytes, Microseconds, TimePoint};
use txctx_core::trace::{ActionReceipt, ActionTrace};
use txctx_core::tx::{Action, AuthorizationLevel, Transaction};
use txctx_core::{
    AuthorizationManager, ChainController, ProtocolConfiguration, ResourceLimitsManager, Session,
    TransactionSerializer, TxException, TxResult, UndoDatabase, VirtualMachine,
};

/// A permissive set of protocol tunables sized for tests: generous caps,
/// zero leeway unless a test opts in, no context-free discount unless set.
pub fn default_config() -> ProtocolConfiguration {
    ProtocolConfiguration {
        max_transaction_net_usage: Bytes(1_000_000),
        max_transaction_cpu_usage: Microseconds::from_milliseconds(150),
        min_transaction_cpu_usage: Microseconds(100),
        base_per_transaction_net_usage: Bytes(12),
        transaction_id_net_usage: Bytes(32),
        net_usage_leeway: Bytes(4096),
        context_free_discount_net_usage_num: 0,
        context_free_discount_net_usage_den: 0,
        deferred_trx_expiration_window: Microseconds::from_seconds(120),
        max_inline_action_depth: 4,
        subjective_cpu_leeway: Microseconds(3_000),
    }
}

// ---------------------------------------------------------------------
// ResourceLimitsManager
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TestResourceLimits {
    pub block_net_limit: Bytes,
    pub block_cpu_limit: Microseconds,
    /// Hard ("non-elastic") per-account stakes.
    pub hard_net_limits: HashMap<AccountName, Bytes>,
    pub hard_cpu_limits: HashMap<AccountName, Microseconds>,
    /// Elastic per-account stakes; falls back to the hard limit when unset.
    pub elastic_net_limits: HashMap<AccountName, Bytes>,
    pub elastic_cpu_limits: HashMap<AccountName, Microseconds>,
    pub ram_usage: HashMap<AccountName, i64>,
    pub ram_quota: HashMap<AccountName, i64>,
    pub account_usage_updates: Vec<(Vec<AccountName>, u32)>,
    pub transaction_usage: Vec<(Vec<AccountName>, Microseconds, Bytes, u32)>,
}

impl Default for TestResourceLimits {
    fn default() -> Self {
        TestResourceLimits {
            block_net_limit: Bytes(1_000_000),
            block_cpu_limit: Microseconds::from_milliseconds(200),
            hard_net_limits: HashMap::new(),
            hard_cpu_limits: HashMap::new(),
            elastic_net_limits: HashMap::new(),
            elastic_cpu_limits: HashMap::new(),
            ram_usage: HashMap::new(),
            ram_quota: HashMap::new(),
            account_usage_updates: Vec::new(),
            transaction_usage: Vec::new(),
        }
    }
}

impl TestResourceLimits {
    pub fn set_net_limit(&mut self, account: AccountName, limit: Bytes) {
        self.hard_net_limits.insert(account, limit);
    }

    pub fn set_cpu_limit(&mut self, account: AccountName, limit: Microseconds) {
        self.hard_cpu_limits.insert(account, limit);
    }

    pub fn set_ram_quota(&mut self, account: AccountName, quota: i64) {
        self.ram_quota.insert(account, quota);
    }
}

impl ResourceLimitsManager for TestResourceLimits {
    fn block_net_limit(&self) -> Bytes {
        self.block_net_limit
    }

    fn block_cpu_limit(&self) -> Microseconds {
        self.block_cpu_limit
    }

    fn update_account_usage(&mut self, accounts: &[AccountName], time_slot: u32) {
        self.account_usage_updates.push((accounts.to_vec(), time_slot));
    }

    fn account_net_limit(&self, account: AccountName, elastic: bool) -> Option<Bytes> {
        if elastic {
            self.elastic_net_limits
                .get(&account)
                .or_else(|| self.hard_net_limits.get(&account))
                .copied()
        } else {
            self.hard_net_limits.get(&account).copied()
        }
    }

    fn account_cpu_limit(&self, account: AccountName, elastic: bool) -> Option<Microseconds> {
        if elastic {
            self.elastic_cpu_limits
                .get(&account)
                .or_else(|| self.hard_cpu_limits.get(&account))
                .copied()
        } else {
            self.hard_cpu_limits.get(&account).copied()
        }
    }

    fn add_pending_ram_usage(&mut self, account: AccountName, delta: i64) {
        *self.ram_usage.entry(account).or_insert(0) += delta;
    }

    fn verify_account_ram_usage(&self, account: AccountName) -> TxResult<()> {
        let usage = self.ram_usage.get(&account).copied().unwrap_or(0);
        let quota = self.ram_quota.get(&account).copied().unwrap_or(i64::MAX);
        if usage > quota {
            Err(TxException::RamUsageExceeded { account })
        } else {
            Ok(())
        }
    }

    fn add_transaction_usage(
        &mut self,
        accounts: &[AccountName],
        cpu: Microseconds,
        net: Bytes,
        time_slot: u32,
    ) {
        self.transaction_usage.push((accounts.to_vec(), cpu, net, time_slot));
    }
}

// ---------------------------------------------------------------------
// AuthorizationManager
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TestAuthorizationManager {
    pub last_used: HashMap<(AccountName, AccountName), u32>,
    pub update_count: u32,
}

impl AuthorizationManager for TestAuthorizationManager {
    type Permission = AuthorizationLevel;

    fn get_permission(&self, level: AuthorizationLevel) -> AuthorizationLevel {
        level
    }

    fn update_permission_usage(&mut self, permission: AuthorizationLevel) {
        self.update_count += 1;
        self.last_used
            .insert((permission.actor, permission.permission), self.update_count);
    }
}

// ---------------------------------------------------------------------
// UndoDatabase
// ---------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct SessionCounters {
    squashed: Rc<Cell<u32>>,
    undone: Rc<Cell<u32>>,
}

/// A nested savepoint handle. `TestDatabase` hands one out per
/// `start_session`; squashing/undoing just bumps a shared counter the
/// database can be inspected for afterwards.
pub struct TestSession {
    counters: SessionCounters,
}

impl Session for TestSession {
    fn squash(self) {
        self.counters.squashed.set(self.counters.squashed.get() + 1);
    }

    fn undo(self) {
        self.counters.undone.set(self.counters.undone.get() + 1);
    }
}

#[derive(Debug, Default)]
pub struct TestDatabase {
    pub generated_transactions: Vec<GeneratedTransactionRecord>,
    pub dedup_records: Vec<TransactionDedupRecord>,
    counters: SessionCounters,
}

impl TestDatabase {
    pub fn squashed_count(&self) -> u32 {
        self.counters.squashed.get()
    }

    pub fn undone_count(&self) -> u32 {
        self.counters.undone.get()
    }
}

impl UndoDatabase for TestDatabase {
    type Session = TestSession;

    fn start_session(&mut self) -> TestSession {
        TestSession {
            counters: self.counters.clone(),
        }
    }

    fn insert_generated_transaction(&mut self, record: GeneratedTransactionRecord) {
        self.generated_transactions.push(record);
    }

    fn insert_transaction_dedup(&mut self, record: TransactionDedupRecord) {
        self.dedup_records.push(record);
    }
}

// ---------------------------------------------------------------------
// VirtualMachine
// ---------------------------------------------------------------------

type ActionHandler = Box<dyn FnMut(&Action, u32) -> TxResult<(ActionTrace, Vec<Action>)>>;

/// A scriptable VM stand-in: actions dispatch to a per-`(account, name)`
/// handler when one is registered, and otherwise produce a trivial
/// successful trace billing `default_net_usage_words`.
#[derive(Default)]
pub struct TestVm {
    pub default_net_usage_words: u64,
    handlers: HashMap<(AccountName, AccountName), ActionHandler>,
}

impl TestVm {
    pub fn new() -> Self {
        TestVm::default()
    }

    pub fn on(
        mut self,
        account: AccountName,
        name: AccountName,
        handler: impl FnMut(&Action, u32) -> TxResult<(ActionTrace, Vec<Action>)> + 'static,
    ) -> Self {
        self.handlers.insert((account, name), Box::new(handler));
        self
    }

    /// Registers a handler that always fails with `EosioAssertMessage`, for
    /// tests that only care that a mid-exec failure still leaves a trace
    /// entry behind.
    pub fn handlers_fail_for_testing(&mut self, account: AccountName, name: AccountName) {
        self.handlers.insert(
            (account, name),
            Box::new(|_action, _depth| {
                Err(TxException::EosioAssertMessage(
                    "scripted failure for testing".to_string(),
                ))
            }),
        );
    }
}

impl VirtualMachine for TestVm {
    fn exec(
        &mut self,
        action: &Action,
        receiver: AccountName,
        context_free: bool,
        recurse_depth: u32,
    ) -> TxResult<(ActionTrace, Vec<Action>)> {
        if let Some(handler) = self.handlers.get_mut(&(action.account, action.name)) {
            return handler(action, recurse_depth);
        }
        let trace = ActionTrace {
            receiver,
            context_free,
            receipt: Some(ActionReceipt {
                receiver,
                act_digest: [0u8; 32],
                global_sequence: 0,
                recv_sequence: 0,
                net_usage_words: self.default_net_usage_words,
            }),
            console: String::new(),
            elapsed: Microseconds::ZERO,
            inline_traces: Vec::new(),
            except: None,
        };
        Ok((trace, Vec::new()))
    }
}

// ---------------------------------------------------------------------
// TransactionSerializer
// ---------------------------------------------------------------------

/// Not a canonical wire format — canonical serialization stays out of
/// scope — but deterministic and byte-accurate for the two things the core
/// needs from it: a billable length, split between the unprunable
/// (header/actions) and prunable (context-free payload) parts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestSerializer;

impl TestSerializer {
    fn unprunable_bytes(&self, trx: &Transaction) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&trx.header.expiration.0.to_le_bytes());
        bytes.extend_from_slice(&trx.header.ref_block_num.to_le_bytes());
        bytes.extend_from_slice(&trx.header.ref_block_prefix.to_le_bytes());
        for action in &trx.actions {
            bytes.extend_from_slice(&action.account.0.to_le_bytes());
            bytes.extend_from_slice(&action.name.0.to_le_bytes());
            bytes.push(action.authorization.len() as u8);
            bytes.extend_from_slice(&action.data);
        }
        bytes
    }

    fn prunable_bytes(&self, trx: &Transaction) -> Vec<u8> {
        let mut bytes = Vec::new();
        for action in &trx.context_free_actions {
            bytes.extend_from_slice(&action.data);
        }
        bytes
    }
}

impl TransactionSerializer for TestSerializer {
    fn serialize(&self, trx: &Transaction) -> Vec<u8> {
        let mut bytes = self.unprunable_bytes(trx);
        bytes.extend(self.prunable_bytes(trx));
        bytes
    }

    fn unprunable_size(&self, trx: &Transaction) -> Bytes {
        Bytes(self.unprunable_bytes(trx).len() as u64)
    }

    fn prunable_size(&self, trx: &Transaction) -> Bytes {
        Bytes(self.prunable_bytes(trx).len() as u64)
    }
}

// ---------------------------------------------------------------------
// ChainController
// ---------------------------------------------------------------------

pub struct TestController {
    pub resource_limits: TestResourceLimits,
    pub authorization: TestAuthorizationManager,
    pub database: TestDatabase,
    pub vm: TestVm,
    pub serializer: TestSerializer,
    pub config: ProtocolConfiguration,
    pub now: TimePoint,
    pub pending_block_time: TimePoint,
    pub pending_block_slot: u32,
    pub producing_block: bool,
    pub greylist: HashSet<AccountName>,
    pub skip_trx_checks: bool,
    pub skip_db_sessions: bool,
    pub fail_expiration: Option<TxException>,
    pub fail_tapos: Option<TxException>,
    pub fail_referenced_accounts: Option<TxException>,
}

impl Default for TestController {
    fn default() -> Self {
        TestController {
            resource_limits: TestResourceLimits::default(),
            authorization: TestAuthorizationManager::default(),
            database: TestDatabase::default(),
            vm: TestVm::default(),
            serializer: TestSerializer,
            config: default_config(),
            now: TimePoint(0),
            pending_block_time: TimePoint(0),
            pending_block_slot: 0,
            producing_block: true,
            greylist: HashSet::new(),
            skip_trx_checks: false,
            skip_db_sessions: false,
            fail_expiration: None,
            fail_tapos: None,
            fail_referenced_accounts: None,
        }
    }
}

impl TestController {
    pub fn new() -> Self {
        TestController::default()
    }

    pub fn advance_to(&mut self, now: TimePoint) {
        self.now = now;
    }

    pub fn greylist(&mut self, account: AccountName) {
        self.greylist.insert(account);
    }
}

impl ChainController for TestController {
    type ResourceLimits = TestResourceLimits;
    type Authorization = TestAuthorizationManager;
    type Database = TestDatabase;
    type Vm = TestVm;
    type Serializer = TestSerializer;

    fn resource_limits(&self) -> &TestResourceLimits {
        &self.resource_limits
    }

    fn resource_limits_mut(&mut self) -> &mut TestResourceLimits {
        &mut self.resource_limits
    }

    fn authorization_mut(&mut self) -> &mut TestAuthorizationManager {
        &mut self.authorization
    }

    fn database_mut(&mut self) -> &mut TestDatabase {
        &mut self.database
    }

    fn vm_mut(&mut self) -> &mut TestVm {
        &mut self.vm
    }

    fn serializer(&self) -> &TestSerializer {
        &self.serializer
    }

    fn now(&self) -> TimePoint {
        self.now
    }

    fn pending_block_time(&self) -> TimePoint {
        self.pending_block_time
    }

    fn pending_block_slot(&self) -> u32 {
        self.pending_block_slot
    }

    fn is_producing_block(&self) -> bool {
        self.producing_block
    }

    fn is_resource_greylisted(&self, account: AccountName) -> bool {
        self.greylist.contains(&account)
    }

    fn skip_trx_checks(&self) -> bool {
        self.skip_trx_checks
    }

    fn skip_db_sessions(&self) -> bool {
        self.skip_db_sessions
    }

    fn validate_expiration(&self, _trx: &Transaction) -> TxResult<()> {
        self.fail_expiration.clone().map_or(Ok(()), Err)
    }

    fn validate_tapos(&self, _trx: &Transaction) -> TxResult<()> {
        self.fail_tapos.clone().map_or(Ok(()), Err)
    }

    fn validate_referenced_accounts(&self, _trx: &Transaction) -> TxResult<()> {
        self.fail_referenced_accounts.clone().map_or(Ok(()), Err)
    }

    fn configuration(&self) -> &ProtocolConfiguration {
        &self.config
    }
}
