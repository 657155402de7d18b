//! The public façade: `TransactionContext`, implementing spec.md §3, §4.6
//! and §4.7. Generic over `C: ChainController` so the context is tied to one
//! concrete set of collaborators without ever storing a back-reference to
//! the controller itself — every operation borrows `&mut C` for the
//! duration of the call, per the "global singleton controller" redesign
//! flag in spec.md §9.

use txctx_core::error::DeadlineExceptionKind;
use txctx_core::persisted::TransactionDedupRecord;
use txctx_core::primitives::{ceil_mul_div, AccountName, Bytes, Microseconds, TimePoint};
use txctx_core::trace::TransactionTrace;
use txctx_core::tx::{AuthorizationLevel, Transaction, TransactionId};
use txctx_core::{ChainController, Session, TxException, TxResult, UndoDatabase};

use crate::billing_timer::BillingTimer;
use crate::checks;
use crate::deferred;
use crate::dispatcher;
use crate::limits::{self, PayerAffordance};

/// One in-flight transaction's resource-accounting and execution harness.
/// Moves through *constructed → initialized → executed → finalized →
/// {squashed | undone}*; see spec.md §3 for the full invariant list.
pub struct TransactionContext<C: ChainController> {
    pub trx: Transaction,
    pub id: TransactionId,
    pub start: TimePoint,
    pub published: TimePoint,
    /// The caller's hard wall-clock deadline, captured at `init` and reused
    /// by every `resume_billing_timer` call thereafter.
    pub caller_deadline: TimePoint,
    pub bill_to_accounts: Vec<AccountName>,
    pub validate_ram_accounts: Vec<AccountName>,
    pub net_limit: Bytes,
    pub eager_net_limit: Bytes,
    pub objective_duration_limit: Microseconds,
    pub initial_objective_duration_limit: Microseconds,
    pub net_limit_due_to_block: bool,
    pub net_limit_due_to_greylist: bool,
    pub cpu_limit_due_to_greylist: bool,
    pub billed_cpu_time: Microseconds,
    pub is_input: bool,
    /// Disabled for re-executed deferred transactions: their context-free
    /// actions are not re-run (spec.md §4.1, *Deferred* variant).
    pub apply_context_free: bool,
    pub is_initialized: bool,
    pub timer: BillingTimer,
    pub trace: TransactionTrace,
    undo_session: Option<<C::Database as UndoDatabase>::Session>,
}

impl<C: ChainController> TransactionContext<C> {
    pub fn new(
        trx: Transaction,
        id: TransactionId,
        start: TimePoint,
        explicit_billed_cpu_time: Option<Microseconds>,
    ) -> Self {
        TransactionContext {
            trx,
            id,
            start,
            published: start,
            caller_deadline: TimePoint(u64::MAX),
            bill_to_accounts: Vec::new(),
            validate_ram_accounts: Vec::new(),
            net_limit: Bytes::ZERO,
            eager_net_limit: Bytes::ZERO,
            objective_duration_limit: Microseconds::ZERO,
            initial_objective_duration_limit: Microseconds::ZERO,
            net_limit_due_to_block: true,
            net_limit_due_to_greylist: false,
            cpu_limit_due_to_greylist: false,
            billed_cpu_time: Microseconds::ZERO,
            is_input: false,
            apply_context_free: true,
            is_initialized: false,
            timer: BillingTimer {
                pseudo_start: start,
                billed_time: Microseconds::ZERO,
                billing_timer_duration_limit: Microseconds::ZERO,
                deadline: start,
                deadline_exception_code: DeadlineExceptionKind::BlockCpuUsageExceeded,
                billing_timer_exception_code: DeadlineExceptionKind::BlockCpuUsageExceeded,
                explicit_billed_cpu_time,
            },
            trace: TransactionTrace::default(),
            undo_session: None,
        }
    }

    // -- init --------------------------------------------------------

    fn init_common(
        &mut self,
        controller: &mut C,
        published: TimePoint,
        initial_net_usage: Bytes,
        explicit_deadline: Option<TimePoint>,
    ) -> TxResult<()> {
        if self.is_initialized {
            return Err(TxException::Defect(
                "cannot initialize a transaction context twice",
            ));
        }

        self.published = published;
        self.bill_to_accounts = self.trx.bill_to_accounts();
        self.caller_deadline = explicit_deadline.unwrap_or(TimePoint(u64::MAX));

        // Bump the usage-window clock for every billed account before
        // querying affordances, so the fold below reflects this block's
        // timestamp rather than whenever each account was last touched.
        let slot = controller.pending_block_slot();
        controller
            .resource_limits_mut()
            .update_account_usage(&self.bill_to_accounts, slot);

        let (account_net, account_cpu, net_greylisted, cpu_greylisted) =
            self.max_bandwidth_billed_accounts_can_pay(controller, false);

        let envelope = limits::build_envelope(
            self.start,
            controller.resource_limits().block_net_limit(),
            controller.resource_limits().block_cpu_limit(),
            controller.configuration(),
            &self.trx.header,
            self.caller_deadline,
            self.timer.explicit_billed_cpu_time,
            PayerAffordance {
                net: account_net,
                cpu: account_cpu,
                net_greylisted,
                cpu_greylisted,
            },
        )?;

        self.net_limit = envelope.net_limit;
        self.eager_net_limit = envelope.eager_net_limit;
        self.objective_duration_limit = envelope.objective_duration_limit;
        self.initial_objective_duration_limit = envelope.initial_objective_duration_limit;
        self.net_limit_due_to_block = envelope.net_limit_due_to_block;
        self.net_limit_due_to_greylist = envelope.net_limit_due_to_greylist;
        self.cpu_limit_due_to_greylist = envelope.cpu_limit_due_to_greylist;

        self.timer.pseudo_start = self.start;
        self.timer.billed_time = Microseconds::ZERO;
        self.timer.billing_timer_duration_limit = envelope.billing_timer_duration_limit;
        self.timer.deadline = envelope.deadline;
        self.timer.deadline_exception_code = envelope.deadline_exception_code;
        self.timer.billing_timer_exception_code = envelope.billing_timer_exception_code;

        if !controller.skip_db_sessions() {
            self.undo_session = Some(controller.database_mut().start_session());
        }

        self.add_net_usage(controller, initial_net_usage)?;
        self.check_time(controller)?;

        self.is_initialized = true;
        log::trace!(
            "transaction context initialized: bill_to={:?} net_limit={} cpu_limit={} deadline={}",
            self.bill_to_accounts,
            self.eager_net_limit,
            self.objective_duration_limit,
            self.timer.deadline
        );
        Ok(())
    }

    /// For transactions originated by the chain itself (e.g. an onblock
    /// action), never subject to expiration/TAPOS/dedup checks.
    pub fn init_for_implicit(
        &mut self,
        controller: &mut C,
        explicit_deadline: Option<TimePoint>,
    ) -> TxResult<()> {
        self.is_input = false;
        self.apply_context_free = true;
        let published = controller.pending_block_time();
        self.init_common(controller, published, Bytes::ZERO, explicit_deadline)
    }

    /// For a transaction freshly arrived from the network. `record_transaction`
    /// controls whether the transaction id is written to the dedup table —
    /// callers replaying an already-recorded block pass `false`.
    pub fn init_for_input(
        &mut self,
        controller: &mut C,
        explicit_deadline: Option<TimePoint>,
        record_transaction: bool,
    ) -> TxResult<()> {
        // Context-free actions carry no authorizations; a transaction with
        // no standard actions therefore has none at all.
        if self.trx.actions.is_empty() {
            return Err(TxException::TxNoAuths);
        }

        controller.validate_expiration(&self.trx)?;
        controller.validate_tapos(&self.trx)?;
        controller.validate_referenced_accounts(&self.trx)?;

        self.is_input = true;
        self.apply_context_free = true;
        let published = controller.pending_block_time();

        let cfg = *controller.configuration();
        let unprunable = controller.serializer().unprunable_size(&self.trx);
        let prunable = controller.serializer().prunable_size(&self.trx);
        let discounted_prunable = if cfg.context_free_discount_active() {
            Bytes(ceil_mul_div(
                prunable.0,
                cfg.context_free_discount_net_usage_num,
                cfg.context_free_discount_net_usage_den,
            ))
        } else {
            prunable
        };
        let mut initial_net_usage = cfg
            .base_per_transaction_net_usage
            .saturating_add(unprunable)
            .saturating_add(discounted_prunable);
        if self.trx.header.delay_sec > 0 {
            initial_net_usage = initial_net_usage
                .saturating_add(cfg.base_per_transaction_net_usage)
                .saturating_add(cfg.transaction_id_net_usage);
        }

        self.init_common(controller, published, initial_net_usage, explicit_deadline)?;

        if record_transaction {
            controller
                .database_mut()
                .insert_transaction_dedup(TransactionDedupRecord {
                    trx_id: self.id,
                    expiration: self.trx.header.expiration,
                });
        }
        Ok(())
    }

    /// For a transaction already persisted as a `GeneratedTransactionRecord`
    /// and now due. Context-free actions are not re-applied: they were
    /// already executed (or discarded) when the record was first created.
    pub fn init_for_deferred(
        &mut self,
        controller: &mut C,
        published: TimePoint,
        explicit_deadline: Option<TimePoint>,
    ) -> TxResult<()> {
        self.is_input = false;
        self.apply_context_free = false;
        self.trace.scheduled = true;
        self.init_common(controller, published, Bytes::ZERO, explicit_deadline)
    }

    // -- exec --------------------------------------------------------

    pub fn exec(&mut self, controller: &mut C) -> TxResult<()> {
        if !self.is_initialized {
            return Err(TxException::Defect("must first initialize"));
        }

        let result = self.exec_inner(controller);
        if let Err(err) = &result {
            self.trace.mark_failed(err.name());
        }
        result
    }

    fn exec_inner(&mut self, controller: &mut C) -> TxResult<()> {
        if self.apply_context_free {
            let context_free_actions = self.trx.context_free_actions.clone();
            for action in &context_free_actions {
                dispatcher::dispatch_action(self, controller, action, true, 0)?;
            }
        }

        if self.trx.header.delay_sec == 0 {
            let actions = self.trx.actions.clone();
            for action in &actions {
                dispatcher::dispatch_action(self, controller, action, false, 0)?;
            }
        } else {
            deferred::schedule(self, controller)?;
        }
        Ok(())
    }

    // -- finalize ------------------------------------------------------

    pub fn finalize(&mut self, controller: &mut C) -> TxResult<()> {
        if !self.is_initialized {
            return Err(TxException::Defect(
                "must first initialize before finalizing",
            ));
        }

        let result = self.finalize_inner(controller);
        if let Err(err) = &result {
            self.trace.mark_failed(err.name());
        }
        result
    }

    fn finalize_inner(&mut self, controller: &mut C) -> TxResult<()> {
        let mut touched: Vec<AuthorizationLevel> = Vec::new();
        for act in self.trx.actions.iter().chain(self.trx.context_free_actions.iter()) {
            for level in &act.authorization {
                if !touched.contains(level) {
                    touched.push(*level);
                }
            }
        }
        for level in touched {
            let permission = controller.authorization_mut().get_permission(level);
            controller.authorization_mut().update_permission_usage(permission);
        }

        for account in self.validate_ram_accounts.clone() {
            controller.resource_limits().verify_account_ram_usage(account)?;
        }

        let (account_net, account_cpu, net_greylisted, cpu_greylisted) =
            self.max_bandwidth_billed_accounts_can_pay(controller, false);
        let cfg = *controller.configuration();
        self.net_limit_due_to_greylist = self.net_limit_due_to_greylist || net_greylisted;
        self.cpu_limit_due_to_greylist = self.cpu_limit_due_to_greylist || cpu_greylisted;

        if let Some(net) = account_net {
            if net <= self.net_limit {
                self.net_limit = net;
                self.net_limit_due_to_block = false;
            }
        }
        if let Some(cpu) = account_cpu {
            if cpu <= self.objective_duration_limit {
                self.objective_duration_limit = cpu;
                self.timer.billing_timer_exception_code = DeadlineExceptionKind::TxCpuUsageExceeded;
            }
        }

        self.trace.net_usage = self.trace.net_usage.round_up_to_word();
        self.eager_net_limit = self.net_limit;
        self.check_net_usage(controller)?;

        let now = controller.now();
        self.trace.elapsed = now - self.start;
        self.update_billed_cpu_time(controller, now);

        limits::validate_cpu_usage_to_bill(
            self.billed_cpu_time,
            true,
            self.objective_duration_limit,
            self.timer.billing_timer_exception_code,
            self.cpu_limit_due_to_greylist,
            cfg.min_transaction_cpu_usage,
        )?;

        let slot = controller.pending_block_slot();
        controller.resource_limits_mut().add_transaction_usage(
            &self.bill_to_accounts,
            self.billed_cpu_time,
            self.trace.net_usage,
            slot,
        );
        log::debug!(
            "transaction finalized: billed_cpu={} net_usage={}",
            self.billed_cpu_time,
            self.trace.net_usage
        );
        Ok(())
    }

    // -- undo session ------------------------------------------------

    /// Folds the nested savepoint into its parent. A no-op if `squash`/`undo`
    /// already ran, or if the controller configured `skip_db_sessions`.
    pub fn squash(&mut self) {
        if let Some(session) = self.undo_session.take() {
            session.squash();
        }
    }

    /// Discards the nested savepoint. A no-op under the same conditions as
    /// `squash`.
    pub fn undo(&mut self) {
        if let Some(session) = self.undo_session.take() {
            session.undo();
        }
    }

    // -- resource accounting ------------------------------------------

    pub fn add_net_usage(&mut self, controller: &C, delta: Bytes) -> TxResult<()> {
        self.trace.net_usage = self.trace.net_usage.saturating_add(delta);
        self.check_net_usage(controller)
    }

    pub fn check_net_usage(&self, controller: &C) -> TxResult<()> {
        if controller.skip_trx_checks() {
            return Ok(());
        }
        checks::check_net_usage(
            self.trace.net_usage,
            self.eager_net_limit,
            self.net_limit_due_to_block,
            self.net_limit_due_to_greylist,
        )
    }

    pub fn check_time(&self, controller: &C) -> TxResult<()> {
        if controller.skip_trx_checks() {
            return Ok(());
        }
        checks::check_time(
            controller.now(),
            self.timer.deadline,
            self.start,
            self.timer.deadline_exception_code,
            self.cpu_limit_due_to_greylist,
        )
    }

    pub fn pause_billing_timer(&mut self, controller: &C) {
        self.timer.pause(controller.now());
    }

    pub fn resume_billing_timer(&mut self, controller: &C) {
        self.timer.resume(controller.now(), self.caller_deadline);
    }

    /// Recomputes `billed_cpu_time` against `now` and stores it; also
    /// returned directly so `finalize` doesn't need a second field read.
    pub fn update_billed_cpu_time(&mut self, controller: &C, now: TimePoint) -> Microseconds {
        self.billed_cpu_time = self
            .timer
            .update_billed_cpu_time(now, controller.configuration().min_transaction_cpu_usage);
        self.billed_cpu_time
    }

    pub fn add_ram_usage(&mut self, controller: &mut C, account: AccountName, delta: i64) {
        controller.resource_limits_mut().add_pending_ram_usage(account, delta);
        if delta > 0 && !self.validate_ram_accounts.contains(&account) {
            self.validate_ram_accounts.push(account);
        }
    }

    /// Folds each billed account's net/CPU affordance to a minimum across
    /// all payers. `force_elastic` overrides the per-account elastic check;
    /// otherwise an account is queried at its elastic limit when the node is
    /// not currently producing a block and the account is greylisted,
    /// matching `original_source/chain/transaction_context.go`'s
    /// `MaxBandwidthBilledAccountsCanPay`
    /// (`forceElasticLimits || !IsProducingBlock() && IsResourceGreylisted(a)`).
    pub fn max_bandwidth_billed_accounts_can_pay(
        &self,
        controller: &C,
        force_elastic: bool,
    ) -> (Option<Bytes>, Option<Microseconds>, bool, bool) {
        let mut net_min: Option<Bytes> = None;
        let mut cpu_min: Option<Microseconds> = None;
        let mut net_greylisted = false;
        let mut cpu_greylisted = false;
        for &account in &self.bill_to_accounts {
            let greylisted = controller.is_resource_greylisted(account);
            let elastic = force_elastic || (!controller.is_producing_block() && greylisted);
            if let Some(net) = controller.resource_limits().account_net_limit(account, elastic) {
                net_min = Some(net_min.map_or(net, |m| m.min(net)));
                if greylisted {
                    net_greylisted = true;
                }
            }
            if let Some(cpu) = controller.resource_limits().account_cpu_limit(account, elastic) {
                cpu_min = Some(cpu_min.map_or(cpu, |m| m.min(cpu)));
                if greylisted {
                    cpu_greylisted = true;
                }
            }
        }
        (net_min, cpu_min, net_greylisted, cpu_greylisted)
    }
}
