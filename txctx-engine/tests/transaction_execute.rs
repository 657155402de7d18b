//! End-to-end scenarios built from the boundary cases in spec.md §8,
//! exercised through `TransactionContext` against the in-memory fixtures in
//! `txctx-test-support` — the same division of labor as
//! `magicblock-bank/tests/transaction_execute.rs` driving a real `Bank`
//! against hand-built genesis/transaction fixtures.

use assert_matches::assert_matches;

use txctx_core::error::DeadlineExceptionKind;
use txctx_core::primitives::{Bytes, Microseconds, TimePoint};
use txctx_core::tx::{Transaction, TransactionId};
use txctx_core::TxException;
use txctx_engine::TransactionContext;
use txctx_test_support::{account, single_action_transaction, TestController};

fn trx_id(tag: u8) -> TransactionId {
    TransactionId([tag; 32])
}

#[test]
fn net_usage_rounds_down_to_word_and_then_trips_block_cap() {
    txctx_test_support::init_logger!();

    let mut controller = TestController::new();
    controller.resource_limits.block_net_limit = Bytes(100);
    controller
        .resource_limits
        .set_net_limit(account(1), Bytes(97));
    controller.config.net_usage_leeway = Bytes(0);

    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(1), TimePoint(0), None);

    ctx.init_for_input(&mut controller, None, true).unwrap();
    assert_eq!(ctx.eager_net_limit, Bytes(96));

    let err = ctx.add_net_usage(&controller, Bytes(97)).unwrap_err();
    assert_matches!(err, TxException::BlockNetUsageExceeded { .. });
}

#[test]
fn transaction_header_cpu_cap_clamps_tighter_than_block_and_config() {
    txctx_test_support::init_logger!();

    let mut controller = TestController::new();
    controller.resource_limits.block_cpu_limit = Microseconds::from_milliseconds(200);
    controller.config.max_transaction_cpu_usage = Microseconds::from_milliseconds(150);

    let mut trx = single_action_transaction(1, 10, vec![]);
    trx.header.max_cpu_usage_ms = 50;

    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(2), TimePoint(0), None);
    ctx.init_for_input(&mut controller, None, true).unwrap();

    assert_eq!(
        ctx.objective_duration_limit,
        Microseconds::from_milliseconds(50)
    );
    assert_eq!(
        ctx.timer.billing_timer_exception_code,
        DeadlineExceptionKind::TxCpuUsageExceeded
    );
}

#[test]
fn explicit_billed_cpu_time_short_circuits_the_timer() {
    txctx_test_support::init_logger!();

    let mut controller = TestController::new();
    controller.config.max_transaction_cpu_usage = Microseconds::from_milliseconds(150);

    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> = TransactionContext::new(
        trx,
        trx_id(3),
        TimePoint(0),
        Some(Microseconds(30_000)),
    );
    ctx.init_for_input(&mut controller, None, true).unwrap();

    ctx.pause_billing_timer(&controller);
    assert!(
        !ctx.timer.paused(),
        "pause must be a no-op under explicit billed cpu time"
    );
    ctx.resume_billing_timer(&controller);

    controller.advance_to(TimePoint(999));
    assert_eq!(
        ctx.update_billed_cpu_time(&controller, controller.now),
        Microseconds(30_000)
    );
}

#[test]
fn explicit_billed_cpu_time_over_cap_fails_at_init() {
    let mut controller = TestController::new();
    controller.config.max_transaction_cpu_usage = Microseconds::from_milliseconds(150);

    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> = TransactionContext::new(
        trx,
        trx_id(4),
        TimePoint(0),
        Some(Microseconds::from_milliseconds(999)),
    );

    let err = ctx.init_for_input(&mut controller, None, true).unwrap_err();
    assert_matches!(err, TxException::CpuUsageOverBillable { .. });
}

#[test]
fn deferred_transaction_schedules_instead_of_executing_and_bills_ram() {
    txctx_test_support::init_logger!();

    let mut controller = TestController::new();

    let mut trx = single_action_transaction(42, 10, vec![1, 2, 3]);
    trx.header.delay_sec = 60;

    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(5), TimePoint(0), None);
    ctx.init_for_input(&mut controller, None, true).unwrap();
    ctx.published = TimePoint(1_000_000); // 1s, in microseconds
    ctx.exec(&mut controller).unwrap();

    assert!(ctx.trace.scheduled);
    assert_eq!(controller.database.generated_transactions.len(), 1);

    let record = &controller.database.generated_transactions[0];
    assert_eq!(record.payer, account(42));
    assert_eq!(record.sender, account(0));
    assert_eq!(
        record.delay_until,
        TimePoint(1_000_000) + Microseconds::from_seconds(60)
    );
    assert_eq!(
        record.expiration,
        record.delay_until + controller.config.deferred_trx_expiration_window
    );
    assert!(!record.serialized_trx.is_empty());

    let billed_ram = controller
        .resource_limits
        .ram_usage
        .get(&account(42))
        .copied()
        .unwrap_or(0);
    assert!(billed_ram > 0, "payer must be billed for the persisted record");
}

#[test]
fn input_transaction_with_only_context_free_actions_fails_with_tx_no_auths() {
    let mut controller = TestController::new();

    let trx = Transaction {
        header: txctx_test_support::header(),
        context_free_actions: vec![txctx_test_support::action(99, 0, 1, vec![])],
        actions: Vec::new(),
    };

    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(6), TimePoint(0), None);

    let err = ctx.init_for_input(&mut controller, None, true).unwrap_err();
    assert_matches!(err, TxException::TxNoAuths);
    assert!(
        !ctx.is_initialized,
        "a tx-no-auths rejection must happen before init completes"
    );
}

#[test]
fn successful_exec_and_finalize_bills_accounts_and_squashes() {
    txctx_test_support::init_logger!();

    let mut controller = TestController::new();
    controller.vm.default_net_usage_words = 4;

    let trx = single_action_transaction(7, 10, vec![9, 9]);
    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(7), TimePoint(0), None);

    ctx.init_for_input(&mut controller, None, true).unwrap();
    ctx.exec(&mut controller).unwrap();
    ctx.finalize(&mut controller).unwrap();
    ctx.squash();

    assert_eq!(controller.database.squashed_count(), 1);
    assert_eq!(controller.resource_limits.transaction_usage.len(), 1);
    let (accounts, cpu, net, _slot) = &controller.resource_limits.transaction_usage[0];
    assert_eq!(accounts, &vec![account(7)]);
    assert!(*cpu >= controller.config.min_transaction_cpu_usage);
    assert!(net.0 > 0);
}

#[test]
fn exec_before_init_fails_with_defect() {
    let mut controller = TestController::new();
    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(8), TimePoint(0), None);

    let err = ctx.exec(&mut controller).unwrap_err();
    assert_matches!(err, TxException::Defect(_));
}

#[test]
fn double_init_fails_with_defect() {
    let mut controller = TestController::new();
    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(9), TimePoint(0), None);

    ctx.init_for_input(&mut controller, None, true).unwrap();
    let err = ctx.init_for_input(&mut controller, None, true).unwrap_err();
    assert_matches!(err, TxException::Defect(_));
}

#[test]
fn failed_exec_still_records_a_trace_entry_and_undo_is_caller_responsibility() {
    let mut controller = TestController::new();
    controller
        .vm
        .handlers_fail_for_testing(account(10), account(0));

    let trx = single_action_transaction(1, 10, vec![]);
    let mut ctx: TransactionContext<TestController> =
        TransactionContext::new(trx, trx_id(10), TimePoint(0), None);
    ctx.init_for_input(&mut controller, None, true).unwrap();

    let err = ctx.exec(&mut controller).unwrap_err();
    assert_matches!(err, TxException::EosioAssertMessage(_));
    assert_eq!(ctx.trace.action_traces.len(), 1);
    assert!(ctx.trace.action_traces[0].except.is_some());

    ctx.undo();
    assert_eq!(controller.database.undone_count(), 1);
}
