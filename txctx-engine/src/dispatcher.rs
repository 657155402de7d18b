//! Pushes a single action through the virtual machine, bills the net usage
//! its receipt reports, and recurses into any inline actions it sent.
//! Implements spec.md §4.4.
//!
//! `dispatch_action` always appends a trace entry for `action` to the
//! transaction's trace — on both the success and failure path, mirroring
//! `chain/transaction_context.go`'s `DispatchAction`, which assigns
//! `*trace = applyContext.Trace` both inside its `Catch` handler and after
//! the `Try` block returns normally.

use txctx_core::primitives::Bytes;
use txctx_core::trace::ActionTrace;
use txctx_core::tx::Action;
use txctx_core::{ChainController, TxException, TxResult, VirtualMachine};

use crate::context::TransactionContext;

/// Dispatches `action` and everything it sends inline, returning its own
/// trace with child traces nested under `inline_traces`. Does not write
/// into the transaction-wide trace itself; `dispatch_action` does that once,
/// at the top of the recursion, so a failure deep in an inline chain still
/// surfaces as exactly one new entry in `ctx.trace.action_traces`.
fn dispatch_one<C: ChainController>(
    ctx: &mut TransactionContext<C>,
    controller: &mut C,
    action: &Action,
    context_free: bool,
    recurse_depth: u32,
) -> TxResult<ActionTrace> {
    ctx.check_time(controller)?;
    if recurse_depth > controller.configuration().max_inline_action_depth {
        return Err(TxException::Defect(
            "inline action recursion depth exceeded",
        ));
    }

    let receiver = action.account;
    let (mut trace, inline_actions) =
        controller
            .vm_mut()
            .exec(action, receiver, context_free, recurse_depth)?;
    trace.receiver = receiver;
    trace.context_free = context_free;

    if let Some(receipt) = trace.receipt.as_ref() {
        let billed = Bytes(receipt.net_usage_words.saturating_mul(8));
        ctx.add_net_usage(controller, billed)?;
    }

    for child in &inline_actions {
        let child_trace = dispatch_one(ctx, controller, child, false, recurse_depth + 1)?;
        trace.inline_traces.push(child_trace);
    }

    Ok(trace)
}

/// Top-level entry point used by `exec` and the deferred scheduler's
/// re-execution path (once implemented by the embedding node). Always
/// leaves a trace entry behind, whether `action` (or one of its inline
/// descendants) succeeded or failed.
pub fn dispatch_action<C: ChainController>(
    ctx: &mut TransactionContext<C>,
    controller: &mut C,
    action: &Action,
    context_free: bool,
    recurse_depth: u32,
) -> TxResult<()> {
    match dispatch_one(ctx, controller, action, context_free, recurse_depth) {
        Ok(trace) => {
            ctx.trace.push_action(trace);
            Ok(())
        }
        Err(err) => {
            let trace = ActionTrace {
                receiver: action.account,
                context_free,
                except: Some(err.name().to_string()),
                ..ActionTrace::default()
            };
            ctx.trace.push_action(trace);
            Err(err)
        }
    }
}
