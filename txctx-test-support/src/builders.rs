//! Small convenience constructors for `Transaction`/`Action` values, so
//! tests don't have to hand-write every field of the wire model each time.

use smallvec::smallvec;

use txctx_core::primitives::{AccountName, TimePoint};
use txctx_core::tx::{Action, AuthorizationLevel, Transaction, TransactionHeader};

pub fn account(id: u64) -> AccountName {
    AccountName(id)
}

pub fn auth(actor: u64, permission: u64) -> AuthorizationLevel {
    AuthorizationLevel {
        actor: account(actor),
        permission: account(permission),
    }
}

pub fn action(account_id: u64, name_id: u64, actor: u64, data: Vec<u8>) -> Action {
    Action {
        account: account(account_id),
        name: account(name_id),
        authorization: smallvec![auth(actor, account_id)],
        data,
    }
}

pub fn header() -> TransactionHeader {
    TransactionHeader {
        expiration: TimePoint(1_000_000),
        ref_block_num: 1,
        ref_block_prefix: 1,
        max_net_usage_words: 0,
        max_cpu_usage_ms: 0,
        delay_sec: 0,
    }
}

pub fn transaction(actions: Vec<Action>) -> Transaction {
    Transaction {
        header: header(),
        context_free_actions: Vec::new(),
        actions,
    }
}

pub fn single_action_transaction(actor: u64, receiver: u64, data: Vec<u8>) -> Transaction {
    transaction(vec![action(receiver, 0, actor, data)])
}
