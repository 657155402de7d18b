//! Minimal transaction/action model. Canonical wire serialization and
//! signature verification are out of scope; this module gives the execution
//! core just enough shape to iterate actions, authorizations and header
//! limits.

use smallvec::SmallVec;

use crate::primitives::{AccountName, TimePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub [u8; 32]);

/// An `(actor, permission)` pair that must be backed by a signature on the
/// enclosing transaction (glossary: "Authorization").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthorizationLevel {
    pub actor: AccountName,
    pub permission: AccountName,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub account: AccountName,
    pub name: AccountName,
    pub authorization: SmallVec<[AuthorizationLevel; 1]>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionHeader {
    pub expiration: TimePoint,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    /// 0 means "no explicit cap": the block/config caps alone bind.
    pub max_net_usage_words: u32,
    /// 0 means "no explicit cap".
    pub max_cpu_usage_ms: u32,
    pub delay_sec: u32,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// The actor on the first authorization of the first action, used as
    /// the RAM payer for a deferred transaction's generated-transaction
    /// record.
    pub fn first_authorizer(&self) -> Option<AccountName> {
        self.actions
            .iter()
            .find_map(|act| act.authorization.first())
            .map(|auth| auth.actor)
    }

    /// Deduplicated `(actor)` set across every action's authorizations,
    /// first-seen order preserved.
    pub fn bill_to_accounts(&self) -> Vec<AccountName> {
        let mut seen = SmallVec::<[AccountName; 4]>::new();
        let mut out = Vec::new();
        for act in &self.actions {
            for auth in &act.authorization {
                if !seen.contains(&auth.actor) {
                    seen.push(auth.actor);
                    out.push(auth.actor);
                }
            }
        }
        out
    }
}
