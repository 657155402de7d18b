//! The transaction execution core: limit envelope builder, billing timer,
//! action dispatcher, deferred-transaction scheduler, and the
//! `TransactionContext` façade that ties them together over the
//! collaborator traits defined in `txctx-core`.

pub mod billing_timer;
pub mod checks;
pub mod context;
pub mod deferred;
pub mod dispatcher;
pub mod limits;

pub use billing_timer::BillingTimer;
pub use context::TransactionContext;
pub use deferred::GENERATED_TRANSACTION_RECORD_OVERHEAD;
pub use limits::{build_envelope, validate_cpu_usage_to_bill, LimitEnvelope, PayerAffordance};
