pub mod collaborators;
pub mod config;
pub mod error;
pub mod persisted;
pub mod primitives;
pub mod trace;
pub mod tx;

pub use collaborators::{
    AuthorizationManager, ChainController, ResourceLimitsManager, Session, TransactionSerializer,
    UndoDatabase, VirtualMachine,
};
pub use config::ProtocolConfiguration;
pub use error::{CpuCapKind, DeadlineExceptionKind, NetLimitExceededKind, TxException, TxResult};
pub use persisted::{GeneratedTransactionRecord, TransactionDedupRecord};
pub use primitives::{AccountName, Bytes, Microseconds, TimePoint};
pub use trace::{ActionReceipt, ActionTrace, TransactionTrace};
pub use tx::{Action, AuthorizationLevel, Transaction, TransactionHeader, TransactionId};
