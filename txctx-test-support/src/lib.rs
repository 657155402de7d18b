pub mod builders;
pub mod diagnostics;
pub mod fixture;

pub use builders::{account, action, auth, header, single_action_transaction, transaction};
pub use fixture::{
    default_config, TestAuthorizationManager, TestController, TestDatabase,
    TestResourceLimits, TestSerializer, TestSession, TestVm,
};
