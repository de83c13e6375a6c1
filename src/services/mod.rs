pub mod payment_ledger;
pub mod payment_service;
pub mod subscription_service;

pub use payment_ledger::*;
pub use payment_service::*;
pub use subscription_service::*;
