pub mod common;
pub mod payment;
pub mod subscription;

pub use common::*;
pub use payment::*;
pub use subscription::*;
