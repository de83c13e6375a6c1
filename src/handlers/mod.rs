pub mod payment;
pub mod subscription;
pub mod webhook;

pub use payment::payment_config;
pub use subscription::subscription_config;
pub use webhook::webhook_config;
