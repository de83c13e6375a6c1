pub mod robokassa;

pub use robokassa::*;
