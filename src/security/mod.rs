pub mod nonce;

pub use nonce::{NonceGenerator, NonceRole, RequestNonces};
