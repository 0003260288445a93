pub mod jwt;
pub mod signature;

pub use jwt::*;
pub use signature::{sign_hex, verify_hex};
