pub mod common;
pub mod entry_metadata;
pub mod gateway;
pub mod pagination;
pub mod penalty;
pub mod recharge;
pub mod wallet;
pub mod wallet_request;

pub use common::*;
pub use entry_metadata::*;
pub use gateway::*;
pub use pagination::*;
pub use penalty::*;
pub use recharge::*;
pub use wallet::*;
pub use wallet_request::*;
