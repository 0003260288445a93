pub mod commission_service;
pub mod gateway_service;
pub mod ledger_service;
pub mod penalty_service;
pub mod recharge_service;
pub mod wallet_request_service;
pub mod wallet_service;

pub use commission_service::*;
pub use gateway_service::*;
pub use ledger_service::*;
pub use penalty_service::*;
pub use recharge_service::*;
pub use wallet_request_service::*;
pub use wallet_service::*;
