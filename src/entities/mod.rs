pub mod gateway_orders;
pub mod penalties;
pub mod recharges;
pub mod transaction_entries;
pub mod wallet_requests;
pub mod wallets;

pub use gateway_orders as gateway_order_entity;
pub use penalties as penalty_entity;
pub use recharges as recharge_entity;
pub use transaction_entries as transaction_entry_entity;
pub use wallet_requests as wallet_request_entity;
pub use wallets as wallet_entity;

pub use gateway_orders::{GatewayOrderStatus, SettledVia};
pub use recharges::RechargeStatus;
pub use transaction_entries::{CashbackState, EntryStatus, EntryType};
pub use wallet_requests::{WalletRequestStatus, WalletRequestType};
