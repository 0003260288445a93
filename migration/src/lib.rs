pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_wallet_ledger;
mod m20250901_000002_create_wallet_requests;
mod m20250903_000001_create_gateway_orders;
mod m20250910_000001_create_penalties_and_recharges;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_wallet_ledger::Migration),
            Box::new(m20250901_000002_create_wallet_requests::Migration),
            Box::new(m20250903_000001_create_gateway_orders::Migration),
            Box::new(m20250910_000001_create_penalties_and_recharges::Migration),
        ]
    }
}
