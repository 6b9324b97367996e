use sea_orm_migration::prelude::*;

mod m20260810_create_accounts;
mod m20260812_create_security_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_create_accounts::Migration),
            Box::new(m20260812_create_security_events::Migration),
        ]
    }
}
