pub use sea_orm_migration::prelude::*;

mod m20121115_000001_create_measure_filters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20121115_000001_create_measure_filters::Migration)]
    }
}
