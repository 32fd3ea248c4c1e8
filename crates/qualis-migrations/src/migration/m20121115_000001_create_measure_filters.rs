use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MeasureFilters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeasureFilters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MeasureFilters::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MeasureFilters::UserId).integer().null())
                    .col(ColumnDef::new(MeasureFilters::Shared).boolean().null())
                    .col(
                        ColumnDef::new(MeasureFilters::Description)
                            .string_len(4000)
                            .null(),
                    )
                    .col(ColumnDef::new(MeasureFilters::Data).text().null())
                    // Filled by the entity on save, rows written by other means may lack them
                    .col(
                        ColumnDef::new(MeasureFilters::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MeasureFilters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups by name are frequent, names are not unique
        manager
            .create_index(
                Index::create()
                    .name("measure_filters_name")
                    .table(MeasureFilters::Table)
                    .col(MeasureFilters::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("measure_filters_name")
                    .table(MeasureFilters::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MeasureFilters::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum MeasureFilters {
    Table,
    Id,
    Name,
    UserId,
    Shared,
    Description,
    Data,
    CreatedAt,
    UpdatedAt,
}
