use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 志愿者 -> 营员 分配表，camper_ids 为逗号拼接的 ID 列表
        manager
            .create_table(
                Table::create()
                    .table(VolunteerAssignment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VolunteerAssignment::VolunteerId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VolunteerAssignment::CamperIds)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(VolunteerAssignment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VolunteerAssignment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VolunteerAssignment {
    #[sea_orm(iden = "volunteer_assignments")]
    Table,
    VolunteerId,
    CamperIds,
    UpdatedAt,
}
