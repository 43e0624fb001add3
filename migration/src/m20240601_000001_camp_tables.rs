use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 campers 表
        manager
            .create_table(
                Table::create()
                    .table(Camper::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Camper::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Camper::FirstName).string().not_null())
                    .col(ColumnDef::new(Camper::LastName).string().not_null())
                    .col(ColumnDef::new(Camper::BirthDate).date().null())
                    .col(ColumnDef::new(Camper::Cabin).string().null())
                    .col(ColumnDef::new(Camper::Address).text().null())
                    .col(ColumnDef::new(Camper::GuardianName).string().null())
                    .col(ColumnDef::new(Camper::GuardianPhone).string().null())
                    .col(ColumnDef::new(Camper::GuardianEmail).string().null())
                    .col(ColumnDef::new(Camper::Notes).text().null())
                    .col(
                        ColumnDef::new(Camper::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Camper::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 care_data 表（与 campers 一对一）
        manager
            .create_table(
                Table::create()
                    .table(CareData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CareData::CamperId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CareData::InsulinType).string().null())
                    .col(ColumnDef::new(CareData::DeliveryMethod).string().null())
                    .col(ColumnDef::new(CareData::TargetBgLow).integer().null())
                    .col(ColumnDef::new(CareData::TargetBgHigh).integer().null())
                    .col(ColumnDef::new(CareData::CarbRatio).double().null())
                    .col(ColumnDef::new(CareData::CorrectionFactor).double().null())
                    .col(ColumnDef::new(CareData::LongActingUnits).double().null())
                    .col(ColumnDef::new(CareData::Allergies).text().null())
                    .col(ColumnDef::new(CareData::Medications).text().null())
                    .col(ColumnDef::new(CareData::Notes).text().null())
                    .col(
                        ColumnDef::new(CareData::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_care_data_camper")
                            .from(CareData::Table, CareData::CamperId)
                            .to(Camper::Table, Camper::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 volunteers 表
        manager
            .create_table(
                Table::create()
                    .table(Volunteer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Volunteer::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Volunteer::FirstName).string().not_null())
                    .col(ColumnDef::new(Volunteer::LastName).string().not_null())
                    .col(ColumnDef::new(Volunteer::Role).string().null())
                    .col(ColumnDef::new(Volunteer::Email).string().null())
                    .col(ColumnDef::new(Volunteer::Phone).string().null())
                    .col(
                        ColumnDef::new(Volunteer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Volunteer::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按姓名排序的查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campers_name")
                    .table(Camper::Table)
                    .col(Camper::LastName)
                    .col(Camper::FirstName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_volunteers_name")
                    .table(Volunteer::Table)
                    .col(Volunteer::LastName)
                    .col(Volunteer::FirstName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_volunteers_name").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_campers_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Volunteer::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CareData::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Camper::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Camper {
    #[sea_orm(iden = "campers")]
    Table,
    Id,
    FirstName,
    LastName,
    BirthDate,
    Cabin,
    Address,
    GuardianName,
    GuardianPhone,
    GuardianEmail,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CareData {
    #[sea_orm(iden = "care_data")]
    Table,
    CamperId,
    InsulinType,
    DeliveryMethod,
    TargetBgLow,
    TargetBgHigh,
    CarbRatio,
    CorrectionFactor,
    LongActingUnits,
    Allergies,
    Medications,
    Notes,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Volunteer {
    #[sea_orm(iden = "volunteers")]
    Table,
    Id,
    FirstName,
    LastName,
    Role,
    Email,
    Phone,
    CreatedAt,
    UpdatedAt,
}
