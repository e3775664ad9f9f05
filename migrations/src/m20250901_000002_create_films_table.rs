use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Films::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Films::Title)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Films::Director).string().null())
                    .col(ColumnDef::new(Films::ReleaseYear).integer().null())
                    .col(
                        ColumnDef::new(Films::Price)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Films::Stock).integer().not_null().default(0))
                    .col(ColumnDef::new(Films::Description).text().null())
                    .col(ColumnDef::new(Films::Country).string().null())
                    .col(ColumnDef::new(Films::RuntimeMinutes).integer().null())
                    .col(ColumnDef::new(Films::Genres).json().not_null())
                    .col(ColumnDef::new(Films::ImageUrl).string().null())
                    .col(ColumnDef::new(Films::CriterionNumber).integer().null())
                    .col(ColumnDef::new(Films::Awards).json().not_null())
                    .col(ColumnDef::new(Films::Cast).json().not_null())
                    .col(ColumnDef::new(Films::Format).string().null())
                    .col(ColumnDef::new(Films::Language).string().null())
                    .col(
                        ColumnDef::new(Films::Featured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Films::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Films::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_films_featured")
                    .table(Films::Table)
                    .col(Films::Featured)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_films_created_at")
                    .table(Films::Table)
                    .col(Films::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Films::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Films {
    Table,
    Id,
    Title,
    Director,
    ReleaseYear,
    Price,
    Stock,
    Description,
    Country,
    RuntimeMinutes,
    Genres,
    ImageUrl,
    CriterionNumber,
    Awards,
    Cast,
    Format,
    Language,
    Featured,
    CreatedAt,
    UpdatedAt,
}
