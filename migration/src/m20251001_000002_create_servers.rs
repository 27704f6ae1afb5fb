use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Servers::Table)
          .if_not_exists()
          .col(ColumnDef::new(Servers::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Servers::Name).string().not_null())
          .col(ColumnDef::new(Servers::Country).string().not_null())
          .col(ColumnDef::new(Servers::City).string().not_null())
          .col(ColumnDef::new(Servers::Host).string().not_null())
          .col(ColumnDef::new(Servers::Port).integer().not_null())
          .col(
            ColumnDef::new(Servers::Status)
              .string()
              .not_null()
              .default("online"),
          )
          .col(
            ColumnDef::new(Servers::Speed)
              .string()
              .not_null()
              .default("medium"),
          )
          .col(ColumnDef::new(Servers::Users).integer().not_null().default(0))
          .col(
            ColumnDef::new(Servers::MaxUsers).integer().not_null().default(100),
          )
          .col(
            ColumnDef::new(Servers::Bandwidth)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Servers::IsActive).boolean().not_null().default(true),
          )
          .col(ColumnDef::new(Servers::AccessKey).string().null())
          .col(ColumnDef::new(Servers::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Servers::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Servers {
  Table,
  Id,
  Name,
  Country,
  City,
  Host,
  Port,
  Status,
  Speed,
  Users,
  MaxUsers,
  Bandwidth,
  IsActive,
  AccessKey,
  CreatedAt,
}
