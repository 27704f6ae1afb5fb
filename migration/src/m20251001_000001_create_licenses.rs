use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Licenses::Table)
          .if_not_exists()
          .col(ColumnDef::new(Licenses::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Licenses::Key).string().not_null())
          .col(ColumnDef::new(Licenses::Email).string().not_null())
          .col(
            ColumnDef::new(Licenses::Plan)
              .string()
              .not_null()
              .default("monthly"),
          )
          .col(ColumnDef::new(Licenses::PriceCents).integer().not_null())
          .col(
            ColumnDef::new(Licenses::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .col(ColumnDef::new(Licenses::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Licenses::ExpiresAt).date_time().not_null())
          .col(ColumnDef::new(Licenses::PaymentRef).string().null())
          .to_owned(),
      )
      .await?;

    // uniqueness of issued keys is enforced here, not by the generator
    manager
      .create_index(
        Index::create()
          .name("idx_licenses_key")
          .table(Licenses::Table)
          .col(Licenses::Key)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_payment_ref")
          .table(Licenses::Table)
          .col(Licenses::PaymentRef)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Licenses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Licenses {
  Table,
  Id,
  Key,
  Email,
  Plan,
  PriceCents,
  Status,
  CreatedAt,
  ExpiresAt,
  PaymentRef,
}
