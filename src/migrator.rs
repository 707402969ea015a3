use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_members_table::Migration),
            Box::new(m20240101_000002_create_leads_table::Migration),
            Box::new(m20240101_000003_create_counters_table::Migration),
            Box::new(m20240101_000004_create_quotes_table::Migration),
            Box::new(m20240101_000005_create_quote_lines_table::Migration),
            Box::new(m20240101_000006_create_share_gp_table::Migration),
            Box::new(m20240101_000007_create_invoices_table::Migration),
            Box::new(m20240101_000008_create_invoice_lines_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_members_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_members_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Members::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Members::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Members::Name).string().not_null())
                        .col(ColumnDef::new(Members::Email).string().not_null())
                        .col(
                            ColumnDef::new(Members::IsAdmin)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Members::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_members_email")
                        .table(Members::Table)
                        .col(Members::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Members::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Members {
        Table,
        Id,
        Name,
        Email,
        IsAdmin,
        CreatedAt,
    }
}

mod m20240101_000002_create_leads_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_leads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Leads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Leads::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Leads::LeadNumber).string().not_null())
                        .col(ColumnDef::new(Leads::CustomerName).string().not_null())
                        .col(ColumnDef::new(Leads::CustomerEmail).string().null())
                        .col(ColumnDef::new(Leads::CustomerPhone).string().null())
                        .col(ColumnDef::new(Leads::AssignedMemberId).uuid().not_null())
                        .col(
                            ColumnDef::new(Leads::AssignedMemberName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Leads::Stage).string().not_null())
                        .col(ColumnDef::new(Leads::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Leads::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_leads_lead_number")
                        .table(Leads::Table)
                        .col(Leads::LeadNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_leads_assigned_member_id")
                        .table(Leads::Table)
                        .col(Leads::AssignedMemberId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_leads_stage")
                        .table(Leads::Table)
                        .col(Leads::Stage)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Leads::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Leads {
        Table,
        Id,
        LeadNumber,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        AssignedMemberId,
        AssignedMemberName,
        Stage,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_counters_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // One row per document series, locked FOR UPDATE while minting
            manager
                .create_table(
                    Table::create()
                        .table(Counters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Counters::Name)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Counters::CurrentValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Counters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Counters {
        Table,
        Name,
        CurrentValue,
    }
}

mod m20240101_000004_create_quotes_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_quotes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Quotes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Quotes::QuoteNumber).string().not_null())
                        .col(ColumnDef::new(Quotes::LeadId).uuid().not_null())
                        .col(ColumnDef::new(Quotes::CustomerName).string().not_null())
                        .col(ColumnDef::new(Quotes::CustomerEmail).string().null())
                        .col(ColumnDef::new(Quotes::SalespersonId).uuid().not_null())
                        .col(ColumnDef::new(Quotes::SalespersonName).string().not_null())
                        .col(ColumnDef::new(Quotes::Status).string().not_null())
                        .col(ColumnDef::new(Quotes::QuoteDate).timestamp().not_null())
                        .col(ColumnDef::new(Quotes::ValidUntil).date().null())
                        .col(
                            ColumnDef::new(Quotes::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::TotalCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Quotes::DiscountMode).string().not_null())
                        .col(
                            ColumnDef::new(Quotes::DiscountValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Quotes::TaxMode).string().not_null())
                        .col(
                            ColumnDef::new(Quotes::VatPercent)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::VatAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::GrandTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::GrossProfit)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Quotes::ProfitPercent)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Quotes::CreatedByType).string().not_null())
                        .col(ColumnDef::new(Quotes::CreatedById).uuid().not_null())
                        .col(ColumnDef::new(Quotes::ApprovedById).uuid().null())
                        .col(ColumnDef::new(Quotes::RejectionNote).string().null())
                        .col(ColumnDef::new(Quotes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Quotes::UpdatedAt).timestamp().null())
                        // lead_id is a plain reference; services resolve it
                        // with explicit lookups
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotes_quote_number")
                        .table(Quotes::Table)
                        .col(Quotes::QuoteNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotes_lead_id")
                        .table(Quotes::Table)
                        .col(Quotes::LeadId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotes_status")
                        .table(Quotes::Table)
                        .col(Quotes::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Quotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Quotes {
        Table,
        Id,
        QuoteNumber,
        LeadId,
        CustomerName,
        CustomerEmail,
        SalespersonId,
        SalespersonName,
        Status,
        QuoteDate,
        ValidUntil,
        Subtotal,
        TotalCost,
        DiscountMode,
        DiscountValue,
        DiscountAmount,
        TaxMode,
        VatPercent,
        VatAmount,
        GrandTotal,
        GrossProfit,
        ProfitPercent,
        CreatedByType,
        CreatedById,
        ApprovedById,
        RejectionNote,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_quote_lines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_quote_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(QuoteLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuoteLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QuoteLines::QuoteId).uuid().not_null())
                        .col(ColumnDef::new(QuoteLines::SlNo).integer().not_null())
                        .col(ColumnDef::new(QuoteLines::Product).string().not_null())
                        .col(ColumnDef::new(QuoteLines::Quantity).integer().not_null())
                        .col(ColumnDef::new(QuoteLines::UnitCost).decimal().not_null())
                        .col(
                            ColumnDef::new(QuoteLines::MarginPercent)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuoteLines::VatPercent)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(QuoteLines::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(QuoteLines::LineGross).decimal().not_null())
                        .col(
                            ColumnDef::new(QuoteLines::LineCostTotal)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuoteLines::LineTax)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(QuoteLines::LineGp).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quote_lines_quote_id")
                                .from(QuoteLines::Table, QuoteLines::QuoteId)
                                .to(Quotes::Table, Quotes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quote_lines_quote_id")
                        .table(QuoteLines::Table)
                        .col(QuoteLines::QuoteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuoteLines::Table).to_owned())
                .await
        }
    }

    use super::m20240101_000004_create_quotes_table::Quotes;

    #[derive(DeriveIden)]
    pub(super) enum QuoteLines {
        Table,
        Id,
        QuoteId,
        SlNo,
        Product,
        Quantity,
        UnitCost,
        MarginPercent,
        VatPercent,
        UnitPrice,
        LineGross,
        LineCostTotal,
        LineTax,
        LineGp,
    }
}

mod m20240101_000006_create_share_gp_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_share_gp_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShareGp::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ShareGp::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ShareGp::LeadId).uuid().not_null())
                        .col(ColumnDef::new(ShareGp::QuoteId).uuid().null())
                        .col(
                            ColumnDef::new(ShareGp::InitiatingMemberId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShareGp::SharedMemberId).uuid().not_null())
                        .col(ColumnDef::new(ShareGp::ProfitPercentage).decimal().null())
                        .col(ColumnDef::new(ShareGp::ProfitAmount).decimal().null())
                        .col(ColumnDef::new(ShareGp::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(ShareGp::UpdatedAt).timestamp().null())
                        // lead_id is a plain reference; services resolve it
                        // with explicit lookups
                        .to_owned(),
                )
                .await?;

            // One share row per (lead, collaborator) pair
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_share_gp_lead_shared_member")
                        .table(ShareGp::Table)
                        .col(ShareGp::LeadId)
                        .col(ShareGp::SharedMemberId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_share_gp_shared_member_id")
                        .table(ShareGp::Table)
                        .col(ShareGp::SharedMemberId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShareGp::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ShareGp {
        Table,
        Id,
        LeadId,
        QuoteId,
        InitiatingMemberId,
        SharedMemberId,
        ProfitPercentage,
        ProfitAmount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000007_create_invoices_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_invoices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Invoices::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Invoices::InvoiceNumber).string().not_null())
                        .col(ColumnDef::new(Invoices::QuoteId).uuid().null())
                        .col(ColumnDef::new(Invoices::CustomerName).string().not_null())
                        .col(ColumnDef::new(Invoices::CustomerEmail).string().null())
                        .col(ColumnDef::new(Invoices::SalespersonId).uuid().not_null())
                        .col(
                            ColumnDef::new(Invoices::SalespersonName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::VatAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Invoices::GrandTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Invoices::Status).string().not_null())
                        .col(ColumnDef::new(Invoices::PaidAt).timestamp().null())
                        .col(ColumnDef::new(Invoices::CreatedByType).string().not_null())
                        .col(ColumnDef::new(Invoices::CreatedById).uuid().not_null())
                        .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Invoices::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_invoice_number")
                        .table(Invoices::Table)
                        .col(Invoices::InvoiceNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Source of truth for "one invoice per quote": the partial NULLs
            // are allowed, any concrete quote id at most once
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_quote_id")
                        .table(Invoices::Table)
                        .col(Invoices::QuoteId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_status")
                        .table(Invoices::Table)
                        .col(Invoices::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Invoices {
        Table,
        Id,
        InvoiceNumber,
        QuoteId,
        CustomerName,
        CustomerEmail,
        SalespersonId,
        SalespersonName,
        Subtotal,
        DiscountAmount,
        VatAmount,
        GrandTotal,
        Status,
        PaidAt,
        CreatedByType,
        CreatedById,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000008_create_invoice_lines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_invoice_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InvoiceLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InvoiceLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceLines::InvoiceId).uuid().not_null())
                        .col(ColumnDef::new(InvoiceLines::SlNo).integer().not_null())
                        .col(ColumnDef::new(InvoiceLines::Product).string().not_null())
                        .col(ColumnDef::new(InvoiceLines::Quantity).integer().not_null())
                        .col(ColumnDef::new(InvoiceLines::UnitCost).decimal().not_null())
                        .col(
                            ColumnDef::new(InvoiceLines::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::LineGross)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::TaxAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::LineTotal)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_lines_invoice_id")
                                .from(InvoiceLines::Table, InvoiceLines::InvoiceId)
                                .to(Invoices::Table, Invoices::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoice_lines_invoice_id")
                        .table(InvoiceLines::Table)
                        .col(InvoiceLines::InvoiceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InvoiceLines::Table).to_owned())
                .await
        }
    }

    use super::m20240101_000007_create_invoices_table::Invoices;

    #[derive(DeriveIden)]
    pub(super) enum InvoiceLines {
        Table,
        Id,
        InvoiceId,
        SlNo,
        Product,
        Quantity,
        UnitCost,
        UnitPrice,
        LineGross,
        TaxAmount,
        LineTotal,
    }
}
