use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_reference_tables::Migration),
            Box::new(m20240101_000002_create_purchase_request_tables::Migration),
            Box::new(m20240101_000003_create_assignment_actions_table::Migration),
            Box::new(m20240101_000004_create_notifications_table::Migration),
            Box::new(m20240101_000005_create_permissions_table::Migration),
        ]
    }
}

mod m20240101_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Departments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Departments::Name).string().not_null())
                        .col(ColumnDef::new(Departments::Description).string().null())
                        .col(
                            ColumnDef::new(Departments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(ColumnDef::new(Users::DepartmentId).uuid().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Category).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Devices::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Devices::Name).string().not_null())
                        .col(ColumnDef::new(Devices::DeviceType).string().not_null())
                        .col(ColumnDef::new(Devices::SerialNumber).string().null())
                        .col(ColumnDef::new(Devices::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Devices::AssignedTo).uuid().null())
                        .col(
                            ColumnDef::new(Devices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Incidents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Incidents::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Incidents::Title).string().not_null())
                        .col(ColumnDef::new(Incidents::Description).text().null())
                        .col(ColumnDef::new(Incidents::Severity).string_len(16).not_null())
                        .col(ColumnDef::new(Incidents::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Incidents::ReportedBy).uuid().null())
                        .col(
                            ColumnDef::new(Incidents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Projects::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Projects::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Projects::Name).string().not_null())
                        .col(ColumnDef::new(Projects::Description).text().null())
                        .col(ColumnDef::new(Projects::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Projects::DepartmentId).uuid().null())
                        .col(
                            ColumnDef::new(Projects::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Requests::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Requests::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Requests::Title).string().not_null())
                        .col(ColumnDef::new(Requests::Description).text().null())
                        .col(ColumnDef::new(Requests::RequesterId).uuid().null())
                        .col(ColumnDef::new(Requests::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Requests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Requests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Projects::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Incidents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Devices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Departments {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Role,
        DepartmentId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        Name,
        Category,
        Quantity,
        Location,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Devices {
        Table,
        Id,
        Name,
        DeviceType,
        SerialNumber,
        Status,
        AssignedTo,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Incidents {
        Table,
        Id,
        Title,
        Description,
        Severity,
        Status,
        ReportedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Projects {
        Table,
        Id,
        Name,
        Description,
        Status,
        DepartmentId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Requests {
        Table,
        Id,
        Title,
        Description,
        RequesterId,
        Status,
        CreatedAt,
    }
}

mod m20240101_000002_create_purchase_request_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_purchase_request_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::PrNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::Title).string().not_null())
                        .col(ColumnDef::new(PurchaseRequests::Description).text().null())
                        .col(ColumnDef::new(PurchaseRequests::RequesterId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseRequests::RequesterName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::DepartmentId).uuid().null())
                        .col(ColumnDef::new(PurchaseRequests::AssignedTo).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseRequests::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::Priority)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::DueDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::Notes).text().null())
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_purchase_requests_status", PurchaseRequests::Status),
                ("idx_purchase_requests_requester_id", PurchaseRequests::RequesterId),
                ("idx_purchase_requests_created_at", PurchaseRequests::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(PurchaseRequests::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(PrItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PrItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(PrItems::PrId).uuid().not_null())
                        .col(ColumnDef::new(PrItems::Name).string().not_null())
                        .col(ColumnDef::new(PrItems::Description).text().null())
                        .col(ColumnDef::new(PrItems::Category).string_len(16).not_null())
                        .col(ColumnDef::new(PrItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(PrItems::UnitPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrItems::TotalPrice)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrItems::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(PrItems::DeliveryStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrItems::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PrItems::AssignedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PrItems::Notes).text().null())
                        .col(
                            ColumnDef::new(PrItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PrItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pr_items_pr_id")
                                .from(PrItems::Table, PrItems::PrId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pr_items_pr_id")
                        .table(PrItems::Table)
                        .col(PrItems::PrId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PrStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrStatusHistory::PrId).uuid().not_null())
                        .col(ColumnDef::new(PrStatusHistory::PrItemId).uuid().null())
                        .col(
                            ColumnDef::new(PrStatusHistory::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrStatusHistory::ChangedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PrStatusHistory::ChangedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrStatusHistory::Remarks).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pr_status_history_pr_id")
                                .from(PrStatusHistory::Table, PrStatusHistory::PrId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrApprovals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PrApprovals::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(PrApprovals::PrId).uuid().not_null())
                        .col(ColumnDef::new(PrApprovals::ApproverId).uuid().not_null())
                        .col(ColumnDef::new(PrApprovals::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(PrApprovals::ApprovedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrApprovals::Remarks).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pr_approvals_pr_id")
                                .from(PrApprovals::Table, PrApprovals::PrId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrComments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PrComments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(PrComments::PrId).uuid().not_null())
                        .col(ColumnDef::new(PrComments::UserId).uuid().not_null())
                        .col(ColumnDef::new(PrComments::Comment).text().not_null())
                        .col(
                            ColumnDef::new(PrComments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pr_comments_pr_id")
                                .from(PrComments::Table, PrComments::PrId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PrAttachments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrAttachments::PrId).uuid().not_null())
                        .col(ColumnDef::new(PrAttachments::FileName).string().not_null())
                        .col(ColumnDef::new(PrAttachments::FileUrl).text().not_null())
                        .col(ColumnDef::new(PrAttachments::UploadedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PrAttachments::UploadedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pr_attachments_pr_id")
                                .from(PrAttachments::Table, PrAttachments::PrId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PrAttachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PrComments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PrApprovals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PrStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PrItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    pub(super) enum PurchaseRequests {
        Table,
        Id,
        PrNumber,
        Title,
        Description,
        RequesterId,
        RequesterName,
        DepartmentId,
        AssignedTo,
        Status,
        Priority,
        TotalAmount,
        CreatedAt,
        UpdatedAt,
        DueDate,
        Notes,
    }

    #[derive(DeriveIden)]
    pub(super) enum PrItems {
        Table,
        Id,
        PrId,
        Name,
        Description,
        Category,
        Quantity,
        UnitPrice,
        TotalPrice,
        Status,
        DeliveryStatus,
        DeliveredAt,
        AssignedAt,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PrStatusHistory {
        Table,
        Id,
        PrId,
        PrItemId,
        Status,
        ChangedBy,
        ChangedAt,
        Remarks,
    }

    #[derive(DeriveIden)]
    enum PrApprovals {
        Table,
        Id,
        PrId,
        ApproverId,
        Status,
        ApprovedAt,
        Remarks,
    }

    #[derive(DeriveIden)]
    enum PrComments {
        Table,
        Id,
        PrId,
        UserId,
        Comment,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PrAttachments {
        Table,
        Id,
        PrId,
        FileName,
        FileUrl,
        UploadedBy,
        UploadedAt,
    }
}

mod m20240101_000003_create_assignment_actions_table {
    use super::m20240101_000002_create_purchase_request_tables::PrItems;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_assignment_actions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AssignmentActions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssignmentActions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssignmentActions::PrItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(AssignmentActions::ActionType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssignmentActions::TargetId).uuid().not_null())
                        .col(ColumnDef::new(AssignmentActions::AssignedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(AssignmentActions::AssignedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssignmentActions::Notes).text().null())
                        .col(
                            ColumnDef::new(AssignmentActions::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assignment_actions_pr_item_id")
                                .from(AssignmentActions::Table, AssignmentActions::PrItemId)
                                .to(PrItems::Table, PrItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assignment_actions_pr_item_id_assigned_at")
                        .table(AssignmentActions::Table)
                        .col(AssignmentActions::PrItemId)
                        .col(AssignmentActions::AssignedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssignmentActions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AssignmentActions {
        Table,
        Id,
        PrItemId,
        ActionType,
        TargetId,
        AssignedBy,
        AssignedAt,
        Notes,
        Status,
    }
}

mod m20240101_000004_create_notifications_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::Type).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Notifications::Category)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::RelatedId).uuid().null())
                        .col(
                            ColumnDef::new(Notifications::Read)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::ActionUrl).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_user_id_read")
                        .table(Notifications::Table)
                        .col(Notifications::UserId)
                        .col(Notifications::Read)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        Title,
        Message,
        Type,
        Category,
        RelatedId,
        Read,
        CreatedAt,
        ActionUrl,
    }
}

mod m20240101_000005_create_permissions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_permissions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Permissions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Permissions::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Permissions::Role).string_len(32).not_null())
                        .col(ColumnDef::new(Permissions::Resource).string_len(32).not_null())
                        .col(ColumnDef::new(Permissions::Action).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Permissions::Granted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_permissions_role_resource_action")
                        .table(Permissions::Table)
                        .col(Permissions::Role)
                        .col(Permissions::Resource)
                        .col(Permissions::Action)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Permissions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Permissions {
        Table,
        Id,
        Role,
        Resource,
        Action,
        Granted,
    }
}
