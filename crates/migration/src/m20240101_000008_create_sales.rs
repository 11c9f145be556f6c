//! Create order, shipment, return request and recurring payment tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(integer(Orders::CustomerId))
                    .col(double(Orders::OrderTotal))
                    .col(string_len(Orders::OrderStatus, 20))
                    .col(string_len(Orders::ShippingStatus, 30))
                    .col(timestamp_with_time_zone(Orders::CreatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_customer")
                            .from(Orders::Table, Orders::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Shipment::Table)
                    .if_not_exists()
                    .col(pk_auto(Shipment::Id))
                    .col(integer(Shipment::OrderId))
                    .col(string_len_null(Shipment::TrackingNumber, 100))
                    .col(double_null(Shipment::TotalWeight))
                    .col(timestamp_with_time_zone_null(Shipment::ShippedDateUtc))
                    .col(timestamp_with_time_zone_null(Shipment::DeliveryDateUtc))
                    .col(timestamp_with_time_zone(Shipment::CreatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipment_order")
                            .from(Shipment::Table, Shipment::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReturnRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(ReturnRequest::Id))
                    .col(integer(ReturnRequest::OrderId))
                    .col(integer(ReturnRequest::CustomerId))
                    .col(integer(ReturnRequest::Quantity))
                    .col(string_len(ReturnRequest::ReasonForReturn, 400))
                    .col(string_len(ReturnRequest::RequestedAction, 400))
                    .col(text_null(ReturnRequest::CustomerComments))
                    .col(text_null(ReturnRequest::StaffNotes))
                    .col(string_len(ReturnRequest::Status, 30))
                    .col(timestamp_with_time_zone(ReturnRequest::CreatedOnUtc))
                    .col(timestamp_with_time_zone(ReturnRequest::UpdatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_request_order")
                            .from(ReturnRequest::Table, ReturnRequest::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringPayment::Table)
                    .if_not_exists()
                    .col(pk_auto(RecurringPayment::Id))
                    .col(integer(RecurringPayment::InitialOrderId))
                    .col(integer(RecurringPayment::CycleLength))
                    .col(string_len(RecurringPayment::CyclePeriod, 10))
                    .col(integer(RecurringPayment::TotalCycles))
                    .col(timestamp_with_time_zone(RecurringPayment::StartDateUtc))
                    .col(boolean(RecurringPayment::IsActive))
                    .col(boolean(RecurringPayment::Deleted))
                    .col(timestamp_with_time_zone(RecurringPayment::CreatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_payment_order")
                            .from(RecurringPayment::Table, RecurringPayment::InitialOrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringPaymentHistory::Table)
                    .if_not_exists()
                    .col(pk_auto(RecurringPaymentHistory::Id))
                    .col(integer(RecurringPaymentHistory::RecurringPaymentId))
                    .col(integer_null(RecurringPaymentHistory::OrderId))
                    .col(timestamp_with_time_zone(RecurringPaymentHistory::CreatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_history_payment")
                            .from(RecurringPaymentHistory::Table, RecurringPaymentHistory::RecurringPaymentId)
                            .to(RecurringPayment::Table, RecurringPayment::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(RecurringPaymentHistory::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(RecurringPayment::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ReturnRequest::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Shipment::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Orders { Table, Id, CustomerId, OrderTotal, OrderStatus, ShippingStatus, CreatedOnUtc }

#[derive(DeriveIden)]
enum Shipment { Table, Id, OrderId, TrackingNumber, TotalWeight, ShippedDateUtc, DeliveryDateUtc, CreatedOnUtc }

#[derive(DeriveIden)]
enum ReturnRequest {
    Table,
    Id,
    OrderId,
    CustomerId,
    Quantity,
    ReasonForReturn,
    RequestedAction,
    CustomerComments,
    StaffNotes,
    Status,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum RecurringPayment {
    Table,
    Id,
    InitialOrderId,
    CycleLength,
    CyclePeriod,
    TotalCycles,
    StartDateUtc,
    IsActive,
    Deleted,
    CreatedOnUtc,
}

#[derive(DeriveIden)]
enum RecurringPaymentHistory { Table, Id, RecurringPaymentId, OrderId, CreatedOnUtc }

#[derive(DeriveIden)]
enum Customer { Table, Id }
