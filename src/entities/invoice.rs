use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// An immutable billing document, either converted from an accepted quote or
/// created manually. At most one invoice may reference a given quote; the
/// unique index on `quote_id` is the source of truth under races.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: String,
    #[sea_orm(unique)]
    pub quote_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
    pub status: String,
    pub paid_at: Option<DateTimeUtc>,
    pub created_by_type: String,
    pub created_by_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice_line::Entity")]
    InvoiceLines,
}

impl Related<super::invoice_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
    Overdue,
}

impl InvoiceStatus {
    /// Paid and Cancelled admit no further transition of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Valid lifecycle moves out of this status.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, next) {
            (Draft, Sent) | (Draft, Cancelled) => true,
            (Sent, Paid) | (Sent, Cancelled) | (Sent, Overdue) => true,
            (Overdue, Paid) | (Overdue, Cancelled) => true,
            _ => false,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}
