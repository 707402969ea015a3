use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// A priced proposal for a lead.
///
/// Pricing columns always satisfy:
/// `grand_total = (subtotal - discount_amount) + vat_amount` and
/// `gross_profit = (subtotal - discount_amount) - total_cost`,
/// to 2 decimal places.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub quote_number: String,
    pub lead_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub status: String,
    pub quote_date: DateTimeUtc,
    pub valid_until: Option<Date>,
    pub subtotal: Decimal,
    pub total_cost: Decimal,
    pub discount_mode: String,
    pub discount_value: Decimal,
    pub discount_amount: Decimal,
    pub tax_mode: String,
    pub vat_percent: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
    pub gross_profit: Decimal,
    pub profit_percent: Decimal,
    pub created_by_type: String,
    pub created_by_id: Uuid,
    pub approved_by_id: Option<Uuid>,
    pub rejection_note: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quote_line::Entity")]
    QuoteLines,
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
}

impl Related<super::quote_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuoteLines.def()
    }
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum QuoteStatus {
    Draft,
    PendingApproval,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Terminal for approval decisions: once here, no approve/reject may be
    /// applied.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Expired
        )
    }

    /// Whether the quote's line set may still be replaced and re-priced.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Draft | QuoteStatus::PendingApproval | QuoteStatus::Sent
        )
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}
