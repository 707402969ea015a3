use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single priced line of a quote. Lines are owned by their quote and are
/// replaced wholesale whenever the quote is re-priced.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quote_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub quote_id: Uuid,
    pub sl_no: i32,
    pub product: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub margin_percent: Decimal,
    pub vat_percent: Decimal,
    pub unit_price: Decimal,
    pub line_gross: Decimal,
    pub line_cost_total: Decimal,
    pub line_tax: Decimal,
    pub line_gp: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote::Entity",
        from = "Column::QuoteId",
        to = "super::quote::Column::Id"
    )]
    Quote,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
