use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profit-sharing ledger entry: a lead's gross profit is split with a
/// collaborating member. At most one row per (lead, shared member) pair,
/// enforced by a unique index. The quote reference is weak: a lead may be
/// shared before any quote exists.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "share_gp")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lead_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub initiating_member_id: Uuid,
    pub shared_member_id: Uuid,
    pub profit_percentage: Option<Decimal>,
    pub profit_amount: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
