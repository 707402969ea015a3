use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named sequence counter.
///
/// One row per series (lead, quote, invoice numbers). Rows are pre-seeded at
/// startup and only ever mutated by the sequence service, under a row lock
/// inside the transaction that consumes the minted value.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub current_value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
