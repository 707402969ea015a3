//! Profit-sharing ledger: which collaborating member receives what share of a
//! lead's gross profit.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{
    lead::Entity as LeadEntity,
    member::Entity as MemberEntity,
    share_gp::{self, Entity as ShareGpEntity},
};
use crate::errors::ServiceError;
use crate::services::pricing::{round_money, round_percent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLeadCommand {
    pub lead_id: Uuid,
    pub initiating_member_id: Uuid,
    pub shared_member_id: Uuid,
    pub profit_percentage: Option<Decimal>,
    pub profit_amount: Option<Decimal>,
    pub quote_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct ProfitSharingService {
    db: Arc<DatabaseConnection>,
}

impl ProfitSharingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records that a lead's profit is shared with another member.
    ///
    /// Fails with a conflict if the pair is already recorded; an existing
    /// row is never silently updated here. The unique index on
    /// (lead_id, shared_member_id) backs the check under concurrency.
    #[instrument(skip(self, cmd), fields(lead_id = %cmd.lead_id, shared_member_id = %cmd.shared_member_id))]
    pub async fn share(&self, cmd: ShareLeadCommand) -> Result<share_gp::Model, ServiceError> {
        if cmd.shared_member_id == cmd.initiating_member_id {
            return Err(ServiceError::ValidationError(
                "a lead cannot be shared with its own initiator".to_string(),
            ));
        }
        if let Some(pct) = cmd.profit_percentage {
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                return Err(ServiceError::ValidationError(
                    "profit percentage must be between 0 and 100".to_string(),
                ));
            }
        }

        let db = &*self.db;

        LeadEntity::find_by_id(cmd.lead_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lead {} not found", cmd.lead_id)))?;

        MemberEntity::find_by_id(cmd.shared_member_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Member {} not found", cmd.shared_member_id))
            })?;

        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = ShareGpEntity::find()
            .filter(share_gp::Column::LeadId.eq(cmd.lead_id))
            .filter(share_gp::Column::SharedMemberId.eq(cmd.shared_member_id))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "lead {} is already shared with member {}",
                cmd.lead_id, cmd.shared_member_id
            )));
        }

        let now = chrono::Utc::now();
        let row = share_gp::ActiveModel {
            id: Set(Uuid::new_v4()),
            lead_id: Set(cmd.lead_id),
            quote_id: Set(cmd.quote_id),
            initiating_member_id: Set(cmd.initiating_member_id),
            shared_member_id: Set(cmd.shared_member_id),
            profit_percentage: Set(cmd.profit_percentage.map(round_percent)),
            profit_amount: Set(cmd.profit_amount.map(round_money)),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = row.insert(&txn).await.map_err(|e| {
            ServiceError::conflict_on_unique(
                e,
                format!(
                    "lead {} is already shared with member {}",
                    cmd.lead_id, cmd.shared_member_id
                ),
            )
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(share_id = %model.id, "profit share recorded");

        Ok(model)
    }

    /// Attaches a priced quote to every ledger row of its lead, overwriting
    /// percentage and the computed monetary amount. This is the one place an
    /// existing ledger row is mutated rather than created. Runs inside the
    /// caller's transaction so a failed quote creation rolls it back too.
    pub async fn attach_quote(
        &self,
        txn: &DatabaseTransaction,
        lead_id: Uuid,
        quote_id: Uuid,
        percentage: Option<Decimal>,
        gross_profit: Decimal,
    ) -> Result<u64, ServiceError> {
        let rows = ShareGpEntity::find()
            .filter(share_gp::Column::LeadId.eq(lead_id))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut updated = 0;
        for row in rows {
            let pct = percentage.or(row.profit_percentage);
            let amount = pct.map(|p| round_money(gross_profit * p / Decimal::ONE_HUNDRED));

            let mut active: share_gp::ActiveModel = row.into();
            active.quote_id = Set(Some(quote_id));
            active.profit_percentage = Set(pct.map(round_percent));
            active.profit_amount = Set(amount);
            active.updated_at = Set(Some(chrono::Utc::now()));
            active.update(txn).await.map_err(ServiceError::db_error)?;
            updated += 1;
        }

        Ok(updated)
    }

    /// All ledger rows for a lead.
    pub async fn shares_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<share_gp::Model>, ServiceError> {
        ShareGpEntity::find()
            .filter(share_gp::Column::LeadId.eq(lead_id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
