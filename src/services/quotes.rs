//! Quote creation, re-pricing, and the approval state machine.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    config::ApprovalPolicy,
    entities::{
        lead::Entity as LeadEntity,
        quote::{self, Entity as QuoteEntity, QuoteStatus},
        quote_line::{self, Entity as QuoteLineEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        pricing::{
            aggregate, compute_line, requires_approval, round_money, round_percent,
            validate_lines, DiscountMode, LineInput, LineTotals, TaxMode,
        },
        profit_sharing::ProfitSharingService,
        sequence::SequenceService,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuoteCommand {
    pub lead_id: Uuid,
    pub lines: Vec<LineInput>,
    pub discount_mode: DiscountMode,
    pub discount_value: Decimal,
    pub tax_mode: TaxMode,
    pub header_vat_percent: Decimal,
    pub valid_until: Option<NaiveDate>,
    /// Collaborator share of gross profit to attach to an already-shared
    /// lead's ledger rows, if any exist.
    pub share_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuoteLinesCommand {
    pub lines: Vec<LineInput>,
    pub discount_mode: DiscountMode,
    pub discount_value: Decimal,
    pub tax_mode: TaxMode,
    pub header_vat_percent: Decimal,
}

#[derive(Clone)]
pub struct QuoteService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceService,
    profit_sharing: ProfitSharingService,
    event_sender: EventSender,
    approval: ApprovalPolicy,
}

impl QuoteService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequences: SequenceService,
        profit_sharing: ProfitSharingService,
        event_sender: EventSender,
        approval: ApprovalPolicy,
    ) -> Self {
        Self {
            db,
            sequences,
            profit_sharing,
            event_sender,
            approval,
        }
    }

    /// Creates a priced quote for a lead.
    ///
    /// Mints the quote number, prices and aggregates the lines, runs the
    /// approval gate to pick the initial status, and attaches any existing
    /// profit shares, all in one transaction.
    #[instrument(skip(self, cmd), fields(lead_id = %cmd.lead_id))]
    pub async fn create_quote(
        &self,
        cmd: CreateQuoteCommand,
        actor: Actor,
    ) -> Result<quote::Model, ServiceError> {
        validate_lines(&cmd.lines)?;
        validate_header(&cmd.discount_value, &cmd.header_vat_percent, cmd.share_percent)?;

        let db = &*self.db;

        let lead = LeadEntity::find_by_id(cmd.lead_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lead {} not found", cmd.lead_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for quote creation");
            ServiceError::db_error(e)
        })?;

        let quote_number = self.sequences.next_quote_number(&txn).await?;

        let line_totals: Vec<LineTotals> = cmd.lines.iter().map(compute_line).collect();
        let totals = aggregate(
            &line_totals,
            cmd.discount_mode,
            cmd.discount_value,
            cmd.tax_mode,
            cmd.header_vat_percent,
        );

        let needs_approval = requires_approval(&cmd.lines, &actor, &self.approval);
        let status = if needs_approval {
            QuoteStatus::PendingApproval
        } else {
            QuoteStatus::Draft
        };

        let now = Utc::now();
        let quote_id = Uuid::new_v4();

        let header = quote::ActiveModel {
            id: Set(quote_id),
            quote_number: Set(quote_number.clone()),
            lead_id: Set(lead.id),
            customer_name: Set(lead.customer_name.clone()),
            customer_email: Set(lead.customer_email.clone()),
            salesperson_id: Set(lead.assigned_member_id),
            salesperson_name: Set(lead.assigned_member_name.clone()),
            status: Set(status.to_string()),
            quote_date: Set(now),
            valid_until: Set(cmd.valid_until),
            subtotal: Set(round_money(totals.subtotal)),
            total_cost: Set(round_money(totals.total_cost)),
            discount_mode: Set(cmd.discount_mode.to_string()),
            discount_value: Set(cmd.discount_value),
            discount_amount: Set(round_money(totals.discount_amount)),
            tax_mode: Set(cmd.tax_mode.to_string()),
            vat_percent: Set(cmd.header_vat_percent),
            vat_amount: Set(round_money(totals.vat_amount)),
            grand_total: Set(round_money(totals.grand_total)),
            gross_profit: Set(round_money(totals.gross_profit)),
            profit_percent: Set(round_percent(totals.profit_percent)),
            created_by_type: Set(actor.kind().to_string()),
            created_by_id: Set(actor.id()),
            approved_by_id: Set(None),
            rejection_note: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = header.insert(&txn).await.map_err(ServiceError::db_error)?;

        insert_lines(&txn, quote_id, &cmd.lines, &line_totals).await?;

        self.profit_sharing
            .attach_quote(
                &txn,
                lead.id,
                quote_id,
                cmd.share_percent,
                round_money(totals.gross_profit),
            )
            .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quote_id = %quote_id, quote_number = %quote_number, status = %status, "quote created");

        if needs_approval {
            self.event_sender
                .notify(Event::QuoteSubmittedForApproval {
                    quote_id,
                    quote_number,
                    created_by: actor.id(),
                })
                .await;
        }

        Ok(model)
    }

    /// Replaces a quote's line set and re-prices the whole document.
    ///
    /// No partial patch semantics: old lines are deleted, new ones computed
    /// from scratch, and the approval gate re-runs (a previously approved
    /// draft can fall back to pending).
    #[instrument(skip(self, cmd), fields(quote_id = %quote_id))]
    pub async fn update_quote_lines(
        &self,
        quote_id: Uuid,
        cmd: UpdateQuoteLinesCommand,
        actor: Actor,
    ) -> Result<quote::Model, ServiceError> {
        validate_lines(&cmd.lines)?;
        validate_header(&cmd.discount_value, &cmd.header_vat_percent, None)?;

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let current = parse_quote_status(&existing.status)?;
        if !current.is_editable() {
            return Err(ServiceError::Conflict(format!(
                "quote {} cannot be edited in status {}",
                existing.quote_number, current
            )));
        }

        QuoteLineEntity::delete_many()
            .filter(quote_line::Column::QuoteId.eq(quote_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let line_totals: Vec<LineTotals> = cmd.lines.iter().map(compute_line).collect();
        let totals = aggregate(
            &line_totals,
            cmd.discount_mode,
            cmd.discount_value,
            cmd.tax_mode,
            cmd.header_vat_percent,
        );

        let needs_approval = requires_approval(&cmd.lines, &actor, &self.approval);
        let status = if needs_approval {
            QuoteStatus::PendingApproval
        } else {
            QuoteStatus::Draft
        };

        let lead_id = existing.lead_id;
        let quote_number = existing.quote_number.clone();
        let created_by = existing.created_by_id;

        let mut active: quote::ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.subtotal = Set(round_money(totals.subtotal));
        active.total_cost = Set(round_money(totals.total_cost));
        active.discount_mode = Set(cmd.discount_mode.to_string());
        active.discount_value = Set(cmd.discount_value);
        active.discount_amount = Set(round_money(totals.discount_amount));
        active.tax_mode = Set(cmd.tax_mode.to_string());
        active.vat_percent = Set(cmd.header_vat_percent);
        active.vat_amount = Set(round_money(totals.vat_amount));
        active.grand_total = Set(round_money(totals.grand_total));
        active.gross_profit = Set(round_money(totals.gross_profit));
        active.profit_percent = Set(round_percent(totals.profit_percent));
        // Re-pricing invalidates any earlier approval.
        active.approved_by_id = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        insert_lines(&txn, quote_id, &cmd.lines, &line_totals).await?;

        self.profit_sharing
            .attach_quote(&txn, lead_id, quote_id, None, round_money(totals.gross_profit))
            .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quote_id = %quote_id, status = %status, "quote re-priced");

        if needs_approval {
            self.event_sender
                .notify(Event::QuoteSubmittedForApproval {
                    quote_id,
                    quote_number,
                    created_by,
                })
                .await;
        }

        Ok(model)
    }

    /// Approves a pending quote, returning it to an editable draft.
    #[instrument(skip(self), fields(quote_id = %quote_id))]
    pub async fn approve_quote(
        &self,
        quote_id: Uuid,
        actor: Actor,
    ) -> Result<quote::Model, ServiceError> {
        if !actor.is_privileged() {
            return Err(ServiceError::Forbidden(
                "only an admin may approve a quote".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let current = parse_quote_status(&existing.status)?;
        ensure_decidable(current, &existing.quote_number)?;

        let quote_number = existing.quote_number.clone();
        let recipient = existing.created_by_id;

        let mut active: quote::ActiveModel = existing.into();
        active.status = Set(QuoteStatus::Draft.to_string());
        active.approved_by_id = Set(Some(actor.id()));
        active.rejection_note = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quote_id = %quote_id, approved_by = %actor.id(), "quote approved");

        self.event_sender
            .notify(Event::QuoteApproved {
                quote_id,
                quote_number,
                approved_by: actor.id(),
                recipient,
            })
            .await;

        Ok(model)
    }

    /// Rejects a pending quote with a mandatory note.
    #[instrument(skip(self, note), fields(quote_id = %quote_id))]
    pub async fn reject_quote(
        &self,
        quote_id: Uuid,
        note: &str,
        actor: Actor,
    ) -> Result<quote::Model, ServiceError> {
        if !actor.is_privileged() {
            return Err(ServiceError::Forbidden(
                "only an admin may reject a quote".to_string(),
            ));
        }
        if note.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "a rejection note is required".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let current = parse_quote_status(&existing.status)?;
        ensure_decidable(current, &existing.quote_number)?;

        let quote_number = existing.quote_number.clone();
        let recipient = existing.created_by_id;

        let mut active: quote::ActiveModel = existing.into();
        active.status = Set(QuoteStatus::Rejected.to_string());
        active.rejection_note = Set(Some(note.trim().to_string()));
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quote_id = %quote_id, "quote rejected");

        self.event_sender
            .notify(Event::QuoteRejected {
                quote_id,
                quote_number,
                note: note.trim().to_string(),
                recipient,
            })
            .await;

        Ok(model)
    }

    /// Draft → Sent.
    pub async fn send_quote(&self, quote_id: Uuid) -> Result<quote::Model, ServiceError> {
        self.transition(quote_id, &[QuoteStatus::Draft], QuoteStatus::Sent)
            .await
    }

    /// Sent → Accepted. Acceptance is what makes a quote convertible.
    pub async fn accept_quote(&self, quote_id: Uuid) -> Result<quote::Model, ServiceError> {
        self.transition(quote_id, &[QuoteStatus::Sent], QuoteStatus::Accepted)
            .await
    }

    /// Sent → Expired. Expiry is a status, not a deletion.
    pub async fn expire_quote(&self, quote_id: Uuid) -> Result<quote::Model, ServiceError> {
        self.transition(quote_id, &[QuoteStatus::Sent], QuoteStatus::Expired)
            .await
    }

    async fn transition(
        &self,
        quote_id: Uuid,
        allowed_from: &[QuoteStatus],
        to: QuoteStatus,
    ) -> Result<quote::Model, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let current = parse_quote_status(&existing.status)?;
        if !allowed_from.contains(&current) {
            return Err(ServiceError::Conflict(format!(
                "quote {} cannot move from {} to {}",
                existing.quote_number, current, to
            )));
        }

        let mut active: quote::ActiveModel = existing.into();
        active.status = Set(to.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(quote_id = %quote_id, status = %to, "quote status changed");

        Ok(model)
    }

    pub async fn get_quote(
        &self,
        quote_id: Uuid,
    ) -> Result<(quote::Model, Vec<quote_line::Model>), ServiceError> {
        let quote = QuoteEntity::find_by_id(quote_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let lines = QuoteLineEntity::find()
            .filter(quote_line::Column::QuoteId.eq(quote_id))
            .order_by_asc(quote_line::Column::SlNo)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((quote, lines))
    }

    pub async fn list_quotes_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<quote::Model>, ServiceError> {
        QuoteEntity::find()
            .filter(quote::Column::LeadId.eq(lead_id))
            .order_by_asc(quote::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

async fn insert_lines(
    txn: &sea_orm::DatabaseTransaction,
    quote_id: Uuid,
    inputs: &[LineInput],
    totals: &[LineTotals],
) -> Result<(), ServiceError> {
    let rows: Vec<quote_line::ActiveModel> = inputs
        .iter()
        .zip(totals.iter())
        .enumerate()
        .map(|(idx, (input, computed))| quote_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            quote_id: Set(quote_id),
            sl_no: Set(idx as i32 + 1),
            product: Set(input.product.clone()),
            quantity: Set(input.quantity),
            unit_cost: Set(round_money(input.unit_cost)),
            margin_percent: Set(round_percent(input.margin_percent)),
            vat_percent: Set(round_percent(input.vat_percent)),
            unit_price: Set(round_money(computed.unit_price)),
            line_gross: Set(round_money(computed.line_gross)),
            line_cost_total: Set(round_money(computed.line_cost_total)),
            line_tax: Set(round_money(computed.line_tax)),
            line_gp: Set(round_money(computed.line_gp)),
        })
        .collect();

    QuoteLineEntity::insert_many(rows)
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(())
}

fn validate_header(
    discount_value: &Decimal,
    header_vat_percent: &Decimal,
    share_percent: Option<Decimal>,
) -> Result<(), ServiceError> {
    if *discount_value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "discount cannot be negative".to_string(),
        ));
    }
    if *header_vat_percent < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "VAT rate cannot be negative".to_string(),
        ));
    }
    if let Some(pct) = share_percent {
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ServiceError::ValidationError(
                "share percentage must be between 0 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

fn parse_quote_status(raw: &str) -> Result<QuoteStatus, ServiceError> {
    QuoteStatus::parse(raw)
        .ok_or_else(|| ServiceError::InvalidOperation(format!("unknown quote status '{}'", raw)))
}

/// A decision may only be applied to a quote pending approval; terminal
/// statuses always conflict.
fn ensure_decidable(status: QuoteStatus, quote_number: &str) -> Result<(), ServiceError> {
    if status.is_terminal() {
        return Err(ServiceError::Conflict(format!(
            "quote {} is already {} and cannot be decided again",
            quote_number, status
        )));
    }
    if status != QuoteStatus::PendingApproval {
        return Err(ServiceError::Conflict(format!(
            "quote {} is not pending approval",
            quote_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_require_pending_approval() {
        assert!(ensure_decidable(QuoteStatus::PendingApproval, "Q-00001").is_ok());
        assert!(matches!(
            ensure_decidable(QuoteStatus::Draft, "Q-00001"),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn terminal_statuses_conflict() {
        for status in [
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
        ] {
            assert!(matches!(
                ensure_decidable(status, "Q-00001"),
                Err(ServiceError::Conflict(_))
            ));
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!(parse_quote_status("Draft").is_ok());
        assert!(parse_quote_status("bogus").is_err());
    }

    #[test]
    fn header_validation_bounds_share_percent() {
        let zero = Decimal::ZERO;
        assert!(validate_header(&zero, &zero, Some(Decimal::ONE_HUNDRED)).is_ok());
        assert!(validate_header(&zero, &zero, Some(Decimal::from(101))).is_err());
        assert!(validate_header(&Decimal::from(-1), &zero, None).is_err());
    }
}
