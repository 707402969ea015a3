//! Quote→invoice conversion and the invoice payment lifecycle.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    entities::{
        invoice::{self, Entity as InvoiceEntity, InvoiceStatus},
        invoice_line::{self, Entity as InvoiceLineEntity},
        lead::{self, Entity as LeadEntity, LeadStage},
        quote::{Entity as QuoteEntity, QuoteStatus},
        quote_line::{self, Entity as QuoteLineEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        pricing::{compute_priced_line, round_money, DiscountMode},
        sequence::SequenceService,
    },
};

/// A line of a manually created invoice: already priced, cost optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualInvoiceLine {
    pub product: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateManualInvoiceCommand {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub discount_mode: DiscountMode,
    pub discount_value: Decimal,
    pub lines: Vec<ManualInvoiceLine>,
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    sequences: SequenceService,
    event_sender: EventSender,
    /// Invoices always re-derive their tax at this fixed rate, independent of
    /// the source quote's tax mode. Invoicing rules differ from quoting
    /// rules.
    invoice_vat_percent: Decimal,
}

impl InvoiceService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequences: SequenceService,
        event_sender: EventSender,
        invoice_vat_percent: Decimal,
    ) -> Self {
        Self {
            db,
            sequences,
            event_sender,
            invoice_vat_percent,
        }
    }

    /// Converts an accepted quote into a new invoice, atomically.
    ///
    /// The precondition check ("no invoice yet for this quote") runs inside
    /// the transaction, but the unique index on `quote_id` is what actually
    /// decides a race: the loser's insert fails and is reclassified as a
    /// conflict.
    #[instrument(skip(self), fields(quote_id = %quote_id))]
    pub async fn convert_quote(
        &self,
        quote_id: Uuid,
        actor: Actor,
    ) -> Result<invoice::Model, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for quote conversion");
            ServiceError::db_error(e)
        })?;

        let quote = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        let status = QuoteStatus::parse(&quote.status).ok_or_else(|| {
            ServiceError::InvalidOperation(format!("unknown quote status '{}'", quote.status))
        })?;
        if status != QuoteStatus::Accepted {
            return Err(ServiceError::Conflict(format!(
                "quote {} is {}, only accepted quotes can be invoiced",
                quote.quote_number, status
            )));
        }

        let already = InvoiceEntity::find()
            .filter(invoice::Column::QuoteId.eq(Some(quote_id)))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if let Some(existing) = already {
            return Err(ServiceError::Conflict(format!(
                "quote {} was already converted to invoice {}",
                quote.quote_number, existing.invoice_number
            )));
        }

        let lead = LeadEntity::find_by_id(quote.lead_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lead {} not found", quote.lead_id)))?;

        let quote_lines = QuoteLineEntity::find()
            .filter(quote_line::Column::QuoteId.eq(quote_id))
            .order_by_asc(quote_line::Column::SlNo)
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let invoice_number = self.sequences.next_invoice_number(&txn).await?;

        let invoice_id = Uuid::new_v4();
        let now = Utc::now();

        let mut subtotal = Decimal::ZERO;
        let mut vat_amount = Decimal::ZERO;
        let mut line_rows = Vec::with_capacity(quote_lines.len());
        for line in &quote_lines {
            let tax = round_money(line.line_gross * self.invoice_vat_percent / Decimal::ONE_HUNDRED);
            subtotal += line.line_gross;
            vat_amount += tax;
            line_rows.push(invoice_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                sl_no: Set(line.sl_no),
                product: Set(line.product.clone()),
                quantity: Set(line.quantity),
                unit_cost: Set(line.unit_cost),
                unit_price: Set(line.unit_price),
                line_gross: Set(line.line_gross),
                tax_amount: Set(tax),
                line_total: Set(round_money(line.line_gross + tax)),
            });
        }

        let discount_amount = quote.discount_amount;
        let grand_total = round_money(subtotal - discount_amount + vat_amount);

        let header = invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number.clone()),
            quote_id: Set(Some(quote_id)),
            customer_name: Set(lead.customer_name.clone()),
            customer_email: Set(lead.customer_email.clone()),
            salesperson_id: Set(lead.assigned_member_id),
            salesperson_name: Set(lead.assigned_member_name.clone()),
            subtotal: Set(round_money(subtotal)),
            discount_amount: Set(discount_amount),
            vat_amount: Set(round_money(vat_amount)),
            grand_total: Set(grand_total),
            status: Set(InvoiceStatus::Draft.to_string()),
            paid_at: Set(None),
            created_by_type: Set(actor.kind().to_string()),
            created_by_id: Set(actor.id()),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = header.insert(&txn).await.map_err(|e| {
            ServiceError::conflict_on_unique(
                e,
                format!("quote {} was already converted", quote.quote_number),
            )
        })?;

        if !line_rows.is_empty() {
            InvoiceLineEntity::insert_many(line_rows)
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, invoice_number = %invoice_number, quote_id = %quote_id, "quote converted to invoice");

        Ok(model)
    }

    /// Creates an invoice that is not backed by any quote.
    #[instrument(skip(self, cmd))]
    pub async fn create_manual_invoice(
        &self,
        cmd: CreateManualInvoiceCommand,
        actor: Actor,
    ) -> Result<invoice::Model, ServiceError> {
        validate_manual_lines(&cmd)?;

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let invoice_number = self.sequences.next_invoice_number(&txn).await?;
        let invoice_id = Uuid::new_v4();
        let now = Utc::now();

        let mut subtotal = Decimal::ZERO;
        let mut vat_amount = Decimal::ZERO;
        let mut line_rows = Vec::with_capacity(cmd.lines.len());
        for (idx, line) in cmd.lines.iter().enumerate() {
            let computed =
                compute_priced_line(line.unit_price, line.quantity, None, self.invoice_vat_percent);
            // Accumulate the per-line figures exactly as they are persisted,
            // so the header always equals the sum of its lines even when a
            // unit price carries more than two decimal places.
            let gross = round_money(computed.line_gross);
            let tax = round_money(computed.line_tax);
            subtotal += gross;
            vat_amount += tax;
            line_rows.push(invoice_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                sl_no: Set(idx as i32 + 1),
                product: Set(line.product.clone()),
                quantity: Set(line.quantity),
                unit_cost: Set(round_money(line.unit_cost)),
                unit_price: Set(round_money(line.unit_price)),
                line_gross: Set(gross),
                tax_amount: Set(tax),
                line_total: Set(round_money(gross + tax)),
            });
        }

        let discount_amount = match cmd.discount_mode {
            DiscountMode::Percent => subtotal * cmd.discount_value / Decimal::ONE_HUNDRED,
            DiscountMode::Amount => cmd.discount_value.min(subtotal),
        };
        let grand_total = round_money(subtotal - discount_amount + vat_amount);

        let header = invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number.clone()),
            quote_id: Set(None),
            customer_name: Set(cmd.customer_name.clone()),
            customer_email: Set(cmd.customer_email.clone()),
            salesperson_id: Set(cmd.salesperson_id),
            salesperson_name: Set(cmd.salesperson_name.clone()),
            subtotal: Set(round_money(subtotal)),
            discount_amount: Set(round_money(discount_amount)),
            vat_amount: Set(round_money(vat_amount)),
            grand_total: Set(grand_total),
            status: Set(InvoiceStatus::Draft.to_string()),
            paid_at: Set(None),
            created_by_type: Set(actor.kind().to_string()),
            created_by_id: Set(actor.id()),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = header.insert(&txn).await.map_err(ServiceError::db_error)?;

        InvoiceLineEntity::insert_many(line_rows)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, invoice_number = %invoice_number, "manual invoice created");

        Ok(model)
    }

    /// Moves an invoice along its lifecycle. `Paid` is routed through
    /// [`InvoiceService::mark_paid`] because of its side effect.
    pub async fn update_status(
        &self,
        invoice_id: Uuid,
        next: InvoiceStatus,
        actor: Actor,
    ) -> Result<invoice::Model, ServiceError> {
        if next == InvoiceStatus::Paid {
            return self.mark_paid(invoice_id, actor).await;
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = self.load_invoice(&txn, invoice_id).await?;
        let current = parse_invoice_status(&existing.status)?;
        ensure_transition(current, next, &existing.invoice_number)?;

        let mut active: invoice::ActiveModel = existing.into();
        active.status = Set(next.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, status = %next, "invoice status changed");

        Ok(model)
    }

    /// Marks an invoice paid: stamps `paid_at` exactly once and, if the
    /// invoice traces back to a lead through its quote, advances that lead to
    /// Won in the same transaction. Both updates commit or neither does.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn mark_paid(
        &self,
        invoice_id: Uuid,
        _actor: Actor,
    ) -> Result<invoice::Model, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let existing = self.load_invoice(&txn, invoice_id).await?;
        let current = parse_invoice_status(&existing.status)?;
        ensure_transition(current, InvoiceStatus::Paid, &existing.invoice_number)?;

        let invoice_number = existing.invoice_number.clone();
        let quote_id = existing.quote_id;
        let recipient = existing.salesperson_id;

        let mut active: invoice::ActiveModel = existing.into();
        active.status = Set(InvoiceStatus::Paid.to_string());
        active.paid_at = Set(Some(Utc::now()));
        active.updated_at = Set(Some(Utc::now()));
        let model = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut stage_change: Option<(Uuid, String, String)> = None;
        if let Some(quote_id) = quote_id {
            if let Some(quote) = QuoteEntity::find_by_id(quote_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
            {
                if let Some(lead) = LeadEntity::find_by_id(quote.lead_id)
                    .one(&txn)
                    .await
                    .map_err(ServiceError::db_error)?
                {
                    if LeadStage::parse(&lead.stage) != Some(LeadStage::Won) {
                        let old_stage = lead.stage.clone();
                        let lead_id = lead.id;
                        let mut lead_active: lead::ActiveModel = lead.into();
                        lead_active.stage = Set(LeadStage::Won.to_string());
                        lead_active.updated_at = Set(Some(Utc::now()));
                        lead_active
                            .update(&txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        stage_change =
                            Some((lead_id, old_stage, LeadStage::Won.to_string()));
                    }
                }
            }
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(invoice_id = %invoice_id, "invoice paid");

        self.event_sender
            .notify(Event::InvoicePaid {
                invoice_id,
                invoice_number,
                recipient,
                lead_id: stage_change.as_ref().map(|(id, _, _)| *id),
            })
            .await;
        if let Some((lead_id, old_stage, new_stage)) = stage_change {
            self.event_sender
                .notify(Event::LeadStageChanged {
                    lead_id,
                    old_stage,
                    new_stage,
                })
                .await;
        }

        Ok(model)
    }

    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<(invoice::Model, Vec<invoice_line::Model>), ServiceError> {
        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let lines = InvoiceLineEntity::find()
            .filter(invoice_line::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_line::Column::SlNo)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((invoice, lines))
    }

    async fn load_invoice(
        &self,
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
    ) -> Result<invoice::Model, ServiceError> {
        InvoiceEntity::find_by_id(invoice_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))
    }
}

fn validate_manual_lines(cmd: &CreateManualInvoiceCommand) -> Result<(), ServiceError> {
    if cmd.customer_name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "customer name is required".to_string(),
        ));
    }
    if cmd.lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "at least one line item is required".to_string(),
        ));
    }
    if cmd.discount_value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "discount cannot be negative".to_string(),
        ));
    }
    for (idx, line) in cmd.lines.iter().enumerate() {
        if line.product.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "line {}: product is required",
                idx + 1
            )));
        }
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "line {}: quantity must be positive",
                idx + 1
            )));
        }
        if line.unit_price < Decimal::ZERO || line.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "line {}: price and cost cannot be negative",
                idx + 1
            )));
        }
    }
    Ok(())
}

fn parse_invoice_status(raw: &str) -> Result<InvoiceStatus, ServiceError> {
    InvoiceStatus::parse(raw)
        .ok_or_else(|| ServiceError::InvalidOperation(format!("unknown invoice status '{}'", raw)))
}

/// Terminal states refuse any further change outright; other invalid moves
/// are conflicts with the lifecycle.
fn ensure_transition(
    current: InvoiceStatus,
    next: InvoiceStatus,
    invoice_number: &str,
) -> Result<(), ServiceError> {
    if current.is_terminal() {
        return Err(ServiceError::Forbidden(format!(
            "invoice {} is {} and can no longer change",
            invoice_number, current
        )));
    }
    if !current.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "invoice {} cannot move from {} to {}",
            invoice_number, current, next
        )));
    }
    Ok(())
}
