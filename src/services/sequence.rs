//! Named sequence counters for minting document numbers.
//!
//! The counter table is the only intentionally shared mutable state in the
//! engine. `next` must be called inside an already-open transaction: the row
//! is read under an exclusive lock, so two concurrent callers serialize and
//! can never observe the same value, and a rollback undoes the increment
//! along with whatever consumed it.

use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, DbErr, EntityTrait, Set, Statement,
};
use tracing::{info, instrument};

use crate::config::NumberingConfig;
use crate::entities::counter::{self, Entity as CounterEntity};
use crate::errors::ServiceError;

pub const LEAD_SERIES: &str = "leadNumber";
pub const QUOTE_SERIES: &str = "quoteNumber";
pub const INVOICE_SERIES: &str = "invoiceNumber";

#[derive(Debug, Clone)]
pub struct SequenceService {
    numbering: NumberingConfig,
}

impl SequenceService {
    pub fn new(numbering: NumberingConfig) -> Self {
        Self { numbering }
    }

    /// Returns the next value of a named series.
    ///
    /// A missing row is a configuration error, not an invitation to start at
    /// zero; the series may already be assumed initialized elsewhere.
    #[instrument(skip(self, txn))]
    pub async fn next(
        &self,
        txn: &DatabaseTransaction,
        series: &str,
    ) -> Result<i64, ServiceError> {
        let backend = txn.get_database_backend();

        let row = if backend == DbBackend::Postgres {
            let stmt = Statement::from_sql_and_values(
                backend,
                r#"SELECT "name", "current_value" FROM "counters" WHERE "name" = $1 FOR UPDATE"#,
                [series.into()],
            );
            CounterEntity::find().from_raw_sql(stmt).one(txn).await
        } else {
            // SQLite has no row locks; its single writer already serializes.
            CounterEntity::find_by_id(series.to_owned()).one(txn).await
        }
        .map_err(ServiceError::db_error)?;

        let row = row.ok_or_else(|| {
            ServiceError::Configuration(format!("counter series '{}' has not been seeded", series))
        })?;

        let next_value = row.current_value + 1;
        let mut active: counter::ActiveModel = row.into();
        active.current_value = Set(next_value);
        active.update(txn).await.map_err(ServiceError::db_error)?;

        Ok(next_value)
    }

    /// Mints and renders the next quote number, e.g. `Q-00042`.
    pub async fn next_quote_number(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<String, ServiceError> {
        let value = self.next(txn, QUOTE_SERIES).await?;
        Ok(self.format(&self.numbering.quote_prefix, value))
    }

    /// Mints and renders the next lead number, e.g. `L-00003`.
    pub async fn next_lead_number(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<String, ServiceError> {
        let value = self.next(txn, LEAD_SERIES).await?;
        Ok(self.format(&self.numbering.lead_prefix, value))
    }

    /// Mints and renders the next invoice number, e.g. `INV-00007`.
    pub async fn next_invoice_number(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<String, ServiceError> {
        let value = self.next(txn, INVOICE_SERIES).await?;
        Ok(self.format(&self.numbering.invoice_prefix, value))
    }

    /// Renders a minted value with the configured prefix and zero padding.
    pub fn format(&self, prefix: &str, value: i64) -> String {
        format!(
            "{}{:0width$}",
            prefix,
            value,
            width = self.numbering.pad_width as usize
        )
    }

    /// Seeds the counter series at startup. Idempotent: existing rows keep
    /// their current value. Failure here halts startup rather than surfacing
    /// per-request.
    pub async fn seed(db: &DatabaseConnection) -> Result<(), ServiceError> {
        for series in [LEAD_SERIES, QUOTE_SERIES, INVOICE_SERIES] {
            let row = counter::ActiveModel {
                name: Set(series.to_string()),
                current_value: Set(0),
            };
            let insert = CounterEntity::insert(row)
                .on_conflict(
                    OnConflict::column(counter::Column::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .exec(db)
                .await;
            match insert {
                Ok(_) | Err(DbErr::RecordNotInserted) => {}
                Err(e) => {
                    return Err(ServiceError::Configuration(format!(
                        "failed to seed counter series '{}': {}",
                        series, e
                    )))
                }
            }
        }
        info!("counter series seeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_prefix_and_padding() {
        let service = SequenceService::new(NumberingConfig::default());
        assert_eq!(service.format("Q-", 42), "Q-00042");
        assert_eq!(service.format("INV-", 7), "INV-00007");
        // Values wider than the pad are never truncated
        assert_eq!(service.format("Q-", 1234567), "Q-1234567");
    }
}
