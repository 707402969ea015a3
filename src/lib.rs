//! SalesDesk API Library
//!
//! This crate provides the financial document workflow for a sales CRM:
//! quote pricing, approval gating, profit sharing between members, and
//! quote-to-invoice conversion with an invoice payment lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::ServiceError;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub sequences: services::SequenceService,
    pub profit_sharing: services::ProfitSharingService,
    pub quotes: services::QuoteService,
    pub invoices: services::InvoiceService,
}

impl AppState {
    /// Wires every service against one shared pool and one event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let sequences = services::SequenceService::new(config.numbering.clone());
        let profit_sharing = services::ProfitSharingService::new(db.clone());
        let quotes = services::QuoteService::new(
            db.clone(),
            sequences.clone(),
            profit_sharing.clone(),
            event_sender.clone(),
            config.approval.clone(),
        );
        let invoices = services::InvoiceService::new(
            db.clone(),
            sequences.clone(),
            event_sender.clone(),
            config.invoice_vat_percent,
        );

        Self {
            db,
            config,
            event_sender,
            sequences,
            profit_sharing,
            quotes,
            invoices,
        }
    }
}

/// Installs the tracing subscriber, connects, migrates if configured, seeds
/// the counters, and spawns the event processing loop. Returns the
/// ready-to-use state.
pub async fn bootstrap(config: config::AppConfig) -> Result<AppState, ServiceError> {
    config::init_tracing(&config.log_level);

    let pool = db::establish_connection_from_app_config(&config).await?;

    if config.auto_migrate {
        db::run_migrations(&pool).await?;
    }

    let db = Arc::new(pool);

    let (tx, rx) = mpsc::channel(events::EVENT_CHANNEL_CAPACITY);
    let event_sender = events::EventSender::new(tx);
    tokio::spawn(events::process_events(rx));

    let state = AppState::new(db, config, event_sender);
    services::SequenceService::seed(&state.db).await?;

    Ok(state)
}
