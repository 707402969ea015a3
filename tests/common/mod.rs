//! Shared harness for integration tests: an in-memory SQLite database with
//! the full schema, seeded counters, and a running event loop.

#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use salesdesk_api::{
    auth::Actor,
    config::AppConfig,
    entities::{lead, member},
    events::{self, EventSender},
    migrator::Migrator,
    services::SequenceService,
    AppState,
};
use sea_orm_migration::MigratorTrait;

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        salesdesk_api::config::init_tracing("warn");

        // A pooled in-memory SQLite database must stay on one connection,
        // otherwise each checkout sees a fresh empty database.
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1).sqlx_logging(false);

        let db = Database::connect(opts).await.expect("connect sqlite");
        Migrator::up(&db, None).await.expect("run migrations");
        SequenceService::seed(&db).await.expect("seed counters");

        let (tx, rx) = mpsc::channel(events::EVENT_CHANNEL_CAPACITY);
        let event_sender = EventSender::new(tx);
        tokio::spawn(events::process_events(rx));

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );

        let state = AppState::new(Arc::new(db), config, event_sender);

        Self { state }
    }

    pub async fn seed_member(&self, name: &str, email: &str, is_admin: bool) -> member::Model {
        member::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert member")
    }

    pub async fn seed_lead(&self, owner: &member::Model) -> lead::Model {
        let n = Uuid::new_v4().simple().to_string();
        lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            lead_number: Set(format!("L-{}", &n[..8])),
            customer_name: Set("Acme Industries".to_string()),
            customer_email: Set(Some("purchasing@acme.test".to_string())),
            customer_phone: Set(None),
            assigned_member_id: Set(owner.id),
            assigned_member_name: Set(owner.name.clone()),
            stage: Set("New".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert lead")
    }

    pub fn admin(&self, member: &member::Model) -> Actor {
        Actor::Admin(member.id)
    }

    pub fn member_actor(&self, member: &member::Model) -> Actor {
        Actor::Member(member.id)
    }
}
