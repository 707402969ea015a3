use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Default buffer for the workflow event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Workflow notifications handed to the surrounding system.
///
/// The engine fires these and moves on; delivery (email, socket broadcast,
/// anything else) belongs to whoever consumes the channel. A notification
/// failure is never a workflow failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    QuoteSubmittedForApproval {
        quote_id: Uuid,
        quote_number: String,
        created_by: Uuid,
    },
    QuoteApproved {
        quote_id: Uuid,
        quote_number: String,
        approved_by: Uuid,
        recipient: Uuid,
    },
    QuoteRejected {
        quote_id: Uuid,
        quote_number: String,
        note: String,
        recipient: Uuid,
    },
    InvoicePaid {
        invoice_id: Uuid,
        invoice_number: String,
        recipient: Uuid,
        lead_id: Option<Uuid>,
    },
    LeadStageChanged {
        lead_id: Uuid,
        old_stage: String,
        new_stage: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, failing if the channel is closed.
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("failed to send event: {}", e)))
    }

    /// Fire-and-forget send: a full or closed channel is logged, not
    /// propagated, so a dead notifier cannot fail a committed workflow.
    pub async fn notify(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event notification dropped");
        }
    }
}

/// Consumes workflow events and logs them for downstream dispatch.
///
/// The notification transports themselves are out of scope; this loop is the
/// boundary where they would plug in.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        if let Ok(payload) = serde_json::to_string(&event) {
            debug!(%payload, "event received");
        }
        match &event {
            Event::QuoteSubmittedForApproval {
                quote_id,
                quote_number,
                created_by,
            } => {
                info!(%quote_id, %quote_number, %created_by, "quote submitted for approval");
            }
            Event::QuoteApproved {
                quote_id,
                quote_number,
                approved_by,
                recipient,
            } => {
                info!(%quote_id, %quote_number, %approved_by, %recipient, "quote approved");
            }
            Event::QuoteRejected {
                quote_id,
                quote_number,
                recipient,
                ..
            } => {
                info!(%quote_id, %quote_number, %recipient, "quote rejected");
            }
            Event::InvoicePaid {
                invoice_id,
                invoice_number,
                recipient,
                lead_id,
            } => {
                info!(%invoice_id, %invoice_number, %recipient, ?lead_id, "invoice paid");
            }
            Event::LeadStageChanged {
                lead_id,
                old_stage,
                new_stage,
            } => {
                info!(%lead_id, %old_stage, %new_stage, "lead stage changed");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender
            .notify(Event::InvoicePaid {
                invoice_id: Uuid::new_v4(),
                invoice_number: "INV-00001".to_string(),
                recipient: Uuid::new_v4(),
                lead_id: None,
            })
            .await;
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_an_event_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let err = sender
            .send(Event::LeadStageChanged {
                lead_id: Uuid::new_v4(),
                old_stage: "New".to_string(),
                new_stage: "Won".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));
    }

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::QuoteApproved {
                quote_id: Uuid::new_v4(),
                quote_number: "Q-00001".to_string(),
                approved_by: Uuid::new_v4(),
                recipient: Uuid::new_v4(),
            })
            .await
            .expect("send");
        assert!(matches!(
            rx.recv().await,
            Some(Event::QuoteApproved { .. })
        ));
    }
}
