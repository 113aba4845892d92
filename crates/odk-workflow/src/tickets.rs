//! Support ticket desk.
//!
//! Ticket status is independent of order state. Updates are followed by a
//! fresh read so the caller always shows what the server stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use odk_client::{ServiceError, TicketService};
use odk_schemas::{
    MetaValue, Metadata, SupportTicket, TicketStats, TicketStatus, UpdateTicketStatusRequest,
};
use tracing::{info, warn};

pub const TICKET_NOT_FOUND: &str = "Ticket not found";
pub const UPDATED_BY: &str = "support_agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// HTTP 404; the caller should leave the ticket view.
    NotFound,
    /// Reading the ticket failed for any other reason.
    Fetch(ServiceError),
    /// The status update itself was refused or never arrived.
    Update(ServiceError),
}

impl std::fmt::Display for TicketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketError::NotFound => f.write_str(TICKET_NOT_FOUND),
            TicketError::Fetch(e) => write!(f, "Failed to fetch ticket data: {}", e.user_message()),
            TicketError::Update(e) => {
                write!(f, "Failed to update ticket status: {}", e.user_message())
            }
        }
    }
}

impl std::error::Error for TicketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TicketError::NotFound => None,
            TicketError::Fetch(e) | TicketError::Update(e) => Some(e),
        }
    }
}

fn classify_fetch(e: ServiceError) -> TicketError {
    if e.is_not_found() {
        TicketError::NotFound
    } else {
        TicketError::Fetch(e)
    }
}

/// Metadata attached to a status change.
pub fn status_update_metadata(notes: &str, now: DateTime<Utc>) -> Metadata {
    let mut md = Metadata::new();
    md.insert("updated_by".to_string(), MetaValue::from(UPDATED_BY));
    md.insert("update_notes".to_string(), MetaValue::from(notes.trim()));
    md.insert(
        "updated_at".to_string(),
        MetaValue::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    md
}

/// Count tickets per status. Every status is present, zero or not.
pub fn status_tally(tickets: &[SupportTicket]) -> BTreeMap<TicketStatus, usize> {
    let mut tally: BTreeMap<TicketStatus, usize> =
        TicketStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for t in tickets {
        *tally.entry(t.status).or_insert(0) += 1;
    }
    tally
}

/// Sum of ticket amounts, e.g. the value at stake for one order.
pub fn total_amount(tickets: &[SupportTicket]) -> f64 {
    tickets.iter().map(|t| t.amount).sum()
}

pub struct TicketDesk<S: ?Sized> {
    service: Arc<S>,
}

impl<S: TicketService + ?Sized> TicketDesk<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// All tickets, optionally narrowed to one status.
    pub async fn list(&self, status: Option<TicketStatus>) -> Result<Vec<SupportTicket>, TicketError> {
        let mut tickets = self.service.list_tickets().await.map_err(TicketError::Fetch)?;
        if let Some(s) = status {
            tickets.retain(|t| t.status == s);
        }
        Ok(tickets)
    }

    pub async fn open(&self, ticket_id: &str) -> Result<SupportTicket, TicketError> {
        self.service.get_ticket(ticket_id).await.map_err(|e| {
            warn!(ticket_id, error = %e, "ticket fetch failed");
            classify_fetch(e)
        })
    }

    pub async fn for_order(&self, order_id: &str) -> Result<Vec<SupportTicket>, TicketError> {
        self.service
            .tickets_for_order(order_id)
            .await
            .map_err(TicketError::Fetch)
    }

    /// Change a ticket's status, then re-read it.
    pub async fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        notes: &str,
    ) -> Result<SupportTicket, TicketError> {
        let req = UpdateTicketStatusRequest {
            status,
            metadata: Some(status_update_metadata(notes, Utc::now())),
        };

        let resp = self
            .service
            .update_ticket_status(ticket_id, &req)
            .await
            .map_err(|e| {
                warn!(ticket_id, status = %status, error = %e, "ticket status update failed");
                if e.is_not_found() {
                    TicketError::NotFound
                } else {
                    TicketError::Update(e)
                }
            })?;
        info!(ticket_id, new_status = %resp.new_status, "ticket status updated");

        self.open(ticket_id).await
    }

    pub async fn stats(&self) -> Result<TicketStats, TicketError> {
        self.service.ticket_stats().await.map_err(TicketError::Fetch)
    }
}
