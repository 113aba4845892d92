//! odk-client
//!
//! Service boundary for the remote Order Service.
//!
//! This crate defines the [`OrderService`] and [`TicketService`] traits and the
//! reqwest-backed [`HttpOrderService`]. It owns transport and error
//! classification only: no caching, no workflow, no retries. Callers
//! (`odk-workflow`) decide what a failure means for the screen they drive.

pub mod error;
pub mod http;

use odk_schemas::{
    CreateOrderRequest, EventKind, EventResponse, Order, OrderHistory, ProcessEventRequest,
    SupportTicket, TicketStats, UpdateTicketStatusRequest, UpdateTicketStatusResponse,
};
use serde_json::Value;

pub use error::{ServiceError, UNEXPECTED_ERROR};
pub use http::HttpOrderService;

/// Allowed events as computed by the business-rule filtered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEvents {
    pub events: Vec<EventKind>,
    /// Server dropped the verification step because the order is small.
    pub small_order_rule_applied: bool,
}

/// Order endpoints of the remote service.
///
/// Implementations must be `Send + Sync` so a single handle can be shared by
/// the submission controller and the reconciliation fetches.
#[async_trait::async_trait]
pub trait OrderService: Send + Sync {
    /// `GET /health`; the body is returned verbatim.
    async fn health(&self) -> Result<Value, ServiceError>;

    /// `GET /orders`
    async fn list_orders(&self) -> Result<Vec<Order>, ServiceError>;

    /// `GET /orders/{id}`
    async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError>;

    /// `POST /orders`
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ServiceError>;

    /// `GET /orders/{id}/allowed-events`
    async fn allowed_events(&self, order_id: &str) -> Result<Vec<EventKind>, ServiceError>;

    /// `GET /api/v2/orders/{id}/allowed-events-filtered`
    async fn filtered_allowed_events(&self, order_id: &str)
        -> Result<FilteredEvents, ServiceError>;

    /// `GET /orders/{id}/history`
    async fn history(&self, order_id: &str) -> Result<OrderHistory, ServiceError>;

    /// `POST /orders/{id}/events`
    async fn submit_event(
        &self,
        order_id: &str,
        req: &ProcessEventRequest,
    ) -> Result<EventResponse, ServiceError>;
}

/// Support ticket endpoints of the remote service.
#[async_trait::async_trait]
pub trait TicketService: Send + Sync {
    /// `GET /support/tickets`
    async fn list_tickets(&self) -> Result<Vec<SupportTicket>, ServiceError>;

    /// `GET /support/tickets/{id}`
    async fn get_ticket(&self, ticket_id: &str) -> Result<SupportTicket, ServiceError>;

    /// `GET /support/orders/{id}/tickets`
    async fn tickets_for_order(&self, order_id: &str) -> Result<Vec<SupportTicket>, ServiceError>;

    /// `PATCH /support/tickets/{id}/status`
    async fn update_ticket_status(
        &self,
        ticket_id: &str,
        req: &UpdateTicketStatusRequest,
    ) -> Result<UpdateTicketStatusResponse, ServiceError>;

    /// `GET /support/tickets/stats/summary`
    async fn ticket_stats(&self) -> Result<TicketStats, ServiceError>;
}

/// Convert server event names into [`EventKind`]s.
///
/// Names this client does not know (a newer server) are skipped with a
/// warning rather than failing the whole fetch: the operator can still act on
/// the kinds that are understood.
pub fn parse_event_kinds<I, S>(raw: I) -> Vec<EventKind>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|name| match name.as_ref().parse::<EventKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!(event = name.as_ref(), "skipping allowed event: {e}");
                None
            }
        })
        .collect()
}
