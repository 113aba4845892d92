//! In-memory stand-in for the remote Order Service.
//!
//! Deterministic: fixed clock, sequential ids, no network. Every call is
//! recorded so tests can assert exactly which endpoints were hit. Failures are
//! scripted per endpoint, and a submission can be held in flight with
//! [`SubmissionHold`] to exercise the one-in-flight guard.
//!
//! The server-side transition table lives here because this type plays the
//! server. Client crates never consult it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use odk_client::{FilteredEvents, OrderService, ServiceError, TicketService};
use odk_schemas::{
    CreateOrderRequest, EventKind, EventResponse, Order, OrderEvent, OrderHistory, OrderState,
    ProcessEventRequest, StatusBucket, SupportTicket, TicketStats, TicketStatus,
    UpdateTicketStatusRequest, UpdateTicketStatusResponse,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::fixtures::fixture_time;

// ---------------------------------------------------------------------------
// Server transition table
// ---------------------------------------------------------------------------

/// The reference server's transition table.
pub fn next_state(state: OrderState, kind: EventKind) -> Option<OrderState> {
    use EventKind::*;
    use OrderState::*;

    let to = match (state, kind) {
        (Pending, PendingBiometricalVerification) => OnHold,
        (Pending, NoVerificationNeeded) => PendingPayment,
        (Pending, PaymentFailed) => Cancelled,
        (Pending, OrderCancelled) => Cancelled,

        (OnHold, BiometricalVerificationSuccessful) => PendingPayment,
        (OnHold, VerificationFailed) => Cancelled,
        (OnHold, OrderCancelledByUser) => Cancelled,

        (PendingPayment, PaymentSuccessful) => Confirmed,
        (PendingPayment, OrderCancelledByUser) => Cancelled,

        (Confirmed, PreparingShipment) => Processing,
        (Confirmed, OrderCancelledByUser) => Cancelled,

        (Processing, ItemDispatched) => Shipped,
        (Processing, OrderCancelledByUser) => Cancelled,

        (Shipped, ItemReceivedByCustomer) => Delivered,
        (Shipped, DeliveryIssue) => OnHold,
        (Shipped, OrderCancelledByUser) => Cancelled,

        (Delivered, ReturnInitiatedByCustomer) => Returning,
        (Returning, ItemReceivedBack) => Returned,
        (Returned, RefundProcessed) => Refunded,

        _ => return None,
    };
    Some(to)
}

/// Events the reference server offers in `state`, in catalog order.
pub fn allowed_for(state: OrderState) -> Vec<EventKind> {
    EventKind::ALL
        .iter()
        .copied()
        .filter(|k| next_state(state, *k).is_some())
        .collect()
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Health,
    ListOrders,
    GetOrder,
    CreateOrder,
    AllowedEvents,
    FilteredAllowedEvents,
    History,
    SubmitEvent,
    ListTickets,
    GetTicket,
    TicketsForOrder,
    UpdateTicketStatus,
    TicketStats,
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: Endpoint,
    /// Order or ticket id from the path, when the endpoint has one.
    pub target: Option<String>,
    /// Request body as JSON, for endpoints that send one.
    pub body: Option<Value>,
}

// ---------------------------------------------------------------------------
// SubmissionHold
// ---------------------------------------------------------------------------

/// Parks the next `submit_event` until [`SubmissionHold::release`].
#[derive(Debug, Default)]
pub struct SubmissionHold {
    entered: Notify,
    release: Notify,
}

impl SubmissionHold {
    /// Resolves once a submission has reached the service and is parked.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

// ---------------------------------------------------------------------------
// ScriptedOrderService
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    orders: BTreeMap<String, Order>,
    history: BTreeMap<String, Vec<OrderEvent>>,
    small_orders: BTreeSet<String>,
    tickets: BTreeMap<String, SupportTicket>,
    failures: BTreeMap<Endpoint, VecDeque<ServiceError>>,
    calls: Vec<Call>,
    next_order: u64,
    ticks: i64,
}

impl Inner {
    /// Fixed clock that advances one minute per mutation.
    fn tick(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        fixture_time() + Duration::minutes(self.ticks)
    }

    fn record(
        &mut self,
        endpoint: Endpoint,
        target: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), ServiceError> {
        self.calls.push(Call {
            endpoint,
            target: target.map(str::to_string),
            body,
        });
        match self.failures.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn order(&self, order_id: &str) -> Result<&Order, ServiceError> {
        self.orders.get(order_id).ok_or_else(order_not_found)
    }
}

fn order_not_found() -> ServiceError {
    ServiceError::NotFound {
        detail: Some("Order not found".to_string()),
    }
}

fn ticket_not_found() -> ServiceError {
    ServiceError::NotFound {
        detail: Some("Ticket not found".to_string()),
    }
}

#[derive(Default)]
pub struct ScriptedOrderService {
    inner: Mutex<Inner>,
    hold: Mutex<Option<Arc<SubmissionHold>>>,
}

impl ScriptedOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    // -- scripting ----------------------------------------------------------

    /// Insert (or replace) an order. Its history starts with a creation entry.
    pub fn insert_order(&self, order: Order) {
        let mut inner = self.lock();
        let created = OrderEvent {
            event_type: "orderCreated".to_string(),
            old_state: None,
            new_state: order.state,
            metadata: Default::default(),
            created_at: order.created_at,
        };
        inner.history.insert(order.id.clone(), vec![created]);
        inner.orders.insert(order.id.clone(), order);
    }

    /// Mark an order as small: the filtered endpoint drops the verification
    /// step and reports `small_order_rule_applied`.
    pub fn set_small_order_rule(&self, order_id: &str, applied: bool) {
        let mut inner = self.lock();
        if applied {
            inner.small_orders.insert(order_id.to_string());
        } else {
            inner.small_orders.remove(order_id);
        }
    }

    pub fn insert_ticket(&self, ticket: SupportTicket) {
        self.lock().tickets.insert(ticket.id.clone(), ticket);
    }

    /// The next call to `endpoint` fails with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, endpoint: Endpoint, err: ServiceError) {
        self.lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(err);
    }

    /// Park the next submission until the returned hold is released.
    pub fn hold_next_submission(&self) -> Arc<SubmissionHold> {
        let hold = Arc::new(SubmissionHold::default());
        *self.hold.lock().unwrap_or_else(|p| p.into_inner()) = Some(Arc::clone(&hold));
        hold
    }

    // -- inspection ---------------------------------------------------------

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Bodies of every `submit_event` call so far.
    pub fn submitted(&self) -> Vec<Value> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == Endpoint::SubmitEvent)
            .filter_map(|c| c.body.clone())
            .collect()
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.lock().orders.get(order_id).cloned()
    }

    pub fn ticket(&self, ticket_id: &str) -> Option<SupportTicket> {
        self.lock().tickets.get(ticket_id).cloned()
    }

    fn take_hold(&self) -> Option<Arc<SubmissionHold>> {
        self.hold.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

#[async_trait]
impl OrderService for ScriptedOrderService {
    async fn health(&self) -> Result<Value, ServiceError> {
        self.lock().record(Endpoint::Health, None, None)?;
        Ok(json!({"status": "healthy", "service": "scripted"}))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::ListOrders, None, None)?;
        Ok(inner.orders.values().cloned().collect())
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::GetOrder, Some(order_id), None)?;
        inner.order(order_id).cloned()
    }

    async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::CreateOrder, None, serde_json::to_value(req).ok())?;

        inner.next_order += 1;
        let now = inner.tick();
        let order = Order {
            id: format!("ORD-{:06}", inner.next_order),
            product_ids: req.product_ids.clone(),
            amount: req.amount,
            state: OrderState::Pending,
            metadata: req.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        drop(inner);

        self.insert_order(order.clone());
        Ok(order)
    }

    async fn allowed_events(&self, order_id: &str) -> Result<Vec<EventKind>, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::AllowedEvents, Some(order_id), None)?;
        Ok(allowed_for(inner.order(order_id)?.state))
    }

    async fn filtered_allowed_events(&self, order_id: &str) -> Result<FilteredEvents, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::FilteredAllowedEvents, Some(order_id), None)?;

        let mut events = allowed_for(inner.order(order_id)?.state);
        let small = inner.small_orders.contains(order_id)
            && events.contains(&EventKind::PendingBiometricalVerification);
        if small {
            events.retain(|k| *k != EventKind::PendingBiometricalVerification);
        }
        Ok(FilteredEvents {
            events,
            small_order_rule_applied: small,
        })
    }

    async fn history(&self, order_id: &str) -> Result<OrderHistory, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::History, Some(order_id), None)?;
        inner.order(order_id)?;

        let events = inner.history.get(order_id).cloned().unwrap_or_default();
        Ok(OrderHistory {
            order_id: order_id.to_string(),
            total_events: events.len(),
            events,
        })
    }

    async fn submit_event(
        &self,
        order_id: &str,
        req: &ProcessEventRequest,
    ) -> Result<EventResponse, ServiceError> {
        self.lock()
            .record(Endpoint::SubmitEvent, Some(order_id), serde_json::to_value(req).ok())?;

        if let Some(hold) = self.take_hold() {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let mut inner = self.lock();
        let old_state = inner.order(order_id)?.state;
        let Some(new_state) = next_state(old_state, req.event_type) else {
            return Err(ServiceError::Rejected {
                status: 400,
                detail: Some(format!(
                    "Invalid transition: cannot apply {} in state {}",
                    req.event_type, old_state
                )),
            });
        };

        let now = inner.tick();
        if let Some(order) = inner.orders.get_mut(order_id) {
            order.state = new_state;
            order.updated_at = now;
        }
        inner
            .history
            .entry(order_id.to_string())
            .or_default()
            .push(OrderEvent {
                event_type: req.event_type.as_str().to_string(),
                old_state: Some(old_state),
                new_state,
                metadata: req.metadata.clone(),
                created_at: now,
            });

        Ok(EventResponse {
            order_id: order_id.to_string(),
            old_state,
            new_state,
            event_type: req.event_type,
            processed_at: now,
        })
    }
}

#[async_trait]
impl TicketService for ScriptedOrderService {
    async fn list_tickets(&self) -> Result<Vec<SupportTicket>, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::ListTickets, None, None)?;
        Ok(inner.tickets.values().cloned().collect())
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<SupportTicket, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::GetTicket, Some(ticket_id), None)?;
        inner.tickets.get(ticket_id).cloned().ok_or_else(ticket_not_found)
    }

    async fn tickets_for_order(&self, order_id: &str) -> Result<Vec<SupportTicket>, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::TicketsForOrder, Some(order_id), None)?;
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_ticket_status(
        &self,
        ticket_id: &str,
        req: &UpdateTicketStatusRequest,
    ) -> Result<UpdateTicketStatusResponse, ServiceError> {
        let mut inner = self.lock();
        inner.record(
            Endpoint::UpdateTicketStatus,
            Some(ticket_id),
            serde_json::to_value(req).ok(),
        )?;

        let ticket = inner.tickets.get_mut(ticket_id).ok_or_else(ticket_not_found)?;
        ticket.status = req.status;
        if let Some(md) = &req.metadata {
            ticket.metadata.extend(md.clone());
        }
        let updated = ticket.clone();

        Ok(UpdateTicketStatusResponse {
            message: format!("Ticket status updated to {}", req.status),
            ticket_id: ticket_id.to_string(),
            new_status: req.status,
            updated_ticket: updated,
        })
    }

    async fn ticket_stats(&self) -> Result<TicketStats, ServiceError> {
        let mut inner = self.lock();
        inner.record(Endpoint::TicketStats, None, None)?;

        let mut sums: BTreeMap<TicketStatus, (u64, f64)> = BTreeMap::new();
        for t in inner.tickets.values() {
            let e = sums.entry(t.status).or_insert((0, 0.0));
            e.0 += 1;
            e.1 += t.amount;
        }
        let by_status = sums
            .into_iter()
            .map(|(status, (count, total))| {
                (
                    status,
                    StatusBucket {
                        count,
                        avg_amount: total / count as f64,
                    },
                )
            })
            .collect();

        Ok(TicketStats {
            total_tickets: inner.tickets.len() as u64,
            by_status,
            generated_at: Some(fixture_time().to_rfc3339()),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_sets_follow_the_table() {
        assert_eq!(
            allowed_for(OrderState::PendingPayment),
            vec![EventKind::OrderCancelledByUser, EventKind::PaymentSuccessful]
        );
        assert!(allowed_for(OrderState::Cancelled).is_empty());
        assert!(allowed_for(OrderState::Refunded).is_empty());
    }

    #[test]
    fn scripted_failures_are_consumed_once() {
        let svc = ScriptedOrderService::new();
        svc.fail_next(Endpoint::Health, ServiceError::Transport("down".into()));
        let mut inner = svc.lock();
        assert!(inner.record(Endpoint::Health, None, None).is_err());
        assert!(inner.record(Endpoint::Health, None, None).is_ok());
        assert_eq!(inner.calls.len(), 2);
    }
}
