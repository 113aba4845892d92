//! odk-schemas
//!
//! Wire types shared by every orderdesk crate. These mirror the JSON shapes
//! served by the remote Order Service; no business logic lives here.
//!
//! The server is the only authority on order state. Nothing in this crate
//! computes a next state or an allowed-event set.

pub mod metadata;
pub mod support;
pub mod timestamp;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use metadata::{normalize_metadata, MetaValue, Metadata};
pub use support::{
    StatusBucket, SupportTicket, TicketStats, TicketStatus, UpdateTicketStatusRequest,
    UpdateTicketStatusResponse,
};

// ---------------------------------------------------------------------------
// OrderState
// ---------------------------------------------------------------------------

/// Workflow states an order can occupy on the server.
///
/// `Reviewing` only exists on newer servers (manual review of high value
/// orders). It is accepted on decode so the client keeps working against both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    OnHold,
    PendingPayment,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Returning,
    Returned,
    Refunded,
    Cancelled,
    Reviewing,
}

impl OrderState {
    pub const ALL: [OrderState; 12] = [
        OrderState::Pending,
        OrderState::OnHold,
        OrderState::PendingPayment,
        OrderState::Confirmed,
        OrderState::Processing,
        OrderState::Shipped,
        OrderState::Delivered,
        OrderState::Returning,
        OrderState::Returned,
        OrderState::Refunded,
        OrderState::Cancelled,
        OrderState::Reviewing,
    ];

    /// Wire string, e.g. `"pending_payment"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::OnHold => "on_hold",
            OrderState::PendingPayment => "pending_payment",
            OrderState::Confirmed => "confirmed",
            OrderState::Processing => "processing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Returning => "returning",
            OrderState::Returned => "returned",
            OrderState::Refunded => "refunded",
            OrderState::Cancelled => "cancelled",
            OrderState::Reviewing => "reviewing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderState::Pending => "Pending",
            OrderState::OnHold => "On Hold",
            OrderState::PendingPayment => "Pending Payment",
            OrderState::Confirmed => "Confirmed",
            OrderState::Processing => "Processing",
            OrderState::Shipped => "Shipped",
            OrderState::Delivered => "Delivered",
            OrderState::Returning => "Returning",
            OrderState::Returned => "Returned",
            OrderState::Refunded => "Refunded",
            OrderState::Cancelled => "Cancelled",
            OrderState::Reviewing => "Reviewing",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OrderState::Pending => "Order is pending verification",
            OrderState::OnHold => "Order is on hold for verification",
            OrderState::PendingPayment => "Waiting for payment processing",
            OrderState::Confirmed => "Order confirmed and approved",
            OrderState::Processing => "Order is being processed",
            OrderState::Shipped => "Order has been shipped",
            OrderState::Delivered => "Order delivered to customer",
            OrderState::Returning => "Customer initiated return",
            OrderState::Returned => "Item returned successfully",
            OrderState::Refunded => "Refund processed",
            OrderState::Cancelled => "Order cancelled",
            OrderState::Reviewing => "Order is waiting for manual review",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Named transition requests understood by the server.
///
/// The set is closed and disjoint from [`OrderState`]. Whether a kind is
/// currently permitted for an order is decided by the server alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    PendingBiometricalVerification,
    NoVerificationNeeded,
    PaymentFailed,
    OrderCancelled,
    BiometricalVerificationSuccessful,
    VerificationFailed,
    OrderCancelledByUser,
    PaymentSuccessful,
    PreparingShipment,
    ItemDispatched,
    ItemReceivedByCustomer,
    DeliveryIssue,
    ReturnInitiatedByCustomer,
    ItemReceivedBack,
    RefundProcessed,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::PendingBiometricalVerification,
        EventKind::NoVerificationNeeded,
        EventKind::PaymentFailed,
        EventKind::OrderCancelled,
        EventKind::BiometricalVerificationSuccessful,
        EventKind::VerificationFailed,
        EventKind::OrderCancelledByUser,
        EventKind::PaymentSuccessful,
        EventKind::PreparingShipment,
        EventKind::ItemDispatched,
        EventKind::ItemReceivedByCustomer,
        EventKind::DeliveryIssue,
        EventKind::ReturnInitiatedByCustomer,
        EventKind::ItemReceivedBack,
        EventKind::RefundProcessed,
    ];

    /// Wire string, e.g. `"paymentSuccessful"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PendingBiometricalVerification => "pendingBiometricalVerification",
            EventKind::NoVerificationNeeded => "noVerificationNeeded",
            EventKind::PaymentFailed => "paymentFailed",
            EventKind::OrderCancelled => "orderCancelled",
            EventKind::BiometricalVerificationSuccessful => "biometricalVerificationSuccessful",
            EventKind::VerificationFailed => "verificationFailed",
            EventKind::OrderCancelledByUser => "orderCancelledByUser",
            EventKind::PaymentSuccessful => "paymentSuccessful",
            EventKind::PreparingShipment => "preparingShipment",
            EventKind::ItemDispatched => "itemDispatched",
            EventKind::ItemReceivedByCustomer => "itemReceivedByCustomer",
            EventKind::DeliveryIssue => "deliveryIssue",
            EventKind::ReturnInitiatedByCustomer => "returnInitiatedByCustomer",
            EventKind::ItemReceivedBack => "itemReceivedBack",
            EventKind::RefundProcessed => "refundProcessed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known [`EventKind`] wire names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        EventKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == t)
            .ok_or_else(|| UnknownEventKind(t.to_string()))
    }
}

/// Turn a camelCase event name into a title-cased label
/// (`"itemDispatched"` -> `"Item Dispatched"`).
///
/// Used for history entries whose event type is not in the catalog.
pub fn humanize_event_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            out.push(' ');
            out.push(ch);
        } else if ch == '_' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A purchase record as served by `GET /orders/{id}`.
///
/// The client only ever holds a cached copy; it is replaced wholesale after
/// every reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub product_ids: Vec<String>,
    pub amount: f64,
    pub state: OrderState,
    #[serde(default, deserialize_with = "metadata::deserialize")]
    pub metadata: Metadata,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// `POST /orders` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub product_ids: Vec<String>,
    pub amount: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// `POST /orders/{id}/events` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEventRequest {
    pub event_type: EventKind,
    #[serde(default)]
    pub metadata: Metadata,
}

/// `POST /orders/{id}/events` response: the server's verdict on a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub order_id: String,
    pub old_state: OrderState,
    pub new_state: OrderState,
    pub event_type: EventKind,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub processed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One past transition. `old_state` is `None` for the creation entry.
///
/// `event_type` stays a plain string: history may contain server-internal
/// events (e.g. `"order_created"`) that are not submittable kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_type: String,
    pub old_state: Option<OrderState>,
    pub new_state: OrderState,
    #[serde(default, deserialize_with = "metadata::deserialize")]
    pub metadata: Metadata,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// `GET /orders/{id}/history` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHistory {
    pub order_id: String,
    #[serde(default)]
    pub events: Vec<OrderEvent>,
    #[serde(default)]
    pub total_events: usize,
}

// ---------------------------------------------------------------------------
// Allowed events
// ---------------------------------------------------------------------------

/// `GET /api/v2/orders/{id}/allowed-events-filtered` response.
///
/// The server sends more diagnostic fields (`base_events`, `threshold`, ...);
/// only these two are consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredAllowedEvents {
    pub filtered_events: Vec<String>,
    #[serde(default)]
    pub small_order_rule_applied: bool,
}
