//! Static per-kind event configuration.
//!
//! The catalog is the only place that decides whether an event kind needs an
//! explicit confirmation step. Severity is presentation-only.

use odk_schemas::{humanize_event_name, EventKind};

/// Visual weight of an event action. Carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Default,
    Destructive,
    Outline,
    Secondary,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "default",
            Severity::Destructive => "destructive",
            Severity::Outline => "outline",
            Severity::Secondary => "secondary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventProfile {
    pub kind: EventKind,
    pub label: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub requires_confirmation: bool,
}

const fn entry(
    kind: EventKind,
    label: &'static str,
    description: &'static str,
    severity: Severity,
    requires_confirmation: bool,
) -> EventProfile {
    EventProfile {
        kind,
        label,
        description,
        severity,
        requires_confirmation,
    }
}

/// Catalog entry for `kind`.
pub fn profile(kind: EventKind) -> EventProfile {
    use EventKind::*;
    use Severity::*;

    match kind {
        PendingBiometricalVerification => entry(
            kind,
            "Require Verification",
            "Put order on hold for biometrical verification",
            Outline,
            true,
        ),
        NoVerificationNeeded => entry(
            kind,
            "Skip Verification",
            "Skip verification and proceed to payment",
            Default,
            false,
        ),
        PaymentFailed => entry(kind, "Payment Failed", "Mark payment as failed", Destructive, true),
        OrderCancelled => entry(kind, "Cancel Order", "Cancel order (system)", Destructive, true),
        BiometricalVerificationSuccessful => entry(
            kind,
            "Verification Success",
            "Biometrical verification successful",
            Default,
            false,
        ),
        VerificationFailed => entry(
            kind,
            "Verification Failed",
            "Verification failed, cancel order",
            Destructive,
            true,
        ),
        OrderCancelledByUser => entry(
            kind,
            "Cancel by User",
            "User requested cancellation",
            Destructive,
            true,
        ),
        PaymentSuccessful => entry(
            kind,
            "Payment Success",
            "Payment processed successfully",
            Default,
            false,
        ),
        PreparingShipment => entry(
            kind,
            "Prepare Shipment",
            "Start preparing order for shipment",
            Default,
            false,
        ),
        ItemDispatched => entry(kind, "Dispatch Item", "Item has been dispatched", Default, false),
        ItemReceivedByCustomer => entry(
            kind,
            "Mark Delivered",
            "Customer received the item",
            Default,
            false,
        ),
        DeliveryIssue => entry(
            kind,
            "Delivery Issue",
            "There was an issue with delivery",
            Outline,
            true,
        ),
        ReturnInitiatedByCustomer => entry(
            kind,
            "Initiate Return",
            "Customer wants to return item",
            Outline,
            true,
        ),
        ItemReceivedBack => entry(kind, "Item Received", "Returned item received", Default, false),
        RefundProcessed => entry(
            kind,
            "Process Refund",
            "Process refund to customer",
            Default,
            false,
        ),
    }
}

pub fn requires_confirmation(kind: EventKind) -> bool {
    profile(kind).requires_confirmation
}

/// Label for a raw event name as it appears in history.
///
/// History may carry names this client has no catalog entry for (including
/// the synthetic creation entry); those get a humanized form of the raw name.
pub fn label_for_name(raw: &str) -> String {
    match raw.parse::<EventKind>() {
        Ok(kind) => profile(kind).label.to_string(),
        Err(_) => humanize_event_name(raw),
    }
}
