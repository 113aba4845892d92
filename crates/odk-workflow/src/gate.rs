//! Confirmation gate: immediate dispatch or reason/notes collection.

use odk_schemas::{EventKind, MetaValue, Metadata};

use crate::catalog;

/// Free-text fields collected by the confirmation step. Both are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationInput {
    pub reason: String,
    pub notes: String,
}

impl ConfirmationInput {
    pub fn new(reason: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            notes: notes.into(),
        }
    }

    /// Metadata for the submission: trimmed `reason` / `notes`, each present
    /// only when non-empty after trimming.
    pub fn to_metadata(&self) -> Metadata {
        let mut out = Metadata::new();
        for (key, raw) in [("reason", &self.reason), ("notes", &self.notes)] {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                out.insert(key.to_string(), MetaValue::from(trimmed));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Submit now with this metadata (always empty for immediate kinds).
    Dispatch { kind: EventKind, metadata: Metadata },
    /// Hold `kind` until [`ConfirmationGate::confirm`] or
    /// [`ConfirmationGate::cancel`].
    Collect(EventKind),
}

/// Holds the event awaiting confirmation, if any.
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    target: Option<EventKind>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<EventKind> {
        self.target
    }

    pub fn select(&mut self, kind: EventKind) -> GateDecision {
        if catalog::requires_confirmation(kind) {
            self.target = Some(kind);
            GateDecision::Collect(kind)
        } else {
            GateDecision::Dispatch {
                kind,
                metadata: Metadata::new(),
            }
        }
    }

    /// Release the held event with the collected metadata.
    ///
    /// `None` when nothing is awaiting confirmation.
    pub fn confirm(&mut self, input: &ConfirmationInput) -> Option<(EventKind, Metadata)> {
        let kind = self.target.take()?;
        Some((kind, input.to_metadata()))
    }

    /// Drop the held event; nothing is submitted.
    pub fn cancel(&mut self) -> Option<EventKind> {
        self.target.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_kind_dispatches_with_empty_metadata() {
        let mut gate = ConfirmationGate::new();
        let d = gate.select(EventKind::PaymentSuccessful);
        assert_eq!(
            d,
            GateDecision::Dispatch {
                kind: EventKind::PaymentSuccessful,
                metadata: Metadata::new()
            }
        );
        assert_eq!(gate.target(), None);
    }

    #[test]
    fn confirming_kind_is_held() {
        let mut gate = ConfirmationGate::new();
        assert_eq!(
            gate.select(EventKind::OrderCancelledByUser),
            GateDecision::Collect(EventKind::OrderCancelledByUser)
        );
        assert_eq!(gate.target(), Some(EventKind::OrderCancelledByUser));
    }

    #[test]
    fn confirm_trims_and_keeps_non_empty_fields() {
        let mut gate = ConfirmationGate::new();
        gate.select(EventKind::OrderCancelledByUser);
        let (kind, md) = gate
            .confirm(&ConfirmationInput::new("  customer changed mind ", "   "))
            .unwrap();

        assert_eq!(kind, EventKind::OrderCancelledByUser);
        assert_eq!(md.get("reason"), Some(&MetaValue::from("customer changed mind")));
        assert!(!md.contains_key("notes"));
        assert_eq!(gate.target(), None);
    }

    #[test]
    fn blank_input_yields_empty_metadata() {
        assert!(ConfirmationInput::new("", "\t\n").to_metadata().is_empty());
    }

    #[test]
    fn cancel_discards_target() {
        let mut gate = ConfirmationGate::new();
        gate.select(EventKind::DeliveryIssue);
        assert_eq!(gate.cancel(), Some(EventKind::DeliveryIssue));
        assert!(gate.confirm(&ConfirmationInput::default()).is_none());
    }
}
