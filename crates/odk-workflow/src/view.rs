//! Order detail view: owns the cached snapshot and drives one interaction
//! at a time through gate, controller and reconciliation.
//!
//! The cached `OrderSnapshot` is written only by [`OrderDetailView::load`]
//! and by the reconciliation that follows an accepted event.

use std::sync::Arc;

use odk_client::OrderService;
use odk_schemas::{EventKind, Metadata, Order, OrderHistory};
use tracing::{info, warn};

use crate::controller::{SubmissionController, SubmitOutcome};
use crate::display::SMALL_ORDER_NOTICE;
use crate::gate::{ConfirmationGate, ConfirmationInput, GateDecision};
use crate::phase::{Phase, PhaseError, PhaseInput};
use crate::reconcile::{self, OrderSnapshot, RefreshError};
use crate::{catalog, WorkflowSettings};

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A message for the operator. Front ends decide how to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The kind is not in the server's current allowed set (or nothing is
    /// loaded yet). Nothing was sent.
    NotOffered(EventKind),
    /// The kind needs confirmation; call `confirm` or `cancel_confirmation`.
    ConfirmationOpened(EventKind),
    Submitted(SubmitOutcome),
}

// ---------------------------------------------------------------------------
// OrderDetailView
// ---------------------------------------------------------------------------

pub struct OrderDetailView<S: ?Sized> {
    service: Arc<S>,
    order_id: String,
    prefer_filtered: bool,
    controller: SubmissionController<S>,
    gate: ConfirmationGate,
    phase: Phase,
    snapshot: Option<OrderSnapshot>,
    notices: Vec<Notice>,
    navigate_away: Option<String>,
}

impl<S: OrderService + ?Sized> OrderDetailView<S> {
    pub fn new(service: Arc<S>, order_id: impl Into<String>, settings: &WorkflowSettings) -> Self {
        Self {
            controller: SubmissionController::new(Arc::clone(&service), settings),
            service,
            order_id: order_id.into(),
            prefer_filtered: settings.prefer_filtered,
            gate: ConfirmationGate::new(),
            phase: Phase::Idle,
            snapshot: None,
            notices: Vec::new(),
            navigate_away: None,
        }
    }

    // -- read side ----------------------------------------------------------

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> Option<&OrderSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn order(&self) -> Option<&Order> {
        self.snapshot.as_ref().map(|s| &s.order)
    }

    pub fn allowed_events(&self) -> &[EventKind] {
        self.snapshot
            .as_ref()
            .map(|s| s.allowed.as_slice())
            .unwrap_or(&[])
    }

    pub fn history(&self) -> Option<&OrderHistory> {
        self.snapshot.as_ref().map(|s| &s.history)
    }

    pub fn pending_confirmation(&self) -> Option<EventKind> {
        self.gate.target()
    }

    /// Set when the order is gone; carries the message to show on the way out.
    pub fn navigate_away(&self) -> Option<&str> {
        self.navigate_away.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -- loading ------------------------------------------------------------

    /// Initial fetch (or manual refresh) of order, allowed events and history.
    pub async fn load(&mut self) -> Result<(), RefreshError> {
        let result =
            reconcile::refresh(self.service.as_ref(), &self.order_id, self.prefer_filtered).await;
        self.apply_refresh(result)
    }

    fn apply_refresh(
        &mut self,
        result: Result<OrderSnapshot, RefreshError>,
    ) -> Result<(), RefreshError> {
        match result {
            Ok(snapshot) => {
                if snapshot.small_order_rule_applied {
                    self.notices.push(Notice::info(SMALL_ORDER_NOTICE));
                }
                self.snapshot = Some(snapshot);
                Ok(())
            }
            Err(e) => {
                if matches!(e, RefreshError::NotFound) {
                    self.navigate_away = Some(e.user_message());
                }
                self.notices.push(Notice::error(e.user_message()));
                Err(e)
            }
        }
    }

    // -- interaction --------------------------------------------------------

    /// Operator picked `kind`.
    ///
    /// Kinds the server does not currently offer are refused locally. Kinds
    /// that need confirmation only open the confirmation step; everything
    /// else is submitted right away.
    pub async fn select_event(&mut self, kind: EventKind) -> Result<Selection, PhaseError> {
        self.settle_phase();

        if !self.phase.is_idle() {
            return Err(PhaseError {
                from: self.phase,
                input: PhaseInput::Select {
                    kind,
                    requires_confirmation: catalog::requires_confirmation(kind),
                },
            });
        }

        let offered = self.snapshot.as_ref().is_some_and(|s| s.allows(kind));
        if !offered {
            warn!(order_id = %self.order_id, event = %kind, "event not in allowed set; refused");
            return Ok(Selection::NotOffered(kind));
        }

        match self.gate.select(kind) {
            GateDecision::Collect(kind) => {
                self.phase.apply(PhaseInput::Select {
                    kind,
                    requires_confirmation: true,
                })?;
                Ok(Selection::ConfirmationOpened(kind))
            }
            GateDecision::Dispatch { kind, metadata } => {
                self.phase.apply(PhaseInput::Select {
                    kind,
                    requires_confirmation: false,
                })?;
                Ok(Selection::Submitted(self.run_submission(kind, metadata).await))
            }
        }
    }

    /// Confirm the pending event with the collected reason/notes.
    pub async fn confirm(&mut self, input: ConfirmationInput) -> Result<SubmitOutcome, PhaseError> {
        self.settle_phase();
        self.phase.apply(PhaseInput::Confirm)?;

        let Some((kind, metadata)) = self.gate.confirm(&input) else {
            // Phase and gate move together; a Confirming phase always has a target.
            self.phase = Phase::Idle;
            return Err(PhaseError {
                from: Phase::Idle,
                input: PhaseInput::Confirm,
            });
        };

        Ok(self.run_submission(kind, metadata).await)
    }

    /// Discard the pending confirmation. Nothing is submitted.
    pub fn cancel_confirmation(&mut self) -> Result<EventKind, PhaseError> {
        let from = self.phase;
        self.phase.apply(PhaseInput::Cancel)?;
        self.gate.cancel().ok_or(PhaseError {
            from,
            input: PhaseInput::Cancel,
        })
    }

    async fn run_submission(&mut self, kind: EventKind, metadata: Metadata) -> SubmitOutcome {
        let mut refreshed: Option<Result<OrderSnapshot, RefreshError>> = None;
        let slot = &mut refreshed;
        let service = self.service.as_ref();
        let order_id = self.order_id.as_str();
        let prefer_filtered = self.prefer_filtered;

        let outcome = self
            .controller
            .submit_with(order_id, kind, metadata, |_| async move {
                *slot = Some(reconcile::refresh(service, order_id, prefer_filtered).await);
            })
            .await;

        // `Complete` is always legal from Submitting.
        let _ = self.phase.apply(PhaseInput::Complete);

        match &outcome {
            SubmitOutcome::Accepted(accepted) => {
                info!(order_id = %self.order_id, event = %kind, "reconciling after accepted event");
                self.notices.push(Notice::success(accepted.summary()));
                if let Some(result) = refreshed {
                    // A failed refresh leaves the old snapshot; the event itself stands.
                    let _ = self.apply_refresh(result);
                }
            }
            SubmitOutcome::NotFound { message } => {
                self.navigate_away = Some(reconcile::ORDER_NOT_FOUND.to_string());
                self.notices.push(Notice::error(message.clone()));
            }
            SubmitOutcome::Failed { message } => {
                self.notices.push(Notice::error(message.clone()));
            }
            SubmitOutcome::Dropped => {}
        }

        outcome
    }

    /// A submission future dropped mid-flight leaves `Submitting` behind with
    /// an idle controller; fold that back to `Idle`.
    fn settle_phase(&mut self) {
        if matches!(self.phase, Phase::Submitting(_)) && !self.controller.is_busy() {
            let _ = self.phase.apply(PhaseInput::Complete);
        }
    }
}
