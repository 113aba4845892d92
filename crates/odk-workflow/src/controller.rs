//! Event Submission Controller.
//!
//! # Invariants
//!
//! 1. **One in flight.** A controller issues at most one transition request at
//!    a time. A call made while busy returns [`SubmitOutcome::Dropped`]
//!    without touching the service: no queue, no error.
//! 2. **Busy always clears.** The flag is held by a [`BusyGuard`] whose `Drop`
//!    releases it, so failure paths and a dropped in-flight future both
//!    leave the controller usable.
//! 3. **No local state change.** The controller never edits a cached order.
//!    Reconciliation is driven by the completion callback, which only runs
//!    after a success.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use odk_client::OrderService;
use odk_schemas::{EventKind, MetaValue, Metadata, OrderState, ProcessEventRequest};
use tracing::{debug, info, warn};

use crate::WorkflowSettings;

/// Metadata key carrying the submission channel tag.
pub const PROCESSED_VIA: &str = "processed_via";
/// Metadata key carrying the client-side submission timestamp.
pub const PROCESSED_AT: &str = "processed_at";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Server's acknowledgement of an accepted transition.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAccepted {
    pub order_id: String,
    pub kind: EventKind,
    pub old_state: OrderState,
    pub new_state: OrderState,
    pub processed_at: DateTime<Utc>,
}

impl EventAccepted {
    pub fn summary(&self) -> String {
        format!(
            "Event processed successfully! Order moved from {} to {}",
            self.old_state.label(),
            self.new_state.label()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(EventAccepted),
    /// Another submission was already in flight; nothing was sent.
    Dropped,
    /// The order no longer exists. Callers should leave the view.
    NotFound { message: String },
    /// Rejection or transport failure; `message` is ready for display.
    Failed { message: String },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

// ---------------------------------------------------------------------------
// BusyGuard
// ---------------------------------------------------------------------------

/// Holds the busy flag for the duration of one submission.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// SubmissionController
// ---------------------------------------------------------------------------

pub struct SubmissionController<S: ?Sized> {
    service: Arc<S>,
    busy: AtomicBool,
    channel: String,
    release_delay: Duration,
}

impl<S: OrderService + ?Sized> SubmissionController<S> {
    pub fn new(service: Arc<S>, settings: &WorkflowSettings) -> Self {
        Self {
            service,
            busy: AtomicBool::new(false),
            channel: settings.channel.clone(),
            release_delay: settings.release_delay,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Submit without a completion callback.
    pub async fn submit(
        &self,
        order_id: &str,
        kind: EventKind,
        metadata: Metadata,
    ) -> SubmitOutcome {
        self.submit_with(order_id, kind, metadata, |_| async {}).await
    }

    /// Submit `kind` for `order_id`.
    ///
    /// On success the busy flag is released after the configured delay and
    /// only then is `on_complete` awaited. `on_complete` never runs on
    /// failure or when the call is dropped as a duplicate.
    pub async fn submit_with<F, Fut>(
        &self,
        order_id: &str,
        kind: EventKind,
        metadata: Metadata,
        on_complete: F,
    ) -> SubmitOutcome
    where
        F: FnOnce(EventAccepted) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            debug!(order_id, event = %kind, "submission already in flight; dropped");
            return SubmitOutcome::Dropped;
        };

        let req = ProcessEventRequest {
            event_type: kind,
            metadata: stamp_metadata(&self.channel, metadata, Utc::now()),
        };

        info!(order_id, event = %kind, channel = %self.channel, "submitting event");

        match self.service.submit_event(order_id, &req).await {
            Ok(resp) => {
                let accepted = EventAccepted {
                    order_id: resp.order_id,
                    kind: resp.event_type,
                    old_state: resp.old_state,
                    new_state: resp.new_state,
                    processed_at: resp.processed_at,
                };
                info!(
                    order_id,
                    event = %kind,
                    old_state = %accepted.old_state,
                    new_state = %accepted.new_state,
                    "event accepted"
                );

                if !self.release_delay.is_zero() {
                    tokio::time::sleep(self.release_delay).await;
                }
                drop(guard);

                on_complete(accepted.clone()).await;
                SubmitOutcome::Accepted(accepted)
            }
            Err(e) if e.is_not_found() => {
                warn!(order_id, event = %kind, error = %e, "event target not found");
                SubmitOutcome::NotFound {
                    message: e.user_message(),
                }
            }
            Err(e) => {
                warn!(order_id, event = %kind, error = %e, "event submission failed");
                SubmitOutcome::Failed {
                    message: e.user_message(),
                }
            }
        }
    }
}

/// Standard metadata (`processed_via`, `processed_at`) with caller keys on top.
pub fn stamp_metadata(channel: &str, caller: Metadata, now: DateTime<Utc>) -> Metadata {
    let mut out = Metadata::new();
    out.insert(PROCESSED_VIA.to_string(), MetaValue::from(channel));
    out.insert(
        PROCESSED_AT.to_string(),
        MetaValue::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    out.extend(caller);
    out
}
