//! odk-workflow
//!
//! Order event submission and confirmation workflow.
//!
//! - `catalog`    – static per-kind configuration (label, severity, confirmation)
//! - `gate`       – confirmation gate: dispatch now or collect reason/notes
//! - `controller` – one-in-flight submission controller
//! - `phase`      – Idle / Confirming / Submitting interaction machine
//! - `reconcile`  – post-transition refresh of order, allowed events, history
//! - `view`       – order detail view tying the above together
//! - `tickets`    – support ticket desk
//! - `draft`      – order creation draft validation
//! - `display`    – metadata accessors and display strings
//!
//! The server is the only authority on transitions. Nothing here computes a
//! next state.

pub mod catalog;
pub mod controller;
pub mod display;
pub mod draft;
pub mod gate;
pub mod phase;
pub mod reconcile;
pub mod tickets;
pub mod view;

use std::time::Duration;

use odk_config::ClientConfig;

pub use catalog::{EventProfile, Severity};
pub use controller::{EventAccepted, SubmissionController, SubmitOutcome};
pub use draft::{CreateOrderDraft, DraftError, Priority};
pub use gate::{ConfirmationGate, ConfirmationInput, GateDecision};
pub use phase::{Phase, PhaseError, PhaseInput};
pub use reconcile::{refresh, OrderSnapshot, RefreshError};
pub use tickets::{TicketDesk, TicketError};
pub use view::{Notice, NoticeLevel, OrderDetailView, Selection};

/// Knobs the workflow reads from client config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// `processed_via` tag on every submission.
    pub channel: String,
    /// How long busy stays set after a success before the callback runs.
    pub release_delay: Duration,
    /// Use the business-rule filtered allowed-events endpoint first.
    pub prefer_filtered: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            channel: "web_interface".to_string(),
            release_delay: Duration::from_millis(100),
            prefer_filtered: true,
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            channel: cfg.submission.channel.clone(),
            release_delay: Duration::from_millis(cfg.submission.release_delay_ms),
            prefer_filtered: cfg.allowed_events.prefer_filtered,
        }
    }

    /// Same settings with no release delay. Tests and the CLI use this.
    pub fn immediate(mut self) -> Self {
        self.release_delay = Duration::ZERO;
        self
    }
}
