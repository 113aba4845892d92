//! Client-observable interaction phase for one order detail view.
//!
//! ```text
//!   Idle ──Select(confirming)──► Confirming ──Confirm──► Submitting ──Complete──► Idle
//!    │                              │                        ▲
//!    │                              └──Cancel──► Idle        │
//!    └──Select(immediate)────────────────────────────────────┘
//! ```
//!
//! While `Submitting` the only legal input is `Complete` (success or
//! failure). Every other combination is a [`PhaseError`] and leaves the phase
//! untouched.

use odk_schemas::EventKind;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting for the operator to confirm or cancel `kind`.
    Confirming(EventKind),
    /// A request for `kind` is in flight.
    Submitting(EventKind),
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Confirming(_) => "confirming",
            Phase::Submitting(_) => "submitting",
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseInput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    /// Operator picked an event. `requires_confirmation` comes from the catalog.
    Select {
        kind: EventKind,
        requires_confirmation: bool,
    },
    Confirm,
    Cancel,
    /// The in-flight request finished, whatever the result.
    Complete,
}

// ---------------------------------------------------------------------------
// PhaseError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseError {
    pub from: Phase,
    pub input: PhaseInput,
}

impl std::fmt::Display for PhaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal interaction transition: {} + {:?}",
            self.from.as_str(),
            self.input
        )
    }
}

impl std::error::Error for PhaseError {}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

impl Phase {
    /// Apply `input` in place.
    ///
    /// # Errors
    /// [`PhaseError`] for illegal combinations; `self` is unchanged.
    pub fn apply(&mut self, input: PhaseInput) -> Result<(), PhaseError> {
        use Phase::*;
        use PhaseInput::*;

        let next = match (*self, input) {
            (
                Idle,
                Select {
                    kind,
                    requires_confirmation: true,
                },
            ) => Confirming(kind),
            (
                Idle,
                Select {
                    kind,
                    requires_confirmation: false,
                },
            ) => Submitting(kind),

            (Confirming(kind), Confirm) => Submitting(kind),
            (Confirming(_), Cancel) => Idle,

            (Submitting(_), Complete) => Idle,

            (from, input) => return Err(PhaseError { from, input }),
        };

        *self = next;
        Ok(())
    }
}
