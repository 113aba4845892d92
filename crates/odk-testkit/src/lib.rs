//! odk-testkit
//!
//! Test doubles for the order service boundary. [`ScriptedOrderService`]
//! implements both service traits in memory; `fixtures` builds the records
//! scenarios start from. Scenario tests for the workflow live under `tests/`.

pub mod fixtures;
pub mod scripted;

pub use scripted::{
    allowed_for, next_state, Call, Endpoint, ScriptedOrderService, SubmissionHold,
};
