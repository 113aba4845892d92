//! Scenario: while a submission is pending, any further submission on the
//! same controller is dropped without a network call, and the busy flag is
//! cleared on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use odk_client::ServiceError;
use odk_schemas::{EventKind, Metadata, OrderState};
use odk_testkit::{fixtures, Endpoint, ScriptedOrderService};
use odk_workflow::{SubmissionController, SubmitOutcome, WorkflowSettings};

fn service() -> Arc<ScriptedOrderService> {
    let svc = Arc::new(ScriptedOrderService::new());
    svc.insert_order(fixtures::order("o-1", OrderState::PendingPayment, 150.0));
    svc
}

#[tokio::test]
async fn second_submission_while_pending_is_dropped() {
    let svc = service();
    let ctrl = SubmissionController::new(
        Arc::clone(&svc),
        &WorkflowSettings::default().immediate(),
    );
    let hold = svc.hold_next_submission();

    let first = ctrl.submit("o-1", EventKind::PaymentSuccessful, Metadata::new());
    let second = async {
        hold.entered().await;
        assert!(ctrl.is_busy());
        let dup_same = ctrl
            .submit("o-1", EventKind::PaymentSuccessful, Metadata::new())
            .await;
        let dup_other = ctrl
            .submit("o-1", EventKind::OrderCancelledByUser, Metadata::new())
            .await;
        hold.release();
        (dup_same, dup_other)
    };

    let (a, (b, c)) = tokio::join!(first, second);

    assert!(a.is_accepted());
    assert_eq!(b, SubmitOutcome::Dropped);
    assert_eq!(c, SubmitOutcome::Dropped);
    assert_eq!(svc.count(Endpoint::SubmitEvent), 1);
    assert!(!ctrl.is_busy());
    assert_eq!(svc.order("o-1").unwrap().state, OrderState::Confirmed);
}

#[tokio::test]
async fn busy_clears_after_delay_before_callback_runs() {
    let svc = service();
    let settings = WorkflowSettings {
        release_delay: Duration::from_millis(20),
        ..WorkflowSettings::default()
    };
    let ctrl = SubmissionController::new(Arc::clone(&svc), &settings);
    let callbacks = AtomicUsize::new(0);
    let counter = &callbacks;
    let ctrl_ref = &ctrl;

    let outcome = ctrl
        .submit_with("o-1", EventKind::PaymentSuccessful, Metadata::new(), |acc| {
            let busy_in_callback = ctrl_ref.is_busy();
            async move {
                assert!(!busy_in_callback, "busy must be cleared before the callback");
                assert_eq!(acc.new_state, OrderState::Confirmed);
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

    assert!(outcome.is_accepted());
    assert_eq!(callbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failures_clear_busy_and_skip_callback() {
    let svc = service();
    let ctrl = SubmissionController::new(
        Arc::clone(&svc),
        &WorkflowSettings::default().immediate(),
    );
    svc.fail_next(
        Endpoint::SubmitEvent,
        ServiceError::Rejected {
            status: 400,
            detail: Some("Payment gateway unavailable".into()),
        },
    );
    svc.fail_next(Endpoint::SubmitEvent, ServiceError::NotFound { detail: None });
    svc.fail_next(Endpoint::SubmitEvent, ServiceError::Transport(String::new()));

    let callbacks = AtomicUsize::new(0);
    let counter = &callbacks;
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let o = ctrl
            .submit_with("o-1", EventKind::PaymentSuccessful, Metadata::new(), |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(!ctrl.is_busy());
        outcomes.push(o);
    }

    assert_eq!(
        outcomes,
        vec![
            SubmitOutcome::Failed {
                message: "Payment gateway unavailable".into()
            },
            SubmitOutcome::NotFound {
                message: "Not found".into()
            },
            SubmitOutcome::Failed {
                message: "An unexpected error occurred".into()
            },
        ]
    );
    assert_eq!(callbacks.load(Ordering::SeqCst), 0);
    assert_eq!(svc.order("o-1").unwrap().state, OrderState::PendingPayment);
}

#[tokio::test]
async fn dropping_an_in_flight_submission_releases_busy() {
    let svc = service();
    let ctrl = SubmissionController::new(
        Arc::clone(&svc),
        &WorkflowSettings::default().immediate(),
    );
    let hold = svc.hold_next_submission();

    {
        let pending = ctrl.submit("o-1", EventKind::PaymentSuccessful, Metadata::new());
        tokio::select! {
            _ = pending => panic!("submission should be parked"),
            _ = hold.entered() => {}
        }
    }

    assert!(!ctrl.is_busy());
    let retry = ctrl
        .submit("o-1", EventKind::PaymentSuccessful, Metadata::new())
        .await;
    assert!(retry.is_accepted());
    assert_eq!(svc.count(Endpoint::SubmitEvent), 2);
}
