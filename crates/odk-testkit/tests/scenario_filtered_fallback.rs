//! Scenario: the view prefers the business-rule filtered allowed-events
//! endpoint, falls back once to the classic endpoint when it fails, and
//! surfaces the small-order rule when the server reports it.

use std::sync::Arc;

use odk_client::ServiceError;
use odk_schemas::{EventKind, OrderState};
use odk_testkit::{allowed_for, fixtures, Endpoint, ScriptedOrderService};
use odk_workflow::{NoticeLevel, OrderDetailView, RefreshError, WorkflowSettings};

fn service(state: OrderState) -> Arc<ScriptedOrderService> {
    let svc = Arc::new(ScriptedOrderService::new());
    svc.insert_order(fixtures::order("o-1", state, 12.5));
    svc
}

fn view(svc: &Arc<ScriptedOrderService>, prefer_filtered: bool) -> OrderDetailView<ScriptedOrderService> {
    let settings = WorkflowSettings {
        prefer_filtered,
        ..WorkflowSettings::default().immediate()
    };
    OrderDetailView::new(Arc::clone(svc), "o-1", &settings)
}

#[tokio::test]
async fn small_order_rule_hides_verification_and_adds_notice() {
    let svc = service(OrderState::Pending);
    svc.set_small_order_rule("o-1", true);
    let mut view = view(&svc, true);

    view.load().await.unwrap();

    assert!(!view
        .allowed_events()
        .contains(&EventKind::PendingBiometricalVerification));
    assert!(view.allowed_events().contains(&EventKind::NoVerificationNeeded));
    assert!(view.snapshot().unwrap().small_order_rule_applied);

    let notices = view.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert_eq!(notices[0].message, "Verification skipped by business rules");
    assert_eq!(svc.count(Endpoint::AllowedEvents), 0);
}

#[tokio::test]
async fn filtered_failure_falls_back_to_classic_once() {
    let svc = service(OrderState::Pending);
    svc.set_small_order_rule("o-1", true);
    svc.fail_next(
        Endpoint::FilteredAllowedEvents,
        ServiceError::Rejected {
            status: 500,
            detail: Some("rules engine down".into()),
        },
    );
    let mut view = view(&svc, true);

    view.load().await.unwrap();

    assert_eq!(svc.count(Endpoint::FilteredAllowedEvents), 1);
    assert_eq!(svc.count(Endpoint::AllowedEvents), 1);
    // The classic endpoint knows nothing about business rules.
    assert_eq!(view.allowed_events(), allowed_for(OrderState::Pending));
    assert!(!view.snapshot().unwrap().small_order_rule_applied);
    assert!(view.notices().is_empty());
}

#[tokio::test]
async fn classic_failure_after_fallback_is_reported() {
    let svc = service(OrderState::Pending);
    svc.fail_next(
        Endpoint::FilteredAllowedEvents,
        ServiceError::Transport("connection reset".into()),
    );
    svc.fail_next(
        Endpoint::AllowedEvents,
        ServiceError::Transport("connection reset".into()),
    );
    let mut view = view(&svc, true);

    let err = view.load().await.unwrap_err();
    assert!(matches!(err, RefreshError::Failed(_)));
    assert!(view.snapshot().is_none());
    assert!(view.navigate_away().is_none());
    assert_eq!(
        view.notices()[0].message,
        "Failed to fetch order data: connection reset"
    );
    assert_eq!(svc.count(Endpoint::AllowedEvents), 1);
}

#[tokio::test]
async fn classic_only_when_filtered_is_disabled() {
    let svc = service(OrderState::Pending);
    svc.set_small_order_rule("o-1", true);
    let mut view = view(&svc, false);

    view.load().await.unwrap();

    assert_eq!(svc.count(Endpoint::FilteredAllowedEvents), 0);
    assert_eq!(svc.count(Endpoint::AllowedEvents), 1);
    assert_eq!(svc.count(Endpoint::GetOrder), 1);
    assert_eq!(svc.count(Endpoint::History), 1);
    assert!(view
        .allowed_events()
        .contains(&EventKind::PendingBiometricalVerification));
}

#[tokio::test]
async fn reconciliation_after_accept_uses_the_same_preference() {
    let svc = service(OrderState::Pending);
    let mut view = view(&svc, false);
    view.load().await.unwrap();
    svc.clear_calls();

    view.select_event(EventKind::NoVerificationNeeded)
        .await
        .unwrap();

    assert_eq!(view.order().unwrap().state, OrderState::PendingPayment);
    assert_eq!(svc.count(Endpoint::AllowedEvents), 1);
    assert_eq!(svc.count(Endpoint::FilteredAllowedEvents), 0);
}

#[tokio::test]
async fn config_layer_can_switch_off_the_filtered_endpoint() {
    let loaded = odk_config::load_layered_yaml_from_strings(&[
        "submission:\n  release_delay_ms: 0\n",
        "allowed_events:\n  prefer_filtered: false\n",
    ])
    .unwrap();
    let settings = WorkflowSettings::from_config(&loaded.client().unwrap());
    assert!(!settings.prefer_filtered);

    let svc = service(OrderState::Pending);
    let mut view = OrderDetailView::new(Arc::clone(&svc), "o-1", &settings);
    view.load().await.unwrap();

    assert_eq!(svc.count(Endpoint::FilteredAllowedEvents), 0);
    assert_eq!(svc.count(Endpoint::AllowedEvents), 1);
}
