//! Scenario: an operator fills the create form; the draft validates locally
//! and only a valid draft reaches the service, which assigns the id and the
//! initial state.

use std::sync::Arc;

use odk_client::OrderService;
use odk_schemas::{MetaValue, OrderState};
use odk_testkit::{fixtures, Endpoint, ScriptedOrderService};
use odk_workflow::display::customer_info;
use odk_workflow::{CreateOrderDraft, DraftError, OrderDetailView, Priority, WorkflowSettings};

fn draft() -> CreateOrderDraft {
    let mut d = CreateOrderDraft::new();
    d.add_product(" PROD-001 ").unwrap();
    d.add_product("PROD-002").unwrap();
    d.amount = 149.99;
    d.customer_name = "Grace Hopper".into();
    d.customer_email = "grace@example.com".into();
    d.priority = Some(Priority::High);
    d
}

#[tokio::test]
async fn valid_draft_creates_pending_order() {
    let svc = Arc::new(ScriptedOrderService::new());

    let req = draft()
        .into_request("web_interface", fixtures::fixture_time())
        .unwrap();
    let order = svc.create_order(&req).await.unwrap();

    assert_eq!(order.id, "ORD-000001");
    assert_eq!(order.state, OrderState::Pending);
    assert_eq!(order.product_ids, ["PROD-001", "PROD-002"]);

    let body = svc.calls()[0].body.clone().unwrap();
    assert_eq!(body["metadata"]["priority"], "high");
    assert_eq!(body["metadata"]["source"], "web_form");
    assert_eq!(body["metadata"]["created_via"], "web_interface");
    assert!(body["metadata"].get("notes").is_none());

    let info = customer_info(&order);
    assert_eq!(info.name, Some("Grace Hopper"));
    assert_eq!(info.priority, Some("high"));
    assert_eq!(
        order.metadata.get("customer_email"),
        Some(&MetaValue::from("grace@example.com"))
    );
}

#[tokio::test]
async fn created_order_opens_with_its_first_events() {
    let svc = Arc::new(ScriptedOrderService::new());
    let req = draft()
        .into_request("web_interface", fixtures::fixture_time())
        .unwrap();
    let order = svc.create_order(&req).await.unwrap();

    let mut view =
        OrderDetailView::new(Arc::clone(&svc), order.id, &WorkflowSettings::default().immediate());
    view.load().await.unwrap();

    assert_eq!(view.order().unwrap().state, OrderState::Pending);
    assert_eq!(view.history().unwrap().total_events, 1);
    assert!(!view.allowed_events().is_empty());
}

#[test]
fn invalid_draft_never_builds_a_request() {
    let mut d = draft();
    d.amount = 0.0;
    assert_eq!(
        d.into_request("web_interface", fixtures::fixture_time()),
        Err(DraftError::AmountTooSmall)
    );

    let mut d = draft();
    d.customer_email = "not-an-email".into();
    assert_eq!(d.validate(), Err(DraftError::InvalidEmail));

    let mut d = draft();
    assert!(d.remove_product("PROD-001"));
    assert!(d.remove_product("PROD-002"));
    assert_eq!(d.validate(), Err(DraftError::NoProducts));
}

#[tokio::test]
async fn sequential_ids_per_service() {
    let svc = Arc::new(ScriptedOrderService::new());
    for expected in ["ORD-000001", "ORD-000002"] {
        let req = draft()
            .into_request("cli", fixtures::fixture_time())
            .unwrap();
        assert_eq!(svc.create_order(&req).await.unwrap().id, expected);
    }
    assert_eq!(svc.count(Endpoint::CreateOrder), 2);
}
