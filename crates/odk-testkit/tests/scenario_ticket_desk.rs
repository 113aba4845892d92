//! Scenario: support agents list, open and move tickets. Every status change
//! is tagged with who made it and is followed by a fresh read.

use std::sync::Arc;

use odk_client::ServiceError;
use odk_schemas::{MetaValue, TicketStatus};
use odk_testkit::{fixtures, Endpoint, ScriptedOrderService};
use odk_workflow::tickets::{status_tally, total_amount};
use odk_workflow::{TicketDesk, TicketError};

fn desk() -> (Arc<ScriptedOrderService>, TicketDesk<ScriptedOrderService>) {
    let svc = Arc::new(ScriptedOrderService::new());
    svc.insert_ticket(fixtures::ticket("t-1", "o-1", TicketStatus::Open, 100.0));
    svc.insert_ticket(fixtures::ticket("t-2", "o-1", TicketStatus::InProgress, 50.0));
    svc.insert_ticket(fixtures::ticket("t-3", "o-2", TicketStatus::Open, 20.0));
    let desk = TicketDesk::new(Arc::clone(&svc));
    (svc, desk)
}

#[tokio::test]
async fn set_status_patches_then_rereads() {
    let (svc, desk) = desk();

    let ticket = desk
        .set_status("t-1", TicketStatus::Resolved, "  refunded manually ")
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);

    let endpoints: Vec<Endpoint> = svc.calls().iter().map(|c| c.endpoint).collect();
    assert_eq!(endpoints, [Endpoint::UpdateTicketStatus, Endpoint::GetTicket]);

    let calls = svc.calls();
    let body = calls[0].body.as_ref().unwrap();
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["metadata"]["updated_by"], "support_agent");
    assert_eq!(body["metadata"]["update_notes"], "refunded manually");
    assert!(body["metadata"]["updated_at"].is_string());

    // The server merged the tags into the stored ticket.
    assert_eq!(
        ticket.metadata.get("updated_by"),
        Some(&MetaValue::from("support_agent"))
    );
    assert_eq!(svc.ticket("t-1").unwrap().status, TicketStatus::Resolved);
}

#[tokio::test]
async fn missing_ticket_is_not_found() {
    let (svc, desk) = desk();

    let err = desk.open("ghost").await.unwrap_err();
    assert_eq!(err, TicketError::NotFound);
    assert_eq!(err.to_string(), "Ticket not found");

    let err = desk
        .set_status("ghost", TicketStatus::Closed, "")
        .await
        .unwrap_err();
    assert_eq!(err, TicketError::NotFound);
    // No re-read after a failed update.
    assert_eq!(svc.count(Endpoint::GetTicket), 1);
}

#[tokio::test]
async fn update_failure_is_reported_with_server_detail() {
    let (svc, desk) = desk();
    svc.fail_next(
        Endpoint::UpdateTicketStatus,
        ServiceError::Rejected {
            status: 422,
            detail: Some("Invalid status".into()),
        },
    );

    let err = desk
        .set_status("t-1", TicketStatus::Closed, "")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to update ticket status: Invalid status");
    assert_eq!(svc.ticket("t-1").unwrap().status, TicketStatus::Open);
    assert_eq!(svc.count(Endpoint::GetTicket), 0);
}

#[tokio::test]
async fn list_filters_and_tallies() {
    let (_svc, desk) = desk();

    let all = desk.list(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let open = desk.list(Some(TicketStatus::Open)).await.unwrap();
    assert_eq!(open.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["t-1", "t-3"]);

    let tally = status_tally(&all);
    assert_eq!(tally[&TicketStatus::Open], 2);
    assert_eq!(tally[&TicketStatus::InProgress], 1);
    assert_eq!(tally[&TicketStatus::Closed], 0);
}

#[tokio::test]
async fn tickets_for_one_order() {
    let (svc, desk) = desk();

    let tickets = desk.for_order("o-1").await.unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(total_amount(&tickets), 150.0);
    assert_eq!(svc.calls()[0].target.as_deref(), Some("o-1"));
}

#[tokio::test]
async fn stats_report_counts_and_averages() {
    let (_svc, desk) = desk();

    let stats = desk.stats().await.unwrap();
    assert_eq!(stats.total_tickets, 3);
    let open = &stats.by_status[&TicketStatus::Open];
    assert_eq!(open.count, 2);
    assert_eq!(open.avg_amount, 60.0);
    assert!(!stats.by_status.contains_key(&TicketStatus::Closed));
}
