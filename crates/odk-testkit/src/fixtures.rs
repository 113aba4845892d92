//! Deterministic records for scenario tests.

use chrono::{DateTime, TimeZone, Utc};
use odk_schemas::{MetaValue, Metadata, Order, OrderState, SupportTicket, TicketStatus};

/// 2026-03-01T10:00:00Z. Every fixture timestamp is derived from this.
pub fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn order(id: &str, state: OrderState, amount: f64) -> Order {
    let mut metadata = Metadata::new();
    metadata.insert("customer_name".to_string(), MetaValue::from("Ada Lovelace"));
    metadata.insert("customer_email".to_string(), MetaValue::from("ada@example.com"));
    metadata.insert("priority".to_string(), MetaValue::from("medium"));

    Order {
        id: id.to_string(),
        product_ids: vec!["PROD-001".to_string()],
        amount,
        state,
        metadata,
        created_at: fixture_time(),
        updated_at: fixture_time(),
    }
}

pub fn ticket(id: &str, order_id: &str, status: TicketStatus, amount: f64) -> SupportTicket {
    SupportTicket {
        id: id.to_string(),
        order_id: order_id.to_string(),
        reason: "Customer cancellation".to_string(),
        amount,
        status,
        metadata: Metadata::new(),
        created_at: fixture_time(),
    }
}
