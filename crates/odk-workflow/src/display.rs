//! Read-side helpers shared by every front end: typed metadata access and
//! the few strings the detail screens print.

use odk_schemas::{Metadata, Order, OrderEvent, OrderState};

use crate::catalog;

pub const NO_ACTIONS_TITLE: &str = "No Actions Available";
pub const FINAL_STATE_MESSAGE: &str = "This order is in a final state or awaiting external input";
pub const SMALL_ORDER_NOTICE: &str = "Verification skipped by business rules";

/// Customer fields the create form writes into order metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomerInfo<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub priority: Option<&'a str>,
}

impl<'a> CustomerInfo<'a> {
    pub fn from_metadata(md: &'a Metadata) -> Self {
        let text = |key: &str| {
            md.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        Self {
            name: text("customer_name"),
            email: text("customer_email"),
            notes: text("notes"),
            priority: text("priority"),
        }
    }
}

pub fn customer_info(order: &Order) -> CustomerInfo<'_> {
    CustomerInfo::from_metadata(&order.metadata)
}

/// First eight characters of an id, as shown in headings.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// `1234.5` -> `"$1,234.50"`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// `SHIPPED`, `PENDING PAYMENT`: the badge text for a state.
pub fn state_badge(state: OrderState) -> String {
    state.as_str().replace('_', " ").to_uppercase()
}

/// One history entry as a single line:
/// `2026-03-01 10:05:00 UTC  Payment Success  pending_payment -> confirmed`.
pub fn history_line(event: &OrderEvent) -> String {
    let from = event
        .old_state
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {}  {} -> {}",
        event.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        catalog::label_for_name(&event.event_type),
        from,
        event.new_state.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use odk_schemas::MetaValue;

    #[test]
    fn customer_info_reads_text_fields_only() {
        let mut md = Metadata::new();
        md.insert("customer_name".into(), MetaValue::from("Ada"));
        md.insert("customer_email".into(), MetaValue::from("   "));
        md.insert("priority".into(), MetaValue::from(3_i64));

        let info = CustomerInfo::from_metadata(&md);
        assert_eq!(info.name, Some("Ada"));
        assert_eq!(info.email, None);
        assert_eq!(info.priority, None);
        assert_eq!(info.notes, None);
    }

    #[test]
    fn short_id_truncates_to_eight() {
        assert_eq!(short_id("3f2a9c1e-77aa-4c1b"), "3f2a9c1e");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.5), "$0.50");
        assert_eq!(format_amount(1234.5), "$1,234.50");
        assert_eq!(format_amount(999999.99), "$999,999.99");
        assert_eq!(format_amount(-12.0), "-$12.00");
    }

    #[test]
    fn badge_upper_cases_every_word() {
        assert_eq!(state_badge(OrderState::PendingPayment), "PENDING PAYMENT");
    }
}
