//! Support ticket wire types.
//!
//! Tickets are linked to an order but carry their own status field, which is
//! independent of the order workflow.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::{self, Metadata};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase().replace('-', "_");
        TicketStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == t)
            .ok_or_else(|| {
                format!(
                    "invalid ticket status '{}'. expected one of: open | in_progress | resolved | closed",
                    s.trim()
                )
            })
    }
}

/// `GET /support/tickets/{id}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: String,
    pub order_id: String,
    pub reason: String,
    pub amount: f64,
    pub status: TicketStatus,
    #[serde(default, deserialize_with = "metadata::deserialize")]
    pub metadata: Metadata,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// `PATCH /support/tickets/{id}/status` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTicketStatusRequest {
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// `PATCH /support/tickets/{id}/status` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTicketStatusResponse {
    pub message: String,
    pub ticket_id: String,
    pub new_status: TicketStatus,
    pub updated_ticket: SupportTicket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBucket {
    pub count: u64,
    #[serde(default)]
    pub avg_amount: f64,
}

/// `GET /support/tickets/stats/summary` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total_tickets: u64,
    #[serde(default)]
    pub by_status: BTreeMap<TicketStatus, StatusBucket>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parse_is_forgiving_about_case_and_dashes() {
        assert_eq!("In-Progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!(" closed ".parse::<TicketStatus>().unwrap(), TicketStatus::Closed);
        assert!("reopened".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn stats_decode_keyed_by_status() {
        let raw = json!({
            "total_tickets": 3,
            "by_status": {
                "open": {"count": 2, "avg_amount": 120.5},
                "resolved": {"count": 1, "avg_amount": 10.0}
            },
            "generated_at": "2025-06-12T15:30:00"
        });
        let stats: TicketStats = serde_json::from_value(raw).unwrap();
        assert_eq!(stats.by_status[&TicketStatus::Open].count, 2);
        assert!(stats.error.is_none());
    }

    #[test]
    fn update_request_omits_absent_metadata() {
        let req = UpdateTicketStatusRequest {
            status: TicketStatus::Resolved,
            metadata: None,
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"status": "resolved"}));
    }
}
