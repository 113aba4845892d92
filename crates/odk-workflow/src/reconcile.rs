//! Post-transition reconciliation.
//!
//! Re-reads order, allowed events and history from the server as one cycle.
//! The result replaces the cached triple wholesale; nothing is merged and the
//! next state is never derived locally.

use odk_client::{OrderService, ServiceError};
use odk_schemas::{EventKind, Order, OrderHistory};
use tracing::{info, warn};

/// Message shown when the order behind a view is gone.
pub const ORDER_NOT_FOUND: &str = "Order not found";

/// Server truth for one order at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub order: Order,
    pub allowed: Vec<EventKind>,
    pub history: OrderHistory,
    /// The filtered endpoint skipped verification because the order is small.
    pub small_order_rule_applied: bool,
}

impl OrderSnapshot {
    /// No further events are offered for this order.
    pub fn is_final(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allows(&self, kind: EventKind) -> bool {
        self.allowed.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The order does not exist (HTTP 404 on any of the reads).
    NotFound,
    /// Any other failure. Does not imply an earlier mutation failed.
    Failed(ServiceError),
}

impl RefreshError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::NotFound => f.write_str(ORDER_NOT_FOUND),
            RefreshError::Failed(e) => {
                write!(f, "Failed to fetch order data: {}", e.user_message())
            }
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::NotFound => None,
            RefreshError::Failed(e) => Some(e),
        }
    }
}

impl From<ServiceError> for RefreshError {
    fn from(e: ServiceError) -> Self {
        if e.is_not_found() {
            RefreshError::NotFound
        } else {
            RefreshError::Failed(e)
        }
    }
}

/// Run one reconciliation cycle for `order_id`.
///
/// The three reads run concurrently on the calling task. With
/// `prefer_filtered`, the business-rule filtered endpoint is used first; any
/// failure other than not-found repeats the cycle once against the classic
/// allowed-events endpoint.
pub async fn refresh<S>(
    service: &S,
    order_id: &str,
    prefer_filtered: bool,
) -> Result<OrderSnapshot, RefreshError>
where
    S: OrderService + ?Sized,
{
    if prefer_filtered {
        match filtered_cycle(service, order_id).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e) if e.is_not_found() => {
                warn!(order_id, "order not found during refresh");
                return Err(RefreshError::NotFound);
            }
            Err(e) => {
                warn!(order_id, error = %e, "filtered refresh failed; retrying with classic allowed events");
            }
        }
    }

    classic_cycle(service, order_id).await.map_err(|e| {
        warn!(order_id, error = %e, "order refresh failed");
        RefreshError::from(e)
    })
}

async fn filtered_cycle<S>(service: &S, order_id: &str) -> Result<OrderSnapshot, ServiceError>
where
    S: OrderService + ?Sized,
{
    let (order, filtered, history) = tokio::try_join!(
        service.get_order(order_id),
        service.filtered_allowed_events(order_id),
        service.history(order_id),
    )?;

    info!(
        order_id,
        state = %order.state,
        allowed = filtered.events.len(),
        small_order_rule_applied = filtered.small_order_rule_applied,
        "order refreshed"
    );

    Ok(OrderSnapshot {
        order,
        allowed: filtered.events,
        history,
        small_order_rule_applied: filtered.small_order_rule_applied,
    })
}

async fn classic_cycle<S>(service: &S, order_id: &str) -> Result<OrderSnapshot, ServiceError>
where
    S: OrderService + ?Sized,
{
    let (order, allowed, history) = tokio::try_join!(
        service.get_order(order_id),
        service.allowed_events(order_id),
        service.history(order_id),
    )?;

    info!(order_id, state = %order.state, allowed = allowed.len(), "order refreshed");

    Ok(OrderSnapshot {
        order,
        allowed,
        history,
        small_order_rule_applied: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_service_error_maps_to_not_found() {
        let e = RefreshError::from(ServiceError::NotFound { detail: None });
        assert_eq!(e, RefreshError::NotFound);
        assert_eq!(e.user_message(), ORDER_NOT_FOUND);
    }

    #[test]
    fn other_errors_keep_cause() {
        let e = RefreshError::from(ServiceError::Transport("connection refused".into()));
        assert_eq!(
            e.user_message(),
            "Failed to fetch order data: connection refused"
        );
        assert!(std::error::Error::source(&e).is_some());
    }
}
