//! reqwest-backed [`OrderService`] / [`TicketService`].
//!
//! Every request and response is logged at `info` (method, path, status);
//! failures at `warn`. Bodies and the bearer token are never logged.

use std::time::Duration;

use odk_config::{ClientConfig, ResolvedSecrets};
use odk_schemas::{
    CreateOrderRequest, EventKind, EventResponse, FilteredAllowedEvents, Order, OrderHistory,
    ProcessEventRequest, SupportTicket, TicketStats, UpdateTicketStatusRequest,
    UpdateTicketStatusResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::{parse_event_kinds, FilteredEvents, OrderService, ServiceError, TicketService};

/// HTTP client for the order service.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct HttpOrderService {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpOrderService {
    /// Build a client rooted at `base_url`.
    ///
    /// `token`, when present, is sent as `Authorization: Bearer <token>` on
    /// every request.
    pub fn new(base_url: &str, timeout: Duration, token: Option<&str>) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ServiceError::Transport(format!("invalid base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Transport(format!(
                "invalid base url '{base_url}': cannot be a base"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(t) = token {
            let mut v = HeaderValue::from_str(&format!("Bearer {t}"))
                .map_err(|_| ServiceError::Transport("api token is not a valid header value".into()))?;
            v.set_sensitive(true);
            headers.insert(AUTHORIZATION, v);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ServiceError::Transport(format!("http client build failed: {e}")))?;

        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &ClientConfig, secrets: &ResolvedSecrets) -> Result<Self, ServiceError> {
        Self::new(
            &cfg.api.base_url,
            Duration::from_millis(cfg.api.timeout_ms),
            secrets.api_token.as_deref(),
        )
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Join path segments onto the base URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ServiceError::Transport(format!("base url cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ServiceError> {
        let req = req
            .build()
            .map_err(|e| ServiceError::Transport(format!("request build failed: {e}")))?;
        let method = req.method().clone();
        let path = req.url().path().to_string();

        info!(%method, %path, "api request");

        let resp = self.http.execute(req).await.map_err(|e| {
            warn!(%method, %path, error = %e, "api transport error");
            ServiceError::Transport(e.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::Transport(format!("response body read failed: {e}")))?;

        if !status.is_success() {
            let err = ServiceError::from_status(status.as_u16(), &body);
            warn!(%method, %path, status = status.as_u16(), error = %err, "api response error");
            return Err(err);
        }

        info!(%method, %path, status = status.as_u16(), "api response");

        serde_json::from_str(&body)
            .map_err(|e| ServiceError::Decode(format!("{method} {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        self.execute(self.http.get(url)).await
    }
}

#[async_trait::async_trait]
impl OrderService for HttpOrderService {
    async fn health(&self) -> Result<Value, ServiceError> {
        self.get(&["health"]).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, ServiceError> {
        self.get(&["orders"]).await
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        self.get(&["orders", order_id]).await
    }

    async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ServiceError> {
        let url = self.endpoint(&["orders"])?;
        self.execute(self.http.post(url).json(req)).await
    }

    async fn allowed_events(&self, order_id: &str) -> Result<Vec<EventKind>, ServiceError> {
        let raw: Vec<String> = self.get(&["orders", order_id, "allowed-events"]).await?;
        Ok(parse_event_kinds(raw))
    }

    async fn filtered_allowed_events(
        &self,
        order_id: &str,
    ) -> Result<FilteredEvents, ServiceError> {
        let raw: FilteredAllowedEvents = self
            .get(&["api", "v2", "orders", order_id, "allowed-events-filtered"])
            .await?;
        Ok(FilteredEvents {
            events: parse_event_kinds(raw.filtered_events),
            small_order_rule_applied: raw.small_order_rule_applied,
        })
    }

    async fn history(&self, order_id: &str) -> Result<OrderHistory, ServiceError> {
        self.get(&["orders", order_id, "history"]).await
    }

    async fn submit_event(
        &self,
        order_id: &str,
        req: &ProcessEventRequest,
    ) -> Result<EventResponse, ServiceError> {
        let url = self.endpoint(&["orders", order_id, "events"])?;
        self.execute(self.http.post(url).json(req)).await
    }
}

#[async_trait::async_trait]
impl TicketService for HttpOrderService {
    async fn list_tickets(&self) -> Result<Vec<SupportTicket>, ServiceError> {
        self.get(&["support", "tickets"]).await
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<SupportTicket, ServiceError> {
        self.get(&["support", "tickets", ticket_id]).await
    }

    async fn tickets_for_order(&self, order_id: &str) -> Result<Vec<SupportTicket>, ServiceError> {
        self.get(&["support", "orders", order_id, "tickets"]).await
    }

    async fn update_ticket_status(
        &self,
        ticket_id: &str,
        req: &UpdateTicketStatusRequest,
    ) -> Result<UpdateTicketStatusResponse, ServiceError> {
        let url = self.endpoint(&["support", "tickets", ticket_id, "status"])?;
        self.execute(self.http.patch(url).json(req)).await
    }

    async fn ticket_stats(&self) -> Result<TicketStats, ServiceError> {
        self.get(&["support", "tickets", "stats", "summary"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(base: &str) -> HttpOrderService {
        HttpOrderService::new(base, Duration::from_secs(1), None).unwrap()
    }

    #[test]
    fn endpoint_joins_segments_without_double_slash() {
        let s = svc("http://localhost:8000/");
        let url = s.endpoint(&["orders", "o-1", "events"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/orders/o-1/events");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let s = svc("https://gw.example.com/orders-api");
        let url = s.endpoint(&["orders", "o-1"]).unwrap();
        assert_eq!(url.path(), "/orders-api/orders/o-1");
    }

    #[test]
    fn endpoint_escapes_segment_content() {
        let s = svc("http://localhost:8000");
        let url = s.endpoint(&["orders", "a/b"]).unwrap();
        assert_eq!(url.path(), "/orders/a%2Fb");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpOrderService::new("not a url", Duration::from_secs(1), None).unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }
}
