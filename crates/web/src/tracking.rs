//! Tracking endpoint
//!
//! `POST /track` validates `{ eventType, experimentId, timestamp, url }`,
//! reporting every violated field at once, and forwards the event to a
//! [`TrackingService`]. Events are forwarded once; there is no retry.

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use splitview_common::TrackingEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ApiError, FieldError};

pub const EVENT_TYPE: &str = "eventType";
pub const EXPERIMENT_ID: &str = "experimentId";
pub const TIMESTAMP: &str = "timestamp";
pub const URL: &str = "url";

/// Required body fields, in reporting order.
pub const REQUIRED_FIELDS: [&str; 4] = [EVENT_TYPE, EXPERIMENT_ID, TIMESTAMP, URL];

/// External collector that persists tracking events.
#[async_trait]
pub trait TrackingService: Send + Sync {
    async fn track_event(
        &self,
        event_type: &str,
        experiment_id: &str,
        timestamp: DateTime<Utc>,
        url: &str,
    ) -> anyhow::Result<()>;
}

/// Writes events to the log only.
#[derive(Debug, Default)]
pub struct LogTracker;

#[async_trait]
impl TrackingService for LogTracker {
    async fn track_event(
        &self,
        event_type: &str,
        experiment_id: &str,
        timestamp: DateTime<Utc>,
        url: &str,
    ) -> anyhow::Result<()> {
        info!(
            event_type,
            experiment_id,
            timestamp = %timestamp.to_rfc3339(),
            url,
            "tracking event"
        );
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    events: Mutex<Vec<TrackingEvent>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl TrackingService for MemoryTracker {
    async fn track_event(
        &self,
        event_type: &str,
        experiment_id: &str,
        timestamp: DateTime<Utc>,
        url: &str,
    ) -> anyhow::Result<()> {
        self.events.lock().push(TrackingEvent {
            event_type: event_type.to_string(),
            experiment_id: experiment_id.to_string(),
            timestamp,
            url: url.to_string(),
        });
        Ok(())
    }
}

/// Posts events as JSON to a collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpTracker {
    client: reqwest::Client,
    collector_url: url::Url,
}

impl HttpTracker {
    pub fn new(collector_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let collector_url = url::Url::parse(collector_url)
            .map_err(|e| anyhow::anyhow!("invalid collector url {:?}: {}", collector_url, e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            collector_url,
        })
    }
}

#[async_trait]
impl TrackingService for HttpTracker {
    async fn track_event(
        &self,
        event_type: &str,
        experiment_id: &str,
        timestamp: DateTime<Utc>,
        url: &str,
    ) -> anyhow::Result<()> {
        let event = TrackingEvent {
            event_type: event_type.to_string(),
            experiment_id: experiment_id.to_string(),
            timestamp,
            url: url.to_string(),
        };
        self.client
            .post(self.collector_url.clone())
            .json(&event)
            .send()
            .await?
            .error_for_status()?;
        debug!("Forwarded {} event for {}", event_type, experiment_id);
        Ok(())
    }
}

// ============================================================================
// Validation
// ============================================================================

fn required_str<'a>(body: &'a Value, field: &str, errors: &mut Vec<FieldError>) -> Option<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => {
            errors.push(FieldError::required(field));
            None
        }
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("expected an RFC 3339 date-time ({})", e)),
        Value::Number(n) => n
            .as_i64()
            .filter(|ms| *ms >= 0)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| "expected non-negative epoch milliseconds".to_string()),
        _ => Err("expected a date-time".to_string()),
    }
}

/// Validate a tracking body, collecting every error before returning.
pub fn validate_event(body: &Value) -> Result<TrackingEvent, Vec<FieldError>> {
    let mut errors = Vec::new();

    let event_type = required_str(body, EVENT_TYPE, &mut errors);
    let experiment_id = required_str(body, EXPERIMENT_ID, &mut errors);

    let timestamp = match body.get(TIMESTAMP) {
        None | Some(Value::Null) => {
            errors.push(FieldError::required(TIMESTAMP));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(FieldError::required(TIMESTAMP));
            None
        }
        Some(value @ (Value::String(_) | Value::Number(_))) => match parse_timestamp(value) {
            Ok(ts) => Some(ts),
            Err(detail) => {
                errors.push(FieldError::invalid(TIMESTAMP, detail));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::required(TIMESTAMP));
            None
        }
    };

    let url = required_str(body, URL, &mut errors).and_then(|raw| match url::Url::parse(raw) {
        Ok(_) => Some(raw),
        Err(e) => {
            errors.push(FieldError::invalid(URL, e));
            None
        }
    });

    match (event_type, experiment_id, timestamp, url) {
        (Some(event_type), Some(experiment_id), Some(timestamp), Some(url)) if errors.is_empty() => {
            Ok(TrackingEvent {
                event_type: event_type.to_string(),
                experiment_id: experiment_id.to_string(),
                timestamp,
                url: url.to_string(),
            })
        }
        _ => Err(errors),
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn track_handler(
    State(tracker): State<Arc<dyn TrackingService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = match body {
        Ok(Json(value)) => value,
        Err(rejection) => {
            debug!("Unreadable tracking body: {}", rejection);
            Value::Null
        }
    };

    let event = validate_event(&body).map_err(ApiError::Validation)?;

    tracker
        .track_event(&event.event_type, &event.experiment_id, event.timestamp, &event.url)
        .await
        .map_err(|e| ApiError::Upstream(format!("tracking service failed: {}", e)))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Build the tracking routes
pub fn tracking_routes(tracker: Arc<dyn TrackingService>) -> Router {
    Router::new()
        .route("/track", post(track_handler))
        .with_state(tracker)
}
