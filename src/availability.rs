// Room availability checking: a debounced query against the booking backend
// whose late answers are dropped once a newer query has been issued.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, ClientError};
use crate::debounce::Debouncer;
use crate::interval::{format_datetime, parse_datetime, IntervalError, TimeInterval};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<reqwest::Error> for AvailabilityError {
    fn from(err: reqwest::Error) -> Self {
        AvailabilityError::NetworkError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub room_id: String,
    pub interval: TimeInterval,
    pub exclude_booking_id: Option<String>,
}

impl AvailabilityQuery {
    pub fn new(
        room_id: impl Into<String>,
        interval: TimeInterval,
        exclude_booking_id: Option<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            interval,
            exclude_booking_id: exclude_booking_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Build a query from raw field values. Missing room, start or end and
    /// unparsable or inverted times are `ValidationError`s.
    pub fn from_fields(
        room_id: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        exclude_booking_id: Option<&str>,
    ) -> Result<Self, AvailabilityError> {
        let room_id = non_empty(room_id, "room_id")?;
        let start = non_empty(start, "start_time")?;
        let end = non_empty(end, "end_time")?;

        let invalid = |e: IntervalError| AvailabilityError::ValidationError(e.to_string());
        let start = parse_datetime(start).map_err(invalid)?;
        let end = parse_datetime(end).map_err(invalid)?;
        let interval = TimeInterval::new(start, end).map_err(invalid)?;

        Ok(Self::new(room_id, interval, exclude_booking_id.map(str::to_string)))
    }

    /// Query string pairs for the availability endpoint. `booking_id` is empty
    /// for new bookings.
    pub fn query_params(&self) -> [(&'static str, String); 4] {
        [
            ("room_id", self.room_id.clone()),
            ("start_time", format_datetime(self.interval.start())),
            ("end_time", format_datetime(self.interval.end())),
            (
                "booking_id",
                self.exclude_booking_id.clone().unwrap_or_default(),
            ),
        ]
    }
}

fn non_empty<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AvailabilityError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AvailabilityError::ValidationError(format!("missing {field}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// What the booking form shows next to the room selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    /// No check has been issued yet
    #[default]
    Idle,
    Checking,
    Available,
    Unavailable,
    /// The last check failed; availability is unknown
    Unknown,
}

impl AvailabilityStatus {
    /// True for the three states a completed check can leave behind.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AvailabilityStatus::Available
                | AvailabilityStatus::Unavailable
                | AvailabilityStatus::Unknown
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            AvailabilityStatus::Idle => "",
            AvailabilityStatus::Checking => "Checking availability...",
            AvailabilityStatus::Available => "Room is available for the selected time.",
            AvailabilityStatus::Unavailable => "Room is already booked during this time.",
            AvailabilityStatus::Unknown => "Error checking availability.",
        }
    }
}

impl From<Result<bool, AvailabilityError>> for AvailabilityStatus {
    fn from(result: Result<bool, AvailabilityError>) -> Self {
        match result {
            Ok(true) => AvailabilityStatus::Available,
            Ok(false) => AvailabilityStatus::Unavailable,
            Err(_) => AvailabilityStatus::Unknown,
        }
    }
}

#[async_trait]
pub trait AvailabilityBackend: Send + Sync + 'static {
    /// Ask whether the room is free for the interval, ignoring the excluded booking.
    async fn check_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<bool, AvailabilityError>;
}

/// `GET {base_url}{availability_path}?room_id=&start_time=&end_time=&booking_id=`
#[derive(Debug, Clone)]
pub struct HttpAvailabilityBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpAvailabilityBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.availability_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AvailabilityBackend for HttpAvailabilityBackend {
    async fn check_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<bool, AvailabilityError> {
        let response = self
            .client
            .get(&self.url)
            .query(&query.query_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvailabilityError::NetworkError(format!(
                "unexpected status {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let parsed: AvailabilityResponse = serde_json::from_str(&body)
            .map_err(|e| AvailabilityError::NetworkError(format!("malformed response: {e}")))?;

        Ok(parsed.available)
    }
}

/// Raw field values an availability trigger reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityInput {
    pub room_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub booking_id: Option<String>,
}

impl AvailabilityInput {
    pub fn is_complete(&self) -> bool {
        [&self.room_id, &self.start_time, &self.end_time]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    pub fn to_query(&self) -> Result<AvailabilityQuery, AvailabilityError> {
        AvailabilityQuery::from_fields(
            self.room_id.as_deref(),
            self.start_time.as_deref(),
            self.end_time.as_deref(),
            self.booking_id.as_deref(),
        )
    }
}

type SettledHook = Arc<dyn Fn(AvailabilityStatus) + Send + Sync>;

/// Debounced availability checks with stale-response suppression.
///
/// Each issued request carries the sequence number it was scheduled with; a
/// response is applied only if no newer request has been issued since.
pub struct AvailabilityChecker<B: AvailabilityBackend> {
    backend: Arc<B>,
    debouncer: Debouncer,
    latest_issued: Arc<AtomicU64>,
    status: Arc<watch::Sender<AvailabilityStatus>>,
    on_settled: Option<SettledHook>,
}

impl<B: AvailabilityBackend> AvailabilityChecker<B> {
    pub fn new(backend: B, debounce: Duration) -> Self {
        Self::with_backend(Arc::new(backend), debounce)
    }

    pub fn with_backend(backend: Arc<B>, debounce: Duration) -> Self {
        let (status, _) = watch::channel(AvailabilityStatus::Idle);
        Self {
            backend,
            debouncer: Debouncer::new(debounce),
            latest_issued: Arc::new(AtomicU64::new(0)),
            status: Arc::new(status),
            on_settled: None,
        }
    }

    pub fn from_config(backend: B, config: &ClientConfig) -> Self {
        Self::new(backend, Duration::from_millis(config.debounce_ms))
    }

    /// Called with the new status every time a current check settles.
    pub fn on_settled<F>(mut self, hook: F) -> Self
    where
        F: Fn(AvailabilityStatus) + Send + Sync + 'static,
    {
        self.on_settled = Some(Arc::new(hook));
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn status(&self) -> AvailabilityStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AvailabilityStatus> {
        self.status.subscribe()
    }

    pub fn latest_issued(&self) -> u64 {
        self.latest_issued.load(Ordering::SeqCst)
    }

    /// Undebounced single check. Does not touch the displayed status.
    pub async fn check_availability(
        &self,
        room_id: &str,
        interval: TimeInterval,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool, AvailabilityError> {
        if room_id.trim().is_empty() {
            return Err(AvailabilityError::ValidationError("missing room_id".to_string()));
        }
        let exclude_booking_id = exclude_booking_id.map(str::to_string);
        let query = AvailabilityQuery::new(room_id, interval, exclude_booking_id);
        self.backend.check_availability(&query).await
    }

    /// Field-change entry point. Incomplete or invalid input is ignored
    /// silently, and a check still waiting out the window is discarded with
    /// it; otherwise a check is scheduled through the debouncer and its
    /// sequence number returned.
    pub fn trigger(&self, input: &AvailabilityInput) -> Option<u64> {
        let query = match input.to_query() {
            Ok(query) => query,
            Err(err) => {
                let cancelled = self.debouncer.cancel_pending();
                debug!(
                    error = %err,
                    cancelled,
                    "Skipping availability check for incomplete input"
                );
                return None;
            }
        };

        let backend = self.backend.clone();
        let latest_issued = self.latest_issued.clone();
        let status = self.status.clone();
        let on_settled = self.on_settled.clone();

        let sequence = self.debouncer.schedule(move |sequence| async move {
            latest_issued.store(sequence, Ordering::SeqCst);
            status.send_replace(AvailabilityStatus::Checking);

            let result = backend.check_availability(&query).await;

            if latest_issued.load(Ordering::SeqCst) != sequence {
                debug!(sequence, room_id = %query.room_id, "Dropping stale availability response");
                return;
            }

            if let Err(err) = &result {
                warn!(
                    sequence,
                    room_id = %query.room_id,
                    error = %err,
                    "Error checking availability"
                );
            }

            let settled = AvailabilityStatus::from(result);
            info!(
                sequence,
                room_id = %query.room_id,
                status = ?settled,
                "Availability check settled"
            );
            status.send_replace(settled);

            if let Some(hook) = on_settled {
                hook(settled);
            }
        });

        Some(sequence)
    }

    /// Drop a check still waiting out the debounce window.
    pub fn cancel_pending(&self) -> bool {
        self.debouncer.cancel_pending()
    }
}
