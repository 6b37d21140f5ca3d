// In-memory availability backend for tests, demos and benchmarks

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::availability::{AvailabilityBackend, AvailabilityError, AvailabilityQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Normal,
    /// Every request fails with a network error
    Outage,
}

#[derive(Debug, Default)]
pub struct MockAvailabilityBackend {
    mode: AtomicU8,
    request_count: AtomicUsize,
    fail_next_requests: AtomicUsize,
    availability: Mutex<HashMap<String, bool>>,
    delays: Mutex<HashMap<String, Duration>>,
    received: Mutex<Vec<AvailabilityQuery>>,
}

impl MockAvailabilityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: BackendMode) {
        let mode_value = match mode {
            BackendMode::Normal => 0,
            BackendMode::Outage => 1,
        };
        self.mode.store(mode_value, Ordering::SeqCst);
    }

    pub fn fail_next_requests(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    /// Rooms without an explicit answer are available.
    pub async fn set_room_available(&self, room_id: &str, available: bool) {
        self.availability
            .lock()
            .await
            .insert(room_id.to_string(), available);
    }

    pub async fn set_room_delay(&self, room_id: &str, delay: Duration) {
        self.delays.lock().await.insert(room_id.to_string(), delay);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every query received so far, in arrival order.
    pub async fn received(&self) -> Vec<AvailabilityQuery> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl AvailabilityBackend for MockAvailabilityBackend {
    async fn check_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<bool, AvailabilityError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().await.push(query.clone());

        if self.mode.load(Ordering::SeqCst) == 1 {
            return Err(AvailabilityError::NetworkError("Service unavailable".to_string()));
        }

        let delay = self.delays.lock().await.get(&query.room_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fail_count = self.fail_next_requests.load(Ordering::SeqCst);
        if fail_count > 0 {
            self.fail_next_requests.store(fail_count - 1, Ordering::SeqCst);
            return Err(AvailabilityError::NetworkError("unexpected status 500".to_string()));
        }

        let availability = self.availability.lock().await;
        Ok(availability.get(&query.room_id).copied().unwrap_or(true))
    }
}
