//! Mock publisher for testing
//!
//! Simulates delivered, queued and failed hand-offs, optional latency and a
//! failing pre-flight check, while recording every payload it receives so
//! tests can verify exactly what the lifecycle manager sent.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::{Outcome, PublishPayload, Publisher};
use crate::error::PublishError;

/// What `send` answers with
#[derive(Debug, Clone, PartialEq)]
pub enum MockMode {
    Deliver,
    Queue,
    Fail(String),
}

/// Configuration for mock publisher behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub mode: MockMode,

    /// Reason returned by `check`, if it should fail
    pub check_error: Option<String>,

    /// Delay before `send` completes (simulates network latency)
    pub delay: Duration,

    pub check_call_count: Arc<Mutex<usize>>,
    pub send_call_count: Arc<Mutex<usize>>,

    /// Payloads handed to `send`
    pub sent: Arc<Mutex<Vec<PublishPayload>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            mode: MockMode::Deliver,
            check_error: None,
            delay: Duration::from_millis(0),
            check_call_count: Arc::new(Mutex::new(0)),
            send_call_count: Arc::new(Mutex::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock publisher for testing
pub struct MockPublisher {
    config: MockConfig,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Always delivers
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Always answers `Failed` with `error`
    pub fn failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            mode: MockMode::Fail(error.to_string()),
            ..Default::default()
        })
    }

    /// Always answers `Queued`
    pub fn queued(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            mode: MockMode::Queue,
            ..Default::default()
        })
    }

    /// Delivers after `delay`
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Pre-flight check rejects with `error`
    pub fn check_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            check_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    pub fn check_calls(&self) -> usize {
        *lock(&self.config.check_call_count)
    }

    pub fn send_calls(&self) -> usize {
        *lock(&self.config.send_call_count)
    }

    pub fn sent_payloads(&self) -> Vec<PublishPayload> {
        lock(&self.config.sent).clone()
    }
}

// A panicking test thread must not hide the counters from the others
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn check(&self, _payload: &PublishPayload) -> Result<(), PublishError> {
        *lock(&self.config.check_call_count) += 1;
        match &self.config.check_error {
            Some(reason) => Err(PublishError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }

    async fn send(&self, payload: &PublishPayload) -> Outcome {
        *lock(&self.config.send_call_count) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        lock(&self.config.sent).push(payload.clone());

        match &self.config.mode {
            MockMode::Deliver => Outcome::Delivered {
                remote_id: Some(format!("{}-{}", self.config.name, payload.post_id)),
                message: format!("Delivered to {}", self.config.name),
            },
            MockMode::Queue => Outcome::Queued {
                location: format!("{}://queue/{}", self.config.name, payload.post_id),
            },
            MockMode::Fail(message) => Outcome::failed(message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewPost, Post};

    fn payload() -> PublishPayload {
        PublishPayload::from_post(&Post::new(5, NewPost::with_body("Test")), false)
    }

    #[tokio::test]
    async fn test_mock_success() {
        let publisher = MockPublisher::success("test");
        let outcome = publisher.send(&payload()).await;

        assert_eq!(
            outcome,
            Outcome::Delivered {
                remote_id: Some("test-5".to_string()),
                message: "Delivered to test".to_string(),
            }
        );
        assert_eq!(publisher.send_calls(), 1);
        assert_eq!(publisher.sent_payloads()[0].body, "Test");
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let publisher = MockPublisher::failure("test", "boom");
        assert_eq!(publisher.send(&payload()).await, Outcome::failed("boom"));
    }

    #[tokio::test]
    async fn test_mock_queued() {
        let publisher = MockPublisher::queued("outbox");
        assert_eq!(
            publisher.send(&payload()).await,
            Outcome::Queued {
                location: "outbox://queue/5".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_mock_check_failure_counts_calls() {
        let publisher = MockPublisher::check_failure("test", "too long");
        assert!(matches!(
            publisher.check(&payload()).await,
            Err(PublishError::Rejected(reason)) if reason == "too long"
        ));
        assert_eq!(publisher.check_calls(), 1);
        assert_eq!(publisher.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_mock_delay() {
        let publisher = MockPublisher::with_delay("test", Duration::from_millis(50));

        let start = std::time::Instant::now();
        publisher.send(&payload()).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
