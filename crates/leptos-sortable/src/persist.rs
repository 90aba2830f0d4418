//! Order Persistence
//!
//! Builds the form payload for the order endpoint and runs it as a
//! retrying command.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::model::{ItemId, OrderableItem};

/// Form field carrying the anti-forgery token
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

/// Owning container of a list, sent along with every entry
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub key: String,
    pub id: ItemId,
}

/// Field name and entry keys the endpoint expects
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadShape {
    pub field: String,
    pub id_key: String,
    pub position_key: String,
    pub parent: Option<ParentRef>,
}

impl PayloadShape {
    pub fn new(field: &str, id_key: &str, position_key: &str) -> Self {
        Self {
            field: field.to_string(),
            id_key: id_key.to_string(),
            position_key: position_key.to_string(),
            parent: None,
        }
    }

    fn entry(&self, item: &OrderableItem) -> Value {
        let mut entry = Map::new();
        entry.insert(self.id_key.clone(), serde_json::json!(item.id));
        entry.insert(self.position_key.clone(), Value::from(item.position));
        if let Some(parent) = &self.parent {
            entry.insert(parent.key.clone(), serde_json::json!(parent.id));
        }
        Value::Object(entry)
    }
}

/// One POST to the order endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub url: String,
    pub field: String,
    /// JSON array of `{id, position}` entries
    pub payload: String,
    pub csrf_token: String,
}

impl PersistRequest {
    pub fn build(url: &str, csrf_token: &str, shape: &PayloadShape, items: &[OrderableItem]) -> Self {
        let entries: Vec<Value> = items.iter().map(|item| shape.entry(item)).collect();
        Self {
            url: url.to_string(),
            field: shape.field.clone(),
            payload: Value::Array(entries).to_string(),
            csrf_token: csrf_token.to_string(),
        }
    }

    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            (self.field.clone(), self.payload.clone()),
            (CSRF_FIELD.to_string(), self.csrf_token.clone()),
        ]
    }
}

/// Why a persist attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response at all (offline, connection reset)
    Network(String),
    /// The server answered with a non-success status
    Status(u16),
    /// The request could not be built or sent
    Request(String),
}

impl TransportError {
    /// Timeouts, conflicts, rate limits, server errors and lost
    /// connections may succeed on a later attempt. A 403 (bad CSRF token)
    /// or any other client error will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status(code) => matches!(code, 408 | 409 | 429 | 500..=599),
            TransportError::Request(_) => false,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {}", msg),
            TransportError::Status(code) => write!(f, "HTTP {}", code),
            TransportError::Request(msg) => write!(f, "request error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Sends a persist request; each error counts as one failed attempt
#[allow(async_fn_in_trait)]
pub trait OrderTransport {
    async fn send(&self, request: &PersistRequest) -> Result<(), TransportError>;
}

#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, delay: Duration);
}

/// Browser timer backed sleeper
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerSleeper;

impl Sleeper for TimerSleeper {
    async fn sleep(&self, delay: Duration) {
        let ms = delay.as_millis().min(u32::MAX as u128) as u32;
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

/// Exponential backoff without jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No retries at all: a single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `backoff_step + 1`
    pub fn delay_for(&self, backoff_step: u32) -> Duration {
        let factor = 2u32.saturating_pow(backoff_step);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// A reorder that has been applied to the view but not yet saved
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderCommand {
    pub generation: u64,
    /// Order before the gesture, used for rollback
    pub before: Vec<ItemId>,
    pub after: Vec<ItemId>,
    pub request: PersistRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved { attempts: u32 },
    Failed { attempts: u32, rolled_back: bool },
}

/// Send, retrying transient failures; returns the number of attempts made
/// and the last error
pub async fn send_with_retry<T, S>(
    transport: &T,
    sleeper: &S,
    policy: &RetryPolicy,
    request: &PersistRequest,
) -> (u32, Result<(), TransportError>)
where
    T: OrderTransport,
    S: Sleeper,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match transport.send(request).await {
            Ok(()) => return (attempt, Ok(())),
            Err(e) => {
                if attempt > policy.max_retries || !e.is_retryable() {
                    return (attempt, Err(e));
                }
                let delay = policy.delay_for(attempt - 1);
                log::warn!(
                    "[SORT] Saving order to {} failed (attempt {}): {}; retrying in {}ms",
                    request.url,
                    attempt,
                    e,
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FlakyTransport {
        failures_left: Cell<u32>,
        calls: Cell<u32>,
        error: TransportError,
    }

    impl FlakyTransport {
        fn failing(times: u32, error: TransportError) -> Self {
            Self { failures_left: Cell::new(times), calls: Cell::new(0), error }
        }
    }

    impl OrderTransport for FlakyTransport {
        async fn send(&self, _request: &PersistRequest) -> Result<(), TransportError> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.borrow_mut().push(delay);
        }
    }

    fn items(ids: &[i64]) -> Vec<OrderableItem> {
        ids.iter()
            .enumerate()
            .map(|(position, id)| OrderableItem { id: ItemId::Int(*id), position })
            .collect()
    }

    #[test]
    fn test_category_payload_keys() {
        let shape = PayloadShape::new("categories", "catId", "catOrder");
        let request = PersistRequest::build("/order/", "tok", &shape, &items(&[5, 3]));

        assert_eq!(request.payload, r#"[{"catId":5,"catOrder":0},{"catId":3,"catOrder":1}]"#);
        assert_eq!(
            request.form_fields(),
            vec![
                ("categories".to_string(), request.payload.clone()),
                ("csrfmiddlewaretoken".to_string(), "tok".to_string()),
            ]
        );
    }

    #[test]
    fn test_payload_with_parent() {
        let mut shape = PayloadShape::new("boards", "boardId", "boardOrder");
        shape.parent = Some(ParentRef { key: "categoryId".to_string(), id: ItemId::Int(2) });
        let request = PersistRequest::build("/b/", "", &shape, &items(&[9]));

        let parsed: Vec<Value> = serde_json::from_str(&request.payload).unwrap();
        assert_eq!(parsed[0]["boardId"], 9);
        assert_eq!(parsed[0]["boardOrder"], 0);
        assert_eq!(parsed[0]["categoryId"], 2);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let transport = FlakyTransport::failing(1, TransportError::Status(503));
        let sleeper = RecordingSleeper::default();
        let request = PersistRequest::build("/x/", "", &PayloadShape::new("boards", "boardId", "boardOrder"), &items(&[1]));

        let (attempts, result) = send_with_retry(&transport, &sleeper, &RetryPolicy::default(), &request).await;

        assert_eq!(attempts, 2);
        assert!(result.is_ok());
        assert_eq!(*sleeper.delays.borrow(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let transport = FlakyTransport::failing(100, TransportError::Status(503));
        let sleeper = RecordingSleeper::default();
        let request = PersistRequest::build("/x/", "", &PayloadShape::new("boards", "boardId", "boardOrder"), &items(&[1]));

        let (attempts, result) = send_with_retry(&transport, &sleeper, &RetryPolicy::default(), &request).await;

        assert_eq!(attempts, 3);
        assert_eq!(transport.calls.get(), 3);
        assert_eq!(result, Err(TransportError::Status(503)));
        assert_eq!(sleeper.delays.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let transport = FlakyTransport::failing(1, TransportError::Network("offline".to_string()));
        let sleeper = RecordingSleeper::default();
        let request = PersistRequest::build("/x/", "", &PayloadShape::new("boards", "boardId", "boardOrder"), &items(&[1]));

        let (attempts, result) = send_with_retry(&transport, &sleeper, &RetryPolicy::none(), &request).await;

        assert_eq!(attempts, 1);
        assert!(result.is_err());
        assert!(sleeper.delays.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let transport = FlakyTransport::failing(100, TransportError::Status(403));
        let sleeper = RecordingSleeper::default();
        let request = PersistRequest::build("/x/", "stale", &PayloadShape::new("boards", "boardId", "boardOrder"), &items(&[1]));

        let (attempts, result) = send_with_retry(&transport, &sleeper, &RetryPolicy::default(), &request).await;

        assert_eq!(attempts, 1);
        assert_eq!(transport.calls.get(), 1);
        assert_eq!(result, Err(TransportError::Status(403)));
        assert!(sleeper.delays.borrow().is_empty());
    }

    #[test]
    fn test_retryable_classes() {
        for code in [408, 409, 429, 500, 502, 503, 504] {
            assert!(TransportError::Status(code).is_retryable(), "{} should retry", code);
        }
        for code in [400, 401, 403, 404, 422] {
            assert!(!TransportError::Status(code).is_retryable(), "{} should not retry", code);
        }
        assert!(TransportError::Network("reset".to_string()).is_retryable());
        assert!(!TransportError::Request("bad url".to_string()).is_retryable());
    }
}
