//! Report delivery.
//!
//! Delivery is best-effort: a failed notifier is logged and skipped, and never
//! changes the outcome already computed for the accounts.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered HTTP {0}")]
    Status(u16),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, title: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Prints the report to stdout.
pub struct ConsoleNotifier;

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn deliver(&self, title: &str, body: &str) -> Result<(), DeliveryError> {
        println!("{title}\n{body}");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    content: &'a str,
}

/// POSTs `{"title", "content"}` JSON to a webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, title: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                title,
                content: body,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Hand the report to every notifier; returns how many accepted it.
pub async fn deliver_all(notifiers: &[Box<dyn Notifier>], title: &str, body: &str) -> usize {
    let mut delivered = 0;
    for notifier in notifiers {
        match notifier.deliver(title, body).await {
            Ok(()) => {
                tracing::debug!("Report delivered via {}", notifier.name());
                delivered += 1;
            }
            Err(e) => {
                tracing::error!("Report delivery via {} failed: {}", notifier.name(), e);
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingNotifier {
        seen: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, title: &str, body: &str) -> Result<(), DeliveryError> {
            self.seen
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct RejectingNotifier;

    #[async_trait::async_trait]
    impl Notifier for RejectingNotifier {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn deliver(&self, _title: &str, _body: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::Status(502))
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_notifiers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(RejectingNotifier),
            Box::new(RecordingNotifier { seen: seen.clone() }),
        ];

        let delivered = deliver_all(&notifiers, "t", "b").await;
        assert_eq!(delivered, 1);
        assert_eq!(*seen.lock().unwrap(), vec![("t".to_string(), "b".to_string())]);
    }

    #[tokio::test]
    async fn test_console_always_delivers() {
        assert!(ConsoleNotifier.deliver("title", "body").await.is_ok());
    }

    #[test]
    fn test_webhook_payload_shape() {
        let payload = WebhookPayload {
            title: "ACCK check-in: 1/1 succeeded",
            content: "body",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "ACCK check-in: 1/1 succeeded", "content": "body"})
        );
    }

    #[test]
    fn test_status_error_message() {
        assert_eq!(DeliveryError::Status(500).to_string(), "webhook answered HTTP 500");
    }
}
