use crate::core::config::NotifyConfig;
use crate::core::error::NotifyError;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Best-effort chat notifications through the Telegram Bot API
///
/// Without a bot token and chat id the notifier is disabled and every
/// delivery is skipped. Delivery failures are logged, never returned.
pub struct Notifier {
    client: reqwest::Client,
    target: Option<Target>,
}

struct Target {
    url: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

impl Notifier {
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let target = config.credentials().map(|(token, chat_id)| Target {
            url: format!("{}/bot{}/sendMessage", config.api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        });

        Ok(Self { client, target })
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            target: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Send `title` and `body` as one message; returns whether it was delivered
    pub async fn notify(&self, title: &str, body: &str) -> bool {
        let Some(target) = &self.target else {
            debug!(title = %title, "Notifications disabled, skipping message");
            return false;
        };

        match self.send(target, title, body).await {
            Ok(()) => {
                info!(title = %title, "Notification sent");
                true
            }
            Err(e) => {
                warn!(title = %title, error = %e, "Failed to send notification");
                false
            }
        }
    }

    async fn send(&self, target: &Target, title: &str, body: &str) -> Result<(), NotifyError> {
        let message = SendMessage {
            chat_id: &target.chat_id,
            text: format!("{title}\n\n{body}"),
            disable_web_page_preview: true,
        };

        let response = self.client.post(&target.url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> NotifyConfig {
        NotifyConfig {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("-1001".to_string()),
            api_base: server.uri(),
        }
    }

    #[tokio::test]
    async fn test_disabled_without_credentials() {
        let notifier = Notifier::from_config(&NotifyConfig::default()).unwrap();
        assert!(!notifier.is_enabled());
        assert!(!notifier.notify("title", "body").await);
    }

    #[tokio::test]
    async fn test_sends_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(json!({
                "chat_id": "-1001",
                "text": "MT FREE 种子下载通知\n\nbody",
                "disable_web_page_preview": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::from_config(&config_for(&server)).unwrap();
        assert!(notifier.is_enabled());
        assert!(notifier.notify("MT FREE 种子下载通知", "body").await);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let notifier = Notifier::from_config(&config_for(&server)).unwrap();
        assert!(!notifier.notify("title", "body").await);
    }
}
