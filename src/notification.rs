//! Push notification boundary.
//!
//! The core only describes what happened; delivery belongs to a [`Notifier`].
//! Delivery is best effort: [`dispatch`] logs failures and never returns them,
//! so a notification problem cannot undo the mutation that triggered it.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    config,
    model::{UploadedImage, User},
};

#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LoginSuccess,
    UploadSuccess,
    TopicSubscriptionChanged,
}

#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Token(String),
    Topic(String),
}

#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub target: Target,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl NotificationEvent {
    pub fn login_success(user: &User, device_token: &str) -> Self {
        NotificationEvent {
            kind: EventKind::LoginSuccess,
            target: Target::Token(device_token.to_string()),
            title: "New sign-in".to_string(),
            body: format!("{} signed in successfully", user.username),
            data: BTreeMap::from([
                ("user_id".to_string(), user.id.to_string()),
                ("role".to_string(), user.role.to_string()),
            ]),
        }
    }

    pub fn upload_success(device_token: &str, folder: &str, image: &UploadedImage) -> Self {
        NotificationEvent {
            kind: EventKind::UploadSuccess,
            target: Target::Token(device_token.to_string()),
            title: "Image uploaded".to_string(),
            body: format!("Your image was uploaded to {}", folder),
            data: BTreeMap::from([
                ("image_url".to_string(), image.secure_url.clone()),
                ("public_id".to_string(), image.public_id.clone()),
                ("type".to_string(), folder.to_string()),
            ]),
        }
    }

    pub fn topic_subscription_changed(device_token: &str, topic: &str, subscribed: bool) -> Self {
        let body = if subscribed {
            format!("Subscribed to {}", topic)
        } else {
            format!("Unsubscribed from {}", topic)
        };

        NotificationEvent {
            kind: EventKind::TopicSubscriptionChanged,
            target: Target::Token(device_token.to_string()),
            title: "Notification settings updated".to_string(),
            body,
            data: BTreeMap::from([
                ("topic".to_string(), topic.to_string()),
                ("subscribed".to_string(), subscribed.to_string()),
            ]),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NotificationError {
    #[error("Notification request failed")]
    Request(#[from] reqwest::Error),
    #[error("Notification service rejected the request with status {0}")]
    Rejected(reqwest::StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns whether the message was accepted for delivery.
    async fn notify(&self, event: &NotificationEvent) -> Result<bool, NotificationError>;
    async fn subscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError>;
    async fn unsubscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError>;
}

/// Hands `event` to the notifier and reports whether it was accepted.
#[tracing::instrument(name = "dispatch notification", skip_all, fields(kind = ?event.kind))]
pub async fn dispatch(notifier: &dyn Notifier, event: NotificationEvent) -> bool {
    match notifier.notify(&event).await {
        Ok(sent) => sent,
        Err(error) => {
            tracing::warn!(err.msg = %error, err.details = ?error, "Notification not sent");
            false
        }
    }
}

/// Used when notifications are switched off in the configuration.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<bool, NotificationError> {
        tracing::info!(kind = ?event.kind, "Notification not sent: notifications disabled");
        Ok(false)
    }

    async fn subscribe(&self, _tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        tracing::info!(topic, "Topic subscription skipped: notifications disabled");
        Ok(())
    }

    async fn unsubscribe(&self, _tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        tracing::info!(topic, "Topic unsubscription skipped: notifications disabled");
        Ok(())
    }
}

/// Forwards events as JSON to a push gateway.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(serde::Serialize)]
struct TopicRequest<'a> {
    tokens: &'a [String],
    topic: &'a str,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        WebhookNotifier {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status()));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<bool, NotificationError> {
        self.post("send", event).await?;
        tracing::info!(kind = ?event.kind, "Notification sent");

        Ok(true)
    }

    async fn subscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        self.post("subscribe", &TopicRequest { tokens, topic }).await
    }

    async fn unsubscribe(&self, tokens: &[String], topic: &str) -> Result<(), NotificationError> {
        self.post("unsubscribe", &TopicRequest { tokens, topic })
            .await
    }
}

pub fn from_config(config: &config::Notification) -> Box<dyn Notifier> {
    match (&config.endpoint, config.enabled) {
        (Some(endpoint), true) => Box::new(WebhookNotifier::new(endpoint.clone())),
        (None, true) => {
            tracing::warn!("Notifications enabled without an endpoint, disabling them");
            Box::new(DisabledNotifier)
        }
        (_, false) => Box::new(DisabledNotifier),
    }
}
