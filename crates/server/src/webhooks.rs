//! Best-effort webhook notifications for created resources.
//!
//! Payloads follow the Discord webhook embed format. Delivery never blocks or
//! fails a request: each target gets its own timeout, and failures are logged
//! and dropped.

use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use shrink_core::ResourceKind;
use shrink_core::config::WebhookConfig;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinHandle;

/// Extensions Discord cannot render as an embed image.
const NON_IMAGE_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// A resource creation worth announcing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    FileUploaded {
        url: String,
        deletion_url: String,
    },
    UrlShortened {
        original_url: String,
        short_url: String,
        deletion_url: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::FileUploaded { .. } => ResourceKind::File,
            Self::UrlShortened { .. } => ResourceKind::ShortUrl,
        }
    }

    /// Build the webhook body for this event.
    pub fn payload(&self) -> WebhookPayload {
        let color = rand::rng().random_range(0..=0x00FF_FFFF);
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).ok();

        let embed = match self {
            Self::FileUploaded { url, deletion_url } => {
                let show_image = !url
                    .rsplit_once('.')
                    .is_some_and(|(_, ext)| NON_IMAGE_EXTENSIONS.contains(&ext));
                Embed {
                    title: "New file has been uploaded!".to_string(),
                    description: url.clone(),
                    color,
                    timestamp,
                    fields: vec![
                        EmbedField::link("URL", "Click here to view", url),
                        EmbedField::link("Deletion URL", "Click here to delete", deletion_url),
                    ],
                    image: show_image.then(|| EmbedImage { url: url.clone() }),
                }
            }
            Self::UrlShortened {
                original_url,
                short_url,
                deletion_url,
            } => Embed {
                title: "URL has been shortened!".to_string(),
                description: format!("{original_url} => {short_url}"),
                color,
                timestamp,
                fields: vec![
                    EmbedField::link("URL", "Click here to view", original_url),
                    EmbedField::link("Deletion URL", "Click here to delete", deletion_url),
                ],
                image: None,
            },
        };

        WebhookPayload {
            embeds: vec![embed],
        }
    }
}

/// Discord-compatible webhook body.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn link(name: &str, label: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            value: format!("**[{label}]({target})**"),
            inline: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

/// Fans creation events out to every configured webhook.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    targets: Arc<[String]>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(config: &WebhookConfig) -> Self {
        let targets: Vec<String> = config
            .urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        Self {
            client: reqwest::Client::new(),
            targets: targets.into(),
            timeout: config.timeout(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Deliver `event` in the background. Returns `None` when no targets are configured.
    pub fn dispatch(&self, event: NotificationEvent) -> Option<JoinHandle<usize>> {
        if !self.is_enabled() {
            return None;
        }
        let notifier = self.clone();
        Some(tokio::spawn(async move { notifier.deliver(&event).await }))
    }

    /// Post `event` to every target concurrently. Returns how many succeeded.
    pub async fn deliver(&self, event: &NotificationEvent) -> usize {
        let payload = event.payload();
        let kind = event.kind();

        let sends = self.targets.iter().map(|target| {
            let request = self.client.post(target.as_str()).json(&payload).send();
            async move {
                match tokio::time::timeout(self.timeout, request).await {
                    Ok(Ok(response)) if response.status().is_success() => true,
                    Ok(Ok(response)) => {
                        tracing::warn!(
                            target = %target,
                            kind = %kind,
                            status = %response.status(),
                            "Webhook rejected notification"
                        );
                        false
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(target = %target, kind = %kind, error = %e, "Webhook delivery failed");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(
                            target = %target,
                            kind = %kind,
                            timeout_secs = self.timeout.as_secs_f64(),
                            "Webhook delivery timed out"
                        );
                        false
                    }
                }
            }
        });

        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        tracing::debug!(kind = %kind, delivered, total = self.targets.len(), "Webhooks notified");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(event: &NotificationEvent) -> serde_json::Value {
        serde_json::to_value(event.payload()).unwrap()
    }

    #[test]
    fn test_file_payload_has_image() {
        let event = NotificationEvent::FileUploaded {
            url: "https://i.example.com/uploads/abc.png".to_string(),
            deletion_url: "https://i.example.com/delete-file/cap/abc.png".to_string(),
        };
        let json = to_json(&event);
        let embed = &json["embeds"][0];

        assert_eq!(embed["title"], "New file has been uploaded!");
        assert_eq!(embed["image"]["url"], "https://i.example.com/uploads/abc.png");
        assert_eq!(embed["fields"][0]["name"], "URL");
        assert_eq!(
            embed["fields"][1]["value"],
            "**[Click here to delete](https://i.example.com/delete-file/cap/abc.png)**"
        );
        assert!(embed["color"].as_u64().unwrap() <= 0xFF_FFFF);
        assert!(embed["timestamp"].is_string());
    }

    #[test]
    fn test_video_payload_has_no_image() {
        let event = NotificationEvent::FileUploaded {
            url: "https://i.example.com/uploads/abc.mp4".to_string(),
            deletion_url: "https://i.example.com/delete-file/cap/abc.mp4".to_string(),
        };
        assert!(to_json(&event)["embeds"][0].get("image").is_none());
    }

    #[test]
    fn test_short_url_payload() {
        let event = NotificationEvent::UrlShortened {
            original_url: "https://example.com/x".to_string(),
            short_url: "https://s.example.com/url/tok".to_string(),
            deletion_url: "https://s.example.com/delete-short-url/cap/tok".to_string(),
        };
        let json = to_json(&event);
        assert_eq!(
            json["embeds"][0]["description"],
            "https://example.com/x => https://s.example.com/url/tok"
        );
        assert_eq!(event.kind(), ResourceKind::ShortUrl);
    }

    #[test]
    fn test_dispatch_without_targets_is_noop() {
        let notifier = Notifier::new(&WebhookConfig {
            urls: vec!["  ".to_string()],
            timeout_secs: 1.0,
        });
        assert!(!notifier.is_enabled());
        let event = NotificationEvent::FileUploaded {
            url: "u".to_string(),
            deletion_url: "d".to_string(),
        };
        assert!(notifier.dispatch(event).is_none());
    }
}
