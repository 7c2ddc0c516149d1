use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::adapters::notifier::{Notifier, RetractError, RetractOutcome, SendError};
use crate::runtime::announcement::{Announcement, AnnouncementField};
use crate::runtime::contract::NotificationId;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/bucket-watch, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("discord request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("discord returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// Bot user the token authenticates as.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
}

/// Posts announcements as embeds in one channel through the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    api_base: String,
    token: String,
    channel_id: u64,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    color: u32,
    timestamp: String,
    fields: &'a [AnnouncementField],
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

impl DiscordNotifier {
    pub fn new(api_base: &str, token: &str, channel_id: u64) -> Result<Self, DiscordError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            channel_id,
        })
    }

    /// Checks the token and that the bot can see the configured channel.
    pub async fn verify_access(&self) -> Result<BotIdentity, DiscordError> {
        let identity_endpoint = format!("{}/users/@me", self.api_base);
        let response = self
            .authorized(self.client.get(&identity_endpoint))
            .send()
            .await?;
        let identity: BotIdentity = ensure_success(response, &identity_endpoint)
            .await?
            .json()
            .await?;

        let channel_endpoint = format!("{}/channels/{}", self.api_base, self.channel_id);
        let response = self
            .authorized(self.client.get(&channel_endpoint))
            .send()
            .await?;
        ensure_success(response, &channel_endpoint).await?;

        Ok(identity)
    }

    fn messages_endpoint(&self) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    async fn post_announcement(
        &self,
        announcement: &Announcement,
    ) -> Result<NotificationId, DiscordError> {
        let endpoint = self.messages_endpoint();
        let body = CreateMessageRequest {
            embeds: [Embed {
                title: &announcement.title,
                color: announcement.color,
                timestamp: announcement.timestamp.to_rfc3339(),
                fields: &announcement.fields,
            }],
        };

        let response = self
            .authorized(self.client.post(&endpoint))
            .json(&body)
            .send()
            .await?;
        let message: MessageResponse = ensure_success(response, &endpoint).await?.json().await?;
        Ok(NotificationId::new(message.id))
    }

    async fn delete_message(
        &self,
        notification_id: &NotificationId,
    ) -> Result<RetractOutcome, DiscordError> {
        let endpoint = format!("{}/{}", self.messages_endpoint(), notification_id);
        let response = self
            .authorized(self.client.delete(&endpoint))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RetractOutcome::NotFound);
        }
        ensure_success(response, &endpoint).await?;
        Ok(RetractOutcome::Retracted)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, announcement: &Announcement) -> Result<NotificationId, SendError> {
        self.post_announcement(announcement)
            .await
            .map_err(|error| SendError {
                key: announcement.key.clone(),
                message: error.to_string(),
            })
    }

    async fn retract(
        &self,
        notification_id: &NotificationId,
    ) -> Result<RetractOutcome, RetractError> {
        self.delete_message(notification_id)
            .await
            .map_err(|error| RetractError {
                notification_id: notification_id.clone(),
                message: error.to_string(),
            })
    }
}

async fn ensure_success(response: Response, endpoint: &str) -> Result<Response, DiscordError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DiscordError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
