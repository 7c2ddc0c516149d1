use async_trait::async_trait;

use crate::runtime::announcement::Announcement;
use crate::runtime::contract::NotificationId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to send announcement for '{key}': {message}")]
pub struct SendError {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to retract message {notification_id}: {message}")]
pub struct RetractError {
    pub notification_id: NotificationId,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetractOutcome {
    Retracted,
    /// The message was already gone. Treated the same as a successful retraction.
    NotFound,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, announcement: &Announcement) -> Result<NotificationId, SendError>;

    async fn retract(
        &self,
        notification_id: &NotificationId,
    ) -> Result<RetractOutcome, RetractError>;
}
