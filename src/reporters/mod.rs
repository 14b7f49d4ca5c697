//! Notification sinks.
//!
//! Every reporter sees a result together with the down counter as it stood
//! before that result was recorded, and derives a [`Transition`] from the pair.

use async_trait::async_trait;
use std::fmt;

use crate::models::CheckResult;
use crate::tracker::DownCounter;

pub mod chat;
pub mod log;
pub mod mail;

pub use self::chat::{ChatAttachment, ChatClient, ChatReporter, SlackClient};
pub use self::log::LogReporter;
pub use self::mail::{MailClient, MailMessage, MailReporter, MailgunClient};

/// Delivery failure of a reporter's backend.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} rejected the request: {message}")]
    Api { service: &'static str, message: String },
}

#[async_trait]
pub trait Reporter: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Deliver `result`. Must not assume `down` already reflects it.
    async fn report(&self, result: &CheckResult, down: &DownCounter) -> Result<(), ReportError>;
}
