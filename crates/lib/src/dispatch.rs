//! Event dispatch: one Events API request body in, exactly one outcome out.
//!
//! The body is parsed once into an [`Envelope`]. Verification handshakes return the challenge,
//! bot-authored messages are dropped, human messages go to the [`ConversationStore`], and every
//! other event is acknowledged without action. Signing secrets are not checked here.

use crate::slack::{self, Envelope, InnerEvent, MessageEvent};
use crate::store::{ConversationStore, StoreError};
use std::sync::Arc;

/// Sender label recorded for messages written by people.
pub const USER_SENDER: &str = "User";

/// Response body for bot-authored messages.
pub const IGNORED_BOT_BODY: &str = "Ignored bot event";

/// What happened to a request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `url_verification`: echo this challenge back.
    Challenge(String),
    /// Message posted by a bot; nothing stored.
    IgnoredBot,
    /// Human message stored.
    Persisted,
    /// Nothing to do (other event kinds, rate-limit notices, unknown envelopes).
    Acknowledged,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed event envelope: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("storing message failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Routes events to the conversation store. Built once at startup and shared by all requests.
pub struct EventDispatcher {
    store: Arc<dyn ConversationStore>,
    collection: String,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn ConversationStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Handle one request body.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Outcome, DispatchError> {
        match slack::parse_envelope(body)? {
            Envelope::UrlVerification(v) => {
                Ok(Outcome::Challenge(v.challenge.unwrap_or_default()))
            }
            Envelope::EventCallback(cb) => match cb.event {
                InnerEvent::Message(msg) => self.handle_message(msg).await,
                InnerEvent::Other => {
                    log::debug!(
                        "ignoring non-message event {} from team {}",
                        cb.event_id.as_deref().unwrap_or("-"),
                        cb.team_id.as_deref().unwrap_or("-")
                    );
                    Ok(Outcome::Acknowledged)
                }
            },
            Envelope::AppRateLimited(rl) => {
                log::warn!(
                    "slack rate limited event delivery for team {} (minute {})",
                    rl.team_id.as_deref().unwrap_or("-"),
                    rl.minute_rate_limited.unwrap_or_default()
                );
                Ok(Outcome::Acknowledged)
            }
            Envelope::Unknown => {
                log::debug!("ignoring unknown envelope type");
                Ok(Outcome::Acknowledged)
            }
        }
    }

    async fn handle_message(&self, msg: MessageEvent) -> Result<Outcome, DispatchError> {
        if msg.is_from_bot() {
            log::debug!(
                "ignoring bot message in {} (subtype {})",
                msg.channel,
                msg.subtype.as_deref().unwrap_or("-")
            );
            return Ok(Outcome::IgnoredBot);
        }
        log::debug!(
            "storing message {} from {} in {}",
            msg.ts.as_deref().unwrap_or("-"),
            msg.user.as_deref().unwrap_or("-"),
            msg.channel
        );
        self.store
            .add_message(&self.collection, &msg.channel, USER_SENDER, &msg.text)
            .await?;
        Ok(Outcome::Persisted)
    }
}
