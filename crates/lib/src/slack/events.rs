//! Slack Events API payloads: the outer envelope and the inner events we route.

use serde::Deserialize;

/// Outer envelope of an Events API request body, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Handshake sent when the request URL is configured; the challenge must be echoed back.
    UrlVerification(UrlVerification),
    /// A subscribed event plus team/app metadata.
    EventCallback(EventCallback),
    /// Slack is dropping events for this app because it exceeded its quota.
    AppRateLimited(AppRateLimited),
    /// Any envelope type we do not handle.
    #[serde(other)]
    Unknown,
}

/// `url_verification` body. An absent or null challenge reads as `None`.
#[derive(Debug, Deserialize)]
pub struct UrlVerification {
    #[serde(default)]
    pub challenge: Option<String>,
}

/// `event_callback` body.
#[derive(Debug, Deserialize)]
pub struct EventCallback {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    pub event: InnerEvent,
}

/// `app_rate_limited` body.
#[derive(Debug, Deserialize)]
pub struct AppRateLimited {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub minute_rate_limited: Option<i64>,
}

/// Event carried inside an `event_callback`, tagged by its own `type`. Only messages are routed.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

/// A `message` event. `bot_id` is absent (or empty) when a human sent it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// True when the message was posted by a bot (including this app).
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Parse a raw request body into an envelope.
pub fn parse_envelope(body: &[u8]) -> Result<Envelope, serde_json::Error> {
    serde_json::from_slice(body)
}
