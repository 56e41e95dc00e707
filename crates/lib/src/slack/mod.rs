//! Slack Events API: payload types for the subscriber endpoint.

mod events;

pub use events::{
    parse_envelope, AppRateLimited, Envelope, EventCallback, InnerEvent, MessageEvent,
    UrlVerification,
};
