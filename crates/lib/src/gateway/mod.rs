//! HTTP surface: a health probe and the Slack Events API request URL on one port.

mod server;

pub use server::{router, run_server, ServerState};
