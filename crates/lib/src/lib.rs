//! Chatlog core library: Slack Events API subscriber that records human messages
//! into a conversation store. Used by the `chatlog` CLI.

pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod slack;
pub mod store;
