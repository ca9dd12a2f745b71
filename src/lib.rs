//! Slack relay: answers chat messages with a tool-using language model.
//!
//! Inbound webhooks are authenticated with Slack's signing scheme, the
//! message text is run through a single tool-augmented model exchange, and
//! the answer is posted back to the originating channel.

pub mod agent;
pub mod auth;
pub mod config;
pub mod inference;
pub mod server;
pub mod slack;
pub mod tools;
pub mod types;
