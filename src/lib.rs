//! Service-selection chat service.
//!
//! A small HTTP service that guides a user from a broad service category
//! down a decision tree to a concrete service, collects their contact
//! details through an LLM-driven dialogue, and persists the finished
//! request. The LLM can only change conversation state through a declared
//! action set, validated against the current phase on the server.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod store;
pub mod tree;

pub use config::Config;
pub use error::{Error, Result};
