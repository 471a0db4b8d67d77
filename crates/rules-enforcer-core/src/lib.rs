//! Core of Rules Enforcer: a cached loader for one markdown rules document and
//! the handlers that serve it to MCP clients.

pub mod config;
pub mod format;
pub mod handlers;
pub mod rules;

pub use config::Settings;
pub use handlers::{HandlerSet, PromptReply, ResourceReply};
pub use rules::{LoadError, LoadResult, RulesStore};
