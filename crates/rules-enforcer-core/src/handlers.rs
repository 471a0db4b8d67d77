//! Request handlers serving the rules document as a resource and as prompts.
//!
//! Handlers return plain envelopes that serialize to MCP wire JSON, so the
//! transport layer only has to hand them over.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;

use crate::format;
use crate::rules::{LoadResult, RulesStore};
use crate::Settings;

pub const RULES_URI: &str = "rules://current";
pub const RULES_RESOURCE_NAME: &str = "rules";
pub const MARKDOWN_MIME: &str = "text/markdown";

pub const AUTO_INJECT_PROMPT: &str = "__auto_inject_system_rules__";
pub const AUTO_INJECT_ALWAYS_PROMPT: &str = "auto_inject_rules";
pub const MANUAL_INJECT_PROMPT: &str = "inject_rules_manual";

/// Name and description of every prompt the handlers answer.
pub const PROMPTS: &[(&str, &str)] = &[
    (
        AUTO_INJECT_PROMPT,
        "SYSTEM: Automatically enforces mandatory rules in all AI conversations",
    ),
    (
        AUTO_INJECT_ALWAYS_PROMPT,
        "Automatically injects mandatory rules into AI agent conversations",
    ),
    (
        MANUAL_INJECT_PROMPT,
        "Manually inject rules into conversation when needed",
    ),
];

// --- Envelopes ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReply {
    pub contents: Vec<ResourceContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl PromptMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    System,
    Highest,
}

/// Hints downstream clients use to decide how strictly to apply a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMeta {
    pub auto_inject: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce_always: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PromptReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<PromptMeta>,
}

impl PromptReply {
    fn empty() -> Self {
        Self::default()
    }

    fn single(message: PromptMessage, meta: PromptMeta) -> Self {
        Self {
            description: None,
            messages: vec![message],
            meta: Some(meta),
        }
    }
}

// --- Handlers ---

/// Owns the rules cache and answers resource and prompt requests against it.
#[derive(Debug)]
pub struct HandlerSet {
    store: Mutex<RulesStore>,
    server_name: String,
    auto_inject: bool,
}

impl HandlerSet {
    pub fn new(store: RulesStore, server_name: impl Into<String>, auto_inject: bool) -> Self {
        Self {
            store: Mutex::new(store),
            server_name: server_name.into(),
            auto_inject,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            RulesStore::new(&settings.rules_path),
            settings.server_name.clone(),
            settings.auto_inject,
        )
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Load through the cache. Exposed for the eager load at startup.
    pub fn load(&self) -> LoadResult {
        self.store().get()
    }

    /// Same as [`load`](Self::load) but with failures replaced by their placeholder text.
    fn load_text(&self) -> String {
        self.load().unwrap_or_else(|e| e.placeholder())
    }

    fn store(&self) -> MutexGuard<'_, RulesStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn display(&self, text: &str) -> String {
        let store = self.store();
        format::for_display(text, store.path(), &self.server_name, Utc::now())
    }

    /// `rules://current`: the display block, carrying the failure text when loading fails.
    pub fn read_rules(&self) -> ResourceReply {
        let text = self.load_text();
        ResourceReply {
            contents: vec![ResourceContent {
                uri: RULES_URI.to_string(),
                mime_type: MARKDOWN_MIME.to_string(),
                text: self.display(&text),
            }],
        }
    }

    pub fn read_resource(&self, uri: &str) -> Option<ResourceReply> {
        (uri == RULES_URI).then(|| self.read_rules())
    }

    /// Gated auto-injection. Never injects failure text; an empty reply means nothing to add.
    pub fn auto_inject_rules(&self) -> PromptReply {
        if !self.auto_inject {
            return PromptReply::empty();
        }

        let rules = match self.load() {
            Ok(rules) => rules,
            Err(_) => return PromptReply::empty(),
        };
        // Content mentioning these markers is withheld too, even when it loaded cleanly.
        if rules.contains("ERROR") || rules.contains("NOT FOUND") {
            return PromptReply::empty();
        }

        let body = format::for_injection(&rules, &self.server_name);
        PromptReply::single(
            PromptMessage::user_text(format!("🔒 SYSTEM ENFORCEMENT - MANDATORY RULES:\n\n{body}")),
            PromptMeta {
                auto_inject: true,
                priority: Priority::System,
                enforce_always: Some(true),
            },
        )
    }

    /// Ungated injection of the directive block, failure text included.
    pub fn inject_rules_always(&self) -> PromptReply {
        let text = self.load_text();
        PromptReply::single(
            PromptMessage::user_text(format::for_injection(&text, &self.server_name)),
            PromptMeta {
                auto_inject: true,
                priority: Priority::Highest,
                enforce_always: None,
            },
        )
    }

    /// On-demand injection of the display block, failure text included.
    pub fn inject_rules_manual(&self) -> PromptReply {
        let text = self.load_text();
        let body = self.display(&text);
        PromptReply::single(
            PromptMessage::user_text(format!("MANUAL RULES INJECTION:\n\n{body}")),
            PromptMeta {
                auto_inject: true,
                priority: Priority::Highest,
                enforce_always: None,
            },
        )
    }

    pub fn prompt(&self, name: &str) -> Option<PromptReply> {
        match name {
            AUTO_INJECT_PROMPT => Some(self.auto_inject_rules()),
            AUTO_INJECT_ALWAYS_PROMPT => Some(self.inject_rules_always()),
            MANUAL_INJECT_PROMPT => Some(self.inject_rules_manual()),
            _ => None,
        }
    }
}
