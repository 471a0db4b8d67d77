use std::sync::Arc;

use rmcp::{
    model::{
        ClientNotification, ClientRequest, CustomResult, Implementation, ListPromptsResult,
        ListResourcesResult, PaginatedRequestParams, ReadResourceRequestParams,
        ReadResourceResult, ServerCapabilities, ServerInfo, ServerResult,
    },
    service::{NotificationContext, RequestContext},
    ErrorData as McpError, RoleServer, ServerHandler, Service,
};
use rules_enforcer_core::handlers::{MARKDOWN_MIME, PROMPTS, RULES_RESOURCE_NAME, RULES_URI};
use rules_enforcer_core::HandlerSet;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

const INSTRUCTIONS: &str = r#"This server enforces a set of mandatory rules for AI agents.

Read the `rules://current` resource to see the active rules. The `__auto_inject_system_rules__` and `auto_inject_rules` prompts inject the rules as binding instructions; `inject_rules_manual` injects them on demand. The rules MUST be followed in every response."#;

// --- Server ---

/// Service served over stdio.
///
/// `prompts/get` is answered here with the reply's own wire JSON, because
/// `GetPromptResult` has no `_meta` field and clients key enforcement off it.
/// Every other request goes to [`RulesHandler`].
#[derive(Clone)]
pub struct RulesServer {
    inner: RulesHandler,
}

impl RulesServer {
    pub fn new(handlers: Arc<HandlerSet>) -> Self {
        Self {
            inner: RulesHandler { handlers },
        }
    }

    fn get_prompt(&self, name: &str) -> Result<ServerResult, McpError> {
        debug!(prompt = name, "get prompt");
        let reply = self
            .inner
            .handlers
            .prompt(name)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown prompt: {name}"), None))?;
        let value = serde_json::to_value(&reply).map_err(encode_error)?;
        Ok(ServerResult::CustomResult(CustomResult::new(value)))
    }
}

impl Service<RoleServer> for RulesServer {
    async fn handle_request(
        &self,
        request: ClientRequest,
        context: RequestContext<RoleServer>,
    ) -> Result<ServerResult, McpError> {
        match request {
            ClientRequest::GetPromptRequest(request) => self.get_prompt(&request.params.name),
            other => Service::handle_request(&self.inner, other, context).await,
        }
    }

    async fn handle_notification(
        &self,
        notification: ClientNotification,
        context: NotificationContext<RoleServer>,
    ) -> Result<(), McpError> {
        Service::handle_notification(&self.inner, notification, context).await
    }

    fn get_info(&self) -> ServerInfo {
        ServerHandler::get_info(&self.inner)
    }
}

/// Server info, resources and the prompt listing.
#[derive(Clone)]
struct RulesHandler {
    handlers: Arc<HandlerSet>,
}

impl ServerHandler for RulesHandler {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = self.handlers.server_name().to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info,
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        resource_catalogue()
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        debug!(uri = %request.uri, "read resource");
        match self.handlers.read_resource(&request.uri) {
            Some(reply) => to_wire(&reply),
            None => Err(McpError::resource_not_found(
                format!("Unknown resource: {}", request.uri),
                Some(json!({ "uri": request.uri })),
            )),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        prompt_catalogue()
    }
}

// --- Helpers ---

fn encode_error(e: serde_json::Error) -> McpError {
    McpError::internal_error(format!("failed to encode response: {e}"), None)
}

/// Re-type a handler envelope as the matching protocol result via its wire JSON.
fn to_wire<T: DeserializeOwned>(envelope: &impl Serialize) -> Result<T, McpError> {
    serde_json::to_value(envelope)
        .and_then(serde_json::from_value)
        .map_err(encode_error)
}

fn resource_catalogue() -> Result<ListResourcesResult, McpError> {
    to_wire(&json!({
        "resources": [{
            "uri": RULES_URI,
            "name": RULES_RESOURCE_NAME,
            "description": "Current mandatory rules for AI agents",
            "mimeType": MARKDOWN_MIME,
        }]
    }))
}

fn prompt_catalogue() -> Result<ListPromptsResult, McpError> {
    let prompts: Vec<_> = PROMPTS
        .iter()
        .map(|(name, description)| json!({ "name": name, "description": description }))
        .collect();
    to_wire(&json!({ "prompts": prompts }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_enforcer_core::RulesStore;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    const FRENCH: &str = "Always answer in French.";

    fn server_with(contents: Option<&str>, auto_inject: bool) -> (TempDir, RulesServer) {
        let dir = TempDir::new().expect("create tempdir");
        let path = dir.path().join("rules.md");
        if let Some(contents) = contents {
            fs::write(&path, contents).unwrap();
        }
        let handlers = HandlerSet::new(RulesStore::new(path), "Test Enforcer", auto_inject);
        (dir, RulesServer::new(Arc::new(handlers)))
    }

    /// JSON-RPC `result` payload the client receives for `prompts/get`.
    fn prompt_on_wire(server: &RulesServer, name: &str) -> Value {
        let result = server.get_prompt(name).unwrap();
        serde_json::to_value(&result).unwrap()
    }

    fn message_text(wire: &Value) -> &str {
        wire["messages"][0]["content"]["text"].as_str().unwrap()
    }

    #[test]
    fn info_advertises_prompts_and_resources() {
        let (_dir, server) = server_with(Some("rule"), true);
        let info = Service::get_info(&server);

        assert_eq!(info.server_info.name, "Test Enforcer");
        assert!(info.capabilities.prompts.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.tools.is_none());
    }

    #[test]
    fn catalogues_list_every_entry() {
        let resources = resource_catalogue().unwrap();
        assert_eq!(resources.resources.len(), 1);
        assert_eq!(resources.resources[0].uri, RULES_URI);

        let prompts = prompt_catalogue().unwrap();
        let names: Vec<&str> = prompts.prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["__auto_inject_system_rules__", "auto_inject_rules", "inject_rules_manual"]
        );
    }

    #[test]
    fn resource_reply_converts_to_protocol_result() {
        let (_dir, server) = server_with(Some(FRENCH), true);
        let reply = server.inner.handlers.read_rules();

        let result: ReadResourceResult = to_wire(&reply).unwrap();
        assert_eq!(result.contents.len(), 1);
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["contents"][0]["mimeType"], MARKDOWN_MIME);
        assert!(wire["contents"][0]["text"].as_str().unwrap().contains(FRENCH));
    }

    #[test]
    fn gated_prompt_carries_directives_and_meta_on_wire() {
        let (_dir, server) = server_with(Some(FRENCH), true);
        let wire = prompt_on_wire(&server, "__auto_inject_system_rules__");

        assert_eq!(wire["messages"].as_array().unwrap().len(), 1);
        assert_eq!(wire["messages"][0]["role"], "user");
        assert_eq!(wire["messages"][0]["content"]["type"], "text");
        assert!(message_text(&wire)
            .contains("SYSTEM RULES - ALWAYS FOLLOW THESE INSTRUCTIONS:\n\nAlways answer in French."));
        assert_eq!(
            wire["_meta"],
            json!({"auto_inject": true, "priority": "system", "enforce_always": true})
        );
    }

    #[test]
    fn always_on_prompt_carries_meta_on_wire() {
        let (_dir, server) = server_with(Some(FRENCH), false);
        let wire = prompt_on_wire(&server, "auto_inject_rules");

        assert!(message_text(&wire)
            .starts_with("SYSTEM RULES - ALWAYS FOLLOW THESE INSTRUCTIONS:\n\nAlways answer in French."));
        assert_eq!(wire["_meta"], json!({"auto_inject": true, "priority": "highest"}));
    }

    #[test]
    fn manual_prompt_carries_meta_on_wire() {
        let (_dir, server) = server_with(None, true);
        let wire = prompt_on_wire(&server, "inject_rules_manual");

        let text = message_text(&wire);
        assert!(text.starts_with("MANUAL RULES INJECTION:"));
        assert!(text.contains("NOT FOUND"));
        assert_eq!(wire["_meta"], json!({"auto_inject": true, "priority": "highest"}));
    }

    #[test]
    fn silent_degrade_sends_empty_message_list() {
        let (_dir, server) = server_with(None, true);
        let wire = prompt_on_wire(&server, "__auto_inject_system_rules__");

        assert_eq!(wire, json!({ "messages": [] }));
    }

    #[test]
    fn unknown_prompt_is_invalid_params() {
        let (_dir, server) = server_with(Some(FRENCH), true);
        let err = server.get_prompt("nope").unwrap_err();
        assert!(err.message.contains("nope"));
    }
}
