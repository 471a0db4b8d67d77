//! `rules-enforcer init`: register the server with locally installed MCP clients.

use std::fs;
use std::path::Path;

use rules_enforcer_core::config::resolve_rules_path;

const SERVER_KEY: &str = "rules-enforcer";

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("neither `claude` nor `codex` found in PATH")]
    NoClients,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml_edit::TomlError),
}

/// Write project-scoped MCP config files in `cwd` so that Claude Code and/or
/// Codex start this server when working in the project. Only clients found
/// on `PATH` are configured.
pub fn init_project(cwd: &Path, rule_root: Option<&str>) -> Result<(), InitError> {
    let binary_path = std::env::current_exe()?
        .canonicalize()?
        .to_string_lossy()
        .to_string();
    let rules_path =
        rule_root.map(|r| resolve_rules_path(Some(r), cwd).to_string_lossy().to_string());

    let has_claude = which("claude");
    let has_codex = which("codex");

    if !has_claude && !has_codex {
        eprintln!("Neither `claude` nor `codex` found in PATH.");
        eprintln!("Install Claude Code or OpenAI Codex first, then re-run `rules-enforcer init`.");
        return Err(InitError::NoClients);
    }

    let mut clients = Vec::new();
    if has_claude {
        let path = init_claude_code(cwd, &binary_path, rules_path.as_deref())?;
        eprintln!("Wrote {}", path.display());
        clients.push("Claude Code");
    }
    if has_codex {
        let path = init_codex(cwd, &binary_path, rules_path.as_deref())?;
        eprintln!("Wrote {}", path.display());
        clients.push("Codex");
    }

    eprintln!("\nDone. {} will enforce your rules in this project.", clients.join(" and "));
    Ok(())
}

fn which(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                dir.join(name).is_file() || dir.join(format!("{name}.exe")).is_file()
            })
        })
        .unwrap_or(false)
}

/// Merge our entry into `.mcp.json` for Claude Code. A file that does not parse is left untouched.
fn init_claude_code(
    cwd: &Path,
    binary_path: &str,
    rules_path: Option<&str>,
) -> Result<std::path::PathBuf, InitError> {
    let mcp_json_path = cwd.join(".mcp.json");
    let mut root: serde_json::Value = if mcp_json_path.exists() {
        serde_json::from_str(&fs::read_to_string(&mcp_json_path)?)?
    } else {
        serde_json::json!({})
    };

    if !root.get("mcpServers").is_some_and(|v| v.is_object()) {
        root["mcpServers"] = serde_json::json!({});
    }
    let mut entry = serde_json::json!({
        "type": "stdio",
        "command": binary_path,
        "args": [],
    });
    if let Some(rules_path) = rules_path {
        entry["env"] = serde_json::json!({ "RULE_ROOT": rules_path });
    }
    root["mcpServers"][SERVER_KEY] = entry;

    fs::write(&mcp_json_path, serde_json::to_string_pretty(&root)?)?;
    Ok(mcp_json_path)
}

/// Merge our entry into `.codex/config.toml` for Codex. A file that does not parse is left untouched.
fn init_codex(
    cwd: &Path,
    binary_path: &str,
    rules_path: Option<&str>,
) -> Result<std::path::PathBuf, InitError> {
    let codex_dir = cwd.join(".codex");
    let config_toml_path = codex_dir.join("config.toml");

    let mut doc: toml_edit::DocumentMut = if config_toml_path.exists() {
        fs::read_to_string(&config_toml_path)?.parse()?
    } else {
        toml_edit::DocumentMut::new()
    };

    if !doc.contains_table("mcp_servers") {
        doc["mcp_servers"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(binary_path));
    server.insert("args", toml_edit::value(toml_edit::Array::new()));
    if let Some(rules_path) = rules_path {
        let mut env = toml_edit::InlineTable::new();
        env.insert("RULE_ROOT", rules_path.into());
        server.insert("env", toml_edit::value(env));
    }
    doc["mcp_servers"][SERVER_KEY] = toml_edit::Item::Table(server);

    fs::create_dir_all(&codex_dir)?;
    fs::write(&config_toml_path, doc.to_string())?;
    Ok(config_toml_path)
}
