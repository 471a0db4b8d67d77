mod init;
mod server;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rmcp::ServiceExt;
use rules_enforcer_core::{HandlerSet, Settings};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::server::RulesServer;

/// MCP server that enforces the rules in a markdown file on every AI agent conversation.
#[derive(Parser, Debug)]
#[command(name = "rules-enforcer", version, about)]
struct Cli {
    /// Path to the rules file, or a directory containing rules.md. Defaults to ./rules.md.
    #[arg(long, env = "RULE_ROOT", global = true)]
    rule_root: Option<String>,

    /// Server name reported to MCP clients.
    #[arg(long, env = "MCP_SERVER_NAME")]
    server_name: Option<String>,

    /// Automatic rule injection; "false" disables it.
    #[arg(long, env = "AUTO_INJECT")]
    auto_inject: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register this server with Claude Code and Codex for the current project.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    if let Some(Command::Init) = cli.command {
        init::init_project(&cwd, cli.rule_root.as_deref())?;
        return Ok(());
    }

    let settings = Settings::resolve(
        cli.rule_root,
        cli.server_name,
        cli.auto_inject.as_deref(),
        &cwd,
    );

    info!(name = %settings.server_name, "starting");
    info!(
        rule_root = settings.rule_root.as_deref().unwrap_or("<unset>"),
        "configured rule root"
    );
    info!(path = %settings.rules_path.display(), "rules file path");
    info!(
        state = if settings.auto_inject { "ENABLED" } else { "DISABLED" },
        "auto-injection"
    );

    let handlers = Arc::new(HandlerSet::from_settings(&settings));
    match handlers.load() {
        Ok(_) => info!("rules loaded successfully"),
        Err(e) => warn!("{}", e.placeholder().lines().next().unwrap_or_default()),
    }

    let service = match RulesServer::new(handlers)
        .serve(rmcp::transport::io::stdio())
        .await
    {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "failed to start MCP server");
            std::process::exit(1);
        }
    };
    info!("listening for MCP requests on stdio");

    tokio::select! {
        result = service.waiting() => {
            let reason = result?;
            info!(?reason, "transport closed");
        }
        _ = shutdown_signal() => {
            info!("shutting down");
        }
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
