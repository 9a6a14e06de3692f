//! MCP stdio server for Apple Calendar and Reminders.
//!
//! Launched by an MCP host, which talks newline-delimited JSON-RPC over
//! stdin/stdout. All tracing output goes to stderr (and optionally a daily
//! log file) so stdout stays a clean protocol channel.
//!
//! `EVENTKIT_MCP_BACKEND=memory` swaps EventKit for an in-memory store with
//! both categories authorized, for trying the server out off macOS.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use eventkit_mcp::config::ServerConfig;
use eventkit_mcp::mcp::{McpServer, run_stdio_server};
use eventkit_mcp::permissions::{AuthorizationBackend, PermissionGate, StaticAuthorization};
use eventkit_mcp::store::{ItemStore, MemoryNativeStore, NativeStore};
use eventkit_mcp::{app_dirs, logging, platform, tools};

const BACKEND_ENV: &str = "EVENTKIT_MCP_BACKEND";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = ServerConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let _log_guard = logging::init_tracing(&config.logging, &app_dirs::logs_dir());
    tracing::info!(
        config = %config_path.display(),
        mode = ?config.tools.mode,
        "eventkit-mcp starting"
    );

    let (native, backend) = select_backend();
    let gate = Arc::new(PermissionGate::new(backend));

    if config.permissions.tcc_repair {
        run_tcc_repair(&config, &gate);
    }
    if config.permissions.request_on_startup {
        gate.prewarm();
    }

    let store = Arc::new(ItemStore::new(
        native,
        Arc::clone(&gate),
        config.store.clone(),
        config.server.attribution.clone(),
    ));
    let registry = Arc::new(tools::build_registry(store, config.tools.mode));
    let server = Arc::new(McpServer::new(registry, config.server.name.clone()));

    run_stdio_server(server).await.map_err(|e| {
        tracing::error!(error = %e, "eventkit-mcp exited with error");
        anyhow::anyhow!("eventkit-mcp failed: {e}")
    })?;

    tracing::info!("eventkit-mcp shut down cleanly");
    Ok(())
}

fn config_path_from_args() -> anyhow::Result<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => Ok(ServerConfig::default_config_path()),
        Some("--config") => args
            .get(2)
            .map(PathBuf::from)
            .context("--config requires a path"),
        Some("help" | "--help" | "-h") => {
            eprintln!("usage: eventkit-mcp [--config <path>]");
            std::process::exit(0);
        }
        Some(other) => anyhow::bail!("unknown argument `{other}` (use --config <path>)"),
    }
}

fn select_backend() -> (Box<dyn NativeStore>, Arc<dyn AuthorizationBackend>) {
    if std::env::var(BACKEND_ENV).as_deref() == Ok("memory") {
        tracing::warn!("using in-memory store; nothing is written to EventKit");
        let store: Box<dyn NativeStore> = Box::new(MemoryNativeStore::with_defaults());
        let auth: Arc<dyn AuthorizationBackend> = Arc::new(StaticAuthorization::authorized());
        return (store, auth);
    }
    (
        platform::create_native_store(),
        platform::create_authorization_backend(),
    )
}

#[cfg(feature = "tcc-repair")]
fn run_tcc_repair(config: &ServerConfig, gate: &PermissionGate) {
    let Some(client) = config.permissions.tcc_client.as_deref() else {
        tracing::warn!("tcc_repair enabled but tcc_client is not set; skipping");
        return;
    };
    let Some(database) = config
        .permissions
        .tcc_database
        .clone()
        .or_else(app_dirs::user_tcc_database)
    else {
        tracing::warn!("cannot locate the user TCC database; skipping repair");
        return;
    };
    match eventkit_mcp::permissions::tcc::repair_if_needed(gate, &database, client) {
        Ok(outcome) => tracing::info!(?outcome, client, "TCC repair finished"),
        Err(e) => tracing::warn!(error = %e, client, "TCC repair failed"),
    }
}

#[cfg(not(feature = "tcc-repair"))]
fn run_tcc_repair(_config: &ServerConfig, _gate: &PermissionGate) {
    tracing::warn!("tcc_repair enabled but this build lacks the `tcc-repair` feature");
}
