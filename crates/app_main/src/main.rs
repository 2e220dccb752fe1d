//! DriveDesk - Terminal file manager for a Google-Drive-backed backend
//!
//! Main entry point.

mod shell;
mod view;

use anyhow::Result;
use app_api::{DesktopLinks, HttpDriveClient};
use app_core::{AppConfig, AppState};
use shell::{ConsoleSink, Shell};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration decides the log level, so read it before logging starts
    let loaded = AppConfig::load();
    let level = loaded
        .as_ref()
        .map(|c| c.log.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize logging and panic hook
    let _log_guard = app_log::init(&level)?;

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {:#}", e);
        AppConfig::default()
    });

    if let Err(e) = app_log::cleanup_old_logs(&app_log::log_dir(), config.log.retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("DriveDesk starting against {}", config.api.base_url);

    let api = HttpDriveClient::new(&config.client_options())?;
    let state = AppState::new(
        config,
        Arc::new(api),
        Arc::new(DesktopLinks::new()),
        Arc::new(ConsoleSink),
    );
    let shell = Shell::new(&state);

    // `drive_desk ls` style one-shot invocation
    let args: Vec<String> = std::env::args().skip(1).map(|a| format!("{:?}", a)).collect();
    if !args.is_empty() {
        state.refresh_session().await.ok();
        state.refresh().await.ok();
        shell.run_line(&args.join(" ")).await;
        return Ok(());
    }

    shell.start().await;
    shell.run().await
}
