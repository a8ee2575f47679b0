//! Quill - binary entry point.
//!
//! Speaks LSP over stdin/stdout. Stdout carries the protocol, so all
//! logging goes to a file.
//!
//! ```text
//! main() -> init_tracing() -> QuillConfig -> LspServer::serve(stdin, stdout)
//!                                                |
//!                                                v
//!                               EOF | exit | Ctrl-C | SIGHUP
//! ```

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quill_config::QuillConfig;
use quill_lsp::{DocumentStore, Dispatcher, LspServer, ServeOutcome};

fn init_tracing(config: Option<&QuillConfig>) -> Vec<String> {
    let mut warnings = Vec::new();
    let level = config.and_then(QuillConfig::log_level).unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|e| {
            warnings.push(format!("Invalid log level {level:?}: {e}"));
            EnvFilter::new("info")
        });

    let (log_file, open_warnings) = open_quill_log_file(config);
    warnings.extend(open_warnings);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        return warnings;
    }

    // No log file: stay silent rather than write into the protocol stream.
    tracing_subscriber::registry().with(env_filter).init();
    warnings
}

fn open_quill_log_file(
    config: Option<&QuillConfig>,
) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut candidates = Vec::new();
    if let Some(configured) = config.and_then(QuillConfig::log_file) {
        candidates.push(configured);
    }
    candidates.extend(quill_config::default_log_files());

    let mut warnings = Vec::new();
    for candidate in candidates {
        if let Some(parent) = candidate.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let loaded = QuillConfig::load();
    let config = loaded.as_ref().ok().and_then(Option::as_ref);

    let warnings = init_tracing(config);
    for warning in warnings {
        tracing::warn!("{warning}");
    }
    match &loaded {
        Ok(Some(_)) => {
            if let Some(path) = QuillConfig::path() {
                tracing::info!(path = %path.display(), "Loaded config");
            }
        }
        Ok(None) => tracing::debug!("No config file, using defaults"),
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "Ignoring config, using defaults: {err}");
        }
    }

    let (documents, server_info) = match config {
        Some(config) => (
            DocumentStore::new(config.diagnostic_engine()),
            config.server_info(),
        ),
        None => Default::default(),
    };
    let mut server = LspServer::new(Dispatcher::new(documents, server_info));

    tracing::info!(pid = std::process::id(), "Language server started");

    let serve = server.serve(tokio::io::stdin(), tokio::io::stdout());
    tokio::select! {
        outcome = serve => {
            match outcome.context("serving stdio")? {
                ServeOutcome::InputClosed => tracing::info!("Stopped: input closed"),
                ServeOutcome::Exited => tracing::info!("Stopped: exit notification"),
            }
        }
        signal = shutdown_signal() => {
            tracing::info!("Stopped: {signal}");
        }
    }

    Ok(())
}

/// Resolve on Ctrl-C, or on SIGHUP when the editor goes away.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::hangup()) {
        Ok(mut hangup) => tokio::select! {
            name = ctrl_c() => name,
            _ = hangup.recv() => "hangup",
        },
        Err(e) => {
            tracing::warn!("Failed to install SIGHUP handler: {e}");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    "interrupt"
}
