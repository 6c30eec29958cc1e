// src/main.rs
use anyhow::Context;
use axum::http::StatusCode as AxumStatusCode;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{response::IntoResponse, Json};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod assignment_store;
mod config;
mod planner;
mod slot_layout;

#[cfg(test)]
mod planner_tests;

use crate::api::AppState;
use crate::assignment_store::{InMemoryAssignmentStore, StoreError};
use crate::config::{Cli, Config};
use crate::planner::{PlannerError, SlotPlanner};

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Malformed request body: {0}")]
    JsonBody(#[from] JsonRejection),
    #[error("Malformed path parameters: {0}")]
    PathParams(#[from] PathRejection),
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

// Map AppError to Axum's IntoResponse
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_message) = match self {
            AppError::BadRequest(ref msg) => (AxumStatusCode::BAD_REQUEST, msg.clone()),
            AppError::JsonBody(ref rejection) => {
                (AxumStatusCode::BAD_REQUEST, rejection.body_text())
            }
            AppError::PathParams(ref rejection) => {
                (AxumStatusCode::BAD_REQUEST, rejection.body_text())
            }
            AppError::Planner(PlannerError::Rejected(ref rejection)) => {
                (AxumStatusCode::CONFLICT, rejection.to_string())
            }
            AppError::Planner(PlannerError::Store(StoreError::NotFound(ref id))) => (
                AxumStatusCode::NOT_FOUND,
                format!("Assignment {} not found", id),
            ),
            AppError::Planner(PlannerError::Store(StoreError::LockError(_))) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error (Concurrency).".to_string(),
            ),
            AppError::TlsConfig(ref msg) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error (TLS Setup: {}). Check logs.", msg),
            ),
        };

        if status_code.is_server_error() {
            error!("Error occurred: {}", self);
        } else {
            warn!("Request failed ({}): {}", status_code, self);
        }

        (
            status_code,
            Json(json!({ "success": false, "error": error_message })),
        )
            .into_response()
    }
}

// --- Main Application Setup ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()
        .context("Failed to load PLANBOARD_* configuration")?
        .with_cli_overrides(&cli);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded: {:?}", config);

    // --- Create Shared App State ---
    let store = Arc::new(InMemoryAssignmentStore::new());
    let state = AppState {
        planner: Arc::new(SlotPlanner::new(store)),
    };
    let app = api::router(state);

    let addr: SocketAddr = config
        .listen_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_address()))?;

    // --- Run Web Server ---
    match load_tls_config(&config).await? {
        Some(tls_config) => {
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Starting server on http://{}", addr);
            axum::serve(listener, app)
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}

async fn load_tls_config(config: &Config) -> Result<Option<RustlsConfig>, AppError> {
    let Some((cert_path, key_path)) = config.tls_paths() else {
        if config.tls_cert_path.is_some() || config.tls_key_path.is_some() {
            warn!("Only one of PLANBOARD_TLS_CERT_PATH / PLANBOARD_TLS_KEY_PATH is set; serving plain HTTP");
        }
        return Ok(None);
    };

    let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| AppError::TlsConfig(format!("Failed to load TLS cert/key: {}", e)))?;
    info!(
        "TLS configuration loaded successfully from {} and {}",
        cert_path, key_path
    );
    Ok(Some(tls_config))
}
