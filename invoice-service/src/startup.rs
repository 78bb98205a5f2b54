//! Application startup and lifecycle management.
//!
//! One HTTP listener for liveness probes, plus the subscription pipeline
//! running alongside it. Binding port 0 gives tests a random free port.

use crate::config::InvoiceConfig;
use crate::services::crm::CrmClient;
use crate::services::pipeline::run_pipeline;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    /// Absent when CRM login failed at startup; the HTTP surface stays up
    /// regardless.
    pub crm: Option<Arc<dyn CrmClient>>,
}

/// Liveness string the CRM-side monitors poll.
async fn liveness() -> &'static str {
    "Invoice Service Running!"
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "invoice-service",
            "version": env!("CARGO_PKG_VERSION"),
            "crm_connected": state.crm.is_some(),
        })),
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Bind the HTTP listener and assemble state. `crm` is `None` when the
    /// connection could not be established; events are then not processed
    /// but the process keeps serving liveness checks.
    pub async fn build(
        config: InvoiceConfig,
        crm: Option<Arc<dyn CrmClient>>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state: AppState { config, crm },
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the HTTP server and, when connected, the event pipeline, until
    /// stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        if let Some(crm) = self.state.crm.clone() {
            let config = self.state.config.clone();
            tokio::spawn(run_pipeline(crm, config));
        } else {
            tracing::warn!("no CRM connection; inbound invoice events will not be processed");
        }

        let router = Router::new()
            .route("/", get(liveness))
            .route("/health", get(health_check))
            .with_state(self.state);

        axum::serve(self.listener, router).await
    }
}
