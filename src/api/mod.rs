//! HTTP control API
//!
//! Lets the voice assistant, reminders and anything else on the network
//! drive the eyes and arms without sharing process state.

mod auth;
pub mod eyes;
pub mod health;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::controller::{ArmsHandle, EyesHandle};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub eyes: EyesHandle,
    pub arms: Option<ArmsHandle>,
    pub api_key: Option<String>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    eyes: EyesHandle,
    arms: Option<ArmsHandle>,
    api_key: Option<String>,
    port: u16,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(eyes: EyesHandle, port: u16) -> Self {
        Self {
            eyes,
            arms: None,
            api_key: None,
            port,
        }
    }

    /// Set the API key for control endpoints
    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Attach the arms controller
    #[must_use]
    pub fn arms(mut self, arms: Option<ArmsHandle>) -> Self {
        self.arms = arms;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        if self.api_key.is_none() {
            tracing::warn!("PEBO_API_KEY not set - control endpoints are open");
        }
        ApiServer {
            state: Arc::new(ApiState {
                eyes: self.eyes,
                arms: self.arms,
                api_key: self.api_key,
            }),
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(eyes::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // CORS layer for the companion app and browser dashboards
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Api(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Api(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
