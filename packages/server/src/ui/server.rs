//! Server execution logic.

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::GatewayConfig,
    domain::{
        AiBackend, Analytics, Authenticator, ConnectionRegistry, EscalationStore, OwnedResource,
    },
    infrastructure::{
        analytics::InMemoryAnalytics, escalation::InMemoryEscalationStore,
        repository::InMemoryConnectionRegistry,
    },
    usecase::{
        ChatUseCase, ConnectClientUseCase, DisconnectClientUseCase, EscalationUseCase,
        FeedbackUseCase, HeartbeatMonitor, MessageRouter, SessionQueryUseCase,
        ShutdownCoordinator,
    },
};

use super::{
    handler::{get_client_count, get_session, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// External services the gateway talks to
pub struct Collaborators {
    pub authenticator: Arc<dyn Authenticator>,
    pub backend: Arc<dyn AiBackend>,
    pub analytics: Arc<dyn Analytics>,
    pub escalations: Arc<dyn EscalationStore>,
    /// Released during shutdown
    pub resources: Vec<Arc<dyn OwnedResource>>,
}

impl Collaborators {
    /// In-process analytics and escalation store, both released at shutdown
    pub fn in_memory(authenticator: Arc<dyn Authenticator>, backend: Arc<dyn AiBackend>) -> Self {
        let analytics = Arc::new(InMemoryAnalytics::new());
        let escalations = Arc::new(InMemoryEscalationStore::new());
        Self {
            authenticator,
            backend,
            analytics: analytics.clone(),
            escalations: escalations.clone(),
            resources: vec![analytics, escalations],
        }
    }
}

/// WebSocket chat gateway
///
/// # Example
///
/// ```ignore
/// let server = Server::new(&config, Collaborators::in_memory(authenticator, backend));
/// server.run(config.host.clone(), config.port).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    registry: Arc<dyn ConnectionRegistry>,
    heartbeat_interval: Duration,
}

impl Server {
    /// Wire the registry and use cases around the given collaborators
    pub fn new(config: &GatewayConfig, collaborators: Collaborators) -> Self {
        // 1. Registry (in-memory, process-local)
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());

        // 2. UseCases
        let connect_client_usecase = Arc::new(ConnectClientUseCase::new(
            collaborators.authenticator,
            registry.clone(),
        ));
        let disconnect_client_usecase = Arc::new(DisconnectClientUseCase::new(registry.clone()));
        let chat_usecase = Arc::new(ChatUseCase::new(
            registry.clone(),
            collaborators.backend,
            collaborators.analytics.clone(),
            config.stream_by_default,
        ));
        let feedback_usecase = Arc::new(FeedbackUseCase::new(
            registry.clone(),
            collaborators.analytics,
        ));
        let escalation_usecase = Arc::new(EscalationUseCase::new(
            registry.clone(),
            collaborators.escalations,
        ));
        let message_router = Arc::new(MessageRouter::new(
            registry.clone(),
            chat_usecase,
            feedback_usecase,
            escalation_usecase,
        ));
        let session_query_usecase = Arc::new(SessionQueryUseCase::new(registry.clone()));
        let coordinator = Arc::new(ShutdownCoordinator::new(
            registry.clone(),
            collaborators.resources,
            config.shutdown_timeout,
        ));

        // 3. AppState
        let state = Arc::new(AppState {
            connect_client_usecase,
            disconnect_client_usecase,
            message_router,
            session_query_usecase,
            coordinator,
        });

        Self {
            state,
            registry,
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        self.state.coordinator.clone()
    }

    /// HTTP routes of the gateway
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/clients/count", get(get_client_count))
            .route("/api/sessions/{client_id}", get(get_session))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `host:port` and serve until shut down
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat gateway listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener).await?;
        Ok(())
    }

    /// Serve on an already bound listener.
    ///
    /// Shutdown starts on Ctrl+C / SIGTERM or when
    /// [`ShutdownCoordinator::trigger`] is called; open sockets are closed
    /// before the HTTP server stops waiting for them.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let coordinator = self.coordinator();

        let heartbeat = HeartbeatMonitor::new(self.registry.clone(), self.heartbeat_interval)
            .spawn(coordinator.subscribe());
        coordinator.attach_heartbeat(heartbeat).await;

        let app = self.router();
        let shutdown = {
            let coordinator = coordinator.clone();
            async move {
                tokio::select! {
                    _ = shutdown_signal() => coordinator.trigger(),
                    _ = coordinator.triggered() => {}
                }
                coordinator.shutdown().await;
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        // Covers the server stopping for reasons other than the shutdown future
        coordinator.shutdown().await;
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
