//! Route wiring and the listen loop
//!
//! Startup runs in a fixed order: weight table, help text, metric registry,
//! routes, listener.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::respond::{DisplayMessage, HelpPage, InstrumentedHandler, Respond};
use crate::weights::{Weight, WeightTable};
use axum::{
    Router,
    http::Method,
    routing::{MethodRouter, any},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Turn an instrumented handler into a route accepting every method
fn instrumented<R: Respond>(handler: InstrumentedHandler<R>) -> MethodRouter<AppState> {
    let handler = Arc::new(handler);
    any(move |method: Method| {
        let handler = Arc::clone(&handler);
        async move { handler.handle(&method) }
    })
}

/// Build the application router
///
/// Registers one instrumented route per table entry, the instrumented help
/// page at `/`, and the uninstrumented `/metrics` and `/ready` routes.
/// Anything else gets axum's default 404 and touches no instrument.
pub fn build_router(state: AppState, table: &WeightTable, help: String) -> Router {
    let metrics = state.metrics().clone();
    let display = DisplayMessage::new(&state.config().server.display);

    let mut router = Router::new();
    for (name, weight) in table.entries() {
        let path = name.path();
        router = router.route(
            &path,
            instrumented(InstrumentedHandler::new(
                path.as_str(),
                weight,
                metrics.clone(),
                display.clone(),
            )),
        );
    }

    router
        .route(
            "/",
            instrumented(InstrumentedHandler::new(
                "/",
                Weight::NO_OP,
                metrics,
                HelpPage::new(help),
            )),
        )
        .route("/metrics", any(handlers::metrics::handler))
        .route("/ready", any(handlers::ready::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until Ctrl-C or SIGTERM
///
/// # Errors
///
/// Returns `AppError::Bind` when the listen address cannot be bound; the
/// caller treats this as fatal. No retry is attempted.
pub async fn serve(config: Config) -> AppResult<()> {
    let table = WeightTable::builtin();
    let help = table.help_text();
    let bind_addr = config.bind_addr()?;
    let state = AppState::new(config)?;
    let app = build_router(state, &table, help);

    for (name, weight) in table.entries() {
        tracing::debug!(path = %name.path(), weight = %weight, "Registered endpoint");
    }

    let listener = tokio::net::TcpListener::bind(bind_addr.as_str())
        .await
        .map_err(|source| AppError::Bind {
            addr: bind_addr.clone(),
            source,
        })?;

    let local_addr = listener.local_addr().map_err(AppError::Serve)?;
    tracing::info!(
        "Listening on {} with {} weighted endpoints",
        local_addr,
        table.len()
    );
    tracing::info!("Metrics available at http://{}/metrics", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Serve)?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
