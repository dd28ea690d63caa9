use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::chatrooms;
use parley_api::groups;
use parley_api::middleware::require_auth;
use parley_api::state::{AppState, AppStateInner};
use parley_crypto::CipherKey;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Config — the encryption key and JWT secret have no defaults: refusing
    // to start beats running with a known key.
    let cipher_key = CipherKey::from_hex(&require_env("PARLEY_ENCRYPTION_KEY")).unwrap_or_else(|_| {
        eprintln!("FATAL: PARLEY_ENCRYPTION_KEY must be 64 hex characters (256 bits).");
        std::process::exit(1);
    });
    let jwt_secret = require_env("PARLEY_JWT_SECRET");

    let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()?;

    // Init database
    let db = parley_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state, read-only after this point
    let state: AppState = Arc::new(AppStateInner {
        db,
        cipher_key,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/chatrooms", get(chatrooms::list_chatrooms))
        .route("/chatrooms/start", post(chatrooms::start_chat))
        .route(
            "/chatrooms/{other_user_id}/messages",
            get(chatrooms::get_conversation).post(chatrooms::send_message),
        )
        .route("/chatrooms/groups", post(groups::create_group))
        .route("/chatrooms/groups/{group_id}/members", post(groups::add_member))
        .route(
            "/chatrooms/groups/{group_id}/messages",
            get(groups::get_group_messages).post(groups::send_group_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn require_env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| {
        eprintln!("FATAL: {name} is not set.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
