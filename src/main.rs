use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propboard::{abuse, api, auth, state::AppState, store::MemStore, watch, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propboard=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Propboard...");

    // Initialize authentication and anti-abuse config
    let auth_config = Arc::new(auth::AuthConfig::from_env());
    let abuse_config = Arc::new(abuse::AbuseConfig::from_env());

    let state = Arc::new(AppState::new(Arc::new(MemStore::new())));

    // Spawn background task that locks events once their deadline passes
    watch::spawn_lock_watcher(state.clone());

    // Protected admin routes (with HTTP Basic Auth)
    let admin_routes = Router::new()
        .route(
            "/api/admin/events",
            get(api::list_all_events).post(api::create_event),
        )
        .route(
            "/api/admin/events/{id}/questions",
            post(api::add_question),
        )
        .route(
            "/api/admin/events/{id}/questions/order",
            put(api::reorder_questions),
        )
        .route(
            "/api/admin/questions/{id}/answer",
            put(api::grade_question),
        )
        .route("/api/admin/events/{id}/entries", get(api::list_entries))
        .route(
            "/api/admin/submissions/{id}",
            put(api::update_submission),
        )
        .layer(middleware::from_fn_with_state(
            auth_config.clone(),
            auth::admin_auth_middleware,
        ));

    // Submission intake with rate limiting
    let submit_routes = Router::new()
        .route("/api/events/{id}/submissions", post(api::submit_picks))
        .layer(middleware::from_fn_with_state(
            abuse_config.clone(),
            abuse::submission_limit_middleware,
        ));

    let app = Router::new()
        .route("/api/events", get(api::list_events))
        .route("/api/events/{id}", get(api::get_event))
        .route("/api/events/{id}/leaderboard", get(api::get_leaderboard))
        .route(
            "/api/events/{id}/leaderboard.csv",
            get(api::get_leaderboard_csv),
        )
        .route("/ws", get(ws::ws_handler))
        .merge(submit_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7180);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
