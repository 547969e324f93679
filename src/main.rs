use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_backend::{config::AppConfig, db, routes, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load();

    let pool = db::init_db(&config.database_path).expect("Failed to initialize database");

    {
        let conn = pool.lock().expect("Database lock failed during startup");
        match db::sessions::cleanup_expired_sessions(&conn) {
            Ok(0) => {}
            Ok(n) => tracing::info!("Removed {} expired sessions", n),
            Err(e) => tracing::warn!("Failed to clean up expired sessions: {}", e),
        }
    }

    let state = AppState::new(pool, config);
    state
        .uploads
        .ensure_dirs()
        .expect("Failed to create upload directories");

    let bind_addr = state.config.bind_addr();
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

    tracing::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
