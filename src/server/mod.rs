use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod routes;

/// Maximum accepted upload size: 16 MiB
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Server state
pub struct AppState {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
}

/// Build the application router.
///
/// Split out of [`start_server`] so tests can drive the routes in-process.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::list_books))
        .route("/add", get(routes::add_form).post(routes::create_book))
        .route("/edit/{id}", get(routes::get_book).post(routes::update_book))
        .route("/delete/{id}", post(routes::delete_book))
        .route("/search", get(routes::search_books))
        .route("/import", get(routes::import_form).post(routes::import_books))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    database_path: PathBuf,
    upload_dir: PathBuf,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&upload_dir)?;
    let state = Arc::new(AppState {
        database_path,
        upload_dir,
    });

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("📚 Bookstock running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
