use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use courier_api::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let secret_key =
        std::env::var("COURIER_SECRET_KEY").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("COURIER_DB_PATH").unwrap_or_else(|_| "courier.db".into());
    let host = std::env::var("COURIER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("COURIER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Password-hashing cost, tunable per deployment
    let mem_kib: u32 = std::env::var("COURIER_HASH_MEM_KIB")
        .unwrap_or_else(|_| "19456".into())
        .parse()?;
    let iters: u32 = std::env::var("COURIER_HASH_ITERS")
        .unwrap_or_else(|_| "2".into())
        .parse()?;
    let lanes: u32 = std::env::var("COURIER_HASH_LANES")
        .unwrap_or_else(|_| "1".into())
        .parse()?;

    let params = Params::new(mem_kib, iters, lanes, None)
        .map_err(|e| anyhow::anyhow!("bad hashing parameters: {}", e))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    // Init database
    let db = courier_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state = Arc::new(AppStateInner {
        db,
        secret_key,
        argon2,
    });

    let app = courier_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Courier server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
