use std::path::PathBuf;

use anyhow::Context;

use depotrack_creator::CreatorConfig;
use depotrack_store::LocalStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    depotrack_observability::init();

    let db_path = std::env::var("DEPOTRACK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_db_path());
    let listen = std::env::var("DEPOTRACK_LISTEN").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let store = LocalStore::open(&db_path)
        .await
        .with_context(|| format!("failed to open database at {db_path:?}"))?;
    tracing::info!("local store at {db_path:?}");

    // Read here even though the webhook path never calls out, so missing
    // credentials are warned about at startup instead of mid-action.
    let creator = CreatorConfig::from_env();
    tracing::info!("mirroring configured against {}", creator.api_domain);

    let app = depotrack_server::app::build_app(store);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!("webhook listener on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// `{app_data_dir}/depotrack/depot.db`, falling back to the working
/// directory when no data directory can be resolved.
fn default_db_path() -> PathBuf {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));

    dir.push("depotrack");
    if let Err(err) = std::fs::create_dir_all(&dir) {
        tracing::warn!("could not create data directory {dir:?}: {err}");
    }
    dir.push("depot.db");
    dir
}
