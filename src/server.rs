use crate::config::AppConfig;
use anyhow::{anyhow, Context, Result};
use axum::{response::Redirect, routing::get, Router};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;
use tracing::info;

/// Directory to serve and the map's path inside it.
fn split_output(html: &Path) -> Result<(PathBuf, String)> {
    let file_name = html
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Output path has no file name: {:?}", html))?
        .to_string();
    let dir = match html.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

pub fn router(config: &AppConfig) -> Result<Router> {
    let (dir, file_name) = split_output(&config.output.html)?;
    let index = format!("/{}", file_name);

    Ok(Router::new()
        .route("/", get(move || {
            let index = index.clone();
            async move { Redirect::temporary(&index) }
        }))
        .fallback_service(ServeDir::new(dir)))
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    if !config.output.html.exists() {
        return Err(anyhow!(
            "{:?} does not exist yet; run `generate` first",
            config.output.html
        ));
    }

    let app = router(&config)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Serving {:?} on http://{}", config.output.html, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
