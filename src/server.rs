//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! journal store, embedding resolver, mode arbitration, and the MCP tool
//! handler into a running server.

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;

use crate::config::QuillConfig;
use crate::embedding::EmbeddingResolver;
use crate::journal::store::EntryStore;
use crate::mode::Journal;
use crate::tools::QuillTools;

/// Shared setup: build the embedding resolver, entry store, and journal
/// facade. The resolver is lazy — the embedding model loads on first use,
/// not at startup.
fn setup_shared_state(config: QuillConfig) -> Result<(Arc<Journal>, Arc<QuillConfig>)> {
    let resolver = Arc::new(EmbeddingResolver::new(config.embedding.clone()));
    let store = EntryStore::new(
        config.resolved_project_dir(),
        config.resolved_user_dir(),
        resolver,
    );

    let journal = Journal::new(&config, store)?;
    tracing::info!(mode = ?journal.mode(), "journal ready");

    Ok((Arc::new(journal), Arc::new(config)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: QuillConfig) -> Result<()> {
    tracing::info!("starting Quill MCP server on stdio");

    let (journal, config) = setup_shared_state(config)?;

    let tools = QuillTools::new(journal, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP.
pub async fn serve_http(config: QuillConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Quill MCP server on HTTP");

    let (journal, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(QuillTools::new(journal.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
