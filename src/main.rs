use anyhow::Context;
use docsum::{
    api,
    config::Config,
    extraction::FsContentExtractor,
    ingestion::IngestionService,
    logging,
    store::MetadataStore,
    summarization::OpenAiSummarizationClient,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        environment = %config.environment,
        version = %config.version,
        "Starting document summary service"
    );

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload directory {}", config.upload_dir.display()))?;

    let store = MetadataStore::connect(&config.database_url(), config.db_max_connections)
        .await
        .context("connecting to the metadata store")?;
    store
        .ensure_schema()
        .await
        .context("creating the metadata schema")?;

    let summarizer = OpenAiSummarizationClient::from_config(&config)?;
    let service = IngestionService::new(
        store,
        Arc::new(FsContentExtractor::new()),
        Arc::new(summarizer),
        config.upload_dir.clone(),
    );
    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("binding port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);
    axum::serve(listener, app).await?;
    Ok(())
}
