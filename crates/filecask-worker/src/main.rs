use std::sync::Arc;

use tokio::sync::mpsc;

use filecask_core::Config;
use filecask_db::{FileRepository, JobRepository};
use filecask_extractors::ExtractorRegistry;
use filecask_processing::Pipeline;
use filecask_storage::create_storage;
use filecask_worker::setup;
use filecask_worker::WorkerLoop;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    setup::init_telemetry();

    let config = Config::from_env()?;

    let pool = setup::setup_database(&config).await?;
    let storage = create_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create storage backend: {}", e))?;

    let registry = ExtractorRegistry::with_defaults();
    let pipeline = Arc::new(Pipeline::new(
        storage.clone(),
        registry,
        config.worker.storage_retry_attempts,
    ));

    let worker = WorkerLoop::new(
        pool.clone(),
        FileRepository::new(pool.clone()),
        JobRepository::new(pool),
        pipeline,
        storage,
        config.worker.clone(),
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    worker.run(shutdown_rx).await?;

    Ok(())
}
