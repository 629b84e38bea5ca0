use std::{sync::Arc, time::Duration};

use engine::{AssetUploader, DisabledUploader, HttpUploader};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "penny={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings found, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await.inspect_err(|err| {
        tracing::error!("failed to initialize database: {err}");
    })?;

    let mut builder = engine::Engine::builder()
        .database(db)
        .uploader(build_uploader(settings.uploader.as_ref())?);
    if let Some(size) = settings.engine.cascade_batch_size {
        builder = builder.cascade_batch_size(size);
    }
    if let Some(retries) = settings.engine.commit_retries {
        builder = builder.commit_retries(retries);
    }
    let engine = builder.build().await.inspect_err(|err| {
        tracing::error!("failed to build engine: {err}");
    })?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    server::run(engine, &addr).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn build_uploader(
    config: Option<&settings::Uploader>,
) -> Result<Arc<dyn AssetUploader>, Box<dyn std::error::Error + Send + Sync>> {
    let Some(config) = config else {
        tracing::info!("no uploader configured, image uploads are disabled");
        return Ok(Arc::new(DisabledUploader));
    };

    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_UPLOAD_TIMEOUT);
    let uploader = match (&config.cloud_name, &config.endpoint) {
        (Some(cloud_name), _) => {
            HttpUploader::cloudinary(cloud_name, config.upload_preset.clone(), timeout)?
        }
        (None, Some(endpoint)) => {
            HttpUploader::new(endpoint.clone(), config.upload_preset.clone(), timeout)?
        }
        (None, None) => return Err("uploader needs either cloud_name or endpoint".into()),
    };
    Ok(Arc::new(uploader))
}
