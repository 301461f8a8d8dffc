use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::{
    config::{Config, StorageKind},
    db::{MemoryStore, PgStore, Store},
    media::{LocalMediaStore, MediaStore},
    notification::{self, Notifier},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub async fn init(config: Config) -> Result<Self, anyhow::Error> {
        let store: Arc<dyn Store> = match config.application.storage {
            StorageKind::Postgres => {
                let pool = PgPoolOptions::new()
                    .min_connections(5)
                    .max_connections(30)
                    .connect_lazy_with(config.database.with_db());

                if config.application.run_migration {
                    tracing::warn!("Running database migrations...");
                    sqlx::migrate!("./migrations").run(&pool).await?;
                }

                Arc::new(PgStore::new(pool))
            }
            StorageKind::Memory => {
                tracing::warn!(
                    "Using in-memory storage, meant for development only and lost on shutdown"
                );
                Arc::new(MemoryStore::new())
            }
        };

        let media = Arc::new(LocalMediaStore::new(&config.media));
        let notifier: Arc<dyn Notifier> = Arc::from(notification::from_config(&config.notification));

        Ok(AppState {
            store,
            media,
            notifier,
            config,
        })
    }
}
