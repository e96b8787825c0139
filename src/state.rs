use std::sync::Arc;

use anyhow::Context;

use crate::auth::directory::Directory;
use crate::auth::session::SessionStore;
use crate::config::AppConfig;
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        // A bad user file must abort startup before the server binds.
        let directory = Arc::new(
            Directory::load(&config.users_file)
                .with_context(|| format!("load user directory from {}", config.users_file))?,
        );

        let storage = Arc::new(
            Storage::new(
                &config.storage.endpoint,
                &config.storage.bucket,
                &config.storage.access_key,
                &config.storage.secret_key,
                &config.storage.region,
            )
            .await?,
        ) as Arc<dyn StorageClient>;

        Ok(Self {
            directory,
            sessions: SessionStore::new(),
            config,
            storage,
        })
    }

    pub fn from_parts(
        directory: Arc<Directory>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            directory,
            sessions: SessionStore::new(),
            config,
            storage,
        }
    }

    pub fn fake() -> Self {
        use axum::async_trait;
        use bytes::Bytes;

        use crate::config::StorageConfig;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn get_object(&self, key: &str) -> anyhow::Result<Bytes> {
                Ok(Bytes::from(format!("fake object {}", key)))
            }
        }

        let config = Arc::new(AppConfig {
            users_file: "users.json".into(),
            public_url: "https://app.example.com".parse().expect("static url"),
            build: "test".into(),
            storage: StorageConfig {
                endpoint: "fake".into(),
                bucket: "fake".into(),
                access_key: "fake".into(),
                secret_key: "fake".into(),
                region: "us-east-1".into(),
            },
        });

        let directory = Arc::new(Directory::from_records(Vec::new()).expect("empty directory"));
        Self::from_parts(directory, config, Arc::new(FakeStorage) as Arc<dyn StorageClient>)
    }
}
