use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub users_file: String,
    /// Origin the redirect guard validates `next` targets against. Pinned by
    /// deployment instead of trusting the request's Host header.
    pub public_url: Url,
    pub build: String,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let users_file = std::env::var("USERS_FILE").unwrap_or_else(|_| "users.json".into());
        let public_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .parse::<Url>()
            .context("PUBLIC_BASE_URL must be an absolute URL")?;
        let build = std::env::var("APP_BUILD").unwrap_or_else(|_| "unknown build".into());
        let storage = StorageConfig {
            endpoint: std::env::var("STORAGE_ENDPOINT")?,
            bucket: std::env::var("DATA_BUCKET")?,
            access_key: std::env::var("STORAGE_ACCESS_KEY")?,
            secret_key: std::env::var("STORAGE_SECRET_KEY")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };
        Ok(Self {
            users_file,
            public_url,
            build,
            storage,
        })
    }
}
