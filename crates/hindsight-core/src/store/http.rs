//! HTTP-backed archive store.
//!
//! Speaks the plain JSON convention of archive gateways: `GET <location>`
//! returns a JSON string array of archive identifiers, and
//! `GET <location>/<id>` returns the archive bundle.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use url::Url;

use crate::archive::ArchiveBundle;
use crate::config::NetworkDefaults;
use crate::error::{MirrorError, Result};
use crate::store::ArchiveStore;

pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NetworkDefaults::REQUEST_TIMEOUT)
            .user_agent(concat!("hindsight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MirrorError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Network {
                message: format!("'{url}' returned {status}"),
                status: Some(status.as_u16()),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ArchiveStore for HttpStore {
    async fn list(&self, location: &Url) -> Result<Vec<String>> {
        self.get_json(location.as_str()).await
    }

    async fn fetch(&self, location: &Url, id: &str) -> Result<ArchiveBundle> {
        self.get_json(&format!("{location}/{id}")).await
    }
}
