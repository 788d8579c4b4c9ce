use crate::package::Package;
use crate::{Error, Result};
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

/// Where a template comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSource {
    Url { url: String },
    Stored { id: String },
}

impl TemplateSource {
    /// The URL to download. Stored ids are resolved as `{base}/{id}`.
    pub fn resolve(&self, base_url: Option<&str>) -> Result<String> {
        match self {
            TemplateSource::Url { url } if !url.trim().is_empty() => Ok(url.trim().to_string()),
            TemplateSource::Url { .. } => Err(Error::InvalidInput("template url is empty".to_string())),
            TemplateSource::Stored { id } if id.trim().is_empty() => {
                Err(Error::InvalidInput("template id is empty".to_string()))
            }
            TemplateSource::Stored { id } => {
                let base = base_url.ok_or_else(|| {
                    Error::InvalidInput(format!("template id '{id}' given but no template base url is configured"))
                })?;
                Ok(format!("{}/{}", base.trim_end_matches('/'), id.trim()))
            }
        }
    }
}

/// Bytes of a remote resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    /// `Content-Type` as reported by the server, without parameters.
    pub content_type: Option<String>,
}

/// Source of remote bytes: templates and images.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Fetched>;
}

/// [`Fetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        let download_error = |reason: String| Error::Download { url: url.to_string(), reason };

        let response = self.client.get(url).send().map_err(|e| download_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP status {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());
        let bytes = response.bytes().map_err(|e| download_error(e.to_string()))?;

        debug!("fetched {} bytes from {url}", bytes.len());
        Ok(Fetched { bytes: bytes.to_vec(), content_type })
    }
}

/// Downloads a template and opens it. Returns the package and its part count.
pub fn load_template(source: &TemplateSource, base_url: Option<&str>, fetcher: &dyn Fetcher) -> Result<(Package, usize)> {
    let url = source.resolve(base_url)?;
    let fetched = fetcher.fetch(&url)?;
    let package = Package::from_bytes(&fetched.bytes)?;
    let part_count = package.part_count();
    info!("loaded template {url}: {part_count} parts");
    Ok((package, part_count))
}
