//! Where a script comes from and how it is read.

use std::fmt;
use std::path::PathBuf;

use crate::error::EngineInitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocation {
    Path(PathBuf),
    Url(String),
}

impl ScriptLocation {
    /// Absolute URLs are fetched as-is. Anything else is joined onto
    /// `base_url` when one is configured, or read from disk otherwise.
    pub fn resolve(resource_id: &str, base_url: Option<&str>) -> Self {
        if is_url(resource_id) {
            return ScriptLocation::Url(resource_id.to_string());
        }
        match base_url {
            Some(base) => ScriptLocation::Url(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                resource_id.trim_start_matches('/')
            )),
            None => ScriptLocation::Path(PathBuf::from(resource_id)),
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<String, EngineInitError> {
        match self {
            ScriptLocation::Path(path) => {
                tracing::debug!(path = %path.display(), "reading script");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| EngineInitError::Fetch {
                        path: path.display().to_string(),
                        source,
                    })
            }
            ScriptLocation::Url(url) => {
                tracing::debug!(%url, "downloading script");
                let http_err = |source: reqwest::Error| EngineInitError::Http {
                    url: url.clone(),
                    source,
                };
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(http_err)?;
                response.text().await.map_err(http_err)
            }
        }
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptLocation::Path(path) => write!(f, "{}", path.display()),
            ScriptLocation::Url(url) => f.write_str(url),
        }
    }
}

fn is_url(resource_id: &str) -> bool {
    resource_id.starts_with("http://") || resource_id.starts_with("https://")
}
