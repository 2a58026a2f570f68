//! Corpus providers
//!
//! A provider turns an identifier (usually a user handle) into raw text.
//! Failures are reported, never retried.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading a corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("{0}")]
    Unavailable(String),

    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Source of raw training text
pub trait CorpusProvider {
    /// Load the text for `id`
    fn load(&self, id: &str) -> Result<String, CorpusError>;
}

/// Strip one leading `@` from a user handle
pub fn normalize_user(id: &str) -> &str {
    id.strip_prefix('@').unwrap_or(id)
}

/// Reads `<root>/<id>.txt`
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.txt", normalize_user(id)))
    }
}

impl CorpusProvider for DirectoryCorpus {
    fn load(&self, id: &str) -> Result<String, CorpusError> {
        let path = self.path_for(id);
        info!("Loading corpus from {}", path.display());
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CorpusError::Unavailable(format!(
                    "No corpus for {} in {}",
                    normalize_user(id),
                    self.root.display()
                ))
            } else {
                CorpusError::Io { path, source }
            }
        })
    }
}

#[derive(Deserialize)]
struct TweetsResponse {
    tweets: Option<Vec<String>>,
}

/// Fetches tweets from a tweet server: `GET {base}/api/{user}` returning
/// `{"tweets": [...]}`, joined with newlines
#[derive(Debug, Clone)]
pub struct TweetServer {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl TweetServer {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self, CorpusError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|source| CorpusError::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl CorpusProvider for TweetServer {
    fn load(&self, id: &str) -> Result<String, CorpusError> {
        let user = normalize_user(id);
        let url = format!("{}/api/{}", self.base_url, user);
        let unavailable = || CorpusError::Unavailable(format!("Failed to load tweets for {user}"));

        info!("fetching tweets for user @{}", user);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| CorpusError::Http {
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(unavailable());
        }

        let body: TweetsResponse = response
            .json()
            .map_err(|source| CorpusError::Http { url, source })?;
        let tweets = body.tweets.ok_or_else(unavailable)?;
        info!(tweets = tweets.len(), "download complete");
        Ok(tweets.join("\n"))
    }
}
