use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use reqwest::StatusCode;
use url::Url;

use crate::error::{Result, ThemeError};

/// Public mirror of TV theme songs, addressed by TVDB id.
pub const DEFAULT_THEME_BASE_URL: &str = "http://tvthemes.plexapp.com";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Streamed response body of a successful fetch.
pub type ThemeBody = BoxStream<'static, Result<Bytes>>;

/// Classified result of asking the remote source for one theme song.
pub enum FetchOutcome {
    Found(ThemeBody),
    /// The source has no theme song for this id.
    NotFound,
    HttpStatus(StatusCode),
    /// Connection, TLS or timeout failure before a status was received.
    Transport(String),
}

impl fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(_) => f.write_str("Found(..)"),
            Self::NotFound => f.write_str("NotFound"),
            Self::HttpStatus(status) => f.debug_tuple("HttpStatus").field(status).finish(),
            Self::Transport(msg) => f.debug_tuple("Transport").field(msg).finish(),
        }
    }
}

/// Remote provider of theme songs keyed by provider identifier.
#[async_trait]
pub trait ThemeSource: Send + Sync {
    /// Deterministic address of the theme song for `provider_id`.
    fn source_url(&self, provider_id: &str) -> String;

    async fn fetch(&self, provider_id: &str) -> FetchOutcome;
}

/// HTTP implementation of [`ThemeSource`]. The client is shared by all
/// concurrent fetches.
#[derive(Debug, Clone)]
pub struct RemoteThemeSource {
    base_url: Url,
    http_client: reqwest::Client,
}

impl RemoteThemeSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|err| {
            ThemeError::InvalidInput(format!("invalid theme source url '{base_url}': {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ThemeError::InvalidInput(format!(
                "theme source url '{base_url}' cannot be used as a base"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_THEME_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    fn url_for(&self, provider_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{provider_id}.mp3"));
        }
        url
    }
}

#[async_trait]
impl ThemeSource for RemoteThemeSource {
    fn source_url(&self, provider_id: &str) -> String {
        self.url_for(provider_id).to_string()
    }

    async fn fetch(&self, provider_id: &str) -> FetchOutcome {
        let response = match self.http_client.get(self.url_for(provider_id)).send().await {
            Ok(response) => response,
            Err(err) => return FetchOutcome::Transport(err.to_string()),
        };

        match response.status() {
            status if status.is_success() => FetchOutcome::Found(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(ThemeError::from))
                    .boxed(),
            ),
            StatusCode::NOT_FOUND => FetchOutcome::NotFound,
            status => FetchOutcome::HttpStatus(status),
        }
    }
}
