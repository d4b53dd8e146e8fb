//! Caption track loading with a per-URL TTL cache.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use reelkit_common::clock::{FrameClock, MonotonicClock};
use reelkit_common::config::PreviewDefaults;
use reelkit_common::error::{ReelError, ReelResult};

use crate::srt::{parse_srt, CaptionCue};

/// Where caption documents come from.
#[async_trait::async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch the raw SRT text at `url`.
    async fn fetch_text(&self, url: &str) -> ReelResult<String>;
}

/// Fetches caption files over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpCaptionSource {
    client: reqwest::Client,
}

impl HttpCaptionSource {
    pub fn new(timeout: Duration) -> ReelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReelError::caption(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl CaptionSource for HttpCaptionSource {
    async fn fetch_text(&self, url: &str) -> ReelResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReelError::caption(format!("Caption download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReelError::caption(format!(
                "Caption download returned HTTP {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ReelError::caption(format!("Caption body unreadable: {e}")))
    }
}

struct CachedTrack {
    cues: Arc<Vec<CaptionCue>>,
    fetched_at: Duration,
}

/// Loads and caches parsed caption tracks.
///
/// Successful loads are reused until the TTL runs out. Failed loads are not
/// cached, so the next call retries.
pub struct CaptionLoader<S> {
    source: S,
    ttl: Duration,
    clock: Rc<dyn FrameClock>,
    cache: HashMap<String, CachedTrack>,
}

impl<S: CaptionSource> CaptionLoader<S> {
    /// Create a loader timed by a fresh monotonic clock.
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Rc::new(MonotonicClock::start()))
    }

    /// Create a loader whose cache ages by `clock`.
    pub fn with_clock(source: S, ttl: Duration, clock: Rc<dyn FrameClock>) -> Self {
        Self {
            source,
            ttl,
            clock,
            cache: HashMap::new(),
        }
    }

    /// Create a loader using the configured cache TTL.
    pub fn from_config(source: S, defaults: &PreviewDefaults) -> Self {
        Self::new(source, Duration::from_secs(defaults.caption_cache_ttl_secs))
    }

    /// Cues for `url`. Never fails: fetch errors yield an empty track.
    pub async fn load(&mut self, url: &str) -> Arc<Vec<CaptionCue>> {
        if url.trim().is_empty() {
            return Arc::new(Vec::new());
        }

        let now = self.clock.now();
        if let Some(entry) = self.cache.get(url) {
            if now.saturating_sub(entry.fetched_at) < self.ttl {
                tracing::debug!(url, cues = entry.cues.len(), "Caption cache hit");
                return Arc::clone(&entry.cues);
            }
        }

        match self.source.fetch_text(url).await {
            Ok(text) => {
                let cues = Arc::new(parse_srt(&text));
                tracing::info!(url, cues = cues.len(), "Loaded caption track");
                self.cache.insert(
                    url.to_string(),
                    CachedTrack {
                        cues: Arc::clone(&cues),
                        fetched_at: self.clock.now(),
                    },
                );
                cues
            }
            Err(e) => {
                tracing::warn!(
                    url,
                    error = %e,
                    "Caption track unavailable, continuing without captions"
                );
                self.cache.remove(url);
                Arc::new(Vec::new())
            }
        }
    }

    /// Drop the cached track for `url`.
    pub fn invalidate(&mut self, url: &str) {
        self.cache.remove(url);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached tracks.
    pub fn cached_tracks(&self) -> usize {
        self.cache.len()
    }
}
