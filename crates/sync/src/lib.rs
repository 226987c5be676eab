//! Remote persistence for the annotation collection.
//!
//! `SyncClient` loads the collection from a GET endpoint and persists it to
//! a POST endpoint with full-replace semantics, and owns the notion of
//! "clean vs dirty" relative to the last successful sync. Change detection
//! against a live collection is handled by [`hook`].

mod hook;

pub use hook::{AutoSave, ChangeDetector, ChangeHook, ChangeHookOptions, ChangeSource};

use overmark_fingerprint::DirtyStateTracker;
use overmark_model::Annotation;
use serde::Deserialize;

/// Option key naming the save destination, used in the not-configured error.
pub const POST_URL_KEY: &str = "postUrl";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no save destination configured: missing `{key}`")]
    NotConfigured { key: &'static str },
    #[error("network error: {0}")]
    Transport(String),
    #[error("endpoint returned HTTP {status}")]
    Http { status: u16 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Status object returned by the save endpoint. Informational only; the
/// HTTP status decides success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Loads and persists the annotation collection and tracks whether the
/// live collection has drifted from the last successful sync.
pub struct SyncClient {
    agent: ureq::Agent,
    baseline: DirtyStateTracker,
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncClient {
    pub fn new() -> Self {
        Self { agent: ureq::agent(), baseline: DirtyStateTracker::new() }
    }

    /// Fetch the annotation collection.
    ///
    /// An empty or absent url means "no remote data": an empty collection,
    /// not an error. On success the clean baseline is reset to the loaded
    /// data; remote style fields a kind does not allow are dropped.
    pub fn load(&mut self, url: Option<&str>) -> Result<Vec<Annotation>, SyncError> {
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            let empty = Vec::new();
            self.baseline.mark_clean(&empty);
            return Ok(empty);
        };

        let response = self.agent.get(url).call().map_err(map_request_error)?;
        let body = response
            .into_string()
            .map_err(|error| SyncError::InvalidResponse(error.to_string()))?;
        let mut items: Vec<Annotation> = serde_json::from_str(&body)
            .map_err(|error| SyncError::InvalidResponse(error.to_string()))?;
        for item in &mut items {
            item.sanitize_style();
        }

        self.baseline.mark_clean(&items);
        Ok(items)
    }

    /// Persist the full collection (replace semantics, not a diff).
    ///
    /// A missing url rejects with [`SyncError::NotConfigured`] before any
    /// network activity. Failure leaves the baseline untouched so the
    /// unsaved-changes indicator keeps reporting dirty; the caller retries
    /// manually.
    pub fn save(
        &mut self,
        url: Option<&str>,
        items: &[Annotation],
    ) -> Result<SaveReceipt, SyncError> {
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            return Err(SyncError::NotConfigured { key: POST_URL_KEY });
        };

        let body = serde_json::to_string(items)
            .map_err(|error| SyncError::InvalidResponse(error.to_string()))?;
        let response = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(map_request_error)?;

        let receipt = match response.into_string() {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| {
                log::debug!("save endpoint returned a non-JSON body");
                SaveReceipt::default()
            }),
            Err(_) => SaveReceipt::default(),
        };

        self.baseline.mark_clean(items);
        Ok(receipt)
    }

    /// Reset the clean baseline without a network round trip. Used when a
    /// failed load degrades to an empty collection.
    pub fn mark_loaded(&mut self, items: &[Annotation]) {
        self.baseline.mark_clean(items);
    }

    /// Whether the live collection differs from the last successful
    /// load/save. True recommends a save before navigating away.
    pub fn has_unsaved_changes(&self, items: &[Annotation]) -> bool {
        self.baseline.is_dirty(items)
    }
}

fn map_request_error(error: ureq::Error) -> SyncError {
    match error {
        ureq::Error::Status(status, _) => SyncError::Http { status },
        other => SyncError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod test_server;
