//! Transient in-memory blob handles for buffer-based document loads.
//!
//! Mirrors the object-URL pattern: a registered buffer gets a `blob:` token
//! the viewer can resolve, and a short revocation timer frees it once the
//! open operation has consumed it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TIMER_STEP: Duration = Duration::from_millis(25);

#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Arc<BlobInner>,
}

#[derive(Default)]
struct BlobInner {
    entries: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    shutdown: AtomicBool,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer and return its `blob:` token.
    pub fn register(&self, bytes: Vec<u8>) -> String {
        let token = format!("blob:{}", uuid::Uuid::new_v4());
        self.inner.entries.lock().unwrap().insert(token.clone(), Arc::new(bytes));
        token
    }

    /// Resolve a token, if it has not been revoked.
    pub fn get(&self, token: &str) -> Option<Arc<Vec<u8>>> {
        self.inner.entries.lock().unwrap().get(token).cloned()
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.inner.entries.lock().unwrap().remove(token).is_some()
    }

    /// Revoke a token after a delay. The timer is cancelled by
    /// [`BlobStore::shutdown`]; the thread wakes in short steps so teardown
    /// never waits out the full delay.
    pub fn revoke_after(&self, token: String, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || {
            let deadline = Instant::now() + delay;
            while Instant::now() < deadline {
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                std::thread::sleep(TIMER_STEP.min(deadline.saturating_duration_since(Instant::now())));
            }
            if !inner.shutdown.load(Ordering::Acquire) {
                inner.entries.lock().unwrap().remove(&token);
            }
        });
    }

    /// Cancel pending revocation timers and drop every entry.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().unwrap().is_empty()
    }
}
