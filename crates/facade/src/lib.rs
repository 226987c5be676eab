//! The externally visible control surface of the annotation overlay.
//!
//! The host embedder constructs one [`ExtensionFacade`] and talks to the
//! system exclusively through it: configuration merging, guarded document
//! and annotation loaders, read-only accessors, change-watch subscriptions
//! and bulk operations. Every validation failure is a rejected operation
//! with a descriptive reason, never a silent no-op.

mod blob;
mod config;
mod options;

pub use blob::BlobStore;
pub use config::{
    AnnotationEndpoints, ExtensionConfig, PdfConfig, SecurityConfig, UserConfig,
};
pub use options::{
    AppOptions, OPT_DEFAULT_EDITOR_ACTIVE, OPT_DEFAULT_SIDEBAR_OPEN, OPT_GET_URL, OPT_POST_URL,
    OPT_USERNAME,
};

use overmark_coordinator::{Coordinator, DocumentViewer, ViewerError};
use overmark_model::tools::{default_tools, find_tool, ToolDefinition};
use overmark_model::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch};
use overmark_sync::{AutoSave, ChangeHook, ChangeHookOptions, SaveReceipt, SyncError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// How long a `blob:` token stays resolvable after the open call consumed
/// it.
const BLOB_REVOKE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

/// Options for the data-change hook.
#[derive(Debug, Clone)]
pub struct DataChangeHookOptions {
    /// Invoke the callback once immediately at registration.
    pub immediate: bool,
    /// Coalescing window: a burst of edits produces one notification.
    pub debounce: Duration,
    /// Fixed detection cadence.
    pub poll_interval: Duration,
    /// Auto-save the coalesced state to the configured post url after each
    /// notification.
    pub enable_auto_save: bool,
}

impl Default for DataChangeHookOptions {
    fn default() -> Self {
        Self {
            immediate: false,
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            enable_auto_save: false,
        }
    }
}

/// One entry in a bulk mutation.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Add(Annotation),
    Update { id: AnnotationId, patch: AnnotationPatch },
    Delete { id: AnnotationId },
}

/// Aggregate statistics over the current collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_author: BTreeMap<String, usize>,
    /// Unix timestamp (seconds) of when the statistics were computed.
    pub last_modified: i64,
}

type ChangeCallback = Box<dyn Fn(&[Annotation]) + Send>;

struct WatchEntry {
    kind: AnnotationKind,
    callback: ChangeCallback,
}

#[derive(Default)]
struct DispatchState {
    user: Mutex<Option<ChangeCallback>>,
    watches: Mutex<BTreeMap<u64, WatchEntry>>,
    next_id: AtomicU64,
}

fn dispatch(state: &DispatchState, items: &[Annotation]) {
    if let Some(user) = state.user.lock().unwrap().as_ref() {
        user(items);
    }
    for entry in state.watches.lock().unwrap().values() {
        let subset: Vec<Annotation> =
            items.iter().filter(|item| item.kind == entry.kind).cloned().collect();
        (entry.callback)(&subset);
    }
}

/// Handle returned by [`ExtensionFacade::watch_annotation_type`]. Dropping
/// it (or calling [`WatchGuard::unsubscribe`]) stops further invocations.
pub struct WatchGuard {
    id: u64,
    state: Arc<DispatchState>,
    active: bool,
}

impl WatchGuard {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.active {
            self.state.watches.lock().unwrap().remove(&self.id);
            self.active = false;
        }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

pub struct ExtensionFacade {
    coordinator: Coordinator,
    viewer: Box<dyn DocumentViewer>,
    tools: Vec<ToolDefinition>,
    options: AppOptions,
    location_fragment: Option<String>,
    config: ExtensionConfig,
    hook: Option<ChangeHook>,
    dispatch: Arc<DispatchState>,
    blobs: BlobStore,
}

impl ExtensionFacade {
    /// Construct the facade around a coordinator and viewer handle. The
    /// optional location URL contributes hash parameters, which take
    /// precedence over everything a later `configure` call provides.
    pub fn new(
        coordinator: Coordinator,
        viewer: Box<dyn DocumentViewer>,
        location: Option<&str>,
    ) -> Self {
        let mut options = AppOptions::default();
        let location_fragment = location.and_then(|location| options.apply_location(location));

        let mut facade = Self {
            coordinator,
            viewer,
            tools: default_tools(),
            options,
            location_fragment,
            config: ExtensionConfig::default(),
            hook: None,
            dispatch: Arc::new(DispatchState::default()),
            blobs: BlobStore::new(),
        };
        facade.push_options();
        facade.apply_ui_defaults();
        facade
    }

    // ---- configuration ----------------------------------------------------

    /// Merge host configuration and re-apply the option layers. A pdf
    /// section with a fixed url (no url-parameter override allowed) opens
    /// the document immediately.
    pub fn configure(&mut self, incoming: ExtensionConfig) -> Result<(), FacadeError> {
        self.config.merge(incoming);

        if let Some(annotations) = &self.config.annotations {
            if let Some(get_url) = annotations.get_url.clone() {
                self.options.set(OPT_GET_URL, get_url);
            }
            if let Some(post_url) = annotations.post_url.clone() {
                self.options.set(OPT_POST_URL, post_url);
            }
            if let Some(auto_load) = annotations.auto_load {
                self.coordinator.set_auto_load(auto_load);
            }
        }
        if let Some(user) = &self.config.user {
            if let Some(username) = user.username.clone() {
                self.options.set(OPT_USERNAME, username);
            }
            if let Some(tool) = user.default_editor_active.clone() {
                self.options.set(OPT_DEFAULT_EDITOR_ACTIVE, tool);
            }
            if let Some(open) = user.default_sidebar_open {
                self.options.set(OPT_DEFAULT_SIDEBAR_OPEN, if open { "true" } else { "false" });
            }
        }

        // Hash parameters outrank the host config.
        if let Some(fragment) = self.location_fragment.clone() {
            self.options.reapply_hash_fragment(&fragment);
        }
        self.push_options();
        self.apply_ui_defaults();

        let pdf = self.config.pdf.clone();
        if let Some(pdf) = pdf {
            if let Some(url) = &pdf.url {
                if !pdf.allow_url_parameter {
                    self.load_document(url)?;
                }
            } else if let Some(bytes) = &pdf.bytes {
                self.load_document_bytes(bytes)?;
            }
        }
        Ok(())
    }

    fn push_options(&mut self) {
        self.coordinator.set_username(self.options.username().to_owned());
        self.coordinator.set_get_url(self.options.get_url().map(str::to_owned));
        self.coordinator.set_post_url(self.options.post_url().map(str::to_owned));
    }

    fn apply_ui_defaults(&mut self) {
        self.coordinator.set_sidebar_open(self.options.sidebar_open());
        let tool =
            self.options.default_tool_name().and_then(|name| find_tool(&self.tools, name)).cloned();
        if let Some(tool) = tool {
            self.coordinator.activate_tool(Some(&tool), None);
        }
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    // ---- security guards --------------------------------------------------

    fn validate_url(&self, url: &str) -> Result<(), FacadeError> {
        let parsed = url::Url::parse(url)
            .map_err(|error| FacadeError::Validation(format!("invalid url `{url}`: {error}")))?;
        let allowed = self
            .config
            .security
            .as_ref()
            .and_then(|security| security.allowed_domains.as_deref())
            .filter(|domains| !domains.is_empty());
        let Some(allowed) = allowed else {
            return Ok(());
        };

        let host = parsed.host_str().unwrap_or_default();
        let permitted = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));
        if permitted {
            Ok(())
        } else {
            Err(FacadeError::Validation(format!("domain `{host}` is not in the allow-list")))
        }
    }

    fn validate_buffer(&self, bytes: &[u8]) -> Result<(), FacadeError> {
        let security = self.config.security.as_ref();
        if let Some(max) = security.and_then(|security| security.max_file_size) {
            if bytes.len() as u64 > max {
                return Err(FacadeError::Validation(format!(
                    "file size {} exceeds the configured maximum of {max} bytes",
                    bytes.len()
                )));
            }
        }
        let types = security
            .and_then(|security| security.allowed_file_types.as_deref())
            .filter(|types| !types.is_empty());
        if let Some(types) = types {
            let pdf_allowed = types.iter().any(|kind| {
                kind.eq_ignore_ascii_case("pdf") || kind.eq_ignore_ascii_case("application/pdf")
            });
            if !(pdf_allowed && bytes.starts_with(b"%PDF")) {
                return Err(FacadeError::Validation(
                    "file type is not in the allowed list".to_owned(),
                ));
            }
        }
        Ok(())
    }

    // ---- guarded loaders --------------------------------------------------

    pub fn load_document(&mut self, url: &str) -> Result<(), FacadeError> {
        self.validate_url(url)?;
        self.viewer.open_url(url)?;
        Ok(())
    }

    /// Open a document from raw bytes (blob / array buffer). The buffer is
    /// published under a transient `blob:` token the viewer resolves
    /// through [`ExtensionFacade::blob_store`], and revoked shortly after.
    pub fn load_document_bytes(&mut self, bytes: &[u8]) -> Result<(), FacadeError> {
        self.validate_buffer(bytes)?;
        let token = self.blobs.register(bytes.to_vec());
        let result = self.viewer.open_url(&token);
        self.blobs.revoke_after(token, BLOB_REVOKE_DELAY);
        result.map_err(FacadeError::from)
    }

    /// Replace the collection from a remote endpoint; the endpoint becomes
    /// the configured get url. Returns how many records were loaded.
    pub fn load_annotations(&mut self, url: &str) -> Result<usize, FacadeError> {
        self.validate_url(url)?;
        self.options.set(OPT_GET_URL, url);
        self.config.annotations.get_or_insert_with(Default::default).get_url =
            Some(url.to_owned());
        self.coordinator.set_get_url(Some(url.to_owned()));
        Ok(self.coordinator.load_annotations_from(url)?)
    }

    /// Persist a collection to a remote endpoint; the endpoint becomes the
    /// configured post url.
    pub fn save_annotations(
        &mut self,
        url: &str,
        items: &[Annotation],
    ) -> Result<SaveReceipt, FacadeError> {
        self.validate_url(url)?;
        self.options.set(OPT_POST_URL, url);
        self.config.annotations.get_or_insert_with(Default::default).post_url =
            Some(url.to_owned());
        self.coordinator.set_post_url(Some(url.to_owned()));
        Ok(self.coordinator.save_annotations_to(url, items)?)
    }

    // ---- read side --------------------------------------------------------

    pub fn current_annotations(&self) -> Vec<Annotation> {
        self.coordinator.snapshot()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.coordinator.has_unsaved_changes()
    }

    pub fn annotation_stats(&self) -> AnnotationStats {
        let items = self.coordinator.snapshot();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_author: BTreeMap<String, usize> = BTreeMap::new();
        for item in &items {
            *by_type.entry(item.kind.as_str().to_owned()).or_default() += 1;
            let author = if item.author.is_empty() { "unknown" } else { item.author.as_str() };
            *by_author.entry(author.to_owned()).or_default() += 1;
        }
        let last_modified = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        AnnotationStats { total: items.len(), by_type, by_author, last_modified }
    }

    // ---- change hooks -----------------------------------------------------

    /// Register the data-change callback. Replaces any previous hook and
    /// its timers.
    pub fn set_data_change_hook<C>(&mut self, callback: C, options: DataChangeHookOptions)
    where
        C: Fn(&[Annotation]) + Send + 'static,
    {
        *self.dispatch.user.lock().unwrap() = Some(Box::new(callback));
        self.restart_hook(options);
    }

    /// Remove the data-change callback; the poll loop stops unless
    /// type-watches still need it.
    pub fn remove_data_change_hook(&mut self) {
        *self.dispatch.user.lock().unwrap() = None;
        if self.dispatch.watches.lock().unwrap().is_empty() {
            self.stop_hook();
        }
    }

    /// Subscribe to changes of a single annotation type. The callback
    /// receives only the records of that type, whichever record a change
    /// touched. The returned guard unsubscribes on drop.
    pub fn watch_annotation_type<C>(&mut self, kind: AnnotationKind, callback: C) -> WatchGuard
    where
        C: Fn(&[Annotation]) + Send + 'static,
    {
        let id = self.dispatch.next_id.fetch_add(1, Ordering::SeqCst);
        self.dispatch
            .watches
            .lock()
            .unwrap()
            .insert(id, WatchEntry { kind, callback: Box::new(callback) });
        if self.hook.is_none() {
            self.restart_hook(DataChangeHookOptions::default());
        }
        WatchGuard { id, state: Arc::clone(&self.dispatch), active: true }
    }

    fn restart_hook(&mut self, options: DataChangeHookOptions) {
        self.stop_hook();
        let auto_save = options
            .enable_auto_save
            .then(|| self.options.post_url().map(|url| AutoSave { url: url.to_owned() }))
            .flatten();
        if options.enable_auto_save && auto_save.is_none() {
            log::warn!("auto-save requested but `{OPT_POST_URL}` is not configured");
        }

        let hook_options = ChangeHookOptions {
            poll_interval: options.poll_interval,
            debounce: options.debounce,
            immediate: options.immediate,
            auto_save,
        };
        let state = Arc::clone(&self.dispatch);
        self.hook = Some(ChangeHook::spawn(
            self.coordinator.change_source(),
            hook_options,
            move |items| dispatch(&state, items),
        ));
    }

    fn stop_hook(&mut self) {
        if let Some(mut hook) = self.hook.take() {
            hook.stop();
        }
    }

    // ---- bulk mutation ----------------------------------------------------

    /// Apply add/update/delete operations in order. The first invalid
    /// operation rejects with its reason and aborts the remainder;
    /// previously applied operations stay applied.
    pub fn batch_operations(&mut self, operations: Vec<BatchOperation>) -> Result<(), FacadeError> {
        for operation in operations {
            match operation {
                BatchOperation::Add(annotation) => {
                    annotation
                        .validate_page(self.viewer.page_count())
                        .map_err(|error| FacadeError::Validation(error.to_string()))?;
                    self.coordinator.add_annotation(annotation);
                }
                BatchOperation::Update { id, patch } => {
                    if !self.coordinator.update_annotation(&id, &patch) {
                        return Err(FacadeError::Validation(format!(
                            "unknown annotation id `{id}`"
                        )));
                    }
                }
                BatchOperation::Delete { id } => {
                    if !self.coordinator.delete_annotation(&id) {
                        return Err(FacadeError::Validation(format!(
                            "unknown annotation id `{id}`"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ---- plumbing ---------------------------------------------------------

    /// The coordinator, for wiring painter notifications and viewer
    /// lifecycle events.
    pub fn coordinator(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    /// Handle for resolving `blob:` tokens from the viewer side.
    pub fn blob_store(&self) -> BlobStore {
        self.blobs.clone()
    }

    /// Tear down hooks, watches and blob timers. Idempotent; also runs on
    /// drop.
    pub fn destroy(&mut self) {
        self.stop_hook();
        *self.dispatch.user.lock().unwrap() = None;
        self.dispatch.watches.lock().unwrap().clear();
        self.blobs.shutdown();
    }
}

impl Drop for ExtensionFacade {
    fn drop(&mut self) {
        self.destroy();
    }
}
