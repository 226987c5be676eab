//! Orchestration core for the annotation overlay.
//!
//! The coordinator is the single source of truth for "which floating
//! surface is open, for which annotation, at what anchor". It translates
//! rendering-collaborator notifications and viewer lifecycle events into
//! surface commands, and routes every user action back through the
//! painter so no two surfaces ever race to mutate the same record.
//!
//! Positions are never computed here: every open/redraw call carries a
//! rectangle supplied by the painter in page-local space, and
//! `overmark-anchor` converts it to screen space on each call.

mod collaborators;
mod surfaces;

pub use collaborators::{
    DocumentViewer, Painter, PainterSource, SharedPainter, ViewerError, ViewerEvent,
};
pub use surfaces::{
    ConnectorSurface, MenuSurface, Notifier, PopbarSurface, Severity, SidebarSurface, Surfaces,
    ToolbarSurface,
};

use overmark_anchor::{anchor_for, ElementSize, PageLayout, Placement};
use overmark_model::tools::ToolDefinition;
use overmark_model::{
    defaults, Annotation, AnnotationId, AnnotationPatch, Rect, StylePatch, TextSelection,
};
use overmark_sync::{ChangeSource, SaveReceipt, SyncClient, SyncError};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Author name attached to annotations created in this session.
    pub username: String,
    /// Remote read endpoint; `None` means no remote data.
    pub get_url: Option<String>,
    /// Remote write endpoint; `None` rejects saves as not configured.
    pub post_url: Option<String>,
    /// Fetch remote annotations when the document loads.
    pub auto_load: bool,
    /// Keep annotations embedded in the source document on reload.
    pub include_document_annotations: bool,
    /// Sidebar-to-shape connector line feature toggle.
    pub connector_enabled: bool,
    /// Whether the comment sidebar starts open.
    pub sidebar_open: bool,
    /// Measured size of the context menu, for anchoring.
    pub menu_size: ElementSize,
    /// Measured size of the selection pop-bar, for anchoring.
    pub popbar_size: ElementSize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            username: defaults::UNKNOWN_USER.to_owned(),
            get_url: None,
            post_url: None,
            auto_load: true,
            include_document_annotations: true,
            connector_enabled: defaults::CONNECTOR_LINE_ENABLED,
            sidebar_open: false,
            menu_size: ElementSize::new(240.0, 48.0),
            popbar_size: ElementSize::new(200.0, 40.0),
        }
    }
}

pub struct Coordinator {
    painter: SharedPainter,
    layout: Box<dyn PageLayout>,
    surfaces: Surfaces,
    sync: SyncClient,
    options: CoordinatorOptions,
    active_tool: Option<ToolDefinition>,
    tool_payload: Option<String>,
    /// Ids currently visible in the sidebar; doubles as the guard against
    /// duplicate creation events.
    sidebar_ids: BTreeSet<AnnotationId>,
    /// Annotation the context menu is currently open for.
    open_menu: Option<AnnotationId>,
    pages_ready: bool,
}

impl Coordinator {
    pub fn new(
        painter: SharedPainter,
        layout: Box<dyn PageLayout>,
        mut surfaces: Surfaces,
        options: CoordinatorOptions,
    ) -> Self {
        surfaces.sidebar.set_open(options.sidebar_open);
        surfaces.toolbar.set_sidebar_toggled(options.sidebar_open);
        Self {
            painter,
            layout,
            surfaces,
            sync: SyncClient::new(),
            options,
            active_tool: None,
            tool_payload: None,
            sidebar_ids: BTreeSet::new(),
            open_menu: None,
            pages_ready: false,
        }
    }

    // ---- viewer lifecycle -------------------------------------------------

    pub fn on_viewer_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::PageRendered { page_number } => {
                self.pages_ready = true;
                self.painter.lock().unwrap().prepare_page(page_number);
            }
            ViewerEvent::DocumentLoaded => self.load_initial_annotations(),
            ViewerEvent::ViewAreaUpdated => self.close_floating(),
        }
    }

    fn load_initial_annotations(&mut self) {
        let items = if self.options.auto_load {
            let url = self.options.get_url.clone();
            if url.as_deref().is_some_and(|url| !url.is_empty()) {
                self.surfaces.notifier.toast(Severity::Info, "Loading annotations…");
            }
            match self.sync.load(url.as_deref()) {
                Ok(items) => items,
                Err(error) => {
                    // Degraded mode: the viewer stays usable with an empty
                    // collection.
                    log::warn!("annotation load failed: {error}");
                    self.surfaces
                        .notifier
                        .toast(Severity::Error, &format!("Loading annotations failed: {error}"));
                    self.sync.mark_loaded(&[]);
                    Vec::new()
                }
            }
        } else {
            self.sync.mark_loaded(&[]);
            Vec::new()
        };

        self.reset_for_reload();
        self.painter
            .lock()
            .unwrap()
            .init_annotations(items, self.options.include_document_annotations);
    }

    fn reset_for_reload(&mut self) {
        self.sidebar_ids.clear();
        self.surfaces.sidebar.clear();
        self.close_floating();
    }

    fn close_floating(&mut self) {
        self.surfaces.menu.close();
        self.surfaces.connector.clear();
        self.open_menu = None;
    }

    // ---- painter notifications --------------------------------------------

    /// A shape was created, by user draw action or programmatic add.
    /// Idempotent: a second event for the same id is a no-op.
    pub fn on_annotation_created(
        &mut self,
        annotation: &Annotation,
        is_from_initial_load: bool,
        active_tool: Option<&ToolDefinition>,
    ) {
        if !self.sidebar_ids.insert(annotation.id.clone()) {
            log::debug!("duplicate creation event for {}", annotation.id);
            return;
        }
        self.surfaces.sidebar.append(annotation);
        if is_from_initial_load {
            return;
        }
        if active_tool.is_some_and(|tool| tool.single_use) {
            // Single-use tools hand control straight to selection mode on
            // the freshly placed annotation.
            self.painter.lock().unwrap().select_annotation(&annotation.id);
        }
        if self.options.sidebar_open {
            self.surfaces.sidebar.select(annotation, true);
        }
    }

    pub fn on_annotation_deleted(&mut self, id: &AnnotationId) {
        if self.sidebar_ids.remove(id) {
            self.surfaces.sidebar.remove(id);
        }
        if self.open_menu.as_ref() == Some(id) {
            self.close_floating();
        }
    }

    /// A shape was selected; opens the context menu at the supplied
    /// rectangle and mirrors the selection into the sidebar on user clicks.
    pub fn on_annotation_selected(
        &mut self,
        annotation: &Annotation,
        from_user_click: bool,
        rect: Rect,
    ) {
        self.open_menu_at(annotation, rect);
        if from_user_click && self.options.sidebar_open {
            self.surfaces.sidebar.select(annotation, from_user_click);
        }
    }

    /// Style or thread content changed; the sidebar entry is replaced in
    /// place, never rebuilt.
    pub fn on_annotation_changed(&mut self, annotation: &Annotation) {
        if self.sidebar_ids.contains(&annotation.id) {
            self.surfaces.sidebar.update_in_place(annotation);
        } else {
            log::debug!("change event for unknown id {}", annotation.id);
        }
    }

    /// The user started interacting with a shape (e.g. drag start). Clears
    /// stale floating chrome eagerly; the collection is not touched. Any
    /// number of these may arrive without a matching commit.
    pub fn on_selection_changing(&mut self, _id: &AnnotationId) {
        self.close_floating();
    }

    /// The interaction committed; reopen the menu and connector at the new
    /// rectangle.
    pub fn on_selection_change_committed(&mut self, annotation: &Annotation, rect: Rect) {
        self.open_menu_at(annotation, rect);
    }

    /// A text range was selected; opens the pop-bar over it.
    pub fn on_text_selected(&mut self, selection: &TextSelection) {
        let anchor = anchor_for(
            self.layout.as_ref(),
            selection.page_number,
            selection.rect,
            Placement::Below,
            self.options.popbar_size,
        );
        if let Some(anchor) = anchor {
            self.surfaces.popbar.open(selection, anchor);
        }
    }

    fn open_menu_at(&mut self, annotation: &Annotation, rect: Rect) {
        let anchor = anchor_for(
            self.layout.as_ref(),
            annotation.page_number,
            rect,
            Placement::Below,
            self.options.menu_size,
        );
        match anchor {
            Some(anchor) => {
                self.surfaces.menu.open(annotation, anchor);
                self.open_menu = Some(annotation.id.clone());
                if self.options.connector_enabled {
                    self.surfaces.connector.draw(annotation, &anchor);
                }
            }
            // Page container not rendered: expected under scrolling, the
            // next committed selection recomputes.
            None => log::debug!("anchor unavailable for page {}", annotation.page_number),
        }
    }

    // ---- user actions -----------------------------------------------------

    /// Set the active drawing tool (`None` = pointer/select mode). The
    /// transfer payload (e.g. a pre-rendered signature image) survives only
    /// for single-use tools.
    pub fn activate_tool(&mut self, tool: Option<&ToolDefinition>, payload: Option<String>) {
        self.tool_payload = if tool.is_some_and(|tool| tool.single_use) { payload } else { None };
        self.active_tool = tool.cloned();
        self.painter.lock().unwrap().activate_tool(tool, self.tool_payload.as_deref());
        self.surfaces.toolbar.set_active_tool(tool);
    }

    /// Return to pointer/select mode; the painter requests this after a
    /// single-use tool placed its annotation.
    pub fn reset_tool(&mut self) {
        self.activate_tool(None, None);
    }

    pub fn active_tool(&self) -> Option<&ToolDefinition> {
        self.active_tool.as_ref()
    }

    /// Apply the pop-bar's highlight action to the current text selection.
    pub fn highlight_selection(&mut self, selection: &TextSelection) {
        self.painter.lock().unwrap().highlight_range(selection);
        self.surfaces.popbar.close();
    }

    /// Open the comment sidebar focused on an annotation (context-menu
    /// action).
    pub fn open_comment_for(&mut self, annotation: &Annotation) {
        self.set_sidebar_open(true);
        self.surfaces.sidebar.select(annotation, true);
        self.surfaces.menu.close();
        self.open_menu = None;
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.options.sidebar_open = open;
        self.surfaces.sidebar.set_open(open);
        self.surfaces.toolbar.set_sidebar_toggled(open);
        self.surfaces.connector.clear();
    }

    /// The sidebar scrolled; the connector's endpoints are stale.
    pub fn on_sidebar_scrolled(&mut self) {
        self.surfaces.connector.clear();
    }

    /// Style edit from the context menu: updates the record and the
    /// toolbar's default style for that tool.
    pub fn update_annotation_style(&mut self, annotation: &Annotation, patch: &StylePatch) {
        if self.update_annotation(&annotation.id, &AnnotationPatch::style(patch.clone())) {
            self.surfaces.toolbar.update_tool_style(annotation.kind, patch);
        }
    }

    /// Apply a patch through the painter and propagate the updated record
    /// to the sidebar. Returns whether the id existed.
    pub fn update_annotation(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        let updated = self.painter.lock().unwrap().update(id, patch);
        match updated {
            Some(updated) => {
                self.on_annotation_changed(&updated);
                true
            }
            None => false,
        }
    }

    /// Programmatic add (batch operations, embedder API).
    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.painter.lock().unwrap().add(annotation.clone());
        self.on_annotation_created(&annotation, false, None);
    }

    /// Returns whether the id existed.
    pub fn delete_annotation(&mut self, id: &AnnotationId) -> bool {
        let existed = self.painter.lock().unwrap().delete(id);
        if existed {
            self.on_annotation_deleted(id);
        }
        existed
    }

    /// Sidebar entry clicked: scroll to and flash the shape.
    pub fn select_from_sidebar(&mut self, annotation: &Annotation) {
        self.painter.lock().unwrap().highlight(annotation);
    }

    // ---- persistence ------------------------------------------------------

    /// Save the current collection to the configured endpoint, reporting
    /// progress and failure to the user. Save failures keep the in-memory
    /// collection and the dirty baseline untouched so the user may retry.
    pub fn save_data(&mut self) {
        let post_url = self.options.post_url.clone().filter(|url| !url.is_empty());
        let Some(post_url) = post_url else {
            self.surfaces.notifier.toast(
                Severity::Error,
                &format!("Cannot save: `{}` is not configured", overmark_sync::POST_URL_KEY),
            );
            return;
        };

        let items = self.painter.lock().unwrap().snapshot();
        self.surfaces.notifier.toast(Severity::Info, "Saving annotations…");
        match self.sync.save(Some(&post_url), &items) {
            Ok(receipt) => {
                if let Some(status) = receipt.status {
                    log::debug!("save endpoint status: {status}");
                }
                self.surfaces.notifier.toast(Severity::Success, "Annotations saved");
            }
            Err(error) => {
                // Silent save failure risks data loss; this is the one
                // failure that demands acknowledgment.
                self.surfaces.notifier.modal_error(&format!("Saving annotations failed: {error}"));
            }
        }
    }

    /// Replace the collection from a remote endpoint (facade operation).
    pub fn load_annotations_from(&mut self, url: &str) -> Result<usize, SyncError> {
        let items = self.sync.load(Some(url))?;
        let count = items.len();
        self.reset_for_reload();
        self.painter
            .lock()
            .unwrap()
            .init_annotations(items, self.options.include_document_annotations);
        Ok(count)
    }

    /// Persist an explicit collection to an explicit endpoint (facade
    /// operation).
    pub fn save_annotations_to(
        &mut self,
        url: &str,
        items: &[Annotation],
    ) -> Result<SaveReceipt, SyncError> {
        self.sync.save(Some(url), items)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        let items = self.painter.lock().unwrap().snapshot();
        self.sync.has_unsaved_changes(&items)
    }

    pub fn snapshot(&self) -> Vec<Annotation> {
        self.painter.lock().unwrap().snapshot()
    }

    /// Polling boundary over the painter's collection for change hooks.
    pub fn change_source(&self) -> Arc<dyn ChangeSource + Send + Sync> {
        Arc::new(PainterSource(Arc::clone(&self.painter)))
    }

    pub fn document_ready(&self) -> bool {
        self.pages_ready
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn set_get_url(&mut self, url: Option<String>) {
        self.options.get_url = url;
    }

    pub fn set_post_url(&mut self, url: Option<String>) {
        self.options.post_url = url;
    }

    pub fn set_username(&mut self, username: String) {
        self.options.username = username;
    }

    pub fn set_auto_load(&mut self, auto_load: bool) {
        self.options.auto_load = auto_load;
    }
}

#[cfg(test)]
mod tests;
