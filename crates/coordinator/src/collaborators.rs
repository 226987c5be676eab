//! Boundaries to the external collaborators: the canvas painter that owns
//! shape drawing/serialization and the canonical collection, and the
//! document viewer that owns page rendering.

use overmark_model::tools::ToolDefinition;
use overmark_model::{Annotation, AnnotationId, AnnotationPatch, TextSelection};
use overmark_sync::ChangeSource;
use std::sync::{Arc, Mutex};

/// Command side of the rendering collaborator.
///
/// The painter owns the canonical in-memory collection; every surface
/// reads a view of it through [`Painter::snapshot`] and writes back through
/// the coordinator. Notifications flow the other way: the embedder wires
/// the painter's events to the coordinator's `on_*` methods.
pub trait Painter {
    /// Prepare the drawing canvas for a freshly rendered page.
    fn prepare_page(&mut self, page_number: u32);

    /// Set the active drawing tool (`None` = pointer/select mode) with an
    /// optional transfer payload such as a pre-rendered signature image.
    fn activate_tool(&mut self, tool: Option<&ToolDefinition>, payload: Option<&str>);

    /// Put the shape with this id into selection mode.
    fn select_annotation(&mut self, id: &AnnotationId);

    /// Scroll to and flash an annotation's shape.
    fn highlight(&mut self, annotation: &Annotation);

    /// Turn a selected text range into a highlight annotation.
    fn highlight_range(&mut self, selection: &TextSelection);

    /// Replace the entire collection, optionally keeping annotations that
    /// originate from the source document itself.
    fn init_annotations(&mut self, items: Vec<Annotation>, include_document_annotations: bool);

    fn add(&mut self, annotation: Annotation);

    /// Apply a patch; returns the updated record, or `None` for an unknown
    /// id. Implementations must re-derive the bounding rectangle when the
    /// shape changes.
    fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> Option<Annotation>;

    /// Returns whether the id existed.
    fn delete(&mut self, id: &AnnotationId) -> bool;

    fn snapshot(&self) -> Vec<Annotation>;
}

/// Shared handle to the painter; the coordinator and background change
/// hooks read through the same lock.
pub type SharedPainter = Arc<Mutex<dyn Painter + Send>>;

/// Adapts the painter handle to the sync crate's polling boundary.
pub struct PainterSource(pub SharedPainter);

impl ChangeSource for PainterSource {
    fn snapshot(&self) -> Vec<Annotation> {
        self.0.lock().unwrap().snapshot()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("viewer failed to open document: {0}")]
pub struct ViewerError(pub String);

/// The document-display host. Buffer-based loads arrive as `blob:` tokens
/// resolvable through the facade's blob store.
pub trait DocumentViewer {
    fn page_count(&self) -> u32;
    fn open_url(&mut self, url: &str) -> Result<(), ViewerError>;
}

/// Viewer lifecycle events routed into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// A page finished rendering (initial render or css re-transform).
    PageRendered { page_number: u32 },
    /// The document finished loading; remote annotations may be fetched.
    DocumentLoaded,
    /// Scroll/zoom changed the visible area; floating positions are stale.
    ViewAreaUpdated,
}
