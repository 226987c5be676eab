//! Contracts for the floating UI surfaces.
//!
//! The coordinator never touches a UI toolkit; each surface is an object
//! with explicit open/close/update methods that the embedder implements.
//! Surfaces render; they never mutate the annotation collection, which is
//! written back exclusively through the coordinator.

use overmark_anchor::Anchor;
use overmark_model::tools::ToolDefinition;
use overmark_model::{Annotation, AnnotationId, AnnotationKind, StylePatch, TextSelection};

/// Per-annotation context menu.
pub trait MenuSurface {
    fn open(&mut self, annotation: &Annotation, anchor: Anchor);
    fn close(&mut self);
}

/// Selection pop-bar shown over a selected text range.
pub trait PopbarSurface {
    fn open(&mut self, selection: &TextSelection, anchor: Anchor);
    fn close(&mut self);
}

/// Comment sidebar listing every annotation.
pub trait SidebarSurface {
    fn append(&mut self, annotation: &Annotation);
    fn remove(&mut self, id: &AnnotationId);
    /// Replace the entry for this annotation without rebuilding the list.
    fn update_in_place(&mut self, annotation: &Annotation);
    fn select(&mut self, annotation: &Annotation, from_user_click: bool);
    fn set_open(&mut self, open: bool);
    fn clear(&mut self);
}

/// Line drawn from a sidebar entry to the annotation's shape.
pub trait ConnectorSurface {
    fn draw(&mut self, annotation: &Annotation, anchor: &Anchor);
    fn clear(&mut self);
}

/// Toolbar state the coordinator pushes down: the active tool (`None` is
/// pointer/view mode, which the toolbar renders as the view button being
/// selected), per-tool default styles, and the sidebar toggle.
pub trait ToolbarSurface {
    fn set_active_tool(&mut self, tool: Option<&ToolDefinition>);
    fn update_tool_style(&mut self, kind: AnnotationKind, patch: &StylePatch);
    fn set_sidebar_toggled(&mut self, open: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// User-facing notifications. Save failures go through the persistent
/// modal channel; everything else is a non-blocking toast.
pub trait Notifier {
    fn toast(&self, severity: Severity, message: &str);
    fn modal_error(&self, message: &str);
}

/// The full surface set handed to the coordinator.
pub struct Surfaces {
    pub menu: Box<dyn MenuSurface>,
    pub popbar: Box<dyn PopbarSurface>,
    pub sidebar: Box<dyn SidebarSurface>,
    pub connector: Box<dyn ConnectorSurface>,
    pub toolbar: Box<dyn ToolbarSurface>,
    pub notifier: Box<dyn Notifier>,
}
