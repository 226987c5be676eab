//! Annotation data model for the Overmark overlay.
//!
//! The canonical collection itself lives behind the rendering collaborator;
//! this crate defines the records that travel between the collaborator, the
//! floating surfaces and the sync endpoints. Shape geometry is opaque here;
//! only the derived bounding rectangle is understood by the coordination
//! layer.

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod tools;

/// Stable unique identifier for an annotation.
///
/// Assigned at creation, immutable thereafter. Remote data may carry
/// arbitrary id strings; locally created annotations use UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh unique id for a locally created annotation.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Which style fields an annotation kind allows the user to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleCapabilities {
    pub color: bool,
    pub stroke_width: bool,
    pub opacity: bool,
}

impl StyleCapabilities {
    pub const NONE: StyleCapabilities =
        StyleCapabilities { color: false, stroke_width: false, opacity: false };
    pub const ALL: StyleCapabilities =
        StyleCapabilities { color: true, stroke_width: true, opacity: true };
}

/// Closed set of annotation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Rectangle,
    Circle,
    Freehand,
    Freetext,
    Note,
    Stamp,
    Signature,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 8] = [
        AnnotationKind::Highlight,
        AnnotationKind::Rectangle,
        AnnotationKind::Circle,
        AnnotationKind::Freehand,
        AnnotationKind::Freetext,
        AnnotationKind::Note,
        AnnotationKind::Stamp,
        AnnotationKind::Signature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Rectangle => "rectangle",
            AnnotationKind::Circle => "circle",
            AnnotationKind::Freehand => "freehand",
            AnnotationKind::Freetext => "freetext",
            AnnotationKind::Note => "note",
            AnnotationKind::Stamp => "stamp",
            AnnotationKind::Signature => "signature",
        }
    }

    /// Declared capability record for this kind.
    pub const fn capabilities(self) -> StyleCapabilities {
        match self {
            AnnotationKind::Highlight => {
                StyleCapabilities { color: true, stroke_width: false, opacity: true }
            }
            AnnotationKind::Rectangle
            | AnnotationKind::Circle
            | AnnotationKind::Freehand => StyleCapabilities::ALL,
            AnnotationKind::Freetext | AnnotationKind::Note => {
                StyleCapabilities { color: true, stroke_width: false, opacity: false }
            }
            AnnotationKind::Stamp | AnnotationKind::Signature => StyleCapabilities::NONE,
        }
    }

    /// Kinds that place a single instance and then hand control back to
    /// selection mode (stamps and signatures).
    pub const fn is_single_use(self) -> bool {
        matches!(self, AnnotationKind::Stamp | AnnotationKind::Signature)
    }
}

/// Axis-aligned bounding rectangle in page-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Editable style fields. A field is present only when the annotation
/// kind's capability record allows it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Partial style update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn color(color: impl Into<String>) -> Self {
        Self { color: Some(color.into()), ..Self::default() }
    }

    pub fn opacity(opacity: f64) -> Self {
        Self { opacity: Some(opacity), ..Self::default() }
    }

    pub fn stroke_width(stroke_width: f64) -> Self {
        Self { stroke_width: Some(stroke_width), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.stroke_width.is_none() && self.opacity.is_none()
    }
}

/// Structured contents of the discussion thread's root entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contents {
    #[serde(default)]
    pub text: String,
}

/// One reply in an annotation's discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub timestamp: String,
    pub text: String,
}

/// A user- or document-authored markup record anchored to a page location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number, bounded by the document page count.
    #[serde(rename = "page")]
    pub page_number: u32,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Serialized shape description owned by the rendering collaborator;
    /// opaque to the coordination core.
    #[serde(default)]
    pub shape: serde_json::Value,
    /// Bounding rectangle derived from the shape, re-derived on every
    /// mutating operation.
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub style: AnnotationStyle,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contents: Contents,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// User name of the author.
    #[serde(default)]
    pub author: String,
    /// True when the annotation originated from the source document rather
    /// than this session.
    #[serde(default)]
    pub is_original: bool,
    /// Transient marker for a freshly created, not-yet-configured instance.
    /// Never serialized.
    #[serde(skip)]
    pub is_draft: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("page {page} is out of bounds for a document with {page_count} pages")]
    PageOutOfBounds { page: u32, page_count: u32 },
}

impl Annotation {
    /// Create a new draft annotation authored in this session.
    pub fn new(page_number: u32, kind: AnnotationKind, author: impl Into<String>) -> Self {
        Self {
            id: AnnotationId::generate(),
            page_number,
            kind,
            shape: serde_json::Value::Null,
            rect: Rect::default(),
            style: AnnotationStyle::default(),
            title: String::new(),
            contents: Contents::default(),
            comments: Vec::new(),
            author: author.into(),
            is_original: false,
            is_draft: true,
        }
    }

    /// Validate placement against the document page count.
    pub fn validate_page(&self, page_count: u32) -> Result<(), ModelError> {
        if self.page_number == 0 || self.page_number > page_count {
            return Err(ModelError::PageOutOfBounds { page: self.page_number, page_count });
        }
        Ok(())
    }

    /// Apply a style patch, honouring the kind's capability record.
    /// Disallowed fields are dropped. Returns whether anything changed.
    pub fn apply_style(&mut self, patch: &StylePatch) -> bool {
        let caps = self.kind.capabilities();
        let mut changed = false;
        if caps.color {
            if let Some(color) = &patch.color {
                if self.style.color.as_deref() != Some(color.as_str()) {
                    self.style.color = Some(color.clone());
                    changed = true;
                }
            }
        }
        if caps.stroke_width {
            if let Some(width) = patch.stroke_width {
                if self.style.stroke_width != Some(width) {
                    self.style.stroke_width = Some(width);
                    changed = true;
                }
            }
        }
        if caps.opacity {
            if let Some(opacity) = patch.opacity {
                if self.style.opacity != Some(opacity) {
                    self.style.opacity = Some(opacity);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Drop style fields the kind does not declare editable. Remote data is
    /// normalized through this on load.
    pub fn sanitize_style(&mut self) {
        let caps = self.kind.capabilities();
        if !caps.color {
            self.style.color = None;
        }
        if !caps.stroke_width {
            self.style.stroke_width = None;
        }
        if !caps.opacity {
            self.style.opacity = None;
        }
    }

    /// Apply a partial update. Returns whether anything changed.
    pub fn apply(&mut self, patch: &AnnotationPatch) -> bool {
        let mut changed = false;
        if let Some(title) = &patch.title {
            if &self.title != title {
                self.title = title.clone();
                changed = true;
            }
        }
        if let Some(contents) = &patch.contents {
            if &self.contents != contents {
                self.contents = contents.clone();
                changed = true;
            }
        }
        if let Some(comments) = &patch.comments {
            if &self.comments != comments {
                self.comments = comments.clone();
                changed = true;
            }
        }
        if self.apply_style(&patch.style) {
            changed = true;
        }
        if let Some(shape) = &patch.shape {
            if &self.shape != shape {
                self.shape = shape.clone();
                changed = true;
            }
        }
        // A moved or reshaped annotation carries its re-derived rectangle
        // alongside the new shape.
        if let Some(rect) = patch.rect {
            if self.rect != rect {
                self.rect = rect;
                changed = true;
            }
        }
        if changed {
            self.is_draft = false;
        }
        changed
    }
}

/// A text range selected in the document, handed to the selection pop-bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSelection {
    #[serde(rename = "page")]
    pub page_number: u32,
    /// Bounding rectangle of the selected range, page-local.
    pub rect: Rect,
    pub text: String,
}

/// Partial update to an annotation's editable fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Contents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(default, skip_serializing_if = "StylePatch::is_empty")]
    pub style: StylePatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
}

impl AnnotationPatch {
    pub fn style(style: StylePatch) -> Self {
        Self { style, ..Self::default() }
    }

    pub fn thread(title: impl Into<String>, contents: Contents, comments: Vec<Comment>) -> Self {
        Self {
            title: Some(title.into()),
            contents: Some(contents),
            comments: Some(comments),
            ..Self::default()
        }
    }

    pub fn moved(shape: serde_json::Value, rect: Rect) -> Self {
        Self { shape: Some(shape), rect: Some(rect), ..Self::default() }
    }
}
