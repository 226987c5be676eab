//! Screen-space anchoring for floating elements.
//!
//! Converts a page-local bounding rectangle into a screen position for a
//! floating element (menu, pop-bar, connector endpoint), flipping the
//! preferred side when it would overflow the viewport. Anchors are
//! recomputed on every call and never cached: every scroll, zoom or page
//! re-render invalidates previous screen coordinates.

use overmark_model::Rect;

/// Rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Measured size of the floating element being placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSize {
    pub width: f64,
    pub height: f64,
}

impl ElementSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Preferred side of the reference box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

impl Placement {
    fn opposite(self) -> Self {
        match self {
            Placement::Above => Placement::Below,
            Placement::Below => Placement::Above,
        }
    }
}

/// Live page geometry supplied by the viewer.
///
/// `page_viewport` returns the current on-screen box of the container for
/// a page, or `None` when the page is not rendered (scrolled out and
/// virtualized away). Callers treat a missing page as an expected no-op,
/// not an error.
pub trait PageLayout {
    fn page_viewport(&self, page_number: u32) -> Option<ScreenRect>;

    /// The visible scroll viewport.
    fn viewport(&self) -> ScreenRect;

    /// Page-local-to-screen scale factor; 1:1 unless the viewer is zoomed.
    fn scale(&self, _page_number: u32) -> f64 {
        1.0
    }
}

/// A computed screen anchor, plus the reference box it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    /// Side actually used after flipping.
    pub placement: Placement,
    pub reference: ScreenRect,
}

/// Compute the screen anchor for a floating element relative to an
/// annotation's rectangle on a page.
///
/// Returns `None` when the page container is unavailable.
pub fn anchor_for(
    layout: &dyn PageLayout,
    page_number: u32,
    rect: Rect,
    preference: Placement,
    element: ElementSize,
) -> Option<Anchor> {
    let Some(page) = layout.page_viewport(page_number) else {
        log::debug!("anchor skipped: page {page_number} container not rendered");
        return None;
    };
    let scale = layout.scale(page_number);

    // Synthetic reference box: the annotation rectangle mapped to screen
    // space, which is all the placement algorithm needs to know about it.
    let reference = ScreenRect::new(
        page.x + rect.x * scale,
        page.y + rect.y * scale,
        rect.width * scale,
        rect.height * scale,
    );

    let viewport = layout.viewport();
    let mut placement = preference;
    let mut y = y_for(placement, &reference, element);

    // Single flip middleware: fall to the opposite side when the preferred
    // side is clipped by the viewport.
    if overflows(y, element, &viewport) {
        let flipped = placement.opposite();
        let flipped_y = y_for(flipped, &reference, element);
        if !overflows(flipped_y, element, &viewport) {
            placement = flipped;
            y = flipped_y;
        }
    }

    // Clamp into the viewport so the element is never fully outside it.
    let x = (reference.center_x() - element.width / 2.0)
        .clamp(viewport.x, (viewport.right() - element.width).max(viewport.x));
    let y = y.clamp(viewport.y, (viewport.bottom() - element.height).max(viewport.y));

    Some(Anchor { x, y, placement, reference })
}

fn y_for(placement: Placement, reference: &ScreenRect, element: ElementSize) -> f64 {
    match placement {
        Placement::Below => reference.bottom(),
        Placement::Above => reference.y - element.height,
    }
}

fn overflows(y: f64, element: ElementSize, viewport: &ScreenRect) -> bool {
    y < viewport.y || y + element.height > viewport.bottom()
}
