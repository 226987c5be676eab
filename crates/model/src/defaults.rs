//! Compiled-in defaults shared by the toolbar, menu and facade.

/// Default stroke/fill color for newly activated tools.
pub const COLOR: &str = "#FF0000";

/// Preset palette offered by the style editor.
pub const PALETTE: [&str; 8] = [
    "#FF0000", "#FFBE00", "#FFFF00", "#83D33C", "#00B445", "#00B2F4", "#0071C4", "#001F63",
];

pub const STROKE_WIDTH: f64 = 2.0;

pub const OPACITY: f64 = 1.0;

/// Highlights render semi-transparent by default.
pub const HIGHLIGHT_OPACITY: f64 = 0.5;

/// Whether the sidebar-to-shape connector line feature is on.
pub const CONNECTOR_LINE_ENABLED: bool = true;

/// Name of the selection tool activated by the default-active-tool flag.
pub const SELECT_TOOL: &str = "select";

/// Fallback author name when none is configured.
pub const UNKNOWN_USER: &str = "unknown";
