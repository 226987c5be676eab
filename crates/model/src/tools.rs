//! Drawing tool definitions surfaced by the toolbar.
//!
//! A tool either creates annotations of a specific kind or is the pure
//! selection tool (`kind: None`). The pointer/view mode is represented by
//! the absence of an active tool, not by a definition of its own.

use crate::defaults;
use crate::{AnnotationKind, AnnotationStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    /// Kind of annotation the tool creates; `None` for the selection tool.
    pub kind: Option<AnnotationKind>,
    /// Single-use tools place one annotation and then transition back to
    /// selection mode.
    pub single_use: bool,
    /// Style applied to annotations the tool creates, within the kind's
    /// capabilities.
    pub default_style: AnnotationStyle,
}

impl ToolDefinition {
    fn for_kind(kind: AnnotationKind) -> Self {
        let caps = kind.capabilities();
        let opacity = match kind {
            AnnotationKind::Highlight => defaults::HIGHLIGHT_OPACITY,
            _ => defaults::OPACITY,
        };
        Self {
            name: kind.as_str().to_owned(),
            kind: Some(kind),
            single_use: kind.is_single_use(),
            default_style: AnnotationStyle {
                color: caps.color.then(|| defaults::COLOR.to_owned()),
                stroke_width: caps.stroke_width.then_some(defaults::STROKE_WIDTH),
                opacity: caps.opacity.then_some(opacity),
            },
        }
    }

    fn select() -> Self {
        Self {
            name: defaults::SELECT_TOOL.to_owned(),
            kind: None,
            single_use: false,
            default_style: AnnotationStyle::default(),
        }
    }
}

/// The built-in toolbar tool set, selection tool first.
pub fn default_tools() -> Vec<ToolDefinition> {
    let mut tools = vec![ToolDefinition::select()];
    tools.extend(AnnotationKind::ALL.into_iter().map(ToolDefinition::for_kind));
    tools
}

/// Look up a tool by name within a tool set.
pub fn find_tool<'a>(tools: &'a [ToolDefinition], name: &str) -> Option<&'a ToolDefinition> {
    tools.iter().find(|tool| tool.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_contains_select_and_every_kind() {
        let tools = default_tools();
        assert_eq!(tools.len(), AnnotationKind::ALL.len() + 1);
        assert_eq!(tools[0].name, defaults::SELECT_TOOL);
        assert_eq!(tools[0].kind, None);
        for kind in AnnotationKind::ALL {
            let tool = find_tool(&tools, kind.as_str()).expect("tool for every kind");
            assert_eq!(tool.kind, Some(kind));
            assert_eq!(tool.single_use, kind.is_single_use());
        }
    }

    #[test]
    fn default_styles_respect_capabilities() {
        let tools = default_tools();
        let stamp = find_tool(&tools, "stamp").expect("stamp tool");
        assert_eq!(stamp.default_style, AnnotationStyle::default());

        let highlight = find_tool(&tools, "highlight").expect("highlight tool");
        assert_eq!(highlight.default_style.opacity, Some(defaults::HIGHLIGHT_OPACITY));
        assert_eq!(highlight.default_style.stroke_width, None);
    }
}
