//! Element patch targeting and viewport hints.

use crate::event::wire_lines;

/// How patched markup lands relative to the selected elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    #[default]
    OuterReplace,
    InnerReplace,
    OuterMergePatch,
    InnerMergePatch,
    Append,
    Prepend,
    InsertBefore,
    InsertAfter,
    Remove,
}

impl PatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchMode::OuterReplace => "outerReplace",
            PatchMode::InnerReplace => "innerReplace",
            PatchMode::OuterMergePatch => "outerMergePatch",
            PatchMode::InnerMergePatch => "innerMergePatch",
            PatchMode::Append => "append",
            PatchMode::Prepend => "prepend",
            PatchMode::InsertBefore => "insertBefore",
            PatchMode::InsertAfter => "insertAfter",
            PatchMode::Remove => "remove",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "outerReplace" => PatchMode::OuterReplace,
            "innerReplace" => PatchMode::InnerReplace,
            "outerMergePatch" => PatchMode::OuterMergePatch,
            "innerMergePatch" => PatchMode::InnerMergePatch,
            "append" => PatchMode::Append,
            "prepend" => PatchMode::Prepend,
            "insertBefore" => PatchMode::InsertBefore,
            "insertAfter" => PatchMode::InsertAfter,
            "remove" => PatchMode::Remove,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEdge {
    Top,
    Bottom,
}

impl ScrollEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollEdge::Top => "top",
            ScrollEdge::Bottom => "bottom",
        }
    }
}

/// Target descriptor and modifiers of an `element-patch` block.
///
/// Without a selector the client matches elements by the `id` of each
/// top-level element in the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementPatch {
    pub selector: Option<String>,
    pub mode: PatchMode,
    pub view_transition: bool,
    pub settle_ms: Option<u64>,
    /// Maximum number of matched targets to patch.
    pub limit: Option<usize>,
    /// Autoscroll the target container to an edge.
    pub scroll: Option<ScrollEdge>,
    /// Scroll the target into view, aligned to an edge.
    pub show: Option<ScrollEdge>,
    /// Keep the focused element's scroll anchor stable.
    pub focus_scroll: bool,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(selector: &str, mode: PatchMode) -> Self {
        Self {
            selector: Some(selector.to_string()),
            mode,
            ..Self::default()
        }
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn mode(mut self, mode: PatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_view_transition(mut self) -> Self {
        self.view_transition = true;
        self
    }

    pub fn settle(mut self, ms: u64) -> Self {
        self.settle_ms = Some(ms);
        self
    }

    pub fn limit(mut self, max_targets: usize) -> Self {
        self.limit = Some(max_targets);
        self
    }

    pub fn scroll(mut self, edge: ScrollEdge) -> Self {
        self.scroll = Some(edge);
        self
    }

    pub fn show(mut self, edge: ScrollEdge) -> Self {
        self.show = Some(edge);
        self
    }

    pub fn focus_scroll(mut self) -> Self {
        self.focus_scroll = true;
        self
    }

    /// Data lines preceding the `elements` lines, in wire order.
    pub(crate) fn header_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(selector) = &self.selector {
            // Line breaks are CSS whitespace; folding them keeps the field on one line.
            lines.push(format!("selector {}", wire_lines(selector).join(" ")));
        }
        if self.mode != PatchMode::OuterReplace {
            lines.push(format!("mode {}", self.mode.as_str()));
        }
        if self.view_transition {
            lines.push("useViewTransition true".to_string());
        }
        if let Some(ms) = self.settle_ms {
            lines.push(format!("settle {ms}"));
        }
        if let Some(n) = self.limit {
            lines.push(format!("limit {n}"));
        }
        if let Some(edge) = self.scroll {
            lines.push(format!("scroll {}", edge.as_str()));
        }
        if let Some(edge) = self.show {
            lines.push(format!("show {}", edge.as_str()));
        }
        if self.focus_scroll {
            lines.push("focusScroll true".to_string());
        }
        lines
    }
}
