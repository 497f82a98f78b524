//! Logging and debugging facilities for Horizon Bridge.
//!
//! This module provides:
//! - Target names for filtering the crate's `tracing` output
//! - Debug visualization for widget trees
//!
//! # Tracing Integration
//!
//! Horizon Bridge uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_bridge_core::display=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! # Debug Visualization
//!
//! Use [`WidgetTreeDebug`] (or [`crate::Display::dump_widget_tree`]) to get a
//! view of the widget hierarchy with each widget's native handles:
//!
//! ```ignore
//! println!("{}", display.dump_widget_tree()?);
//! ```

use std::fmt::Write as FmtWrite;

use crate::registry::{HandleRegistry, WidgetId};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_bridge_core";
    /// Display lifecycle and event loop target.
    pub const DISPLAY: &str = "horizon_bridge_core::display";
    /// Handle registry target.
    pub const REGISTRY: &str = "horizon_bridge_core::registry";
    /// Synchronizer target.
    pub const SYNCHRONIZER: &str = "horizon_bridge_core::synchronizer";
    /// Timer target.
    pub const TIMER: &str = "horizon_bridge_core::timer";
    /// Widget lifecycle target.
    pub const WIDGET: &str = "horizon_bridge_core::widget";
    /// Native toolkit traffic target.
    pub const NATIVE: &str = "horizon_bridge_core::native";
    /// Thread affinity target.
    pub const THREAD: &str = "horizon_bridge_core::thread";
}

/// Style options for widget tree visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Plain indentation.
    Compact,
}

/// Configuration for widget tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show widget ids.
    pub show_ids: bool,
    /// Whether to show native handles.
    pub show_handles: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_handles: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_handles: false,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing widget trees.
#[derive(Debug, Clone, Default)]
pub struct WidgetTreeDebug {
    options: TreeFormatOptions,
}

impl WidgetTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every tree in `registry`.
    pub fn format_all<W: ?Sized>(&self, registry: &HandleRegistry<W>) -> String {
        let roots = registry.roots();
        let mut output = String::new();
        let _ = writeln!(output, "Widget Tree ({} widgets):", registry.len());

        if roots.is_empty() {
            output.push_str("  (empty)\n");
        } else {
            for root in roots {
                self.format_subtree_into(registry, root, 0, true, &mut output);
            }
        }
        output
    }

    /// Format the subtree rooted at `root`.
    pub fn format_subtree<W: ?Sized>(&self, registry: &HandleRegistry<W>, root: WidgetId) -> String {
        let mut output = String::new();
        self.format_subtree_into(registry, root, 0, true, &mut output);
        output
    }

    fn format_subtree_into<W: ?Sized>(
        &self,
        registry: &HandleRegistry<W>,
        id: WidgetId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(type_name) = registry.type_name(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(type_name);
        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", id);
        }
        if self.options.show_handles {
            let handles = registry.handles_of(id);
            if !handles.is_empty() {
                let list: Vec<String> = handles.iter().map(ToString::to_string).collect();
                let _ = write!(output, " <{}>", list.join(", "));
            }
        }
        output.push('\n');

        let children = registry.children(id);
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(registry, child, depth + 1, i + 1 == child_count, output);
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => (
                "\u{2502}",
                "\u{251c}\u{2500}\u{2500}",
                "\u{2514}\u{2500}\u{2500}",
            ),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}
