use std::fmt;

use tracing::{Level, Span, level_filters::LevelFilter};

/// Logging handle owned by one graph.
///
/// Events are parented to the graph's span and filtered by the graph's own
/// level, so two graphs in one process can log at different verbosity without
/// touching the global subscriber.
#[derive(Debug, Clone)]
pub struct GraphLogger {
    span: Span,
    level: LevelFilter,
}

impl GraphLogger {
    pub fn new(tag: &str, level: LevelFilter) -> Self {
        Self {
            span: tracing::info_span!("filter_graph", tag = %tag),
            level,
        }
    }

    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
            level: LevelFilter::OFF,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn debug(&self, message: impl fmt::Display) {
        if self.enabled(Level::DEBUG) {
            tracing::debug!(parent: &self.span, "{message}");
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        if self.enabled(Level::INFO) {
            tracing::info!(parent: &self.span, "{message}");
        }
    }

    pub fn warn(&self, message: impl fmt::Display) {
        if self.enabled(Level::WARN) {
            tracing::warn!(parent: &self.span, "{message}");
        }
    }
}

impl Default for GraphLogger {
    fn default() -> Self {
        Self::new("graph", LevelFilter::INFO)
    }
}
