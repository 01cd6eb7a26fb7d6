use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::markdown::MarkdownParser;
use crate::postprocess::{DEFAULT_TABLE_CLASS, add_table_class};
use crate::sanitize::{Sanitizer, default_sanitizer};

static DEFAULT_RENDERER: Lazy<Renderer> = Lazy::new(Renderer::default);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Highlight fenced code blocks with a declared language.
    pub highlight: bool,
    /// GFM tables and strikethrough.
    pub gfm: bool,
    /// Class added to every table; `None` leaves tables untouched.
    pub table_class: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            highlight: true,
            gfm: true,
            table_class: Some(DEFAULT_TABLE_CLASS.to_string()),
        }
    }
}

/// Markdown in, display-safe HTML out.
///
/// Parsing (with per-block highlighting), sanitizing and table decoration run
/// in that order on every call. A renderer holds no per-call state and can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct Renderer {
    parser: MarkdownParser,
    sanitizer: Arc<Sanitizer>,
    table_class: Option<String>,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        let parser = if options.highlight {
            MarkdownParser::new()
        } else {
            MarkdownParser::plain()
        };
        Self {
            parser: parser.with_gfm(options.gfm),
            sanitizer: default_sanitizer(),
            table_class: options.table_class,
        }
    }

    pub fn with_parser(mut self, parser: MarkdownParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Arc::new(sanitizer);
        self
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn render(&self, markdown: &str) -> String {
        let raw = self.parser.render(markdown);
        let clean = self.sanitizer.clean(&raw);
        let html = match self.table_class.as_deref() {
            Some(class_name) => add_table_class(&clean, class_name),
            None => clean,
        };
        debug!(
            input = markdown.len(),
            raw = raw.len(),
            output = html.len(),
            "rendered markdown"
        );
        html
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

/// Renders `markdown` with the default options.
pub fn render(markdown: &str) -> String {
    DEFAULT_RENDERER.render(markdown)
}
