//! Markdown to HTML conversion with a per-code-block hook.

use std::sync::Arc;

use goosemark_highlight::{HighlighterRegistry, default_registry, escape_html};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use tracing::trace;

/// Prefix of the class the parser puts on `<code>` for a declared language.
pub const LANGUAGE_CLASS_PREFIX: &str = "language-";

/// Renders the body of a code block.
///
/// The returned HTML is spliced between `<pre><code>` and `</code></pre>`, so
/// it must already be escaped.
pub trait CodeBlockHook: Send + Sync {
    fn render_code(&self, code: &str, language: Option<&str>) -> String;
}

impl CodeBlockHook for HighlighterRegistry {
    fn render_code(&self, code: &str, language: Option<&str>) -> String {
        self.highlight(code, language)
    }
}

impl<T: CodeBlockHook + ?Sized> CodeBlockHook for &T {
    fn render_code(&self, code: &str, language: Option<&str>) -> String {
        (**self).render_code(code, language)
    }
}

impl<T: CodeBlockHook + ?Sized> CodeBlockHook for Arc<T> {
    fn render_code(&self, code: &str, language: Option<&str>) -> String {
        (**self).render_code(code, language)
    }
}

#[derive(Clone)]
pub struct MarkdownParser {
    hook: Arc<dyn CodeBlockHook>,
    gfm: bool,
}

impl MarkdownParser {
    /// A parser that highlights code blocks with the default registry.
    pub fn new() -> Self {
        Self {
            hook: Arc::new(default_registry()),
            gfm: true,
        }
    }

    /// A parser that only escapes code blocks.
    pub fn plain() -> Self {
        Self::new().with_hook(HighlighterRegistry::plain())
    }

    pub fn with_hook<H: CodeBlockHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    /// Enable or disable GFM tables and strikethrough (enabled by default).
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    pub fn options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
        } else {
            Options::empty()
        }
    }

    /// Converts `markdown` to HTML. Raw HTML in the input is passed through
    /// untouched; sanitizing it is the caller's job.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options());
        let events = HookedCodeBlocks {
            events: parser,
            hook: self.hook.as_ref(),
        };
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownParser")
            .field("gfm", &self.gfm)
            .finish_non_exhaustive()
    }
}

/// Replaces each code block's events with a single HTML event built by the hook.
struct HookedCodeBlocks<'h, I> {
    events: I,
    hook: &'h dyn CodeBlockHook,
}

impl<'a, I> Iterator for HookedCodeBlocks<'_, I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        match self.events.next()? {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match &kind {
                    CodeBlockKind::Fenced(info) => fence_language(info),
                    CodeBlockKind::Indented => None,
                };
                let mut code = String::new();
                for event in self.events.by_ref() {
                    match event {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(&text),
                        _ => {}
                    }
                }
                trace!(language, len = code.len(), "code block");
                Some(Event::Html(CowStr::from(code_block_html(
                    self.hook, &code, language,
                ))))
            }
            event => Some(event),
        }
    }
}

fn fence_language(info: &str) -> Option<&str> {
    info.split_whitespace().next()
}

fn code_block_html(hook: &dyn CodeBlockHook, code: &str, language: Option<&str>) -> String {
    let body = hook.render_code(code, language);
    let mut out = String::with_capacity(body.len() + 64);
    match language {
        Some(language) => {
            out.push_str("<pre><code class=\"");
            out.push_str(LANGUAGE_CLASS_PREFIX);
            out.push_str(&escape_html(language));
            out.push_str("\">");
        }
        None => out.push_str("<pre><code>"),
    }
    out.push_str(&body);
    out.push_str("</code></pre>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::{CodeBlockHook, MarkdownParser};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl CodeBlockHook for Recorder {
        fn render_code(&self, code: &str, language: Option<&str>) -> String {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((code.to_string(), language.map(str::to_string)));
            }
            "BODY".to_string()
        }
    }

    #[test]
    fn headings_and_emphasis() {
        let html = MarkdownParser::plain().render("# Title\n\nHello **world**.");
        assert_eq!(html, "<h1>Title</h1>\n<p>Hello <strong>world</strong>.</p>\n");
    }

    #[test]
    fn hook_receives_code_and_language() {
        let recorder = Arc::new(Recorder::default());
        let parser = MarkdownParser::new().with_hook(Arc::clone(&recorder));
        let html = parser.render("```python extra\nprint(1)\nprint(2)\n```\n\n    indented\n");
        assert_eq!(
            html,
            "<pre><code class=\"language-python\">BODY</code></pre>\n<pre><code>BODY</code></pre>\n"
        );
        let calls = recorder.calls.lock().map(|calls| calls.clone()).unwrap_or_default();
        assert_eq!(
            calls,
            vec![
                ("print(1)\nprint(2)\n".to_string(), Some("python".to_string())),
                ("indented\n".to_string(), None),
            ]
        );
    }

    #[test]
    fn fence_without_language_has_no_class() {
        let html = MarkdownParser::plain().render("```\n<b>\n```\n");
        assert_eq!(html, "<pre><code>&lt;b&gt;\n</code></pre>\n");
    }

    #[test]
    fn language_is_attribute_escaped() {
        let html = MarkdownParser::plain().render("```a\"b\nx\n```\n");
        assert!(html.starts_with("<pre><code class=\"language-a&quot;b\">"), "{}", html);
    }

    #[test]
    fn tables_follow_gfm_flag() {
        let source = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        let html = MarkdownParser::plain().render(source);
        assert!(html.contains("<table>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<tbody>"));
        let html = MarkdownParser::plain().with_gfm(false).render(source);
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let html = MarkdownParser::plain().render("```rust\nlet x = 1;\n\nstill code");
        assert!(html.starts_with("<pre><code class=\"language-rust\">let x = 1;\n"), "{}", html);
        assert!(html.contains("still code</code></pre>"), "{}", html);
    }

    #[test]
    fn raw_html_is_passed_through() {
        let html = MarkdownParser::plain().render("a <b>b</b>");
        assert_eq!(html, "<p>a <b>b</b></p>\n");
    }
}
