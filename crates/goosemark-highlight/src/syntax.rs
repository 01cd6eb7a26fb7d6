use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::warn;

use crate::{Highlight, escape_html};

/// Prefix of every class the highlighter puts on a token span.
pub const TOKEN_CLASS_PREFIX: &str = "hl-";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed {
    prefix: TOKEN_CLASS_PREFIX,
};

static SYNTAX_SET: Lazy<Arc<SyntaxSet>> =
    Lazy::new(|| Arc::new(SyntaxSet::load_defaults_newlines()));

/// Syntect's bundled syntaxes, loaded once per process.
pub fn default_syntax_set() -> Arc<SyntaxSet> {
    Arc::clone(&SYNTAX_SET)
}

/// A syntect syntax, emitting class-tagged spans.
///
/// The whole block is wrapped in one span carrying the syntax's top-level
/// scope (`hl-source hl-python`); that outer span is the only one naming the
/// language. Nested token spans carry scope classes such as `hl-keyword`.
#[derive(Debug, Clone)]
pub struct SyntectLanguage {
    syntax_set: Arc<SyntaxSet>,
    index: usize,
}

impl SyntectLanguage {
    /// `index` refers to `syntax_set.syntaxes()`.
    pub fn new(syntax_set: Arc<SyntaxSet>, index: usize) -> Self {
        Self { syntax_set, index }
    }

    pub fn syntax(&self) -> Option<&SyntaxReference> {
        self.syntax_set.syntaxes().get(self.index)
    }
}

impl Highlight for SyntectLanguage {
    fn highlight(&self, code: &str) -> String {
        let Some(syntax) = self.syntax() else {
            return escape_html(code);
        };
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                warn!(syntax = %syntax.name, error = %err, "highlighting failed, emitting plain text");
                return escape_html(code);
            }
        }
        generator.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::TOKEN_CLASS_PREFIX;
    use crate::{default_registry, escape_html, highlight};
    use lol_html::{RewriteStrSettings, element, rewrite_str};
    use pretty_assertions::assert_eq;

    /// Text left after dropping every tag, still escaped.
    fn strip_tags(html: &str) -> String {
        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("*", |el| {
                    el.remove_and_keep_content();
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .expect("rewrite html")
    }

    fn span_classes(html: &str) -> Vec<String> {
        let mut classes = Vec::new();
        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("span", |el| {
                    classes.push(el.get_attribute("class").unwrap_or_default());
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .expect("rewrite html");
        classes
    }

    #[test]
    fn outer_span_names_the_language() {
        let html = highlight("print(1)\n", Some("python"));
        assert!(
            html.starts_with("<span class=\"hl-source hl-python\">"),
            "unexpected output: {}",
            html
        );
        assert!(html.ends_with("</span>"), "unexpected output: {}", html);

        let rust = highlight("let x = 1;\n", Some("rust"));
        assert!(
            rust.starts_with("<span class=\"hl-source hl-rust\">"),
            "unexpected output: {}",
            rust
        );
    }

    #[test]
    fn highlighting_only_adds_markup() {
        let code = "fn main() {\n    let s = \"<b>&</b>\";\n    println!(\"{}\", s);\n}\n";
        let html = highlight(code, Some("rust"));
        assert!(html.contains("<span"));
        assert!(!html.contains("<b>"));
        assert_eq!(strip_tags(&html).replace("&#39;", "'"), escape_html(code));
    }

    #[test]
    fn code_without_trailing_newline_is_kept() {
        let code = "x = 1";
        let html = default_registry().highlight(code, Some("py"));
        assert_eq!(strip_tags(&html), code);
    }

    #[test]
    fn every_span_class_is_prefixed() {
        let classes = span_classes(&highlight("const a = [1, 'two'];\n", Some("js")));
        assert!(!classes.is_empty());
        for class in classes.iter().flat_map(|value| value.split_whitespace()) {
            assert!(class.starts_with(TOKEN_CLASS_PREFIX), "class {}", class);
        }
    }
}
