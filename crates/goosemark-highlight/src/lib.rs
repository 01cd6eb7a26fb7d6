//! Language-aware code highlighting for rendered markdown.
//!
//! Highlighting is driven by a [`HighlighterRegistry`]: a map from language
//! identifier to a [`Highlight`] definition, plus a plain-text fallback that
//! only escapes. Looking up a language that was never registered is not an
//! error; it resolves to the fallback.

mod syntax;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::trace;

pub use syntax::{SyntectLanguage, TOKEN_CLASS_PREFIX, default_syntax_set};

static DEFAULT_REGISTRY: Lazy<HighlighterRegistry> =
    Lazy::new(HighlighterRegistry::with_default_syntaxes);

/// A highlighting definition for one language.
pub trait Highlight: Send + Sync {
    /// Returns `code` as HTML. Every character of `code` must appear in the
    /// output, in order, and all text must be escaped.
    fn highlight(&self, code: &str) -> String;
}

/// Fallback definition: escapes `code` and adds no markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Highlight for PlainText {
    fn highlight(&self, code: &str) -> String {
        escape_html(code)
    }
}

#[derive(Clone)]
pub struct HighlighterRegistry {
    languages: HashMap<String, Arc<dyn Highlight>>,
    fallback: Arc<dyn Highlight>,
}

impl HighlighterRegistry {
    /// A registry with no languages; every lookup resolves to [`PlainText`].
    pub fn plain() -> Self {
        Self {
            languages: HashMap::new(),
            fallback: Arc::new(PlainText),
        }
    }

    /// A registry covering syntect's bundled syntaxes.
    ///
    /// Each syntax is registered under its lowercased name and then under each
    /// file extension, so an extension shadows a name when both collide.
    pub fn with_default_syntaxes() -> Self {
        let syntax_set = default_syntax_set();
        let mut registry = Self::plain();
        let syntaxes = syntax_set
            .syntaxes()
            .iter()
            .enumerate()
            .filter(|(_, syntax)| syntax.name != "Plain Text");

        for (index, syntax) in syntaxes.clone() {
            registry.register(
                &syntax.name,
                SyntectLanguage::new(Arc::clone(&syntax_set), index),
            );
        }
        for (index, syntax) in syntaxes {
            for extension in &syntax.file_extensions {
                registry.register(
                    extension,
                    SyntectLanguage::new(Arc::clone(&syntax_set), index),
                );
            }
        }
        registry
    }

    /// Registers `definition` for `language`, replacing any previous entry.
    pub fn register<H: Highlight + 'static>(&mut self, language: &str, definition: H) {
        self.languages
            .insert(normalize_language(language), Arc::new(definition));
    }

    pub fn with_language<H: Highlight + 'static>(mut self, language: &str, definition: H) -> Self {
        self.register(language, definition);
        self
    }

    /// Whether `language` has its own definition (i.e. does not fall back).
    pub fn contains(&self, language: &str) -> bool {
        self.languages.contains_key(&normalize_language(language))
    }

    pub fn lookup(&self, language: Option<&str>) -> &dyn Highlight {
        language
            .map(normalize_language)
            .and_then(|key| self.languages.get(&key))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    pub fn highlight(&self, code: &str, language: Option<&str>) -> String {
        trace!(language, len = code.len(), "highlighting code block");
        self.lookup(language).highlight(code)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for HighlighterRegistry {
    fn default() -> Self {
        Self::plain()
    }
}

impl fmt::Debug for HighlighterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlighterRegistry")
            .field("languages", &self.languages.len())
            .finish_non_exhaustive()
    }
}

/// The shared registry built from syntect's bundled syntaxes.
pub fn default_registry() -> &'static HighlighterRegistry {
    &DEFAULT_REGISTRY
}

/// Highlights `code` with the default registry.
pub fn highlight(code: &str, language: Option<&str>) -> String {
    DEFAULT_REGISTRY.highlight(code, language)
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn normalize_language(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{Highlight, HighlighterRegistry, PlainText, escape_html, highlight};
    use pretty_assertions::assert_eq;

    struct Upper;

    impl Highlight for Upper {
        fn highlight(&self, code: &str) -> String {
            escape_html(&code.to_uppercase())
        }
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html("<a href=\"x\">&</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn unknown_language_is_escaped_only() {
        let code = "if a < b && c > d { \"x\" }";
        assert_eq!(highlight(code, Some("unknown-lang")), escape_html(code));
    }

    #[test]
    fn missing_language_is_escaped_only() {
        let code = "<script>alert(1)</script>";
        assert_eq!(highlight(code, None), escape_html(code));
    }

    #[test]
    fn plain_registry_always_falls_back() {
        let registry = HighlighterRegistry::plain();
        assert!(registry.is_empty());
        assert_eq!(registry.highlight("x<y", Some("rust")), "x&lt;y");
        assert_eq!(PlainText.highlight("x<y"), "x&lt;y");
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        let registry = HighlighterRegistry::plain().with_language("Shout", Upper);
        assert!(registry.contains("shout"));
        assert_eq!(registry.highlight("hey", Some(" SHOUT ")), "HEY");
        assert_eq!(registry.highlight("hey", Some("whisper")), "hey");
    }

    #[test]
    fn default_registry_knows_common_languages() {
        let registry = super::default_registry();
        for language in ["python", "py", "rust", "rs", "js", "html", "c"] {
            assert!(registry.contains(language), "missing {}", language);
        }
        assert!(!registry.contains("plain text"));
    }
}
