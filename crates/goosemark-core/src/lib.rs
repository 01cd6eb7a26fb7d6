//! Safe rendering of untrusted markdown.
//!
//! [`render`] turns markdown into HTML that can be inserted into a live page:
//! code blocks are highlighted through a [`CodeBlockHook`], the result is run
//! through a whitelist [`Sanitizer`], and tables get a styling class.
//!
//! ```
//! let html = goosemark_core::render("Hello <script>alert(1)</script>**world**");
//! assert_eq!(html, "<p>Hello <strong>world</strong></p>\n");
//! ```

mod markdown;
mod pipeline;
mod postprocess;
mod sanitize;

pub use markdown::{CodeBlockHook, LANGUAGE_CLASS_PREFIX, MarkdownParser};
pub use pipeline::{RenderOptions, Renderer, render};
pub use postprocess::{DEFAULT_TABLE_CLASS, add_table_class};
pub use sanitize::{
    AttributeExemption, ClassPrefixExemption, PolicyError, SanitizePolicy, Sanitizer,
    StripPolicy, WhitelistTable, default_sanitizer, sanitize,
};

pub use goosemark_highlight::{HighlighterRegistry, TOKEN_CLASS_PREFIX, highlight};
