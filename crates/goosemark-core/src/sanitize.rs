//! Whitelist-based HTML sanitization.
//!
//! A [`SanitizePolicy`] names the tags and attributes that may survive, the
//! tags whose whole subtree is dropped, and a list of [`AttributeExemption`]s
//! that can rescue an attribute the whitelist does not allow. The walk itself
//! is ammonia's; the policy is translated into an [`ammonia::Builder`] once.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ammonia::Builder;
use goosemark_highlight::TOKEN_CLASS_PREFIX;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::markdown::LANGUAGE_CLASS_PREFIX;

const MAX_CLEAN_PASSES: usize = 8;

static DEFAULT_SANITIZER: Lazy<Arc<Sanitizer>> = Lazy::new(|| {
    Arc::new(
        Sanitizer::new(SanitizePolicy::default()).expect("default sanitize policy is consistent"),
    )
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("`{0}` is whitelisted and also in the strip policy")]
    StrippedTagWhitelisted(&'static str),
    #[error("exemption for `{tag}`/`{attribute}` targets a tag in the strip policy")]
    ExemptionOnStrippedTag {
        tag: &'static str,
        attribute: &'static str,
    },
}

/// Tags that may appear in sanitized output, with the attributes each may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistTable {
    tags: HashMap<&'static str, HashSet<&'static str>>,
    global: HashSet<&'static str>,
}

impl WhitelistTable {
    /// A table that permits nothing.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
            global: HashSet::new(),
        }
    }

    pub fn allow_tags(mut self, tags: &[&'static str]) -> Self {
        for tag in tags {
            self.tags.entry(tag).or_default();
        }
        self
    }

    /// Permits `tag` together with `attributes` on it.
    pub fn allow_attributes(mut self, tag: &'static str, attributes: &[&'static str]) -> Self {
        self.tags
            .entry(tag)
            .or_default()
            .extend(attributes.iter().copied());
        self
    }

    /// Permits `attributes` on every whitelisted tag.
    pub fn allow_global(mut self, attributes: &[&'static str]) -> Self {
        self.global.extend(attributes.iter().copied());
        self
    }

    pub fn is_tag_allowed(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn is_attribute_allowed(&self, tag: &str, attribute: &str) -> bool {
        match self.tags.get(tag) {
            Some(attributes) => attributes.contains(attribute) || self.global.contains(attribute),
            None => false,
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tags.keys().copied()
    }

    pub fn global(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.global.iter().copied()
    }
}

impl Default for WhitelistTable {
    fn default() -> Self {
        Self::empty()
            .allow_tags(&[
                "b",
                "blockquote",
                "br",
                "code",
                "dd",
                "del",
                "details",
                "div",
                "dl",
                "dt",
                "em",
                "h1",
                "h2",
                "h3",
                "h4",
                "h5",
                "h6",
                "hr",
                "i",
                "ins",
                "kbd",
                "li",
                "p",
                "pre",
                "s",
                "span",
                "strong",
                "sub",
                "summary",
                "sup",
                "u",
                "ul",
                // Tables
                "table",
                "caption",
                "colgroup",
                "col",
                "thead",
                "tbody",
                "tfoot",
                "tr",
            ])
            .allow_attributes("a", &["href", "title"])
            .allow_attributes("abbr", &["title"])
            .allow_attributes("img", &["alt", "src", "title", "width", "height"])
            .allow_attributes("ol", &["start"])
            .allow_attributes("colgroup", &["span"])
            .allow_attributes("col", &["span"])
            // Column alignment; `style` is narrowed to `text-align` by the policy.
            .allow_attributes("th", &["style"])
            .allow_attributes("td", &["style"])
            .allow_global(&["title", "lang"])
    }
}

/// Tags removed together with everything inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripPolicy {
    tags: HashSet<&'static str>,
}

impl StripPolicy {
    pub fn with_tags(tags: &[&'static str]) -> Self {
        Self {
            tags: tags.iter().copied().collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tags.iter().copied()
    }
}

impl Default for StripPolicy {
    fn default() -> Self {
        Self::with_tags(&["script", "style"])
    }
}

/// Rescues one attribute the whitelist would otherwise drop.
///
/// An exemption is scoped to a single `(tag, attribute)` pair and decides per
/// occurrence from the attribute value. A rescued value is re-escaped on output.
pub trait AttributeExemption: Send + Sync + fmt::Debug {
    fn tag(&self) -> &'static str;

    fn attribute(&self) -> &'static str;

    fn keep(&self, tag: &str, attribute: &str, value: &str) -> bool;
}

/// Keeps `class` on `tag` when every class token carries `prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassPrefixExemption {
    tag: &'static str,
    prefix: &'static str,
}

impl ClassPrefixExemption {
    pub const fn new(tag: &'static str, prefix: &'static str) -> Self {
        Self { tag, prefix }
    }

    /// `class="language-…"` on `<code>`, as set for fenced code blocks.
    pub const fn language_class() -> Self {
        Self::new("code", LANGUAGE_CLASS_PREFIX)
    }

    /// `class="hl-…"` on `<span>`, as set by the highlighter.
    pub const fn token_class() -> Self {
        Self::new("span", TOKEN_CLASS_PREFIX)
    }
}

impl AttributeExemption for ClassPrefixExemption {
    fn tag(&self) -> &'static str {
        self.tag
    }

    fn attribute(&self) -> &'static str {
        "class"
    }

    fn keep(&self, tag: &str, attribute: &str, value: &str) -> bool {
        if tag != self.tag || attribute != "class" {
            return false;
        }
        let mut classes = value.split_ascii_whitespace().peekable();
        classes.peek().is_some()
            && classes.all(|class| class.len() > self.prefix.len() && class.starts_with(self.prefix))
    }
}

#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    whitelist: WhitelistTable,
    strip: StripPolicy,
    exemptions: Vec<Arc<dyn AttributeExemption>>,
    url_schemes: HashSet<&'static str>,
    style_properties: HashSet<&'static str>,
}

impl SanitizePolicy {
    pub fn new(whitelist: WhitelistTable, strip: StripPolicy) -> Self {
        Self {
            whitelist,
            strip,
            exemptions: Vec::new(),
            url_schemes: ["http", "https", "mailto"].iter().copied().collect(),
            style_properties: ["text-align"].iter().copied().collect(),
        }
    }

    pub fn with_exemption<E: AttributeExemption + 'static>(mut self, exemption: E) -> Self {
        self.exemptions.push(Arc::new(exemption));
        self
    }

    pub fn with_url_schemes(mut self, schemes: &[&'static str]) -> Self {
        self.url_schemes = schemes.iter().copied().collect();
        self
    }

    /// CSS properties kept inside a whitelisted `style` attribute.
    pub fn with_style_properties(mut self, properties: &[&'static str]) -> Self {
        self.style_properties = properties.iter().copied().collect();
        self
    }

    pub fn whitelist(&self) -> &WhitelistTable {
        &self.whitelist
    }

    pub fn strip(&self) -> &StripPolicy {
        &self.strip
    }

    pub fn exemptions(&self) -> &[Arc<dyn AttributeExemption>] {
        &self.exemptions
    }

    /// Whether an attribute occurrence may appear in sanitized output.
    pub fn permits(&self, tag: &str, attribute: &str, value: &str) -> bool {
        self.whitelist.is_attribute_allowed(tag, attribute)
            || self.exemptions.iter().any(|exemption| {
                exemption.tag() == tag
                    && exemption.attribute() == attribute
                    && exemption.keep(tag, attribute, value)
            })
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if let Some(tag) = self.strip.tags().find(|tag| self.whitelist.is_tag_allowed(tag)) {
            return Err(PolicyError::StrippedTagWhitelisted(tag));
        }
        if let Some(exemption) = self
            .exemptions
            .iter()
            .find(|exemption| self.strip.contains(exemption.tag()))
        {
            return Err(PolicyError::ExemptionOnStrippedTag {
                tag: exemption.tag(),
                attribute: exemption.attribute(),
            });
        }
        Ok(())
    }

    fn filter_attribute<'v>(
        &self,
        element: &str,
        attribute: &str,
        value: &'v str,
    ) -> Option<Cow<'v, str>> {
        if self.permits(element, attribute, value) {
            Some(Cow::Borrowed(value))
        } else {
            debug!(element, attribute, "dropping attribute");
            None
        }
    }
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::new(WhitelistTable::default(), StripPolicy::default())
            .with_exemption(ClassPrefixExemption::language_class())
            .with_exemption(ClassPrefixExemption::token_class())
    }
}

/// A [`SanitizePolicy`] compiled into an ammonia builder.
pub struct Sanitizer {
    policy: Arc<SanitizePolicy>,
    builder: Builder<'static>,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        let policy = Arc::new(policy);

        let mut tag_attributes: HashMap<&'static str, HashSet<&'static str>> = policy
            .whitelist
            .tags
            .iter()
            .map(|(tag, attributes)| (*tag, attributes.clone()))
            .collect();
        // Exempted attributes must get past ammonia's whitelist to reach the filter.
        for exemption in &policy.exemptions {
            tag_attributes
                .entry(exemption.tag())
                .or_default()
                .insert(exemption.attribute());
        }

        let filter_policy = Arc::clone(&policy);
        let mut builder = Builder::default();
        builder
            .tags(policy.whitelist.tags().collect())
            .generic_attributes(policy.whitelist.global().collect())
            .tag_attributes(tag_attributes)
            .clean_content_tags(policy.strip.tags().collect())
            .url_schemes(policy.url_schemes.clone())
            .filter_style_properties(policy.style_properties.clone())
            .link_rel(None)
            .strip_comments(true)
            .attribute_filter(move |element, attribute, value| {
                filter_policy.filter_attribute(element, attribute, value)
            });

        Ok(Self { policy, builder })
    }

    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// Sanitizes `html`. The result is a fixed point: cleaning it again
    /// returns it unchanged.
    pub fn clean(&self, html: &str) -> String {
        let mut current = self.builder.clean(html).to_string();
        // Unwrapping a dropped element can leave markup the HTML parser
        // restructures on the next parse (text directly inside `<table>`,
        // a block inside `<p>`), so reparse until the output is stable.
        for _ in 1..MAX_CLEAN_PASSES {
            let next = self.builder.clean(&current).to_string();
            if next == current {
                return current;
            }
            current = next;
        }
        warn!(passes = MAX_CLEAN_PASSES, "sanitized html did not settle");
        current
    }
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// The shared sanitizer for [`SanitizePolicy::default`].
pub fn default_sanitizer() -> Arc<Sanitizer> {
    Arc::clone(&DEFAULT_SANITIZER)
}

/// Sanitizes `html` with the default policy.
pub fn sanitize(html: &str) -> String {
    DEFAULT_SANITIZER.clean(html)
}
