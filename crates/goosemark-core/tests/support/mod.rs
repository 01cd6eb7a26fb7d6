#![allow(dead_code)]

use lol_html::{RewriteStrSettings, element, rewrite_str};

/// An element seen in serialized HTML, with raw attribute values.
#[derive(Debug)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

pub fn elements(html: &str) -> Vec<Element> {
    let mut found = Vec::new();
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                found.push(Element {
                    name: el.tag_name(),
                    attributes: el
                        .attributes()
                        .iter()
                        .map(|attribute| (attribute.name(), attribute.value()))
                        .collect(),
                });
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
    .expect("rewrite html");
    found
}

/// Removes every tag from `html`, keeping text (still escaped).
pub fn strip_tags(html: &str) -> String {
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
