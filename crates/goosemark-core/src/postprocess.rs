use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::warn;

/// Class added to every table, matching the page stylesheet.
pub const DEFAULT_TABLE_CLASS: &str = "table";

/// Adds `class_name` to the class list of every `<table>` in `html`.
///
/// Existing classes are kept; a table that already carries `class_name` is
/// left as is. Input that cannot be rewritten is returned unchanged.
pub fn add_table_class(html: &str, class_name: &str) -> String {
    let class_name = class_name.trim();
    if class_name.is_empty() {
        return html.to_string();
    }

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("table", |el| {
                let classes = match el.get_attribute("class") {
                    Some(existing) => {
                        if existing.split_ascii_whitespace().any(|class| class == class_name) {
                            return Ok(());
                        }
                        let existing = existing.trim();
                        if existing.is_empty() {
                            class_name.to_string()
                        } else {
                            format!("{existing} {class_name}")
                        }
                    }
                    None => class_name.to_string(),
                };
                el.set_attribute("class", &classes)?;
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    );
    match result {
        Ok(out) => out,
        Err(err) => {
            warn!(error = %err, "failed to add table class");
            html.to_string()
        }
    }
}
