use serde::Deserialize;
use wasm_bindgen::prelude::*;

use goosemark_core::{RenderOptions, Renderer};

/// Options accepted from JavaScript. Every field is optional; an empty
/// `tableClass` leaves tables without a class.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsRenderOptions {
    highlight: Option<bool>,
    gfm: Option<bool>,
    table_class: Option<String>,
}

impl JsRenderOptions {
    fn into_options(self) -> RenderOptions {
        let mut out = RenderOptions::default();
        if let Some(highlight) = self.highlight {
            out.highlight = highlight;
        }
        if let Some(gfm) = self.gfm {
            out.gfm = gfm;
        }
        if let Some(table_class) = self.table_class {
            out.table_class = Some(table_class).filter(|class| !class.trim().is_empty());
        }
        out
    }
}

#[wasm_bindgen]
pub fn render_html(source: &str) -> String {
    goosemark_core::render(source)
}

#[wasm_bindgen]
pub fn render_html_with_options(source: &str, options: JsValue) -> Result<String, JsValue> {
    let options = options_from_js(options)?;
    Ok(Renderer::new(options).render(source))
}

fn options_from_js(value: JsValue) -> Result<RenderOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(RenderOptions::default());
    }
    let parsed: JsRenderOptions =
        serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(parsed.into_options())
}
