// Shared stylesheet for all blur overlays, registered once per document.
use wasm_bindgen::prelude::*;
use web_sys::Document;

pub const STYLE_ID: &str = "gradual-blur-styles";

const STYLESHEET: &str = r#"
.gradual-blur-inner {
  position: relative;
  width: 100%;
  height: 100%;
  pointer-events: none;
}

.gradual-blur-inner > div {
  -webkit-backdrop-filter: inherit;
  backdrop-filter: inherit;
}

.gradual-blur {
  isolation: isolate;
  pointer-events: none;
  transition: opacity 0.3s ease-out;
}

.gradual-blur-parent {
  overflow: hidden;
}

.gradual-blur-page {
  pointer-events: none;
}

@supports not (backdrop-filter: blur(1px)) {
  .gradual-blur-inner > div {
    background: rgba(0, 0, 0, 0.3);
    opacity: 0.5;
  }
}

.gradual-blur-fixed {
  position: fixed !important;
  top: 0;
  left: 0;
  right: 0;
  bottom: 0;
  pointer-events: none;
  z-index: 1000;
}
"#;

/// Inserts the stylesheet into `<head>` unless an element with [`STYLE_ID`]
/// already exists. Returns whether it was inserted by this call.
pub fn ensure_styles(doc: &Document) -> Result<bool, JsValue> {
    if doc.get_element_by_id(STYLE_ID).is_some() {
        return Ok(false);
    }
    let head = doc.head().ok_or_else(|| JsValue::from_str("no head"))?;
    let style = doc.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(STYLESHEET));
    head.append_child(&style)?;
    log::debug!("installed #{STYLE_ID}");
    Ok(true)
}

/// JS entry point. Fails only when there is no document to install into.
#[wasm_bindgen(js_name = injectGradualBlurStyles)]
pub fn inject_gradual_blur_styles() -> Result<(), JsValue> {
    let doc = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    ensure_styles(&doc).map(|_| ())
}
