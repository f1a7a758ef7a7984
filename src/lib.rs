//! Gradual blur core crate.
//!
//! Stacks of masked `backdrop-filter` panels that fade a container edge (or
//! the viewport edge) into a smooth directional blur. Geometry, presets and
//! reactive state are plain Rust (`config`, `layout`, `state`); `engine`
//! applies them to the DOM and `auto` decorates a page in one call.

use wasm_bindgen::prelude::*;
use web_sys::Element;

pub mod auto;
pub mod config;
pub mod engine;
pub mod layout;
pub mod state;
pub mod styles;

pub use config::{BlurConfig, BlurOptions, ConfigBuilder, ConfigError, Curve, Dimension, Edge};
pub use engine::GradualBlur;
pub use layout::{LayerPlan, MaskProfile};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let level = if cfg!(debug_assertions) { log::Level::Debug } else { log::Level::Info };
    wasm_logger::init(wasm_logger::Config::new(level));

    // The shared stylesheet goes in as soon as the module loads, like a <link>.
    if web_sys::window().and_then(|w| w.document()).is_some() {
        if let Err(err) = styles::inject_gradual_blur_styles() {
            log::warn!("gradual blur styles not installed: {err:?}");
        }
    }
}

// -----------------------------------------------------------------------------
// JS entrypoints
// -----------------------------------------------------------------------------

/// Builds a detached overlay from page options (an object, a JSON string, or
/// nothing for the defaults). The caller attaches `element()` or calls `mount`.
#[wasm_bindgen(js_name = createGradualBlur)]
pub fn create_gradual_blur(
    options: JsValue,
    target_element: Option<Element>,
    on_animation_complete: Option<js_sys::Function>,
) -> Result<GradualBlur, JsValue> {
    let config = BlurConfig::from_json(&options_json(&options)?).unwrap_or_else(|err| {
        log::warn!("{err}; using default blur options");
        BlurConfig::default()
    });
    GradualBlur::new(config, target_element, on_animation_complete)
}

fn options_json(options: &JsValue) -> Result<String, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok("{}".to_string());
    }
    if let Some(json) = options.as_string() {
        return Ok(json);
    }
    // Functions and elements in the object are dropped by JSON.stringify;
    // they arrive through the dedicated parameters instead.
    Ok(js_sys::JSON::stringify(options)?.into())
}

#[wasm_bindgen(js_name = presetNames)]
pub fn preset_names() -> js_sys::Array {
    config::PRESET_NAMES
        .iter()
        .map(|name| JsValue::from_str(name))
        .collect()
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
