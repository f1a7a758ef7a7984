//! Page-level auto decoration.
//!
//! Scrollable sections that actually overflow get a bottom blur plus a top
//! blur that only shows once the section has been scrolled; the page itself
//! gets a fixed header blur that appears after the window scrolls past
//! [`PAGE_SCROLLED_PX`]. The overlays stay registered with the engine until
//! their host leaves the page; the handles are not kept.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Document, Event, HtmlElement, Window, window};

use crate::config::{BlurOptions, ConfigBuilder, Dimension, Target};
use crate::engine::GradualBlur;

pub const SCROLLABLE_SELECTOR: &str =
    ".scrollable-section, .about-preview-content, .featured-carousel";
const SECTION_SCROLLED_PX: i32 = 10;
pub const PAGE_SCROLLED_PX: f64 = 100.0;

/// Options for the blur pair inside a scrollable section.
pub fn section_options(preset: &str) -> BlurOptions {
    BlurOptions {
        preset: Some(preset.to_string()),
        target: Some(Target::Parent),
        height: Some(Dimension::Rem(4.0)),
        strength: Some(1.5),
        opacity: Some(0.9),
        ..Default::default()
    }
}

/// Options for the fixed page-header blur.
pub fn page_header_options() -> BlurOptions {
    BlurOptions {
        preset: Some("page-header".to_string()),
        target: Some(Target::Page),
        height: Some(Dimension::Rem(6.0)),
        strength: Some(2.0),
        opacity: Some(0.8),
        ..Default::default()
    }
}

fn build(options: BlurOptions) -> Result<GradualBlur, JsValue> {
    let config = ConfigBuilder::new().overrides(options).build();
    GradualBlur::new(config, None, None)
}

/// Decorates the page now, or once the DOM is parsed if it is still loading.
#[wasm_bindgen(js_name = initGradualBlur)]
pub fn init_gradual_blur() -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    if doc.ready_state() == "loading" {
        let loading = doc.clone();
        let deferred = Closure::once_into_js(move || {
            if let Err(err) = decorate_page(&win, &doc) {
                log::warn!("gradual blur auto-init failed: {err:?}");
            }
        });
        // freed by wasm-bindgen after its single DOMContentLoaded call
        loading.add_event_listener_with_callback("DOMContentLoaded", deferred.unchecked_ref())?;
        return Ok(());
    }
    decorate_page(&win, &doc)
}

fn decorate_page(win: &Window, doc: &Document) -> Result<(), JsValue> {
    let sections = doc.query_selector_all(SCROLLABLE_SELECTOR)?;
    let mut decorated = 0;
    for i in 0..sections.length() {
        let Some(section) = sections.get(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
            continue;
        };
        if section.scroll_height() <= section.client_height() {
            continue;
        }
        decorate_section(&section)?;
        decorated += 1;
    }
    decorate_page_header(win, doc)?;
    log::info!("gradual blur: decorated {decorated} scrollable sections and the page header");
    Ok(())
}

fn decorate_section(section: &HtmlElement) -> Result<(), JsValue> {
    let _ = section.style().set_property("position", "relative");

    let bottom = build(section_options("bottom"))?;
    bottom.mount(section)?;

    let top = build(section_options("top"))?;
    top.mount(section)?;
    let handle = top.handle();

    let scrolled = section.clone();
    let sync = move || handle.set_visible(scrolled.scroll_top() > SECTION_SCROLLED_PX);
    sync();
    let closure = Closure::wrap(Box::new(move |_evt: Event| sync()) as Box<dyn FnMut(_)>);
    section.add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn decorate_page_header(win: &Window, doc: &Document) -> Result<(), JsValue> {
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
    let blur = build(page_header_options())?;
    blur.mount(&body)?;
    let handle = blur.handle();

    let scroll_win = win.clone();
    // Visibility changes are edge-triggered inside the engine, so reporting on
    // every scroll event only touches the DOM when the threshold is crossed.
    let sync = move || {
        let y = scroll_win.scroll_y().unwrap_or(0.0);
        handle.set_visible(y > PAGE_SCROLLED_PX);
    };
    sync();
    let closure = Closure::wrap(Box::new(move |_evt: Event| sync()) as Box<dyn FnMut(_)>);
    let options = AddEventListenerOptions::new();
    options.set_passive(true);
    win.add_event_listener_with_callback_and_add_event_listener_options(
        "scroll",
        closure.as_ref().unchecked_ref(),
        &options,
    )?;
    closure.forget();
    Ok(())
}
