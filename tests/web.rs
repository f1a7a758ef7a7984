// Browser tests: run with `wasm-pack test --headless --firefox` (or chrome).
#![cfg(target_arch = "wasm32")]

use gradual_blur::engine::live_count;
use gradual_blur::styles::{STYLE_ID, ensure_styles};
use gradual_blur::{BlurConfig, GradualBlur, MaskProfile};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{Event, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

/// A host pinned inside the viewport at `top` px.
fn host_at(top: i32) -> HtmlElement {
    let doc = document();
    let el: HtmlElement = doc.create_element("section").unwrap().dyn_into().unwrap();
    let s = el.style();
    s.set_property("position", "fixed").unwrap();
    s.set_property("top", &format!("{top}px")).unwrap();
    s.set_property("left", "0").unwrap();
    s.set_property("width", "300px").unwrap();
    s.set_property("height", "200px").unwrap();
    doc.body().unwrap().append_child(&el).unwrap();
    el
}

fn host() -> HtmlElement {
    host_at(0)
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn fire(target: &web_sys::EventTarget, event: &str) {
    target.dispatch_event(&Event::new(event).unwrap()).unwrap();
}

fn resize_window() {
    fire(web_sys::window().unwrap().as_ref(), "resize");
}

fn style_of(el: &HtmlElement, property: &str) -> String {
    el.style().get_property_value(property).unwrap()
}

/// Completion callback bumping `window[name]`.
fn counter(name: &str) -> js_sys::Function {
    js_sys::Function::new_no_args(&format!("window.{name} = (window.{name} || 0) + 1;"))
}

fn count(name: &str) -> f64 {
    js_sys::Reflect::get(&web_sys::window().unwrap(), &JsValue::from_str(name))
        .unwrap()
        .as_f64()
        .unwrap_or(0.0)
}

fn panels(blur: &GradualBlur) -> Vec<HtmlElement> {
    panels_of(&blur.element())
}

fn panels_of(root: &HtmlElement) -> Vec<HtmlElement> {
    let inner = root.first_element_child().unwrap();
    let kids = inner.children();
    (0..kids.length())
        .map(|i| kids.item(i).unwrap().dyn_into().unwrap())
        .collect()
}

fn panel_filter(panel: &HtmlElement) -> String {
    let standard = style_of(panel, "backdrop-filter");
    if standard.is_empty() {
        style_of(panel, "-webkit-backdrop-filter")
    } else {
        standard
    }
}

#[wasm_bindgen_test]
fn builds_detached_stack() {
    let config = BlurConfig::from_json(r#"{"divCount": 7, "position": "top"}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    let root = blur.element();
    assert!(!root.is_connected(), "factory must not insert");
    assert_eq!(root.class_name(), "gradual-blur gradual-blur-parent");
    assert_eq!(root.child_element_count(), 1);
    let panels = panels(&blur);
    assert_eq!(panels.len(), 7);
    assert_eq!(blur.layer_count(), 7);
    let first_mask = MaskProfile::for_layer(1, 7).mask_image(gradual_blur::Edge::Top);
    let mask = style_of(&panels[0], "mask-image");
    let webkit = style_of(&panels[0], "-webkit-mask-image");
    assert!(
        mask.contains("to top") || webkit.contains("to top"),
        "mask {mask:?} / {webkit:?} vs {first_mask:?}"
    );
    blur.destroy();
}

#[wasm_bindgen_test]
fn hover_recomputes_in_place() {
    let config = BlurConfig::from_json(r#"{"strength": 2, "hoverIntensity": 2}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    blur.mount(&host()).unwrap();
    let before = panels(&blur);
    let masks = blur.masks();

    fire(blur.element().as_ref(), "mouseenter");
    assert!(blur.is_hovered());
    assert_eq!(blur.current_strength(), 4.0);

    fire(blur.element().as_ref(), "mouseleave");
    assert!(!blur.is_hovered());
    assert_eq!(blur.current_strength(), 2.0);

    let after = panels(&blur);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert!(a.is_same_node(Some(b.as_ref())), "panels must not be recreated");
    }
    assert_eq!(blur.masks(), masks);
    blur.destroy();
}

#[wasm_bindgen_test]
fn manual_visibility_sets_opacity() {
    let config = BlurConfig::from_json(r#"{"opacity": 0.6}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    blur.mount(&host()).unwrap();
    blur.set_visible(false);
    assert_eq!(style_of(&blur.element(), "opacity"), "0");
    blur.set_visible(true);
    assert_eq!(style_of(&blur.element(), "opacity"), "0.6");
    blur.destroy();
}

#[wasm_bindgen_test]
fn hidden_overlay_lets_clicks_through() {
    let config = BlurConfig::from_json(r#"{"animated": "scroll", "hoverIntensity": 2}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    assert!(!blur.is_visible());
    assert_eq!(style_of(&blur.element(), "opacity"), "0");
    assert_eq!(style_of(&blur.element(), "pointer-events"), "none");
    blur.set_visible(true);
    assert_eq!(style_of(&blur.element(), "pointer-events"), "auto");
    blur.set_visible(false);
    assert_eq!(style_of(&blur.element(), "pointer-events"), "none");
    blur.destroy();
}

#[wasm_bindgen_test]
fn destroy_twice_is_a_noop() {
    let config = BlurConfig::from_json(r#"{"hoverIntensity": 1.5, "height": "80px"}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    let h = host();
    blur.mount(&h).unwrap();
    assert_eq!(h.child_element_count(), 1);
    blur.destroy();
    assert!(blur.is_destroyed());
    assert_eq!(h.child_element_count(), 0);
    blur.destroy();
    // listeners are gone: hover no longer changes anything
    fire(blur.element().as_ref(), "mouseenter");
    assert!(!blur.is_hovered());
}

#[wasm_bindgen_test]
fn dropping_the_handle_keeps_the_overlay() {
    let config = BlurConfig::from_json(r#"{"strength": 2, "hoverIntensity": 3}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    let h = host();
    h.append_child(&blur.element()).unwrap();
    let root = blur.element();
    let registered = live_count();
    drop(blur);

    assert!(root.is_connected());
    assert_eq!(h.child_element_count(), 1);
    assert_eq!(live_count(), registered);
    let layers = panels_of(&root);
    let first = &layers[0];
    let before = panel_filter(first);
    fire(root.as_ref(), "mouseenter");
    if !before.is_empty() {
        assert_ne!(panel_filter(first), before, "hover must still react");
    }
    h.remove();
}

#[wasm_bindgen_test]
fn overlay_of_removed_host_is_reaped() {
    let config = BlurConfig::from_json(r#"{"hoverIntensity": 2}"#).unwrap();
    let first = GradualBlur::new(config.clone(), None, None).unwrap();
    let h = host();
    first.mount(&h).unwrap();
    let root = first.element();
    drop(first);
    h.remove();

    let second = GradualBlur::new(config, None, None).unwrap();
    // torn down: container detached from its (removed) host
    assert_eq!(h.child_element_count(), 0);
    assert!(root.parent_element().is_none());
    second.destroy();
}

#[wasm_bindgen_test]
fn band_wins_over_user_style() {
    let config =
        BlurConfig::from_json(r#"{"height": "80px", "style": {"height": "10px", "marginTop": "3px"}}"#)
            .unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    let root = blur.element();
    assert_eq!(style_of(&root, "height"), "80px");
    assert_eq!(style_of(&root, "margin-top"), "3px");
    blur.destroy();
}

#[wasm_bindgen_test]
async fn resize_reapplies_band_after_debounce() {
    let config =
        BlurConfig::from_json(r#"{"height": "80px", "style": {"height": "10px"}}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    blur.mount(&host()).unwrap();
    let root = blur.element();
    root.style().set_property("height", "1px").unwrap();

    resize_window();
    resize_window();
    assert_eq!(style_of(&root, "height"), "1px", "debounced");
    sleep(250).await;
    assert_eq!(style_of(&root, "height"), "80px");
    blur.destroy();
}

#[wasm_bindgen_test]
async fn destroy_releases_resize_and_timers() {
    let config = BlurConfig::from_json(
        r#"{"height": "80px", "animated": "scroll", "duration": "50ms"}"#,
    )
    .unwrap();
    let blur = GradualBlur::new(config, None, Some(counter("__blurDestroyed"))).unwrap();
    let h = host();
    blur.mount(&h).unwrap();
    let root = blur.element();

    blur.set_visible(true);
    resize_window();
    blur.destroy();

    // put the node back by hand: nothing of the dead overlay may touch it
    h.append_child(&root).unwrap();
    root.style().set_property("height", "1px").unwrap();
    resize_window();
    sleep(250).await;
    assert_eq!(style_of(&root, "height"), "1px");
    assert_eq!(count("__blurDestroyed"), 0.0);
    h.remove();
}

#[wasm_bindgen_test]
async fn mount_observes_the_host() {
    let config = BlurConfig::from_json(r#"{"animated": "scroll", "opacity": 0.8}"#).unwrap();
    let blur = GradualBlur::new(config, None, None).unwrap();
    let h = host();
    blur.mount(&h).unwrap();
    assert!(!blur.is_visible());
    sleep(200).await;
    assert!(blur.is_visible(), "host is on screen");
    assert_eq!(style_of(&blur.element(), "opacity"), "0.8");
    blur.destroy();
    h.remove();
}

#[wasm_bindgen_test]
async fn explicit_target_is_observed_instead_of_host() {
    let reference = host();
    let offscreen = host_at(-5000);
    let config = BlurConfig::from_json(r#"{"animated": "scroll"}"#).unwrap();
    let blur = GradualBlur::new(config, Some(reference.clone().into()), None).unwrap();
    blur.mount(&offscreen).unwrap();
    sleep(200).await;
    assert!(blur.is_visible(), "visibility follows the explicit target");
    blur.destroy();
    reference.remove();
    offscreen.remove();
}

#[wasm_bindgen_test]
async fn completion_fires_after_duration() {
    let config =
        BlurConfig::from_json(r#"{"animated": "scroll", "duration": "60ms"}"#).unwrap();
    let blur = GradualBlur::new(config, None, Some(counter("__blurDone"))).unwrap();
    blur.set_visible(true);
    assert_eq!(count("__blurDone"), 0.0);
    sleep(200).await;
    assert_eq!(count("__blurDone"), 1.0);

    // hidden again before the timer runs: nothing fires
    blur.set_visible(false);
    blur.set_visible(true);
    blur.set_visible(false);
    sleep(200).await;
    assert_eq!(count("__blurDone"), 1.0);
    blur.destroy();
}

#[wasm_bindgen_test]
fn styles_register_once() {
    let doc = document();
    ensure_styles(&doc).unwrap();
    assert!(!ensure_styles(&doc).unwrap());
    assert!(doc.get_element_by_id(STYLE_ID).is_some());
}
