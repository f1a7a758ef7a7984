//! DOM applicator for the blur stack.
//!
//! [`GradualBlur`] builds a detached container holding one inner wrapper and
//! `layer_count` masked panels, then keeps it in sync with three signals:
//! pointer hover (panel blur strength), scroll visibility (container opacity)
//! and a debounced viewport resize (band size). Every listener, observer and
//! timer it acquires is released by [`GradualBlur::destroy`].
//!
//! Live overlays sit in a per-thread registry, so dropping the handle (or
//! letting JS collect it) leaves the overlay working. An overlay whose host
//! has been removed from the page is torn down when the next one is built.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Element, Event, EventTarget, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, window,
};

use crate::config::{BlurConfig, DESKTOP_MAX_WIDTH};
use crate::layout::{self, LayerPlan, MaskProfile, StyleDecl};
use crate::state::{BlurState, CompletionTicket};

const RESIZE_DEBOUNCE_MS: i32 = 100;
/// Fraction of the reference element that must be on screen to count as visible.
const SCROLL_THRESHOLD: f64 = 0.1;

type EventCallback = Closure<dyn FnMut(Event)>;
type SharedEngine = Rc<RefCell<Engine>>;

thread_local! {
    static LIVE_BLURS: RefCell<Vec<SharedEngine>> = const { RefCell::new(Vec::new()) };
}

fn register(engine: &SharedEngine) {
    LIVE_BLURS.with(|live| live.borrow_mut().push(engine.clone()));
}

fn unregister(engine: &SharedEngine) {
    LIVE_BLURS.with(|live| live.borrow_mut().retain(|e| !Rc::ptr_eq(e, engine)));
}

/// Tears down overlays that were attached once and have since left the page.
fn reap_detached() {
    let orphans: Vec<SharedEngine> = LIVE_BLURS.with(|live| {
        let mut live = live.borrow_mut();
        let (orphans, kept): (Vec<_>, Vec<_>) = live.drain(..).partition(|engine| {
            engine
                .try_borrow_mut()
                .is_ok_and(|mut eng| eng.is_orphaned())
        });
        *live = kept;
        orphans
    });
    for engine in orphans {
        if let Ok(mut eng) = engine.try_borrow_mut() {
            eng.teardown();
        }
    }
}

/// Number of overlays currently registered on this thread.
pub fn live_count() -> usize {
    LIVE_BLURS.with(|live| live.borrow().len())
}

// --- Registrations -----------------------------------------------------------

/// An event listener together with the closure backing it.
struct EventBinding {
    target: EventTarget,
    event: &'static str,
    callback: EventCallback,
}

impl EventBinding {
    fn listen(
        target: &EventTarget,
        event: &'static str,
        callback: EventCallback,
    ) -> Result<Self, JsValue> {
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    fn release(self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// A `setTimeout` slot. The closure is created once and handed to every
/// `start`, so restarting the timer allocates nothing.
struct Timer {
    callback: Closure<dyn FnMut()>,
    handle: Option<i32>,
}

impl Timer {
    fn new(callback: impl FnMut() + 'static) -> Self {
        Self {
            callback: Closure::wrap(Box::new(callback) as Box<dyn FnMut()>),
            handle: None,
        }
    }

    fn start(&mut self, delay_ms: i32) {
        self.cancel();
        let Some(win) = window() else {
            return;
        };
        match win.set_timeout_with_callback_and_timeout_and_arguments_0(
            self.callback.as_ref().unchecked_ref(),
            delay_ms,
        ) {
            Ok(id) => self.handle = Some(id),
            Err(err) => log::warn!("could not start blur timer: {err:?}"),
        }
    }

    fn cancel(&mut self) {
        if let Some(id) = self.handle.take() {
            if let Some(win) = window() {
                win.clear_timeout_with_handle(id);
            }
        }
    }

    fn fired(&mut self) {
        self.handle = None;
    }
}

struct ScrollWatch {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

// --- Engine ------------------------------------------------------------------

pub(crate) struct Engine {
    config: BlurConfig,
    plan: LayerPlan,
    state: BlurState,
    container: HtmlElement,
    panels: Vec<HtmlElement>,
    backdrop_supported: bool,
    /// Explicit element whose visibility drives scroll activation.
    reference: Option<Element>,
    /// Set once the container has been seen in the document.
    was_attached: bool,
    bindings: Vec<EventBinding>,
    scroll_watch: Option<ScrollWatch>,
    resize_timer: Timer,
    completion_timer: Timer,
    pending_ticket: Option<CompletionTicket>,
    on_complete: Option<js_sys::Function>,
}

impl Engine {
    fn apply_strength(&self, strength: f64) {
        if !self.backdrop_supported {
            return;
        }
        for (panel, filter) in self.panels.iter().zip(self.plan.blur_filters(strength)) {
            let s = panel.style();
            let _ = s.set_property("backdrop-filter", &filter);
            let _ = s.set_property("-webkit-backdrop-filter", &filter);
        }
    }

    /// Writes the edge band. Always last, so it wins over user `style`.
    fn write_band(&self) {
        apply_styles(
            &self.container,
            &layout::band_declarations(&self.config, viewport_width()),
        );
    }

    fn apply_band(&self) {
        if self.state.is_torn_down() || !self.container.is_connected() {
            return;
        }
        self.write_band();
    }

    fn is_orphaned(&mut self) -> bool {
        if self.state.is_torn_down() {
            return true;
        }
        if self.container.is_connected() {
            self.was_attached = true;
            return false;
        }
        self.was_attached
    }

    fn teardown(&mut self) -> bool {
        if !self.state.teardown() {
            return false;
        }
        for binding in self.bindings.drain(..) {
            binding.release();
        }
        if let Some(watch) = self.scroll_watch.take() {
            watch.observer.disconnect();
        }
        self.resize_timer.cancel();
        self.completion_timer.cancel();
        self.pending_ticket = None;
        self.container.remove();
        log::debug!("gradual blur torn down ({} panels)", self.panels.len());
        true
    }
}

fn apply_styles(el: &HtmlElement, decls: &[StyleDecl]) {
    let s = el.style();
    for (property, value) in decls {
        let _ = s.set_property(property, value);
    }
}

fn viewport_width() -> f64 {
    window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(DESKTOP_MAX_WIDTH)
}

fn backdrop_filter_supported() -> bool {
    ["backdrop-filter", "-webkit-backdrop-filter"]
        .iter()
        .any(|property| web_sys::css::supports_with_value(property, "blur(1px)").unwrap_or(false))
}

fn create_div(doc: &web_sys::Document) -> Result<HtmlElement, JsValue> {
    Ok(doc.create_element("div")?.dyn_into()?)
}

/// Visibility report from the observer (`observed`) or from the host.
fn update_visibility(engine: &SharedEngine, visible: bool, observed: bool) {
    let Ok(mut eng) = engine.try_borrow_mut() else {
        return;
    };
    // Observer callbacks for a container that left the page are inert.
    if observed && !eng.container.is_connected() {
        return;
    }
    let Some(change) = eng.state.set_visible(visible) else {
        return;
    };
    apply_styles(
        &eng.container,
        &layout::visibility_declarations(&eng.config, visible),
    );
    eng.completion_timer.cancel();
    eng.pending_ticket = None;
    if let Some((ticket, delay_ms)) = change.completion {
        eng.pending_ticket = Some(ticket);
        eng.completion_timer.start(delay_ms.round() as i32);
    }
}

fn finish_completion(engine: &Weak<RefCell<Engine>>) {
    let Some(engine) = engine.upgrade() else {
        return;
    };
    let callback = {
        let Ok(mut eng) = engine.try_borrow_mut() else {
            return;
        };
        eng.completion_timer.fired();
        let Some(ticket) = eng.pending_ticket.take() else {
            return;
        };
        if !eng.state.complete(ticket) {
            return;
        }
        eng.on_complete.clone()
    };
    // Borrow released: the callback may call back into the engine.
    if let Some(f) = callback {
        if let Err(err) = f.call0(&JsValue::NULL) {
            log::warn!("blur completion callback threw: {err:?}");
        }
    }
}

fn finish_band_refresh(engine: &Weak<RefCell<Engine>>) {
    let Some(engine) = engine.upgrade() else {
        return;
    };
    if let Ok(mut eng) = engine.try_borrow_mut() {
        eng.resize_timer.fired();
        eng.apply_band();
    }
}

fn schedule_band_refresh(engine: &SharedEngine) {
    let Ok(mut eng) = engine.try_borrow_mut() else {
        return;
    };
    if eng.state.is_torn_down() {
        return;
    }
    eng.resize_timer.start(RESIZE_DEBOUNCE_MS);
}

// --- Public handle -----------------------------------------------------------

/// One blur overlay. The handle is only a reference: dropping it does not
/// remove the overlay, [`destroy`](GradualBlur::destroy) does.
#[wasm_bindgen]
pub struct GradualBlur {
    engine: SharedEngine,
}

/// Weak handle for page-lifetime listeners that must not keep an overlay alive.
#[derive(Clone)]
pub(crate) struct BlurHandle(Weak<RefCell<Engine>>);

impl BlurHandle {
    pub(crate) fn set_visible(&self, visible: bool) {
        if let Some(engine) = self.0.upgrade() {
            update_visibility(&engine, visible, false);
        }
    }
}

impl GradualBlur {
    /// Builds the overlay. Nothing is inserted into the document; attach
    /// [`element`](Self::element) yourself or call [`mount`](Self::mount).
    ///
    /// `reference` is the element whose visibility drives a scroll-activated
    /// overlay; without it the host passed to `mount` is observed.
    pub fn new(
        config: BlurConfig,
        reference: Option<Element>,
        on_complete: Option<js_sys::Function>,
    ) -> Result<GradualBlur, JsValue> {
        reap_detached();
        let doc = window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let plan = LayerPlan::new(&config);
        let state = BlurState::new(&config, on_complete.is_some());
        let backdrop_supported = backdrop_filter_supported();
        if !backdrop_supported {
            log::warn!("backdrop-filter unsupported; using flat overlay panels");
        }

        let container = create_div(&doc)?;
        container.set_class_name(&layout::container_class(&config));
        apply_styles(
            &container,
            &layout::container_declarations(&config, state.is_visible()),
        );
        {
            let s = container.style();
            for (property, value) in &config.style {
                let _ = s.set_property(property, value);
            }
        }

        let inner = create_div(&doc)?;
        inner.set_class_name("gradual-blur-inner");
        apply_styles(&inner, &layout::inner_declarations());
        container.append_child(&inner)?;

        let filters = plan.blur_filters(state.strength());
        let mut panels = Vec::with_capacity(plan.len());
        for (geometry, filter) in plan.panels().iter().zip(&filters) {
            let panel = create_div(&doc)?;
            apply_styles(
                &panel,
                &layout::panel_declarations(&config, geometry, filter, backdrop_supported),
            );
            inner.append_child(&panel)?;
            panels.push(panel);
        }

        log::debug!(
            "gradual blur: {} panels on {} edge, strength {}",
            panels.len(),
            config.edge.as_str(),
            config.strength
        );

        let engine = Rc::new_cyclic(|weak: &Weak<RefCell<Engine>>| {
            let on_resize = weak.clone();
            let on_done = weak.clone();
            RefCell::new(Engine {
                config,
                plan,
                state,
                container,
                panels,
                backdrop_supported,
                reference,
                was_attached: false,
                bindings: Vec::new(),
                scroll_watch: None,
                resize_timer: Timer::new(move || finish_band_refresh(&on_resize)),
                completion_timer: Timer::new(move || finish_completion(&on_done)),
                pending_ticket: None,
                on_complete,
            })
        });
        engine.borrow().write_band();

        let blur = GradualBlur { engine };
        if let Err(err) = blur.bind() {
            blur.engine.borrow_mut().teardown();
            return Err(err);
        }
        register(&blur.engine);
        Ok(blur)
    }

    fn bind(&self) -> Result<(), JsValue> {
        self.bind_hover()?;
        self.bind_resize()?;
        let explicit = {
            let eng = self.engine.borrow();
            eng.config
                .is_scroll_activated()
                .then(|| eng.reference.clone())
                .flatten()
        };
        if let Some(reference) = explicit {
            self.observe(&reference)?;
        }
        Ok(())
    }

    pub fn config(&self) -> BlurConfig {
        self.engine.borrow().config.clone()
    }

    /// Mask geometry of every panel, in DOM order.
    pub fn masks(&self) -> Vec<MaskProfile> {
        self.engine.borrow().plan.masks()
    }

    /// Strength currently applied to the panels.
    pub fn current_strength(&self) -> f64 {
        self.engine.borrow().state.strength()
    }

    pub(crate) fn handle(&self) -> BlurHandle {
        BlurHandle(Rc::downgrade(&self.engine))
    }

    fn bind_hover(&self) -> Result<(), JsValue> {
        let mut eng = self.engine.borrow_mut();
        if eng.config.hover_multiplier.is_none() {
            return Ok(());
        }
        let target: EventTarget = eng.container.clone().into();
        for (event, entering) in [("mouseenter", true), ("mouseleave", false)] {
            let weak = Rc::downgrade(&self.engine);
            let callback = Closure::wrap(Box::new(move |_evt: Event| {
                let Some(engine) = weak.upgrade() else {
                    return;
                };
                let Ok(mut eng) = engine.try_borrow_mut() else {
                    return;
                };
                let strength = if entering {
                    eng.state.pointer_enter()
                } else {
                    eng.state.pointer_leave()
                };
                if let Some(strength) = strength {
                    eng.apply_strength(strength);
                }
            }) as Box<dyn FnMut(Event)>);
            eng.bindings.push(EventBinding::listen(&target, event, callback)?);
        }
        Ok(())
    }

    fn bind_resize(&self) -> Result<(), JsValue> {
        let mut eng = self.engine.borrow_mut();
        if !eng.config.tracks_viewport() {
            return Ok(());
        }
        let Some(win) = window() else {
            return Ok(());
        };
        let weak = Rc::downgrade(&self.engine);
        let callback = Closure::wrap(Box::new(move |_evt: Event| {
            if let Some(engine) = weak.upgrade() {
                schedule_band_refresh(&engine);
            }
        }) as Box<dyn FnMut(Event)>);
        eng.bindings.push(EventBinding::listen(win.as_ref(), "resize", callback)?);
        Ok(())
    }

    fn observe(&self, reference: &Element) -> Result<(), JsValue> {
        let weak = Rc::downgrade(&self.engine);
        let callback = Closure::wrap(Box::new(move |entries: js_sys::Array| {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            // Entries are queued oldest first; only the latest state matters.
            let latest = entries
                .iter()
                .last()
                .and_then(|e| e.dyn_into::<IntersectionObserverEntry>().ok());
            if let Some(entry) = latest {
                update_visibility(&engine, entry.is_intersecting(), true);
            }
        }) as Box<dyn FnMut(js_sys::Array)>);
        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(SCROLL_THRESHOLD));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        observer.observe(reference);
        self.engine.borrow_mut().scroll_watch = Some(ScrollWatch {
            observer,
            _callback: callback,
        });
        Ok(())
    }
}

#[wasm_bindgen]
impl GradualBlur {
    /// The overlay root.
    pub fn element(&self) -> HtmlElement {
        self.engine.borrow().container.clone()
    }

    /// Appends the overlay to `host`. A scroll-activated overlay without an
    /// explicit reference element starts observing `host` here.
    pub fn mount(&self, host: &Element) -> Result<(), JsValue> {
        let needs_observer = {
            let mut eng = self.engine.borrow_mut();
            if eng.state.is_torn_down() {
                return Ok(());
            }
            host.append_child(&eng.container)?;
            eng.was_attached = true;
            eng.config.is_scroll_activated() && eng.scroll_watch.is_none()
        };
        if needs_observer {
            self.observe(host)?;
        }
        Ok(())
    }

    /// Drives the opacity channel directly (independent of hover).
    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&self, visible: bool) {
        update_visibility(&self.engine, visible, false);
    }

    #[wasm_bindgen(js_name = isVisible)]
    pub fn is_visible(&self) -> bool {
        self.engine.borrow().state.is_visible()
    }

    #[wasm_bindgen(js_name = isHovered)]
    pub fn is_hovered(&self) -> bool {
        self.engine.borrow().state.is_hovered()
    }

    #[wasm_bindgen(js_name = isDestroyed)]
    pub fn is_destroyed(&self) -> bool {
        self.engine.borrow().state.is_torn_down()
    }

    #[wasm_bindgen(js_name = layerCount)]
    pub fn layer_count(&self) -> u32 {
        self.engine.borrow().panels.len() as u32
    }

    /// Removes listeners, observer, timers and DOM nodes. Safe to call twice.
    pub fn destroy(&self) {
        if let Ok(mut eng) = self.engine.try_borrow_mut() {
            eng.teardown();
        }
        unregister(&self.engine);
    }
}
