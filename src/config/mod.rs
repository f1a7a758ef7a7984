//! Blur configuration: partial option layers and the resolved [`BlurConfig`].
//!
//! Options arrive as loosely-typed JSON from the page (`{ preset: 'intense',
//! strength: 1 }`) and are deserialized into [`BlurOptions`], where every field
//! is optional. [`ConfigBuilder`] stacks the layers in a fixed order
//! (built-in defaults, then the named preset, then explicit overrides) and
//! validates the result into an immutable [`BlurConfig`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

mod presets;

pub use presets::{PRESET_NAMES, preset};

// --- Defaults ----------------------------------------------------------------

pub const DEFAULT_STRENGTH: f64 = 2.0;
pub const DEFAULT_BAND_SIZE: &str = "6rem";
pub const DEFAULT_LAYER_COUNT: u32 = 5;
pub const DEFAULT_Z_INDEX: i32 = 1000;
pub const DEFAULT_DURATION_MS: f64 = 300.0;
pub const DEFAULT_EASING: &str = "ease-out";
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Page-level overlays stack above parent-level ones by this amount.
pub const PAGE_Z_INDEX_BOOST: i32 = 100;

// Viewport breakpoints (inclusive, CSS pixels) for responsive band sizes.
pub const MOBILE_MAX_WIDTH: f64 = 480.0;
pub const TABLET_MAX_WIDTH: f64 = 768.0;
pub const DESKTOP_MAX_WIDTH: f64 = 1024.0;

// --- Errors ------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed blur options: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for wasm_bindgen::JsValue {
    fn from(err: ConfigError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

// --- Enumerated fields -------------------------------------------------------

/// Which side of the host the blur band hugs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top" => Some(Edge::Top),
            "bottom" => Some(Edge::Bottom),
            "left" => Some(Edge::Left),
            "right" => Some(Edge::Right),
            _ => None,
        }
    }

    /// CSS property name of the edge (`top`, `bottom`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }

    /// `linear-gradient` direction keyword for masks on this edge.
    pub fn gradient_direction(self) -> &'static str {
        match self {
            Edge::Top => "to top",
            Edge::Bottom => "to bottom",
            Edge::Left => "to left",
            Edge::Right => "to right",
        }
    }

    /// Top/bottom bands span the width; left/right bands span the height.
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Top | Edge::Bottom)
    }
}

/// Progress reparametrization applied before computing blur intensity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Curve {
    #[default]
    Linear,
    Bezier,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Curve {
    pub const ALL: [Curve; 5] = [
        Curve::Linear,
        Curve::Bezier,
        Curve::EaseIn,
        Curve::EaseOut,
        Curve::EaseInOut,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Curve::Linear),
            "bezier" => Some(Curve::Bezier),
            "ease-in" => Some(Curve::EaseIn),
            "ease-out" => Some(Curve::EaseOut),
            "ease-in-out" => Some(Curve::EaseInOut),
            _ => None,
        }
    }
}

/// Decorate a single container, or pin the overlay to the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Target {
    #[default]
    Parent,
    Page,
}

/// `animated` option: off, opacity/filter transitions, or scroll-driven visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Animation {
    #[default]
    None,
    Fade,
    Scroll,
}

impl Animation {
    pub fn is_animated(self) -> bool {
        !matches!(self, Animation::None)
    }
}

// Unknown names map to the default variant with a warning.
macro_rules! lenient_name_deserialize {
    ($ty:ty, $what:literal) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                Ok(<$ty>::from_name(&name).unwrap_or_else(|| {
                    log::warn!("unknown blur {} '{}', using default", $what, name);
                    <$ty>::default()
                }))
            }
        }
    };
}

lenient_name_deserialize!(Edge, "position");
lenient_name_deserialize!(Curve, "curve");

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(if name == "page" { Target::Page } else { Target::Parent })
    }
}

impl<'de> Deserialize<'de> for Animation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Mode(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Animation::None,
            Repr::Flag(true) => Animation::Fade,
            Repr::Mode(mode) if mode == "scroll" => Animation::Scroll,
            Repr::Mode(mode) if mode.is_empty() => Animation::None,
            Repr::Mode(_) => Animation::Fade,
        })
    }
}

// --- Dimensions & times ------------------------------------------------------

/// A CSS length as written in the options. Bare numbers are pixels; strings
/// that are not a simple `<number><unit>` pass through untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    Px(f64),
    Rem(f64),
    Em(f64),
    Percent(f64),
    Vh(f64),
    Vw(f64),
    Raw(String),
}

impl Dimension {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        // Longest suffixes first so "rem" is not read as "em".
        const UNITS: [&str; 6] = ["rem", "px", "em", "vh", "vw", "%"];
        for unit in UNITS {
            if let Some(number) = text.strip_suffix(unit) {
                if let Ok(v) = number.trim().parse::<f64>() {
                    if v.is_finite() {
                        return match unit {
                            "rem" => Dimension::Rem(v),
                            "px" => Dimension::Px(v),
                            "em" => Dimension::Em(v),
                            "vh" => Dimension::Vh(v),
                            "vw" => Dimension::Vw(v),
                            _ => Dimension::Percent(v),
                        };
                    }
                }
            }
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Dimension::Px(v),
            _ => Dimension::Raw(text.to_string()),
        }
    }

    /// Fixed pixel sizes do not follow font or viewport changes by themselves.
    pub fn is_pixels(&self) -> bool {
        matches!(self, Dimension::Px(_))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Px(v) => write!(f, "{v}px"),
            Dimension::Rem(v) => write!(f, "{v}rem"),
            Dimension::Em(v) => write!(f, "{v}em"),
            Dimension::Percent(v) => write!(f, "{v}%"),
            Dimension::Vh(v) => write!(f, "{v}vh"),
            Dimension::Vw(v) => write!(f, "{v}vw"),
            Dimension::Raw(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Dimension::Px(v),
            Repr::Text(s) => Dimension::parse(&s),
        })
    }
}

/// Parses a CSS `<time>` (`0.3s`, `300ms`) into milliseconds.
pub fn parse_css_time(text: &str) -> Option<f64> {
    let text = text.trim();
    let ms = if let Some(v) = text.strip_suffix("ms") {
        v.trim().parse::<f64>().ok()?
    } else if let Some(v) = text.strip_suffix('s') {
        v.trim().parse::<f64>().ok()? * 1000.0
    } else {
        // A unitless value is read as seconds, like `parseFloat("0.3") * 1000`.
        text.parse::<f64>().ok()? * 1000.0
    };
    (ms.is_finite() && ms >= 0.0).then_some(ms)
}

/// Transition duration in milliseconds. JSON numbers are milliseconds, strings
/// are CSS times.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Millis(pub f64);

impl<'de> Deserialize<'de> for Millis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        let ms = match Repr::deserialize(deserializer)? {
            Repr::Number(v) if v.is_finite() && v >= 0.0 => v,
            Repr::Number(_) => DEFAULT_DURATION_MS,
            Repr::Text(s) => parse_css_time(&s).unwrap_or_else(|| {
                log::warn!("unparseable blur duration '{}', using default", s);
                DEFAULT_DURATION_MS
            }),
        };
        Ok(Millis(ms))
    }
}

// --- Loose numbers -----------------------------------------------------------

/// Reads a number the way the page writes it: JSON numbers and numeric strings
/// (`"0.5"`, `"10"`). Anything else is dropped with a warning so the field
/// falls back to its preset or default.
fn loose_number(value: serde_json::Value) -> Option<f64> {
    let number = match &value {
        serde_json::Value::Null => return None,
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            log::warn!("ignoring non-numeric blur option value {}", value);
            None
        }
    }
}

fn loose_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(loose_number(serde_json::Value::deserialize(deserializer)?))
}

/// Layer counts drop their fractional part (`2.5` draws two panels).
fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(loose_f64(deserializer)?.map(|v| v.floor() as i64))
}

fn loose_z_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(loose_f64(deserializer)?.map(|v| v.trunc() as i32))
}

// --- Option layers -----------------------------------------------------------

/// One layer of partial configuration. Field names follow the page-facing
/// option names; aliases accept the engine's own vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlurOptions {
    pub preset: Option<String>,
    #[serde(alias = "edge")]
    pub position: Option<Edge>,
    #[serde(alias = "strengthBase", deserialize_with = "loose_f64")]
    pub strength: Option<f64>,
    #[serde(alias = "bandSize")]
    pub height: Option<Dimension>,
    pub width: Option<Dimension>,
    #[serde(alias = "layerCount", deserialize_with = "loose_count")]
    pub div_count: Option<i64>,
    pub exponential: Option<bool>,
    #[serde(alias = "zIndexBase", deserialize_with = "loose_z_index")]
    pub z_index: Option<i32>,
    pub animated: Option<Animation>,
    pub duration: Option<Millis>,
    pub easing: Option<String>,
    #[serde(deserialize_with = "loose_f64")]
    pub opacity: Option<f64>,
    pub curve: Option<Curve>,
    pub responsive: Option<bool>,
    pub mobile_height: Option<Dimension>,
    pub tablet_height: Option<Dimension>,
    pub desktop_height: Option<Dimension>,
    pub target: Option<Target>,
    pub class_name: Option<String>,
    pub style: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(alias = "hoverMultiplier", deserialize_with = "loose_f64")]
    pub hover_intensity: Option<f64>,
}

impl BlurOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Stacks `over` on top of `self`: every field `over` sets wins.
    pub fn merge(&self, over: &BlurOptions) -> BlurOptions {
        BlurOptions {
            preset: over.preset.clone().or_else(|| self.preset.clone()),
            position: over.position.or(self.position),
            strength: over.strength.or(self.strength),
            height: over.height.clone().or_else(|| self.height.clone()),
            width: over.width.clone().or_else(|| self.width.clone()),
            div_count: over.div_count.or(self.div_count),
            exponential: over.exponential.or(self.exponential),
            z_index: over.z_index.or(self.z_index),
            animated: over.animated.or(self.animated),
            duration: over.duration.or(self.duration),
            easing: over.easing.clone().or_else(|| self.easing.clone()),
            opacity: over.opacity.or(self.opacity),
            curve: over.curve.or(self.curve),
            responsive: over.responsive.or(self.responsive),
            mobile_height: over.mobile_height.clone().or_else(|| self.mobile_height.clone()),
            tablet_height: over.tablet_height.clone().or_else(|| self.tablet_height.clone()),
            desktop_height: over.desktop_height.clone().or_else(|| self.desktop_height.clone()),
            target: over.target.or(self.target),
            class_name: over.class_name.clone().or_else(|| self.class_name.clone()),
            style: over.style.clone().or_else(|| self.style.clone()),
            hover_intensity: over.hover_intensity.or(self.hover_intensity),
        }
    }
}

// --- Resolved configuration --------------------------------------------------

/// Per-breakpoint band sizes used when `responsive` is on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponsiveSizes {
    pub mobile: Option<Dimension>,
    pub tablet: Option<Dimension>,
    pub desktop: Option<Dimension>,
}

/// Fully resolved, validated blur configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurConfig {
    pub edge: Edge,
    pub strength: f64,
    pub band_size: Dimension,
    pub width: Option<Dimension>,
    pub layer_count: u32,
    pub exponential: bool,
    pub curve: Curve,
    pub opacity: f64,
    pub hover_multiplier: Option<f64>,
    pub animation: Animation,
    pub duration_ms: f64,
    pub easing: String,
    pub z_index: i32,
    pub target: Target,
    pub class_name: String,
    pub style: BTreeMap<String, String>,
    pub responsive: Option<ResponsiveSizes>,
}

impl Default for BlurConfig {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

impl BlurConfig {
    /// Parses page options (which may name a preset) and resolves them.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(ConfigBuilder::new().overrides(BlurOptions::from_json(json)?).build())
    }

    pub fn is_scroll_activated(&self) -> bool {
        self.animation == Animation::Scroll
    }

    pub fn is_page_level(&self) -> bool {
        self.target == Target::Page
    }

    /// Stacking order actually written to the container.
    pub fn effective_z_index(&self) -> i32 {
        if self.is_page_level() {
            self.z_index.saturating_add(PAGE_Z_INDEX_BOOST)
        } else {
            self.z_index
        }
    }

    /// Band thickness for a viewport of `viewport_width` CSS pixels.
    pub fn band_size_for_viewport(&self, viewport_width: f64) -> &Dimension {
        if let Some(sizes) = &self.responsive {
            let pick = if viewport_width <= MOBILE_MAX_WIDTH && sizes.mobile.is_some() {
                sizes.mobile.as_ref()
            } else if viewport_width <= TABLET_MAX_WIDTH && sizes.tablet.is_some() {
                sizes.tablet.as_ref()
            } else if viewport_width <= DESKTOP_MAX_WIDTH && sizes.desktop.is_some() {
                sizes.desktop.as_ref()
            } else {
                None
            };
            if let Some(d) = pick {
                return d;
            }
        }
        &self.band_size
    }

    /// Whether the band must be re-applied when the viewport changes size.
    pub fn tracks_viewport(&self) -> bool {
        self.responsive.is_some()
            || self.band_size.is_pixels()
            || self.width.as_ref().is_some_and(Dimension::is_pixels)
    }
}

/// Extra container CSS. Keys may be written the JS way (`marginTop`); values
/// may be strings or numbers. Anything else is dropped.
fn style_overrides(style: &BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    style
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((css_property_name(key), value))
        })
        .collect()
}

/// `marginTop` -> `margin-top`; already-hyphenated names are kept.
pub fn css_property_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Layered configuration builder: defaults, then preset, then overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    preset: Option<String>,
    overrides: BlurOptions,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a preset. A `preset` field inside the overrides takes precedence.
    pub fn preset(mut self, name: &str) -> Self {
        self.preset = Some(name.to_string());
        self
    }

    pub fn overrides(mut self, options: BlurOptions) -> Self {
        self.overrides = self.overrides.merge(&options);
        self
    }

    /// Resolves the layers. Out-of-range values degrade to a usable setting
    /// with a warning.
    pub fn build(self) -> BlurConfig {
        let preset_name = self.overrides.preset.as_deref().or(self.preset.as_deref());
        let base = match preset_name {
            Some(name) => match presets::preset(name) {
                Some(p) => p.clone(),
                None => {
                    log::warn!("unknown blur preset '{}', ignoring", name);
                    BlurOptions::default()
                }
            },
            None => BlurOptions::default(),
        };
        let o = base.merge(&self.overrides);

        let strength = match o.strength {
            Some(v) if v.is_finite() && v > 0.0 => v,
            Some(v) => {
                log::warn!("blur strength must be positive, got {}; using {}", v, DEFAULT_STRENGTH);
                DEFAULT_STRENGTH
            }
            None => DEFAULT_STRENGTH,
        };
        let hover_multiplier = match o.hover_intensity {
            // zero means "no hover reaction", like an unset option
            Some(m) if m == 0.0 => None,
            Some(m) if !m.is_finite() || m < 0.0 => {
                log::warn!("negative hoverIntensity {} disables hover", m);
                None
            }
            other => other,
        };
        let opacity = match o.opacity {
            Some(v) if v.is_nan() => DEFAULT_OPACITY,
            Some(v) => v.clamp(0.0, 1.0),
            None => DEFAULT_OPACITY,
        };
        let layer_count = o
            .div_count
            .unwrap_or(DEFAULT_LAYER_COUNT as i64)
            .clamp(1, u32::MAX as i64) as u32;
        let responsive = o.responsive.unwrap_or(false).then(|| ResponsiveSizes {
            mobile: o.mobile_height.clone(),
            tablet: o.tablet_height.clone(),
            desktop: o.desktop_height.clone(),
        });

        BlurConfig {
            edge: o.position.unwrap_or_default(),
            strength,
            band_size: o.height.unwrap_or_else(|| Dimension::parse(DEFAULT_BAND_SIZE)),
            width: o.width,
            layer_count,
            exponential: o.exponential.unwrap_or(false),
            curve: o.curve.unwrap_or_default(),
            opacity,
            hover_multiplier,
            animation: o.animated.unwrap_or_default(),
            duration_ms: o.duration.map_or(DEFAULT_DURATION_MS, |d| d.0),
            easing: o.easing.unwrap_or_else(|| DEFAULT_EASING.to_string()),
            z_index: o.z_index.unwrap_or(DEFAULT_Z_INDEX),
            target: o.target.unwrap_or_default(),
            class_name: o.class_name.unwrap_or_default(),
            style: o.style.as_ref().map(style_overrides).unwrap_or_default(),
            responsive,
        }
    }
}
