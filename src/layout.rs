//! Layer geometry for the blur stack.
//!
//! A continuous directional blur is approximated by `N` superimposed panels.
//! Panel `i` (1-based) gets a mask band that is fully opaque over one `100/N`
//! slice of the axis and fades out over the neighbouring slices, and a blur
//! intensity that grows with `i`. Successive bands overlap, so their
//! backdrop filters sum into a smooth ramp.
//!
//! Everything here is plain data; the DOM applicator in `engine` only copies
//! the produced declarations onto elements.

use std::fmt::Write as _;

use crate::config::{BlurConfig, Curve, Edge, Target};

/// Blur per unit of (curved) progress, in `rem`.
pub const BLUR_UNIT_REM: f64 = 0.0625;

/// Flat overlay used when the renderer has no backdrop filter.
pub const FALLBACK_BACKGROUND: &str = "rgba(0, 0, 0, 0.3)";
pub const FALLBACK_OPACITY_FACTOR: f64 = 0.5;

/// A CSS property / value pair.
pub type StyleDecl = (&'static str, String);

// --- Curves & intensity ------------------------------------------------------

impl Curve {
    /// Maps raw progress `p` in `[0, 1]` onto the eased progress.
    pub fn apply(self, p: f64) -> f64 {
        match self {
            Curve::Linear => p,
            Curve::Bezier => p * p * (3.0 - 2.0 * p),
            Curve::EaseIn => p * p,
            Curve::EaseOut => 1.0 - (1.0 - p).powi(2),
            Curve::EaseInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Blur radius (rem) of panel `index` out of `layer_count`.
pub fn blur_intensity(
    index: u32,
    layer_count: u32,
    curve: Curve,
    exponential: bool,
    strength: f64,
) -> f64 {
    let n = layer_count.max(1) as f64;
    let progress = curve.apply(index as f64 / n);
    if exponential {
        2f64.powf(progress * 4.0) * BLUR_UNIT_REM * strength
    } else {
        BLUR_UNIT_REM * (progress * n + 1.0) * strength
    }
}

/// `blur(<v>rem)` with three decimals.
pub fn format_blur(value: f64) -> String {
    format!("blur({value:.3}rem)")
}

// --- Masks -------------------------------------------------------------------

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Four-point mask boundary (percentages along the blur axis).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskProfile {
    /// transparent at
    pub fade_in: f64,
    /// opaque from
    pub solid_start: f64,
    /// opaque until, only emitted when <= 100
    pub solid_end: f64,
    /// transparent again at, only emitted when <= 100
    pub fade_out: f64,
}

impl MaskProfile {
    pub fn for_layer(index: u32, layer_count: u32) -> Self {
        let step = 100.0 / layer_count.max(1) as f64;
        let at = step * index as f64;
        Self {
            fade_in: round_tenth(at - step),
            solid_start: round_tenth(at),
            solid_end: round_tenth(at + step),
            fade_out: round_tenth(at + 2.0 * step),
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.fade_in, self.solid_start, self.solid_end, self.fade_out]
    }

    /// Gradient color stops, e.g. `transparent 0%, black 20%, black 40%, transparent 60%`.
    pub fn gradient_stops(&self) -> String {
        let mut stops = format!("transparent {}%, black {}%", self.fade_in, self.solid_start);
        if self.solid_end <= 100.0 {
            let _ = write!(stops, ", black {}%", self.solid_end);
        }
        if self.fade_out <= 100.0 {
            let _ = write!(stops, ", transparent {}%", self.fade_out);
        }
        stops
    }

    pub fn mask_image(&self, edge: Edge) -> String {
        format!(
            "linear-gradient({}, {})",
            edge.gradient_direction(),
            self.gradient_stops()
        )
    }
}

// --- Layer plan --------------------------------------------------------------

/// Immutable geometry of one panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelGeometry {
    pub index: u32,
    pub mask: MaskProfile,
    pub mask_image: String,
}

/// Geometry of the whole stack; fixed once built. Only the strength passed to
/// [`LayerPlan::blur_values`] varies afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPlan {
    curve: Curve,
    exponential: bool,
    panels: Vec<PanelGeometry>,
}

impl LayerPlan {
    pub fn new(config: &BlurConfig) -> Self {
        let n = config.layer_count.max(1);
        let panels = (1..=n)
            .map(|index| {
                let mask = MaskProfile::for_layer(index, n);
                PanelGeometry {
                    index,
                    mask_image: mask.mask_image(config.edge),
                    mask,
                }
            })
            .collect();
        Self {
            curve: config.curve,
            exponential: config.exponential,
            panels,
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panels(&self) -> &[PanelGeometry] {
        &self.panels
    }

    pub fn masks(&self) -> Vec<MaskProfile> {
        self.panels.iter().map(|p| p.mask).collect()
    }

    /// Blur radius of every panel (in DOM order) for the given strength.
    pub fn blur_values(&self, strength: f64) -> Vec<f64> {
        let n = self.panels.len() as u32;
        self.panels
            .iter()
            .map(|p| blur_intensity(p.index, n, self.curve, self.exponential, strength))
            .collect()
    }

    pub fn blur_filters(&self, strength: f64) -> Vec<String> {
        self.blur_values(strength).into_iter().map(format_blur).collect()
    }
}

// --- Style declarations ------------------------------------------------------

/// Class list of the outer container.
pub fn container_class(config: &BlurConfig) -> String {
    let scope = match config.target {
        Target::Page => "gradual-blur-page",
        Target::Parent => "gradual-blur-parent",
    };
    format!("gradual-blur {scope} {}", config.class_name)
        .trim()
        .to_string()
}

/// Size and pinning of the band for the given viewport width.
pub fn band_declarations(config: &BlurConfig, viewport_width: f64) -> Vec<StyleDecl> {
    let band = config.band_size_for_viewport(viewport_width).to_string();
    let edge = config.edge.as_str();
    if config.edge.is_vertical() {
        let width = config
            .width
            .as_ref()
            .map_or_else(|| "100%".to_string(), ToString::to_string);
        vec![
            ("height", band),
            ("width", width),
            (edge, "0".into()),
            ("left", "0".into()),
            ("right", "0".into()),
        ]
    } else {
        let width = config.width.as_ref().map_or(band, ToString::to_string);
        vec![
            ("width", width),
            ("height", "100%".into()),
            (edge, "0".into()),
            ("top", "0".into()),
            ("bottom", "0".into()),
        ]
    }
}

/// Only a visible overlay with a hover reaction takes pointer events; any
/// other overlay lets clicks through to the content underneath.
pub fn pointer_events(config: &BlurConfig, visible: bool) -> &'static str {
    if visible && config.hover_multiplier.is_some() { "auto" } else { "none" }
}

/// Visibility-channel part of the container style.
pub fn visibility_declarations(config: &BlurConfig, visible: bool) -> Vec<StyleDecl> {
    let opacity = if visible { config.opacity } else { 0.0 };
    vec![
        ("opacity", opacity.to_string()),
        ("pointer-events", pointer_events(config, visible).into()),
    ]
}

/// Container style without the band geometry, which is written separately so
/// it always wins over user `style` entries.
pub fn container_declarations(config: &BlurConfig, visible: bool) -> Vec<StyleDecl> {
    let position = if config.is_page_level() { "fixed" } else { "absolute" };
    let mut decls: Vec<StyleDecl> = vec![
        ("position", position.into()),
        ("z-index", config.effective_z_index().to_string()),
    ];
    decls.extend(visibility_declarations(config, visible));
    if config.animation.is_animated() {
        decls.push((
            "transition",
            format!("opacity {}ms {}", config.duration_ms, config.easing),
        ));
    }
    decls
}

pub fn inner_declarations() -> Vec<StyleDecl> {
    vec![
        ("position", "relative".into()),
        ("width", "100%".into()),
        ("height", "100%".into()),
    ]
}

/// Style of one panel. `filter` is the formatted `blur(..)` value; ignored in
/// fallback mode, where a flat translucent overlay stands in.
pub fn panel_declarations(
    config: &BlurConfig,
    panel: &PanelGeometry,
    filter: &str,
    backdrop_supported: bool,
) -> Vec<StyleDecl> {
    let mut decls: Vec<StyleDecl> = vec![
        ("position", "absolute".into()),
        ("inset", "0".into()),
        ("mask-image", panel.mask_image.clone()),
        ("-webkit-mask-image", panel.mask_image.clone()),
    ];
    if backdrop_supported {
        decls.push(("backdrop-filter", filter.to_string()));
        decls.push(("-webkit-backdrop-filter", filter.to_string()));
        decls.push(("opacity", config.opacity.to_string()));
    } else {
        decls.push(("background", FALLBACK_BACKGROUND.to_string()));
        decls.push((
            "opacity",
            (config.opacity * FALLBACK_OPACITY_FACTOR).to_string(),
        ));
    }
    if config.animation.is_animated() && !config.is_scroll_activated() {
        decls.push((
            "transition",
            format!("backdrop-filter {}ms {}", config.duration_ms, config.easing),
        ));
    }
    decls
}
