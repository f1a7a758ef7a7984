// Named partial configurations.
// Each preset only sets the fields it cares about; everything else falls
// through to the built-in defaults or to the caller's explicit options.
use super::{BlurOptions, Curve, Dimension, Edge, Target};
use std::sync::OnceLock;

pub const PRESET_NAMES: [&str; 13] = [
    "top",
    "bottom",
    "left",
    "right",
    "subtle",
    "intense",
    "smooth",
    "sharp",
    "header",
    "footer",
    "sidebar",
    "page-header",
    "page-footer",
];

fn rem(v: f64) -> Option<Dimension> {
    Some(Dimension::Rem(v))
}

fn edge_preset(edge: Edge) -> BlurOptions {
    BlurOptions {
        position: Some(edge),
        height: rem(6.0),
        ..Default::default()
    }
}

fn build_presets() -> Vec<(&'static str, BlurOptions)> {
    vec![
        ("top", edge_preset(Edge::Top)),
        ("bottom", edge_preset(Edge::Bottom)),
        ("left", edge_preset(Edge::Left)),
        ("right", edge_preset(Edge::Right)),
        (
            "subtle",
            BlurOptions {
                height: rem(4.0),
                strength: Some(1.0),
                opacity: Some(0.8),
                div_count: Some(3),
                ..Default::default()
            },
        ),
        (
            "intense",
            BlurOptions {
                height: rem(10.0),
                strength: Some(4.0),
                div_count: Some(8),
                exponential: Some(true),
                ..Default::default()
            },
        ),
        (
            "smooth",
            BlurOptions {
                height: rem(8.0),
                curve: Some(Curve::Bezier),
                div_count: Some(10),
                ..Default::default()
            },
        ),
        (
            "sharp",
            BlurOptions {
                height: rem(5.0),
                curve: Some(Curve::Linear),
                div_count: Some(4),
                ..Default::default()
            },
        ),
        (
            "header",
            BlurOptions {
                position: Some(Edge::Top),
                height: rem(8.0),
                curve: Some(Curve::EaseOut),
                ..Default::default()
            },
        ),
        (
            "footer",
            BlurOptions {
                position: Some(Edge::Bottom),
                height: rem(8.0),
                curve: Some(Curve::EaseOut),
                ..Default::default()
            },
        ),
        (
            "sidebar",
            BlurOptions {
                position: Some(Edge::Left),
                height: rem(6.0),
                strength: Some(2.5),
                ..Default::default()
            },
        ),
        (
            "page-header",
            BlurOptions {
                position: Some(Edge::Top),
                height: rem(10.0),
                target: Some(Target::Page),
                strength: Some(3.0),
                ..Default::default()
            },
        ),
        (
            "page-footer",
            BlurOptions {
                position: Some(Edge::Bottom),
                height: rem(10.0),
                target: Some(Target::Page),
                strength: Some(3.0),
                ..Default::default()
            },
        ),
    ]
}

fn presets() -> &'static [(&'static str, BlurOptions)] {
    static PRESETS: OnceLock<Vec<(&'static str, BlurOptions)>> = OnceLock::new();
    PRESETS.get_or_init(build_presets)
}

/// Looks up a preset by name.
pub fn preset(name: &str) -> Option<&'static BlurOptions> {
    presets().iter().find(|(n, _)| *n == name).map(|(_, p)| p)
}
