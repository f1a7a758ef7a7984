//! Engine-private reactive state.
//!
//! Two independent channels: hover drives blur strength, visibility drives
//! container opacity. Every DOM callback goes through [`BlurState`] first; it
//! answers what (if anything) has to be written, so the rules are testable
//! without a browser.

use crate::config::BlurConfig;

/// Identifies one pending completion callback. Stale tickets (visibility
/// flipped back, or the engine was torn down) are refused by [`BlurState::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionTicket(u64);

/// Result of a visibility transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityChange {
    pub opacity: f64,
    /// Set when a completion callback should be scheduled.
    pub completion: Option<(CompletionTicket, f64)>,
}

#[derive(Clone, Debug)]
pub struct BlurState {
    base_strength: f64,
    hover_multiplier: Option<f64>,
    opacity: f64,
    duration_ms: f64,
    wants_completion: bool,
    hovered: bool,
    visible: bool,
    generation: u64,
    pending: Option<u64>,
    torn_down: bool,
}

impl BlurState {
    pub fn new(config: &BlurConfig, wants_completion: bool) -> Self {
        Self {
            base_strength: config.strength,
            hover_multiplier: config.hover_multiplier,
            opacity: config.opacity,
            duration_ms: config.duration_ms,
            wants_completion,
            hovered: false,
            // scroll-driven overlays start hidden until the observer reports in
            visible: !config.is_scroll_activated(),
            generation: 0,
            pending: None,
            torn_down: false,
        }
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn has_pending_completion(&self) -> bool {
        self.pending.is_some()
    }

    /// Strength currently in effect.
    pub fn strength(&self) -> f64 {
        match (self.hovered, self.hover_multiplier) {
            (true, Some(m)) => self.base_strength * m,
            _ => self.base_strength,
        }
    }

    pub fn container_opacity(&self) -> f64 {
        if self.visible { self.opacity } else { 0.0 }
    }

    /// Pointer entered. Returns the strength to re-apply to every panel.
    pub fn pointer_enter(&mut self) -> Option<f64> {
        self.set_hovered(true)
    }

    /// Pointer left. Returns the strength to re-apply to every panel.
    pub fn pointer_leave(&mut self) -> Option<f64> {
        self.set_hovered(false)
    }

    fn set_hovered(&mut self, hovered: bool) -> Option<f64> {
        if self.torn_down || self.hover_multiplier.is_none() {
            return None;
        }
        self.hovered = hovered;
        Some(self.strength())
    }

    /// Applies a visibility report. `None` when nothing changes.
    pub fn set_visible(&mut self, visible: bool) -> Option<VisibilityChange> {
        if self.torn_down || self.visible == visible {
            return None;
        }
        self.visible = visible;
        // any transition invalidates an in-flight completion
        self.generation += 1;
        self.pending = None;
        let completion = if visible && self.wants_completion {
            self.pending = Some(self.generation);
            Some((CompletionTicket(self.generation), self.duration_ms))
        } else {
            None
        };
        Some(VisibilityChange {
            opacity: self.container_opacity(),
            completion,
        })
    }

    /// Consumes a completion ticket. True exactly once per live ticket.
    pub fn complete(&mut self, ticket: CompletionTicket) -> bool {
        if self.torn_down || self.pending != Some(ticket.0) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Marks the state dead. True only on the first call.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.pending = None;
        self.hovered = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll_config() -> BlurConfig {
        BlurConfig::from_json(r#"{"animated": "scroll", "opacity": 0.9, "duration": "0.5s"}"#)
            .unwrap()
    }

    #[test]
    fn test_hover_disabled_without_multiplier() {
        let mut s = BlurState::new(&BlurConfig::default(), false);
        assert_eq!(s.pointer_enter(), None);
        assert!(!s.is_hovered());
        assert_eq!(s.strength(), 2.0);
    }

    #[test]
    fn test_hover_scales_strength() {
        let c = BlurConfig::from_json(r#"{"strength": 2, "hoverIntensity": 1.5}"#).unwrap();
        let mut s = BlurState::new(&c, false);
        assert_eq!(s.pointer_enter(), Some(3.0));
        assert!(s.is_hovered());
        assert_eq!(s.pointer_leave(), Some(2.0));
        assert!(!s.is_hovered());
    }

    #[test]
    fn test_scroll_starts_hidden() {
        let s = BlurState::new(&scroll_config(), false);
        assert!(!s.is_visible());
        assert_eq!(s.container_opacity(), 0.0);
        let s = BlurState::new(&BlurConfig::default(), false);
        assert_eq!(s.container_opacity(), 1.0);
    }

    #[test]
    fn test_visibility_transitions() {
        let mut s = BlurState::new(&scroll_config(), true);
        assert_eq!(s.set_visible(false), None);
        let change = s.set_visible(true).unwrap();
        assert_eq!(change.opacity, 0.9);
        let (ticket, delay) = change.completion.unwrap();
        assert_eq!(delay, 500.0);
        assert_eq!(s.set_visible(true), None, "repeat report is not a transition");
        assert!(s.complete(ticket));
        assert!(!s.complete(ticket), "fires once");
        let hidden = s.set_visible(false).unwrap();
        assert_eq!(hidden.opacity, 0.0);
        assert_eq!(hidden.completion, None);
    }

    #[test]
    fn test_flip_cancels_pending_completion() {
        let mut s = BlurState::new(&scroll_config(), true);
        let (first, _) = s.set_visible(true).unwrap().completion.unwrap();
        s.set_visible(false);
        let (second, _) = s.set_visible(true).unwrap().completion.unwrap();
        assert!(!s.complete(first));
        assert!(s.complete(second));
    }

    #[test]
    fn test_teardown_is_idempotent_and_final() {
        let c = BlurConfig::from_json(r#"{"animated": "scroll", "hoverIntensity": 2}"#).unwrap();
        let mut s = BlurState::new(&c, true);
        let (ticket, _) = s.set_visible(true).unwrap().completion.unwrap();
        assert!(s.teardown());
        assert!(!s.teardown());
        assert!(!s.complete(ticket));
        assert_eq!(s.pointer_enter(), None);
        assert_eq!(s.set_visible(false), None);
    }
}
