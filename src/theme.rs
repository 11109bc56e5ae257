//! Light/dark theming.
//!
//! Every themed color is registered once at setup as a named light/dark
//! pair; toggling the mode swaps which side of each pair resolves. Nothing
//! scans live state looking for things to re-theme.

use crate::surface::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub(crate) fn flipped(self) -> ThemeMode {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

struct Entry {
    name: &'static str,
    light: Rgba,
    dark: Rgba,
}

pub(crate) struct ThemeRegistry {
    mode: ThemeMode,
    entries: Vec<Entry>,
}

/// Colors the renderer and the starfield actually draw with, resolved for
/// the current mode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub(crate) background: Rgba,
    /// Translucent full-surface wash painted before the stars each frame.
    pub(crate) trail: Rgba,
    pub(crate) star_stroke: Rgba,
    pub(crate) star_fill: Rgba,
    pub(crate) vignette_inner: Rgba,
    pub(crate) vignette_outer: Rgba,
    pub(crate) hud_text: Rgba,
    pub(crate) hud_dim: Rgba,
}

impl ThemeRegistry {
    pub(crate) fn new(mode: ThemeMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, name: &'static str, light: Rgba, dark: Rgba) {
        debug_assert!(
            self.entries.iter().all(|e| e.name != name),
            "duplicate theme entry"
        );
        self.entries.push(Entry { name, light, dark });
    }

    pub(crate) fn resolve(&self, name: &str) -> Rgba {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| match self.mode {
                ThemeMode::Light => e.light,
                ThemeMode::Dark => e.dark,
            })
            .unwrap_or(Rgba::TRANSPARENT)
    }

    pub(crate) fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub(crate) fn toggle(&mut self) {
        self.mode = self.mode.flipped();
    }

    pub(crate) fn palette(&self) -> Palette {
        Palette {
            background: self.resolve("background"),
            trail: self.resolve("trail"),
            star_stroke: self.resolve("star.stroke"),
            star_fill: self.resolve("star.fill"),
            vignette_inner: self.resolve("vignette.inner"),
            vignette_outer: self.resolve("vignette.outer"),
            hud_text: self.resolve("hud.text"),
            hud_dim: self.resolve("hud.dim"),
        }
    }

    /// The built-in pairs. Dark-side constants match the classic canvas
    /// starfield exactly; light-side values are their daylight counterparts.
    pub(crate) fn builtin(mode: ThemeMode) -> Self {
        let mut reg = Self::new(mode);
        reg.register(
            "background",
            Rgba::new(236, 239, 244, 1.0),
            Rgba::new(0, 0, 0, 1.0),
        );
        reg.register(
            "trail",
            Rgba::new(255, 255, 255, 0.25),
            Rgba::new(0, 0, 0, 0.25),
        );
        reg.register(
            "star.stroke",
            Rgba::new(24, 30, 46, 0.85),
            Rgba::new(255, 255, 255, 0.85),
        );
        reg.register(
            "star.fill",
            Rgba::new(24, 30, 46, 1.0),
            Rgba::new(255, 255, 255, 1.0),
        );
        reg.register(
            "vignette.inner",
            Rgba::new(24, 30, 46, 0.12),
            Rgba::new(255, 255, 255, 0.12),
        );
        reg.register(
            "vignette.outer",
            Rgba::new(236, 239, 244, 0.0),
            Rgba::new(0, 0, 0, 0.0),
        );
        reg.register(
            "hud.text",
            Rgba::new(40, 46, 66, 1.0),
            Rgba::new(200, 205, 215, 1.0),
        );
        reg.register(
            "hud.dim",
            Rgba::new(110, 118, 138, 1.0),
            Rgba::new(110, 118, 138, 1.0),
        );
        reg
    }
}
