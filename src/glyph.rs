//! Brightness ramp and pixel-to-glyph mapping.

use image::Rgb;

/// Ramp used when no other is configured, dimmest first.
pub const DEFAULT_RAMP: &str = " .-+o#@";

/// An ordered set of glyphs from dimmest to brightest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessRamp {
    glyphs: Vec<char>,
}

/// Space or a visible ASCII character. Control bytes would be executed by
/// the terminal instead of drawn.
pub fn is_printable_glyph(c: char) -> bool {
    c == ' ' || c.is_ascii_graphic()
}

impl BrightnessRamp {
    /// Build a ramp from a string. Returns `None` for an empty string or one
    /// holding anything but printable ASCII: every glyph has to occupy
    /// exactly one terminal cell and read back as itself.
    pub fn new(ramp: &str) -> Option<Self> {
        if ramp.is_empty() || !ramp.chars().all(is_printable_glyph) {
            return None;
        }
        Some(Self {
            glyphs: ramp.chars().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn dimmest(&self) -> char {
        self.glyphs[0]
    }

    pub fn brightest(&self) -> char {
        self.glyphs[self.glyphs.len() - 1]
    }

    /// Ramp position for a pixel: `floor(brightness / 256 * len)`, clamped.
    pub fn index_for(&self, px: Rgb<u8>) -> usize {
        let level = (brightness(px) as f32 / 256.0 * self.glyphs.len() as f32).floor() as usize;
        level.min(self.glyphs.len() - 1)
    }

    /// Glyph for a pixel.
    pub fn glyph(&self, px: Rgb<u8>) -> char {
        self.glyphs[self.index_for(px)]
    }

    pub fn as_str(&self) -> String {
        self.glyphs.iter().collect()
    }
}

impl Default for BrightnessRamp {
    fn default() -> Self {
        Self {
            glyphs: DEFAULT_RAMP.chars().collect(),
        }
    }
}

/// Unweighted channel mean, truncated to an integer.
///
/// The mean is used rather than the HSL midpoint `(max + min) / 2`, so a
/// saturated primary like pure red reads as dim (85) instead of mid-grey.
pub fn brightness(px: Rgb<u8>) -> u8 {
    let [r, g, b] = px.0;
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_is_truncated_mean() {
        assert_eq!(brightness(Rgb([0, 0, 0])), 0);
        assert_eq!(brightness(Rgb([255, 255, 255])), 255);
        assert_eq!(brightness(Rgb([255, 0, 0])), 85);
        assert_eq!(brightness(Rgb([1, 1, 0])), 0);
        assert_eq!(brightness(Rgb([100, 150, 200])), 150);
    }

    #[test]
    fn pinned_glyphs_for_default_ramp() {
        let ramp = BrightnessRamp::default();
        assert_eq!(ramp.glyph(Rgb([0, 0, 0])), ' ');
        assert_eq!(ramp.glyph(Rgb([255, 255, 255])), '@');
        // mean 85 -> 85/256*7 = 2.32 -> '-'
        assert_eq!(ramp.glyph(Rgb([255, 0, 0])), '-');
        // mean 36 -> 0.98 -> ' ', mean 37 -> 1.01 -> '.'
        assert_eq!(ramp.glyph(Rgb([36, 36, 36])), ' ');
        assert_eq!(ramp.glyph(Rgb([37, 37, 37])), '.');
        // mean 128 -> 3.5 -> '+'
        assert_eq!(ramp.glyph(Rgb([128, 128, 128])), '+');
    }

    #[test]
    fn midpoint_formula_would_disagree() {
        // (max + min) / 2 for pure red is 127 -> '+'; the mean gives '-'
        let ramp = BrightnessRamp::default();
        assert_eq!(ramp.glyph(Rgb([255, 0, 0])), '-');
        assert_ne!(ramp.glyph(Rgb([255, 0, 0])), ramp.glyph(Rgb([127, 127, 127])));
    }

    #[test]
    fn index_stays_in_range_and_is_monotonic() {
        for ramp in [BrightnessRamp::default(), BrightnessRamp::new("@").unwrap()] {
            let mut last = 0;
            for v in 0..=255u8 {
                let idx = ramp.index_for(Rgb([v, v, v]));
                assert!(idx < ramp.len());
                assert!(idx >= last, "index went down at {}", v);
                last = idx;
            }
        }
    }

    #[test]
    fn rejects_empty_and_non_ascii_ramps() {
        assert!(BrightnessRamp::new("").is_none());
        assert!(BrightnessRamp::new(" ░▒▓█").is_none());
        let ramp = BrightnessRamp::new(" .:").unwrap();
        assert_eq!(ramp.dimmest(), ' ');
        assert_eq!(ramp.brightest(), ':');
        assert_eq!(ramp.as_str(), " .:");
    }

    #[test]
    fn rejects_control_characters() {
        assert!(BrightnessRamp::new("\t.@").is_none());
        assert!(BrightnessRamp::new(" .\n").is_none());
        assert!(BrightnessRamp::new("\x1b#").is_none());
        assert!(BrightnessRamp::new(" .\x7f").is_none());
        assert!(is_printable_glyph(' '));
        assert!(is_printable_glyph('~'));
        assert!(!is_printable_glyph('\r'));
    }
}
