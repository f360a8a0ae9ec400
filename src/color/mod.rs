//! Colors and color gradients for terrain and sea shading

mod gradient;

pub use gradient::{ColorGradient, ColorStop, Easing, StopValue};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Linear RGB color with channels in [0, 1]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Color {
    /// All channels 0
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    /// All channels 1
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    /// Create a color from channel values
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a packed `0xRRGGBB` value
    ///
    /// # Example
    ///
    /// ```rust
    /// use rust_biome_planet::Color;
    ///
    /// let red = Color::from_hex(0xff0000);
    /// assert_eq!(red.to_array(), [1.0, 0.0, 0.0]);
    /// ```
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Channels as an array
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Channels plus opaque alpha
    #[inline]
    pub fn to_rgba(self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }

    /// Linear interpolation in RGB space
    ///
    /// # Arguments
    ///
    /// * `other` - Color reached at `t = 1`
    /// * `t` - Blend factor; values outside [0, 1] extrapolate
    #[inline]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    /// Interpolation in HSL space, taking the shorter way around the hue circle
    pub fn lerp_hsl(self, other: Color, t: f32) -> Color {
        let (h1, s1, l1) = self.to_hsl();
        let (h2, s2, l2) = other.to_hsl();

        let mut dh = h2 - h1;
        if dh > 0.5 {
            dh -= 1.0;
        } else if dh < -0.5 {
            dh += 1.0;
        }
        let h = (h1 + dh * t).rem_euclid(1.0);

        Color::from_hsl(h, s1 + (s2 - s1) * t, l1 + (l2 - l1) * t)
    }

    /// Convert to hue, saturation, lightness (all in [0, 1])
    pub fn to_hsl(self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) * 0.5;

        if max == min {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == self.r {
            (self.g - self.b) / d + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / d + 2.0
        } else {
            (self.r - self.g) / d + 4.0
        };

        (h / 6.0, s, l)
    }

    /// Build a color from hue, saturation, lightness (all in [0, 1])
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Color {
        if s <= 0.0 {
            return Color::new(l, l, l);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Color {
            r: hue_to_channel(p, q, h + 1.0 / 3.0),
            g: hue_to_channel(p, q, h),
            b: hue_to_channel(p, q, h - 1.0 / 3.0),
        }
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
