//! Ordered color stops with optional nesting
//!
//! A stop's value is either a concrete color or another gradient. Nested
//! gradients read their own position from the extra dimensions passed to
//! [`ColorGradient::get`], so a gradient of gradients acts as a 2-D lookup
//! (height along one axis, e.g. latitude along the other).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Color;
use crate::error::{PlanetError, Result};

/// Easing applied to the blend factor between a stop and the previous one
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// `f^exponent`
    Power(f32),
    /// Hermite smoothstep `3f² - 2f³`
    SmoothStep,
    /// Hold the previous color until the stop is reached
    Step,
}

impl Easing {
    /// Apply the easing to a blend factor in [0, 1]
    pub fn apply(self, f: f32) -> f32 {
        match self {
            Easing::Linear => f,
            Easing::Power(exponent) => f.max(0.0).powf(exponent),
            Easing::SmoothStep => f * f * (3.0 - 2.0 * f),
            Easing::Step => {
                if f >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Value held by a stop
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum StopValue {
    Color(Color),
    Gradient(Box<ColorGradient>),
}

impl StopValue {
    fn resolve(&self, extra: &[f32]) -> Color {
        match self {
            StopValue::Color(color) => *color,
            StopValue::Gradient(gradient) => {
                let (t, rest) = extra.split_first().map_or((0.0, &[][..]), |(t, rest)| (*t, rest));
                gradient.get(t, rest)
            }
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            StopValue::Color(_) => 0,
            StopValue::Gradient(gradient) => gradient.dimensions(),
        }
    }
}

/// A single gradient stop
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub value: StopValue,
    /// Easing for the segment ending at this stop
    #[cfg_attr(feature = "serde", serde(default))]
    pub easing: Option<Easing>,
}

impl ColorStop {
    pub fn color(position: f32, color: Color) -> Self {
        Self {
            position,
            value: StopValue::Color(color),
            easing: None,
        }
    }

    pub fn gradient(position: f32, gradient: ColorGradient) -> Self {
        Self {
            position,
            value: StopValue::Gradient(Box::new(gradient)),
            easing: None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// Ordered list of color stops
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGradient"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    stops: Vec<ColorStop>,
    /// Interpolate in HSL instead of RGB
    hsl: bool,
}

impl ColorGradient {
    /// Create a gradient; stops are sorted by position
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `stops` is empty or a position is not finite
    pub fn new(mut stops: Vec<ColorStop>, hsl: bool) -> Result<Self> {
        if stops.is_empty() {
            return Err(PlanetError::InvalidConfig(
                "color gradient needs at least one stop".into(),
            ));
        }
        if let Some(stop) = stops.iter().find(|s| !s.position.is_finite()) {
            return Err(PlanetError::InvalidConfig(format!(
                "color stop position must be finite (got {})",
                stop.position
            )));
        }
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(Self { stops, hsl })
    }

    /// Gradient with a single flat color
    pub fn solid(color: Color) -> Self {
        Self {
            stops: vec![ColorStop::color(0.0, color)],
            hsl: false,
        }
    }

    /// Gradient from `(position, hex color)` pairs
    pub fn from_hex_stops(stops: &[(f32, u32)]) -> Result<Self> {
        Self::new(
            stops
                .iter()
                .map(|&(position, hex)| ColorStop::color(position, Color::from_hex(hex)))
                .collect(),
            false,
        )
    }

    pub fn with_hsl(mut self, hsl: bool) -> Self {
        self.hsl = hsl;
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn is_hsl(&self) -> bool {
        self.hsl
    }

    /// Number of positional arguments a full lookup consumes
    pub fn dimensions(&self) -> usize {
        1 + self
            .stops
            .iter()
            .map(|s| s.value.dimensions())
            .max()
            .unwrap_or(0)
    }

    /// Color at position `t`; `extra` feeds nested gradients
    pub fn get(&self, t: f32, extra: &[f32]) -> Color {
        let first = &self.stops[0];
        // `!(t > ..)` also routes NaN to the first stop
        if self.stops.len() == 1 || !(t > first.position) {
            return first.value.resolve(extra);
        }

        // First stop strictly after t
        let next = self.stops.partition_point(|s| s.position <= t);
        if next >= self.stops.len() {
            return self.stops[self.stops.len() - 1].value.resolve(extra);
        }

        let lo = &self.stops[next - 1];
        let hi = &self.stops[next];
        let span = hi.position - lo.position;
        let mut f = if span > 0.0 { (t - lo.position) / span } else { 1.0 };
        if let Some(easing) = hi.easing {
            f = easing.apply(f);
        }

        let a = lo.value.resolve(extra);
        let b = hi.value.resolve(extra);
        if self.hsl {
            a.lerp_hsl(b, f)
        } else {
            a.lerp(b, f)
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawGradient {
    stops: Vec<ColorStop>,
    #[serde(default)]
    hsl: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGradient> for ColorGradient {
    type Error = PlanetError;

    fn try_from(raw: RawGradient) -> Result<Self> {
        ColorGradient::new(raw.stops, raw.hsl)
    }
}
