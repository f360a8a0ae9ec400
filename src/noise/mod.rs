//! Layered, warpable, noise-parameterized noise
//!
//! A [`NoiseConfig`] is a declarative description; [`NoiseEngine`] is the
//! evaluator built from it. Any numeric parameter may itself be a nested
//! noise configuration, which makes the parameter vary over space.

mod engine;
mod primitive;

pub use engine::{NoiseEngine, Parameter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PlanetError, Result};

/// Upper bound on fractal layers per configuration
pub const MAX_OCTAVES: u32 = 16;

/// A configuration parameter: a constant or a noise field
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Constant(f64),
    Noise(Box<NoiseConfig>),
}

impl Param {
    /// The constant value, if this parameter is not noise-driven
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Param::Constant(value) => Some(*value),
            Param::Noise(_) => None,
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        match self {
            Param::Constant(value) if !value.is_finite() => Err(PlanetError::InvalidConfig(
                format!("noise parameter `{}` must be finite (got {})", field, value),
            )),
            Param::Constant(_) => Ok(()),
            Param::Noise(config) => config.validate(),
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Constant(value)
    }
}

impl From<NoiseConfig> for Param {
    fn from(config: NoiseConfig) -> Self {
        Param::Noise(Box::new(config))
    }
}

/// Declarative noise description
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseConfig {
    /// Seed of this layer; child layers draw their seeds from it
    pub seed: u32,
    /// Lower end of the output range
    pub min: Param,
    /// Upper end of the output range
    pub max: Param,
    /// Input coordinate multiplier (feature size)
    pub scale: Param,
    /// Exponent of the power curve around 0
    pub power: Param,
    /// Number of fractal layers (0 = a single primitive evaluation)
    pub octaves: u32,
    /// Amplitude multiplier per layer
    pub gain: Param,
    /// Frequency multiplier per layer
    pub lacunarity: Param,
    /// Blend toward a step (> 0) or ridge (< 0) shape, in [-1, 1]
    pub sharpness: Param,
    /// Number of quantization bands (< 2 disables)
    pub steps: Param,
    /// First domain warp strength
    pub warp: Param,
    /// Second domain warp strength
    pub warp2: Param,
    /// Separate field used for warping instead of the layer's own primitive
    pub warp_noise: Option<Box<NoiseConfig>>,
    /// Offset added to the input position
    pub shift: [f64; 4],
    /// Wrap seamlessly along x
    pub tile_x: bool,
    /// Wrap seamlessly along y
    pub tile_y: bool,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            min: Param::Constant(-1.0),
            max: Param::Constant(1.0),
            scale: Param::Constant(1.0),
            power: Param::Constant(1.0),
            octaves: 0,
            gain: Param::Constant(0.5),
            lacunarity: Param::Constant(2.0),
            sharpness: Param::Constant(0.0),
            steps: Param::Constant(0.0),
            warp: Param::Constant(0.0),
            warp2: Param::Constant(0.0),
            warp_noise: None,
            shift: [0.0; 4],
            tile_x: false,
            tile_y: false,
        }
    }
}

impl NoiseConfig {
    /// Default configuration with the given seed
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Set the output range
    ///
    /// # Arguments
    ///
    /// * `min` - Value the darkest noise maps to (constant or noise-driven)
    /// * `max` - Value the brightest noise maps to
    ///
    /// # Example
    ///
    /// ```rust
    /// use rust_biome_planet::*;
    ///
    /// // Heights between -0.05 and 0.05, with a noisy upper bound
    /// let config = NoiseConfig::new(7).with_range(-0.05, NoiseConfig::new(8).with_range(0.02, 0.05));
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn with_range(mut self, min: impl Into<Param>, max: impl Into<Param>) -> Self {
        self.min = min.into();
        self.max = max.into();
        self
    }

    /// Set the input coordinate multiplier; larger values give smaller features
    pub fn with_scale(mut self, scale: impl Into<Param>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Set the power curve exponent applied as `sign(v) * |v|^power`
    pub fn with_power(mut self, power: impl Into<Param>) -> Self {
        self.power = power.into();
        self
    }

    /// Set the number of fractal layers
    ///
    /// 0 evaluates the primitive once; at most [`MAX_OCTAVES`] is accepted.
    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self
    }

    /// Set the amplitude multiplier between layers
    pub fn with_gain(mut self, gain: impl Into<Param>) -> Self {
        self.gain = gain.into();
        self
    }

    /// Set the frequency multiplier between layers
    pub fn with_lacunarity(mut self, lacunarity: impl Into<Param>) -> Self {
        self.lacunarity = lacunarity.into();
        self
    }

    /// Set the step (> 0) or ridge (< 0) blend in [-1, 1]
    pub fn with_sharpness(mut self, sharpness: impl Into<Param>) -> Self {
        self.sharpness = sharpness.into();
        self
    }

    /// Quantize into `steps` bands; fewer than 2 disables quantization
    pub fn with_steps(mut self, steps: impl Into<Param>) -> Self {
        self.steps = steps.into();
        self
    }

    /// Set the strength of the first domain warp
    pub fn with_warp(mut self, warp: impl Into<Param>) -> Self {
        self.warp = warp.into();
        self
    }

    /// Set the strength of the second domain warp, applied after the first
    pub fn with_warp2(mut self, warp2: impl Into<Param>) -> Self {
        self.warp2 = warp2.into();
        self
    }

    /// Warp with a separate field instead of this layer's own primitive
    pub fn with_warp_noise(mut self, warp_noise: NoiseConfig) -> Self {
        self.warp_noise = Some(Box::new(warp_noise));
        self
    }

    /// Offset added to the input position, per dimension
    pub fn with_shift(mut self, shift: [f64; 4]) -> Self {
        self.shift = shift;
        self
    }

    /// Wrap seamlessly along x and/or y over a period of 1
    ///
    /// Each tiled axis takes two noise dimensions, so tiling is skipped when
    /// the result would exceed four.
    pub fn with_tiling(mut self, tile_x: bool, tile_y: bool) -> Self {
        self.tile_x = tile_x;
        self.tile_y = tile_y;
        self
    }

    /// Replace the seed of this layer and of its warp field
    ///
    /// Noise-driven parameters keep their own seeds.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        if let Some(warp) = self.warp_noise.as_mut() {
            warp.reseed(seed.wrapping_add(7919));
        }
    }

    /// Check the configuration, recursing into nested noise
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a constant is not finite, constant
    /// `min > max`, or `octaves > MAX_OCTAVES`
    pub fn validate(&self) -> Result<()> {
        if self.octaves > MAX_OCTAVES {
            return Err(PlanetError::InvalidConfig(format!(
                "noise octaves must be <= {} (got {})",
                MAX_OCTAVES, self.octaves
            )));
        }
        if let (Some(min), Some(max)) = (self.min.as_constant(), self.max.as_constant()) {
            if min > max {
                return Err(PlanetError::InvalidConfig(format!(
                    "noise min must be <= max (got min {} > max {})",
                    min, max
                )));
            }
        }
        if self.shift.iter().any(|s| !s.is_finite()) {
            return Err(PlanetError::InvalidConfig("noise shift must be finite".into()));
        }

        self.min.validate("min")?;
        self.max.validate("max")?;
        self.scale.validate("scale")?;
        self.power.validate("power")?;
        self.gain.validate("gain")?;
        self.lacunarity.validate("lacunarity")?;
        self.sharpness.validate("sharpness")?;
        self.steps.validate("steps")?;
        self.warp.validate("warp")?;
        self.warp2.validate("warp2")?;
        if let Some(warp) = &self.warp_noise {
            warp.validate()?;
        }
        Ok(())
    }

    /// Configuration of one fractal child layer
    ///
    /// Children keep the sampling setup (scale, warp, shift, tiling) but not
    /// the shaping or range, which the parent applies once to the sum.
    pub(crate) fn layer_config(&self, seed: u32) -> NoiseConfig {
        NoiseConfig {
            seed,
            octaves: 0,
            scale: self.scale.clone(),
            warp: self.warp.clone(),
            warp2: self.warp2.clone(),
            warp_noise: self.warp_noise.clone(),
            shift: self.shift,
            tile_x: self.tile_x,
            tile_y: self.tile_y,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NoiseConfig::default();
        assert_eq!(config.min, Param::Constant(-1.0));
        assert_eq!(config.max, Param::Constant(1.0));
        assert_eq!(config.octaves, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let config = NoiseConfig::new(1).with_range(2.0, 1.0);
        assert!(matches!(config.validate(), Err(PlanetError::InvalidConfig(_))));
    }

    #[test]
    fn test_nested_config_validated() {
        let bad = NoiseConfig::new(2).with_range(5.0, -5.0);
        let config = NoiseConfig::new(1).with_scale(bad);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_octaves_rejected() {
        let config = NoiseConfig::new(1).with_octaves(MAX_OCTAVES + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_constant_rejected() {
        let config = NoiseConfig::new(1).with_gain(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layer_config_drops_shaping() {
        let config = NoiseConfig::new(1)
            .with_range(0.0, 10.0)
            .with_power(3.0)
            .with_steps(4.0)
            .with_scale(2.5)
            .with_octaves(4);
        let layer = config.layer_config(99);
        assert_eq!(layer.seed, 99);
        assert_eq!(layer.octaves, 0);
        assert_eq!(layer.scale, Param::Constant(2.5));
        assert_eq!(layer.power, Param::Constant(1.0));
        assert_eq!(layer.min, Param::Constant(-1.0));
    }

    #[test]
    fn test_reseed_reaches_warp_field() {
        let mut config = NoiseConfig::new(1).with_warp_noise(NoiseConfig::new(1));
        config.reseed(40);
        assert_eq!(config.seed, 40);
        assert_eq!(config.warp_noise.as_ref().unwrap().seed, 40 + 7919);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_param_accepts_number_or_object() {
        let json = r#"{"seed":3,"scale":{"seed":4,"min":1.0,"max":2.0},"octaves":2}"#;
        let config: NoiseConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.octaves, 2);
        assert!(matches!(config.scale, Param::Noise(_)));
        assert_eq!(config.gain, Param::Constant(0.5));
    }
}
