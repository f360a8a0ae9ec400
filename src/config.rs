//! Planet request configuration and builder
//!
//! A [`PlanetRequest`] is the declarative input of one mesh generation. It is
//! serializable (with the `serde` feature) so it can cross the worker boundary
//! as plain data; the same request always produces the same mesh.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::biome::{presets, BiomeOptions};
use crate::color::Color;
use crate::error::{PlanetError, Result};

/// Highest accepted subdivision level
pub const MAX_DETAIL: i32 = 128;

/// Base solid of the planet
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeKind {
    /// Subdivided icosahedron projected onto the unit sphere
    #[default]
    Sphere,
    /// Subdivided cube of half-size 1
    Box,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Box => "box",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = PlanetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sphere" => Ok(ShapeKind::Sphere),
            "box" => Ok(ShapeKind::Box),
            other => Err(PlanetError::InvalidConfig(format!(
                "unknown shape `{}` (expected `sphere` or `box`)",
                other
            ))),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Surface material look of the terrain and sea
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialStyle {
    #[default]
    Simple,
    /// Sea shader with moving caustics
    AnimatedCaustic,
}

impl MaterialStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialStyle::Simple => "simple",
            MaterialStyle::AnimatedCaustic => "animated-caustic",
        }
    }
}

impl FromStr for MaterialStyle {
    type Err = PlanetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(MaterialStyle::Simple),
            "animated-caustic" => Ok(MaterialStyle::AnimatedCaustic),
            other => Err(PlanetError::InvalidConfig(format!(
                "unknown material style `{}` (expected `simple` or `animated-caustic`)",
                other
            ))),
        }
    }
}

impl fmt::Display for MaterialStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional atmosphere shell around the planet
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereOptions {
    pub enabled: bool,
    /// Shell radius as a multiple of the planet radius
    pub height: f32,
    pub color: Color,
}

impl AtmosphereOptions {
    /// Enabled shell with the given height multiplier and tint
    pub fn new(height: f32, color: Color) -> Self {
        Self {
            enabled: true,
            height,
            color,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && !(self.height.is_finite() && self.height >= 1.0) {
            return Err(PlanetError::InvalidConfig(format!(
                "atmosphere height must be >= 1 (got {})",
                self.height
            )));
        }
        Ok(())
    }
}

impl Default for AtmosphereOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            height: 1.1,
            color: Color::from_hex(0x87ceeb),
        }
    }
}

/// Biome of a request: a preset name or a full custom description
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum BiomeSelection {
    Preset(String),
    Custom(Box<BiomeOptions>),
}

impl Default for BiomeSelection {
    fn default() -> Self {
        BiomeSelection::Preset("beach".to_string())
    }
}

/// Input of one planet mesh generation
///
/// # Example
///
/// ```rust
/// use rust_biome_planet::*;
///
/// let request = PlanetRequestBuilder::new()
///     .seed(7)
///     .shape(ShapeKind::Box)
///     .detail(12).unwrap()
///     .biome_preset("forest").unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(request.detail, 12);
/// # #[cfg(feature = "serde")]
/// # {
/// let json = serde_json::to_string(&request).unwrap();
/// let restored: PlanetRequest = serde_json::from_str(&json).unwrap();
/// assert_eq!(request, restored);
/// # }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetRequest {
    pub shape: ShapeKind,
    /// Edge splits per base face
    ///
    /// Signed so that a negative value sent over the wire is reported as a
    /// configuration error instead of failing to decode.
    pub detail: i32,
    /// Seeds preset biomes and the vegetation scatter
    pub seed: u32,
    pub biome: BiomeSelection,
    #[cfg_attr(feature = "serde", serde(default))]
    pub atmosphere: AtmosphereOptions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: MaterialStyle,
}

impl PlanetRequest {
    /// Check every field that can be checked without generating anything
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` or `UnknownBiome` describing the first problem
    pub fn validate(&self) -> Result<()> {
        self.detail_level()?;
        self.atmosphere.validate()?;
        match &self.biome {
            BiomeSelection::Preset(name) => presets::get(name)?.validate(),
            BiomeSelection::Custom(options) => options.validate(),
        }
    }

    /// Detail as an unsigned level
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if detail is outside `0..=MAX_DETAIL`
    pub fn detail_level(&self) -> Result<u32> {
        if !(0..=MAX_DETAIL).contains(&self.detail) {
            return Err(PlanetError::InvalidConfig(format!(
                "detail must be in 0..={} (got {})",
                MAX_DETAIL, self.detail
            )));
        }
        Ok(self.detail as u32)
    }

    /// Biome options this request generates with
    ///
    /// Presets are re-seeded from the request seed; custom biomes keep theirs.
    pub fn resolve_biome(&self) -> Result<BiomeOptions> {
        match &self.biome {
            BiomeSelection::Preset(name) => {
                let mut options = presets::get(name)?;
                options.reseed(self.seed);
                Ok(options)
            }
            BiomeSelection::Custom(options) => Ok((**options).clone()),
        }
    }
}

impl Default for PlanetRequest {
    fn default() -> Self {
        Self {
            shape: ShapeKind::default(),
            detail: 20,
            seed: 0,
            biome: BiomeSelection::default(),
            atmosphere: AtmosphereOptions::default(),
            material: MaterialStyle::default(),
        }
    }
}

/// Builder for creating PlanetRequest with validation
///
/// Setters that can fail check their argument immediately, so configuration
/// errors surface before any generation starts.
#[derive(Debug, Clone)]
pub struct PlanetRequestBuilder {
    shape: ShapeKind,
    detail: i32,
    seed: Option<u32>,
    biome: BiomeSelection,
    atmosphere: AtmosphereOptions,
    material: MaterialStyle,
}

impl PlanetRequestBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - shape: sphere
    /// - detail: 20
    /// - seed: random
    /// - biome: "beach" preset
    /// - atmosphere: disabled
    /// - material: simple
    pub fn new() -> Self {
        let defaults = PlanetRequest::default();
        Self {
            shape: defaults.shape,
            detail: defaults.detail,
            seed: None,
            biome: defaults.biome,
            atmosphere: defaults.atmosphere,
            material: defaults.material,
        }
    }

    pub fn shape(mut self, shape: ShapeKind) -> Self {
        self.shape = shape;
        self
    }

    /// Set the subdivision level
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if detail is outside `0..=MAX_DETAIL`
    pub fn detail(mut self, detail: i32) -> Result<Self> {
        if !(0..=MAX_DETAIL).contains(&detail) {
            return Err(PlanetError::InvalidConfig(format!(
                "detail must be in 0..={} (got {})",
                MAX_DETAIL, detail
            )));
        }
        self.detail = detail;
        Ok(self)
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use a named preset biome
    ///
    /// # Errors
    ///
    /// Returns `UnknownBiome` if the name is not a preset
    pub fn biome_preset(mut self, name: &str) -> Result<Self> {
        presets::get(name)?;
        self.biome = BiomeSelection::Preset(name.to_string());
        Ok(self)
    }

    /// Use a custom biome
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the biome fails validation
    pub fn biome(mut self, options: BiomeOptions) -> Result<Self> {
        options.validate()?;
        self.biome = BiomeSelection::Custom(Box::new(options));
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if an enabled atmosphere has height < 1
    pub fn atmosphere(mut self, atmosphere: AtmosphereOptions) -> Result<Self> {
        atmosphere.validate()?;
        self.atmosphere = atmosphere;
        Ok(self)
    }

    pub fn material(mut self, material: MaterialStyle) -> Self {
        self.material = material;
        self
    }

    /// Build the request
    ///
    /// If no seed was provided, a random one is drawn.
    pub fn build(self) -> Result<PlanetRequest> {
        let request = PlanetRequest {
            shape: self.shape,
            detail: self.detail,
            seed: self.seed.unwrap_or_else(rand::random),
            biome: self.biome,
            atmosphere: self.atmosphere,
            material: self.material,
        };
        request.validate()?;
        Ok(request)
    }
}

impl Default for PlanetRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
