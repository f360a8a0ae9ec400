//! Vegetation item descriptors

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{PlanetError, Result};

/// Exponent of the ground decoration falloff curve
const GROUND_FALLOFF_POWER: i32 = 2;

/// Largest accepted instance count per item over the whole planet
pub const MAX_DENSITY: f32 = 100_000.0;

/// A texture and the tints an instance may be drawn with
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialVariant {
    pub texture: Option<String>,
    pub tints: Vec<Color>,
}

impl MaterialVariant {
    pub fn tinted(tints: Vec<Color>) -> Self {
        Self {
            texture: None,
            tints,
        }
    }
}

/// Terrain raise and color blend around a large item, so it sits in the ground
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundDecoration {
    /// Influence radius in surface units
    pub radius: f32,
    /// Outward displacement at the item center
    pub raise: f32,
    /// Terrain color at the item center
    pub color: Color,
}

impl GroundDecoration {
    /// Influence weight at `distance`: 1 at the center, 0 at `radius`
    pub fn falloff(&self, distance: f32) -> f32 {
        if self.radius <= 0.0 || distance >= self.radius {
            return 0.0;
        }
        (1.0 - distance / self.radius).powi(GROUND_FALLOFF_POWER)
    }
}

/// Rules for one kind of vegetation
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationItemSpec {
    /// Identifier, also used to look up models
    pub name: String,
    /// Expected number of instances over the whole planet surface
    pub density: f32,
    /// Minimum distance to any other vegetation; derived from density when unset
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_spacing: Option<f32>,
    /// Terrain height below which the item is not placed
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_height: f32,
    /// Named material variants
    #[cfg_attr(feature = "serde", serde(default))]
    pub materials: BTreeMap<String, MaterialVariant>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ground: Option<GroundDecoration>,
}

impl VegetationItemSpec {
    pub fn new(name: impl Into<String>, density: f32) -> Self {
        Self {
            name: name.into(),
            density,
            min_spacing: None,
            min_height: 0.0,
            materials: BTreeMap::new(),
            ground: None,
        }
    }

    pub fn with_min_height(mut self, min_height: f32) -> Self {
        self.min_height = min_height;
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.min_spacing = Some(spacing);
        self
    }

    pub fn with_material(mut self, name: impl Into<String>, variant: MaterialVariant) -> Self {
        self.materials.insert(name.into(), variant);
        self
    }

    pub fn with_ground(mut self, ground: GroundDecoration) -> Self {
        self.ground = Some(ground);
        self
    }

    /// Minimum spacing on a surface of the given area
    ///
    /// Without an explicit value this is half the side of the square each
    /// instance would own at the target density.
    pub fn spacing(&self, surface_area: f32) -> f32 {
        self.min_spacing
            .unwrap_or_else(|| 0.5 * (surface_area / self.density.max(f32::EPSILON)).sqrt())
    }

    /// Target instance count, rounded up and clamped to [`MAX_DENSITY`]
    pub fn expected_count(&self) -> usize {
        self.density.clamp(0.0, MAX_DENSITY).ceil() as usize
    }

    /// Ground decoration radius, or 0 when undecorated
    pub fn ground_radius(&self) -> f32 {
        self.ground.map_or(0.0, |g| g.radius)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PlanetError::InvalidConfig(
                "vegetation item name must not be empty".into(),
            ));
        }
        if !(self.density.is_finite() && self.density > 0.0 && self.density <= MAX_DENSITY) {
            return Err(PlanetError::InvalidConfig(format!(
                "vegetation `{}` density must be in (0, {}] (got {})",
                self.name, MAX_DENSITY, self.density
            )));
        }
        if let Some(spacing) = self.min_spacing {
            if !(spacing.is_finite() && spacing >= 0.0) {
                return Err(PlanetError::InvalidConfig(format!(
                    "vegetation `{}` spacing must be >= 0 (got {})",
                    self.name, spacing
                )));
            }
        }
        if let Some(ground) = self.ground {
            if !(ground.radius.is_finite() && ground.radius > 0.0) {
                return Err(PlanetError::InvalidConfig(format!(
                    "vegetation `{}` ground radius must be positive (got {})",
                    self.name, ground.radius
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff_curve() {
        let ground = GroundDecoration {
            radius: 0.1,
            raise: 0.01,
            color: Color::BLACK,
        };
        assert_eq!(ground.falloff(0.0), 1.0);
        assert_eq!(ground.falloff(0.1), 0.0);
        assert_eq!(ground.falloff(0.5), 0.0);
        // Power curve sits below linear
        assert!((ground.falloff(0.05) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_spacing_derived_from_density() {
        let spec = VegetationItemSpec::new("tree", 100.0);
        let area = 4.0 * std::f32::consts::PI;
        let expected = 0.5 * (area / 100.0).sqrt();
        assert!((spec.spacing(area) - expected).abs() < 1e-6);

        let spec = spec.with_spacing(0.05);
        assert_eq!(spec.spacing(area), 0.05);
    }

    #[test]
    fn test_expected_count_rounds_up() {
        assert_eq!(VegetationItemSpec::new("a", 10.2).expected_count(), 11);
    }

    #[test]
    fn test_validation() {
        assert!(VegetationItemSpec::new("tree", 10.0).validate().is_ok());
        assert!(VegetationItemSpec::new("", 10.0).validate().is_err());
        assert!(VegetationItemSpec::new("tree", 0.0).validate().is_err());
        assert!(VegetationItemSpec::new("tree", f32::NAN).validate().is_err());

        let bad_ground = VegetationItemSpec::new("rock", 5.0).with_ground(GroundDecoration {
            radius: 0.0,
            raise: 0.1,
            color: Color::BLACK,
        });
        assert!(bad_ground.validate().is_err());
    }

    #[test]
    fn test_oversized_density_rejected() {
        assert!(VegetationItemSpec::new("grass", MAX_DENSITY).validate().is_ok());
        let err = VegetationItemSpec::new("grass", 1.0e13).validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(VegetationItemSpec::new("grass", f32::INFINITY).validate().is_err());
        assert_eq!(
            VegetationItemSpec::new("grass", 1.0e13).expected_count(),
            MAX_DENSITY as usize
        );
    }
}
