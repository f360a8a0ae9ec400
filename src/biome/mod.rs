//! Biome model: terrain and sea height fields, their color gradients and
//! the vegetation rules of one planet look
//!
//! A [`Biome`] is built from declarative [`BiomeOptions`] for a single mesh
//! generation and owns the vegetation spatial index used while scattering.

pub mod presets;
mod vegetation;

pub use vegetation::{GroundDecoration, MaterialVariant, VegetationItemSpec, MAX_DENSITY};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::collections::HashSet;

use glam::Vec3;

use crate::color::{Color, ColorGradient};
use crate::error::{PlanetError, Result};
use crate::noise::{NoiseConfig, NoiseEngine};
use crate::spatial::{Aabb, PointOctree};

/// Half-size of the vegetation index around the origin
///
/// Placement points lie on the unit sphere or the unit cube surface.
const INDEX_HALF_SIZE: f32 = 1.05;

/// Declarative description of a biome
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeOptions {
    pub terrain: NoiseConfig,
    pub land_gradient: ColorGradient,
    pub sea: NoiseConfig,
    pub sea_gradient: ColorGradient,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vegetation: Vec<VegetationItemSpec>,
    /// Color that `tint_factor` blends terrain toward; the mesh builder
    /// shades the ground around placed vegetation with it
    #[cfg_attr(feature = "serde", serde(default))]
    pub tint_color: Color,
}

impl BiomeOptions {
    /// Check noise ranges and vegetation rules
    pub fn validate(&self) -> Result<()> {
        self.terrain.validate()?;
        self.sea.validate()?;

        let mut names = HashSet::new();
        for item in &self.vegetation {
            item.validate()?;
            if !names.insert(item.name.as_str()) {
                return Err(PlanetError::InvalidConfig(format!(
                    "duplicate vegetation item `{}`",
                    item.name
                )));
            }
        }
        Ok(())
    }

    /// Re-seed the terrain field with `seed` and the sea field with `seed + 1`
    pub fn reseed(&mut self, seed: u32) {
        self.terrain.reseed(seed);
        self.sea.reseed(seed.wrapping_add(1));
    }

    /// Representative land color, used for the flat fallback planet
    pub fn land_tint(&self) -> Color {
        self.land_gradient.get(0.5, &[])
    }
}

/// A placed vegetation instance found by [`Biome::items_around`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyItem {
    pub point: Vec3,
    pub distance: f32,
    /// Index into [`Biome::vegetation`]
    pub item: usize,
}

/// Runtime biome with built noise engines and a vegetation index
#[derive(Debug)]
pub struct Biome {
    terrain: NoiseEngine,
    sea: NoiseEngine,
    land_gradient: ColorGradient,
    sea_gradient: ColorGradient,
    tint_color: Color,
    vegetation: Vec<VegetationItemSpec>,
    index: PointOctree<usize>,
    max_radius: f32,
}

impl Biome {
    pub fn new(options: &BiomeOptions) -> Result<Self> {
        options.validate()?;

        let max_radius = options
            .vegetation
            .iter()
            .map(VegetationItemSpec::ground_radius)
            .fold(0.0, f32::max);

        Ok(Self {
            terrain: NoiseEngine::new(&options.terrain)?,
            sea: NoiseEngine::new(&options.sea)?,
            land_gradient: options.land_gradient.clone(),
            sea_gradient: options.sea_gradient.clone(),
            tint_color: options.tint_color,
            vegetation: options.vegetation.clone(),
            index: PointOctree::new(Aabb::around(Vec3::ZERO, INDEX_HALF_SIZE)),
            max_radius,
        })
    }

    /// Terrain displacement at a surface coordinate
    pub fn get_height(&self, pos: Vec3) -> f32 {
        self.terrain.get_vec3(pos) as f32
    }

    /// Terrain height normalized to [0, 1], the land gradient's domain
    pub fn get_normalized_height(&self, pos: Vec3) -> f32 {
        self.terrain.get_unit(&coords3(pos)) as f32
    }

    /// Land color at `pos`
    ///
    /// `normalized` skips re-evaluating the terrain field when the caller
    /// already has it. Nested gradients are indexed by latitude `|pos.y|`.
    pub fn get_color(&self, pos: Vec3, normalized: Option<f32>, tint_factor: f32) -> Color {
        let t = normalized.unwrap_or_else(|| self.get_normalized_height(pos));
        let color = self.land_gradient.get(t, &[latitude(pos)]);
        if tint_factor > 0.0 {
            color.lerp(self.tint_color, tint_factor.min(1.0))
        } else {
            color
        }
    }

    /// Sea displacement at rest
    pub fn get_sea_height(&self, pos: Vec3) -> f32 {
        self.get_sea_height_at_phase(pos, 0.0)
    }

    /// Sea displacement with the wave phase as the fourth coordinate
    pub fn get_sea_height_at_phase(&self, pos: Vec3, phase: f32) -> f32 {
        self.sea.get(&coords4(pos, phase)) as f32
    }

    pub fn get_sea_color(&self, pos: Vec3, normalized: Option<f32>) -> Color {
        let t = normalized.unwrap_or_else(|| self.sea.get_unit(&coords4(pos, 0.0)) as f32);
        self.sea_gradient.get(t, &[latitude(pos)])
    }

    pub fn vegetation(&self) -> &[VegetationItemSpec] {
        &self.vegetation
    }

    pub fn item_index(&self, name: &str) -> Option<usize> {
        self.vegetation.iter().position(|v| v.name == name)
    }

    /// Number of placed vegetation instances
    pub fn vegetation_count(&self) -> usize {
        self.index.len()
    }

    /// Record a placed instance of `item_name`
    ///
    /// Returns `false` for an unknown item or a point outside the index.
    pub fn add_vegetation(&mut self, item_name: &str, point: Vec3) -> bool {
        match self.item_index(item_name) {
            Some(item) => self.add_vegetation_at(item, point),
            None => false,
        }
    }

    pub(crate) fn add_vegetation_at(&mut self, item: usize, point: Vec3) -> bool {
        item < self.vegetation.len() && self.index.insert(point, item)
    }

    /// Distance to the closest placed instance within `radius`
    pub fn closest_vegetation_distance(&self, point: Vec3, radius: f32) -> Option<f32> {
        self.index.nearest_distance(point, radius)
    }

    /// Whether an instance sits strictly closer than `radius`
    pub fn has_vegetation_within(&self, point: Vec3, radius: f32) -> bool {
        self.index.any_within(point, radius)
    }

    /// Placed instances within `radius` of `point`
    pub fn items_around(&self, point: Vec3, radius: f32) -> Vec<NearbyItem> {
        self.index
            .query_radius(point, radius)
            .into_iter()
            .map(|(p, &item)| NearbyItem {
                point: p,
                distance: p.distance(point),
                item,
            })
            .collect()
    }

    /// Largest ground decoration radius over all vegetation items
    pub fn max_vegetation_radius(&self) -> f32 {
        self.max_radius
    }
}

#[inline]
fn coords3(pos: Vec3) -> [f64; 3] {
    [pos.x as f64, pos.y as f64, pos.z as f64]
}

#[inline]
fn coords4(pos: Vec3, phase: f32) -> [f64; 4] {
    [pos.x as f64, pos.y as f64, pos.z as f64, phase as f64]
}

#[inline]
fn latitude(pos: Vec3) -> f32 {
    pos.normalize_or_zero().y.abs()
}
