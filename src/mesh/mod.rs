//! Planet mesh generation
//!
//! Produces engine-agnostic flat buffers (three floats per vertex) for the
//! displaced terrain, the two-state sea shell and the vegetation placements.
//! Buffers are unindexed triangle lists with flat normals, ready to upload:
//! - wgpu / WebGL: use directly as vertex buffers
//! - Bevy: insert as `Mesh` attributes
//! - Godot: convert to `ArrayMesh` arrays

mod builder;
mod scatter;
mod shape;

pub use builder::{MeshBuilder, SEA_WAVE_PHASE, VEGETATION_TINT_RADIUS, VEGETATION_TINT_STRENGTH};
pub use scatter::{scatter_vegetation, SCATTER_ATTEMPTS_PER_INSTANCE};
pub use shape::{BaseShape, ShapeCache, SurfacePoint, DEFAULT_SHAPE_CACHE_CAPACITY};

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use glam::Vec3;

use crate::color::Color;
use crate::config::ShapeKind;

/// Subdivision level of the fallback planet
pub const FALLBACK_DETAIL: u32 = 3;

/// Flat vertex buffers of one mesh
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
}

impl GeometryBuffers {
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices * 3),
            colors: Vec::with_capacity(vertices * 3),
            normals: Vec::with_capacity(vertices * 3),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn push_vertex(&mut self, position: Vec3, color: Color, normal: Vec3) {
        self.positions.extend_from_slice(&position.to_array());
        self.colors.extend_from_slice(&color.to_array());
        self.normals.extend_from_slice(&normal.to_array());
    }

    /// All three buffers hold the same whole number of vertices
    pub fn is_consistent(&self) -> bool {
        self.positions.len() % 3 == 0
            && self.colors.len() == self.positions.len()
            && self.normals.len() == self.positions.len()
    }
}

/// Alternate vertex state blended in by a single weight
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
}

impl MorphTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Sea shell with its rest and wave states
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct SeaGeometry {
    /// Drawn geometry, identical to the rest state
    pub base: GeometryBuffers,
    /// `[rest, wave]`
    pub morph_targets: [MorphTarget; 2],
}

impl SeaGeometry {
    pub fn empty() -> Self {
        Self {
            base: GeometryBuffers::default(),
            morph_targets: [MorphTarget::new("rest"), MorphTarget::new("wave")],
        }
    }

    pub fn rest(&self) -> &MorphTarget {
        &self.morph_targets[0]
    }

    pub fn wave(&self) -> &MorphTarget {
        &self.morph_targets[1]
    }

    pub fn is_consistent(&self) -> bool {
        self.base.is_consistent()
            && self.morph_targets.iter().all(|m| {
                m.positions.len() == self.base.positions.len()
                    && m.normals.len() == self.base.positions.len()
            })
    }
}

impl Default for SeaGeometry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Output of one planet mesh generation
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanetMeshResult {
    pub terrain: GeometryBuffers,
    pub sea: SeaGeometry,
    /// Placement points on the undisplaced surface, per item name
    pub vegetation: BTreeMap<String, Vec<[f32; 3]>>,
}

impl PlanetMeshResult {
    /// Terrain vertex count
    pub fn vertex_count(&self) -> usize {
        self.terrain.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.terrain.triangle_count()
    }

    /// Number of vegetation placements over all items
    pub fn vegetation_count(&self) -> usize {
        self.vegetation.values().map(Vec::len).sum()
    }

    /// Terrain and sea buffers agree on their vertex counts
    pub fn is_consistent(&self) -> bool {
        self.terrain.is_consistent() && self.sea.is_consistent()
    }
}

/// Minimal planet shown when generation fails
///
/// A flat-colored icosphere with no sea and no vegetation.
pub fn fallback_mesh(color: Color) -> PlanetMeshResult {
    let shape = BaseShape::new(ShapeKind::Sphere, FALLBACK_DETAIL);
    let points = shape.points();

    let mut terrain = GeometryBuffers::with_capacity(shape.triangle_count() * 3);
    for tri in shape.triangles() {
        let [a, b, c] = tri.map(|i| points[i as usize]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for p in [a, b, c] {
            terrain.push_vertex(p, color, normal);
        }
    }

    PlanetMeshResult {
        terrain,
        sea: SeaGeometry::empty(),
        vegetation: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_mesh() {
        let color = Color::new(0.2, 0.6, 0.3);
        let mesh = fallback_mesh(color);
        let n = (FALLBACK_DETAIL + 1) as usize;

        assert_eq!(mesh.triangle_count(), 20 * n * n);
        assert!(mesh.is_consistent());
        assert!(mesh.sea.base.is_empty());
        assert_eq!(mesh.vegetation_count(), 0);
        assert!(mesh.terrain.colors.chunks(3).all(|c| c == color.to_array()));
    }

    #[test]
    fn test_inconsistent_sea_detected() {
        let mut mesh = fallback_mesh(Color::WHITE);
        mesh.sea.base.push_vertex(Vec3::X, Color::WHITE, Vec3::X);
        assert!(!mesh.is_consistent());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_result_json_field_names() {
        let json = serde_json::to_value(fallback_mesh(Color::WHITE)).unwrap();
        assert!(json["terrain"]["positions"].is_array());
        assert_eq!(json["sea"]["morphTargets"][1]["name"], "wave");
        assert!(json["vegetation"].is_object());
    }
}
