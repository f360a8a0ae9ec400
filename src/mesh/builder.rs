//! Planet mesh pipeline
//!
//! Base shape, height displacement, vegetation scatter, ground decoration,
//! sea shell, then flat buffers. Everything runs sequentially on the calling
//! thread; the biome and its vegetation index live only for one build.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::scatter::scatter_vegetation;
use super::shape::{build_logged, BaseShape, ShapeCache, DEFAULT_SHAPE_CACHE_CAPACITY};
use super::{GeometryBuffers, MorphTarget, PlanetMeshResult, SeaGeometry};
use crate::biome::Biome;
use crate::color::Color;
use crate::config::{PlanetRequest, ShapeKind};
use crate::error::{PlanetError, Result};

/// Fourth noise coordinate of the sea's wave state
pub const SEA_WAVE_PHASE: f32 = 0.35;

/// Radius of the biome tint shading around every placed instance
pub const VEGETATION_TINT_RADIUS: f32 = 0.08;

/// Tint factor right at an instance
pub const VEGETATION_TINT_STRENGTH: f32 = 0.5;

/// Builds planet meshes, reusing base shape topology between requests
#[derive(Debug)]
pub struct MeshBuilder {
    cache: Mutex<ShapeCache>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_SHAPE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(ShapeCache::new(capacity)),
        }
    }

    /// Number of cached base shapes
    pub fn cached_shapes(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Shared base shape for `kind` at `detail`
    ///
    /// A miss is built without holding the cache lock, so other requests keep
    /// using cached shapes meanwhile. Two concurrent misses on the same key
    /// both build; the first insert is kept.
    pub fn shape(&self, kind: ShapeKind, detail: u32) -> Arc<BaseShape> {
        if let Some(shape) = self.lock_cache().get(kind, detail) {
            return shape;
        }
        let built = Arc::new(build_logged(kind, detail));
        self.lock_cache().insert(built)
    }

    // A panic while building a shape leaves the cache itself intact
    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ShapeCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate the full mesh for `request`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid request, or
    /// `GenerationFailed` if the result would contain non-finite values
    pub fn build(&self, request: &PlanetRequest) -> Result<PlanetMeshResult> {
        let started = Instant::now();
        request.validate()?;
        let detail = request.detail_level()?;
        let mut biome = Biome::new(&request.resolve_biome()?)?;
        let shape = self.shape(request.shape, detail);

        let surface = displace_terrain(&biome, &shape);

        let mut rng = ChaCha8Rng::seed_from_u64(request.seed as u64);
        let vegetation = scatter_vegetation(&mut biome, &shape, &mut rng);

        let surface = decorate_ground(&biome, &shape, surface);
        let terrain = flat_buffers(&shape, &surface.positions, &surface.colors);
        let sea = sea_shell(&biome, &shape);

        let result = PlanetMeshResult {
            terrain,
            sea,
            vegetation,
        };
        ensure_finite(&result)?;

        log::info!(
            "built {} planet (detail {}, seed {}) in {:.1?}: {} triangles, {} vegetation",
            request.shape,
            detail,
            request.seed,
            started.elapsed(),
            result.triangle_count(),
            result.vegetation_count()
        );
        Ok(result)
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per shared vertex state before expansion to triangles
struct Surface {
    heights: Vec<f32>,
    normalized: Vec<f32>,
    positions: Vec<Vec3>,
    colors: Vec<Color>,
}

fn displace_terrain(biome: &Biome, shape: &BaseShape) -> Surface {
    let n = shape.vertex_count();
    let mut surface = Surface {
        heights: Vec::with_capacity(n),
        normalized: Vec::with_capacity(n),
        positions: Vec::with_capacity(n),
        colors: Vec::with_capacity(n),
    };

    for (point, dir) in shape.points().iter().zip(shape.directions()) {
        let height = biome.get_height(*dir);
        let normalized = biome.get_normalized_height(*dir);
        surface.heights.push(height);
        surface.normalized.push(normalized);
        surface.positions.push(*point + *dir * height);
        surface.colors.push(biome.get_color(*dir, Some(normalized), 0.0));
    }
    surface
}

/// Shade terrain toward the biome tint around every instance, then raise and
/// recolor it around decorated ones
fn decorate_ground(biome: &Biome, shape: &BaseShape, mut surface: Surface) -> Surface {
    if biome.vegetation_count() == 0 {
        return surface;
    }
    let radius = biome.max_vegetation_radius().max(VEGETATION_TINT_RADIUS);

    let specs = biome.vegetation();
    let mut touched = 0usize;
    for (i, (point, dir)) in shape.points().iter().zip(shape.directions()).enumerate() {
        let nearby = biome.items_around(*point, radius);
        if nearby.is_empty() {
            continue;
        }

        let shade = nearby
            .iter()
            .map(|n| tint_falloff(n.distance))
            .fold(0.0, f32::max);
        let mut color = biome.get_color(
            *dir,
            Some(surface.normalized[i]),
            shade * VEGETATION_TINT_STRENGTH,
        );

        let mut raise = 0.0;
        for item in &nearby {
            let Some(ground) = specs[item.item].ground else {
                continue;
            };
            let weight = ground.falloff(item.distance);
            if weight > 0.0 {
                raise += ground.raise * weight;
                color = color.lerp(ground.color, weight);
            }
        }

        surface.colors[i] = color;
        if raise != 0.0 {
            surface.positions[i] = *point + *dir * (surface.heights[i] + raise);
        }
        touched += 1;
    }

    log::debug!("vegetation shading touched {} vertices", touched);
    surface
}

fn tint_falloff(distance: f32) -> f32 {
    if distance >= VEGETATION_TINT_RADIUS {
        return 0.0;
    }
    (1.0 - distance / VEGETATION_TINT_RADIUS).powi(2)
}

fn sea_shell(biome: &Biome, shape: &BaseShape) -> SeaGeometry {
    let n = shape.vertex_count();
    let mut rest = Vec::with_capacity(n);
    let mut wave = Vec::with_capacity(n);
    let mut colors = Vec::with_capacity(n);

    for (point, dir) in shape.points().iter().zip(shape.directions()) {
        rest.push(*point + *dir * biome.get_sea_height_at_phase(*dir, 0.0));
        wave.push(*point + *dir * biome.get_sea_height_at_phase(*dir, SEA_WAVE_PHASE));
        colors.push(biome.get_sea_color(*dir, None));
    }

    let base = flat_buffers(shape, &rest, &colors);
    let wave_buffers = flat_buffers(shape, &wave, &colors);

    let mut rest_target = MorphTarget::new("rest");
    rest_target.positions = base.positions.clone();
    rest_target.normals = base.normals.clone();

    let mut wave_target = MorphTarget::new("wave");
    wave_target.positions = wave_buffers.positions;
    wave_target.normals = wave_buffers.normals;

    SeaGeometry {
        base,
        morph_targets: [rest_target, wave_target],
    }
}

/// Expand shared vertices into an unindexed triangle list with face normals
fn flat_buffers(shape: &BaseShape, positions: &[Vec3], colors: &[Color]) -> GeometryBuffers {
    let mut out = GeometryBuffers::with_capacity(shape.triangle_count() * 3);
    for tri in shape.triangles() {
        let [a, b, c] = tri.map(|i| positions[i as usize]);
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        if normal == Vec3::ZERO {
            // Degenerate after displacement; fall back to the radial direction
            normal = (a + b + c).normalize_or_zero();
        }
        for (&i, p) in tri.iter().zip([a, b, c]) {
            out.push_vertex(p, colors[i as usize], normal);
        }
    }
    out
}

fn ensure_finite(result: &PlanetMeshResult) -> Result<()> {
    let buffers = [
        &result.terrain.positions,
        &result.terrain.normals,
        &result.terrain.colors,
        &result.sea.base.positions,
        &result.sea.wave().positions,
    ];
    if buffers.iter().any(|b| b.iter().any(|v| !v.is_finite())) {
        return Err(PlanetError::GenerationFailed(
            "mesh contains non-finite values".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{presets, BiomeOptions, GroundDecoration, VegetationItemSpec};
    use crate::color::ColorGradient;
    use crate::config::{BiomeSelection, PlanetRequestBuilder};
    use crate::noise::NoiseConfig;

    fn request(shape: ShapeKind, detail: i32, biome: &str) -> PlanetRequest {
        PlanetRequestBuilder::new()
            .seed(42)
            .shape(shape)
            .detail(detail)
            .unwrap()
            .biome_preset(biome)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_buffers_are_consistent() {
        let builder = MeshBuilder::new();
        for shape in [ShapeKind::Sphere, ShapeKind::Box] {
            let mesh = builder.build(&request(shape, 4, "forest")).unwrap();
            assert!(mesh.is_consistent());
            assert_eq!(mesh.sea.base.vertex_count(), mesh.vertex_count());
            assert_eq!(mesh.sea.wave().positions.len(), mesh.sea.base.positions.len());
        }
    }

    #[test]
    fn test_same_seed_same_bytes() {
        let builder = MeshBuilder::new();
        let a = builder.build(&request(ShapeKind::Sphere, 20, "beach")).unwrap();
        // A fresh builder rebuilds the topology from scratch
        let b = MeshBuilder::new().build(&request(ShapeKind::Sphere, 20, "beach")).unwrap();

        assert_eq!(a.terrain.positions, b.terrain.positions);
        assert_eq!(a.terrain.colors, b.terrain.colors);
        assert_eq!(a.vegetation, b.vegetation);
    }

    #[test]
    fn test_vegetation_names_match_biome() {
        let mesh = MeshBuilder::new()
            .build(&request(ShapeKind::Sphere, 6, "forest"))
            .unwrap();
        let names: Vec<&str> = mesh.vegetation.keys().map(String::as_str).collect();
        assert_eq!(names, ["bush", "rock", "tree"]);
    }

    #[test]
    fn test_sea_wave_differs_from_rest() {
        let mesh = MeshBuilder::new()
            .build(&request(ShapeKind::Sphere, 4, "beach"))
            .unwrap();
        assert_eq!(mesh.sea.rest().positions, mesh.sea.base.positions);
        assert_ne!(mesh.sea.wave().positions, mesh.sea.rest().positions);
    }

    #[test]
    fn test_negative_detail_fails() {
        let mut bad = request(ShapeKind::Sphere, 2, "beach");
        bad.detail = -1;
        let err = MeshBuilder::new().build(&bad).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_cache_reused_between_builds() {
        let builder = MeshBuilder::with_cache_capacity(2);
        builder.build(&request(ShapeKind::Sphere, 3, "beach")).unwrap();
        builder.build(&request(ShapeKind::Sphere, 3, "desert")).unwrap();
        assert_eq!(builder.cached_shapes(), 1);
        builder.build(&request(ShapeKind::Box, 3, "desert")).unwrap();
        assert_eq!(builder.cached_shapes(), 2);
        builder.clear_cache();
        assert_eq!(builder.cached_shapes(), 0);
    }

    #[test]
    fn test_ground_decoration_raises_terrain() {
        let flat = |ground: Option<GroundDecoration>| {
            let mut rock = VegetationItemSpec::new("rock", 30.0).with_min_height(-1.0);
            rock.ground = ground;
            let options = BiomeOptions {
                terrain: NoiseConfig::new(1).with_range(0.0, 0.0),
                land_gradient: ColorGradient::solid(Color::WHITE),
                sea: NoiseConfig::new(2).with_range(-0.01, 0.0),
                sea_gradient: ColorGradient::solid(Color::BLACK),
                vegetation: vec![rock],
                tint_color: Color::BLACK,
            };
            let request = PlanetRequest {
                detail: 8,
                seed: 5,
                biome: BiomeSelection::Custom(Box::new(options)),
                ..Default::default()
            };
            MeshBuilder::new().build(&request).unwrap()
        };

        let plain = flat(None);
        let decorated = flat(Some(GroundDecoration {
            radius: 0.3,
            raise: 0.05,
            color: Color::BLACK,
        }));

        let max_radius = |m: &PlanetMeshResult| {
            m.terrain
                .positions
                .chunks(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]).length())
                .fold(0.0_f32, f32::max)
        };
        assert!((max_radius(&plain) - 1.0).abs() < 1e-5);
        assert!(max_radius(&decorated) > 1.0 + 1e-3);
        assert!(decorated.terrain.colors.iter().any(|c| *c < 1.0));
        assert_eq!(plain.vegetation, decorated.vegetation);
    }

    #[test]
    fn test_vegetation_tints_nearby_terrain() {
        let build = |vegetation: Vec<VegetationItemSpec>| {
            let options = BiomeOptions {
                terrain: NoiseConfig::new(1).with_range(0.0, 0.0),
                land_gradient: ColorGradient::solid(Color::WHITE),
                sea: NoiseConfig::new(2).with_range(-0.01, 0.0),
                sea_gradient: ColorGradient::solid(Color::BLACK),
                vegetation,
                tint_color: Color::new(1.0, 0.0, 0.0),
            };
            let request = PlanetRequest {
                detail: 12,
                seed: 9,
                biome: BiomeSelection::Custom(Box::new(options)),
                ..Default::default()
            };
            MeshBuilder::new().build(&request).unwrap()
        };

        let bare = build(Vec::new());
        assert!(bare.terrain.colors.iter().all(|c| *c == 1.0));

        let planted = build(vec![VegetationItemSpec::new("shrub", 40.0).with_min_height(-1.0)]);
        assert!(planted.vegetation_count() > 0);
        let rgb: Vec<&[f32]> = planted.terrain.colors.chunks(3).collect();
        // Blending toward red lowers green and blue but never red
        assert!(rgb.iter().all(|c| c[0] == 1.0));
        assert!(rgb.iter().any(|c| c[1] < 1.0 && c[1] >= 1.0 - VEGETATION_TINT_STRENGTH - 1e-6));
        assert!(rgb.iter().any(|c| c[1] == 1.0));
    }

    #[test]
    fn test_every_preset_generates() {
        let builder = MeshBuilder::new();
        for name in presets::names() {
            let mesh = builder.build(&request(ShapeKind::Sphere, 3, name)).unwrap();
            assert!(mesh.is_consistent());
            assert!(mesh.vertex_count() > 0);
        }
    }
}
