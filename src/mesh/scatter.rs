//! Rejection-sampling vegetation scatter

use std::collections::BTreeMap;

use rand::Rng;

use super::shape::BaseShape;
use crate::biome::Biome;

/// Attempt budget per expected instance
///
/// Dense items on a crowded surface would otherwise never finish.
pub const SCATTER_ATTEMPTS_PER_INSTANCE: usize = 4;

/// Upper bound on the points buffer reserved up front per item
const MAX_RESERVED_POINTS: usize = 4096;

/// Scatter every vegetation item of `biome` over `shape`
///
/// Candidates are uniform surface points. A candidate is rejected when the
/// terrain there is below the item's minimum height, or when any already
/// placed vegetation of any item is closer than the item's spacing. Accepted
/// points are inserted into the biome index and returned per item name.
pub fn scatter_vegetation<R: Rng>(
    biome: &mut Biome,
    shape: &BaseShape,
    rng: &mut R,
) -> BTreeMap<String, Vec<[f32; 3]>> {
    let area = shape.surface_area();
    let mut placed: BTreeMap<String, Vec<[f32; 3]>> = BTreeMap::new();

    for item in 0..biome.vegetation().len() {
        let spec = &biome.vegetation()[item];
        let name = spec.name.clone();
        let target = spec.expected_count();
        let spacing = spec.spacing(area);
        let min_height = spec.min_height;
        let attempts = target.saturating_mul(SCATTER_ATTEMPTS_PER_INSTANCE);

        let mut points = Vec::with_capacity(target.min(MAX_RESERVED_POINTS));
        let mut rejected_height = 0usize;
        let mut rejected_spacing = 0usize;

        for _ in 0..attempts {
            if points.len() >= target {
                break;
            }
            let candidate = shape.sample_surface(rng);
            if biome.get_height(candidate.direction) < min_height {
                rejected_height += 1;
                continue;
            }
            if biome.has_vegetation_within(candidate.point, spacing) {
                rejected_spacing += 1;
                continue;
            }
            if biome.add_vegetation_at(item, candidate.point) {
                points.push(candidate.point.to_array());
            }
        }

        log::debug!(
            "scattered {}/{} `{}` (spacing {:.4}, rejected {} by height, {} by spacing)",
            points.len(),
            target,
            name,
            spacing,
            rejected_height,
            rejected_spacing
        );
        placed.entry(name).or_default().extend(points);
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{BiomeOptions, VegetationItemSpec};
    use crate::color::{Color, ColorGradient};
    use crate::config::ShapeKind;
    use crate::noise::NoiseConfig;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn biome_with(vegetation: Vec<VegetationItemSpec>) -> Biome {
        Biome::new(&BiomeOptions {
            terrain: NoiseConfig::new(11).with_range(-0.05, 0.05).with_octaves(3),
            land_gradient: ColorGradient::solid(Color::WHITE),
            sea: NoiseConfig::new(12).with_range(0.0, 0.0),
            sea_gradient: ColorGradient::solid(Color::BLACK),
            vegetation,
            tint_color: Color::BLACK,
        })
        .unwrap()
    }

    fn all_points(placed: &BTreeMap<String, Vec<[f32; 3]>>) -> Vec<Vec3> {
        placed
            .values()
            .flatten()
            .map(|p| Vec3::from_array(*p))
            .collect()
    }

    #[test]
    fn test_minimum_spacing_holds() {
        let spacing = 0.05;
        let mut biome = biome_with(vec![
            VegetationItemSpec::new("tree", 100.0).with_min_height(-1.0).with_spacing(spacing)
        ]);
        let shape = BaseShape::new(ShapeKind::Sphere, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let placed = scatter_vegetation(&mut biome, &shape, &mut rng);

        let points = all_points(&placed);
        assert!(!points.is_empty());
        assert!(points.len() <= 100);
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= spacing - 1e-6);
            }
        }
        assert_eq!(biome.vegetation_count(), points.len());
    }

    #[test]
    fn test_spacing_applies_across_items() {
        let mut biome = biome_with(vec![
            VegetationItemSpec::new("tree", 60.0).with_min_height(-1.0).with_spacing(0.2),
            VegetationItemSpec::new("bush", 60.0).with_min_height(-1.0).with_spacing(0.2),
        ]);
        let shape = BaseShape::new(ShapeKind::Box, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let placed = scatter_vegetation(&mut biome, &shape, &mut rng);

        let points = all_points(&placed);
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 0.2 - 1e-6);
            }
            // Box placements lie on the cube surface
            assert!((a.abs().max_element() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_min_height_excludes_everything_above_range() {
        let mut biome = biome_with(vec![VegetationItemSpec::new("palm", 50.0).with_min_height(0.5)]);
        let shape = BaseShape::new(ShapeKind::Sphere, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let placed = scatter_vegetation(&mut biome, &shape, &mut rng);

        assert_eq!(placed["palm"].len(), 0);
        assert_eq!(biome.vegetation_count(), 0);
    }

    #[test]
    fn test_scatter_is_deterministic() {
        let shape = BaseShape::new(ShapeKind::Sphere, 1);
        let run = || {
            let mut biome = biome_with(vec![VegetationItemSpec::new("tree", 40.0).with_min_height(-1.0)]);
            let mut rng = ChaCha8Rng::seed_from_u64(77);
            scatter_vegetation(&mut biome, &shape, &mut rng)
        };
        assert_eq!(run(), run());
    }
}
