//! Named biome presets
//!
//! Terrain heights are offsets from the unit radius; sea level sits at 0, so
//! vegetation thresholds just above 0 keep items out of the water.

use crate::color::{Color, ColorGradient, ColorStop};
use crate::error::{PlanetError, Result};
use crate::noise::NoiseConfig;

use super::{BiomeOptions, GroundDecoration, MaterialVariant, VegetationItemSpec};

const PRESET_NAMES: [&str; 4] = ["beach", "forest", "snowy forest", "desert"];

/// Names accepted by [`get`]
pub fn names() -> &'static [&'static str] {
    &PRESET_NAMES
}

/// Resolve a preset by name
///
/// # Errors
///
/// Returns `UnknownBiome` for a name not in [`names`]
pub fn get(name: &str) -> Result<BiomeOptions> {
    match name {
        "beach" => beach(),
        "forest" => forest(),
        "snowy forest" => snowy_forest(),
        "desert" => desert(),
        other => Err(PlanetError::UnknownBiome(other.to_string())),
    }
}

fn calm_sea(seed: u32) -> NoiseConfig {
    NoiseConfig::new(seed)
        .with_range(-0.004, 0.004)
        .with_scale(6.0)
        .with_octaves(2)
}

fn ocean_gradient() -> Result<ColorGradient> {
    ColorGradient::from_hex_stops(&[(0.0, 0x1b4f8a), (0.6, 0x2a7ab8), (1.0, 0x6fc3df)])
}

fn rock(density: f32, tint: u32) -> VegetationItemSpec {
    VegetationItemSpec::new("rock", density)
        .with_min_height(0.002)
        .with_spacing(0.1)
        .with_material(
            "stone",
            MaterialVariant::tinted(vec![Color::from_hex(tint), Color::from_hex(0x6b6b6b)]),
        )
        .with_ground(GroundDecoration {
            radius: 0.06,
            raise: 0.008,
            color: Color::from_hex(0x5a5248),
        })
}

fn beach() -> Result<BiomeOptions> {
    Ok(BiomeOptions {
        terrain: NoiseConfig::new(1)
            .with_range(-0.05, 0.06)
            .with_scale(1.6)
            .with_octaves(4)
            .with_warp(0.3),
        land_gradient: ColorGradient::from_hex_stops(&[
            (0.0, 0xc2b280),
            (0.45, 0xe8d8a8),
            (0.55, 0x9ccc65),
            (1.0, 0x558b2f),
        ])?,
        sea: calm_sea(2),
        sea_gradient: ocean_gradient()?,
        vegetation: vec![
            VegetationItemSpec::new("palm", 60.0)
                .with_min_height(0.004)
                .with_material(
                    "leaves",
                    MaterialVariant::tinted(vec![Color::from_hex(0x4caf50), Color::from_hex(0x7cb342)]),
                ),
            rock(15.0, 0x8d8070),
        ],
        tint_color: Color::from_hex(0xfff3d6),
    })
}

fn forest() -> Result<BiomeOptions> {
    Ok(BiomeOptions {
        terrain: NoiseConfig::new(3)
            .with_range(-0.04, 0.08)
            .with_scale(1.4)
            .with_octaves(5)
            .with_gain(0.45)
            .with_sharpness(-0.3),
        land_gradient: ColorGradient::from_hex_stops(&[
            (0.0, 0x8d7b5a),
            (0.35, 0x6b8e23),
            (0.7, 0x2e7d32),
            (1.0, 0x4e5b31),
        ])?,
        sea: calm_sea(4),
        sea_gradient: ocean_gradient()?,
        vegetation: vec![
            VegetationItemSpec::new("tree", 180.0)
                .with_min_height(0.003)
                .with_material(
                    "leaves",
                    MaterialVariant::tinted(vec![Color::from_hex(0x2e7d32), Color::from_hex(0x388e3c)]),
                ),
            VegetationItemSpec::new("bush", 80.0).with_min_height(0.002),
            rock(20.0, 0x7a7a7a),
        ],
        tint_color: Color::from_hex(0x1b2a12),
    })
}

fn snowy_forest() -> Result<BiomeOptions> {
    // Above the tree line the color also depends on latitude
    let peaks = ColorGradient::from_hex_stops(&[(0.0, 0x5d6b4a), (0.6, 0xdfe8ea), (1.0, 0xffffff)])?;
    let land_gradient = ColorGradient::new(
        vec![
            ColorStop::color(0.0, Color::from_hex(0x6e6a5e)),
            ColorStop::color(0.4, Color::from_hex(0x3f5e3a)),
            ColorStop::gradient(0.75, peaks),
            ColorStop::color(1.0, Color::WHITE),
        ],
        false,
    )?;

    Ok(BiomeOptions {
        terrain: NoiseConfig::new(5)
            .with_range(-0.03, 0.1)
            .with_scale(1.8)
            .with_octaves(5)
            .with_power(1.4),
        land_gradient,
        sea: calm_sea(6).with_range(-0.002, 0.002),
        sea_gradient: ColorGradient::from_hex_stops(&[(0.0, 0x2c4a63), (1.0, 0x9fc6d9)])?,
        vegetation: vec![
            VegetationItemSpec::new("pine", 150.0)
                .with_min_height(0.004)
                .with_material(
                    "needles",
                    MaterialVariant::tinted(vec![Color::from_hex(0x1f4d2b), Color::from_hex(0xe0eef0)]),
                ),
            rock(25.0, 0x9e9e9e),
        ],
        tint_color: Color::WHITE,
    })
}

fn desert() -> Result<BiomeOptions> {
    Ok(BiomeOptions {
        terrain: NoiseConfig::new(7)
            .with_range(-0.02, 0.07)
            .with_scale(2.2)
            .with_octaves(3)
            .with_sharpness(-0.6)
            .with_warp(0.5),
        land_gradient: ColorGradient::from_hex_stops(&[
            (0.0, 0xb5835a),
            (0.5, 0xe0b872),
            (1.0, 0xf3d9a4),
        ])?
        .with_hsl(true),
        sea: calm_sea(8),
        sea_gradient: ColorGradient::from_hex_stops(&[(0.0, 0x1f7a7a), (1.0, 0x7fd6c8)])?,
        vegetation: vec![
            VegetationItemSpec::new("cactus", 40.0).with_min_height(0.006),
            rock(30.0, 0xa0704a),
        ],
        tint_color: Color::from_hex(0x7a4b2a),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;

    #[test]
    fn test_every_preset_builds() {
        for name in names() {
            let options = get(name).unwrap();
            options.validate().unwrap();
            assert!(!options.vegetation.is_empty());
            Biome::new(&options).unwrap();
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(
            get("swamp").unwrap_err(),
            PlanetError::UnknownBiome("swamp".into())
        );
    }

    #[test]
    fn test_snowy_forest_is_two_dimensional() {
        let options = get("snowy forest").unwrap();
        assert_eq!(options.land_gradient.dimensions(), 2);
        assert_eq!(get("beach").unwrap().land_gradient.dimensions(), 1);
    }

    #[test]
    fn test_decorated_rocks() {
        let biome = Biome::new(&get("forest").unwrap()).unwrap();
        assert_eq!(biome.max_vegetation_radius(), 0.06);
    }
}
