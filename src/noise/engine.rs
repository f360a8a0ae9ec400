//! Noise evaluator built from a [`NoiseConfig`]

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::primitive::{self, NoisePoint, Primitive};
use super::{NoiseConfig, Param};
use crate::error::Result;

/// A resolved parameter: constant, or driven by its own engine
#[derive(Debug, Clone)]
pub enum Parameter {
    Constant(f64),
    Driven(Box<NoiseEngine>),
}

impl Parameter {
    fn build(param: &Param) -> Result<Self> {
        Ok(match param {
            Param::Constant(value) => Parameter::Constant(*value),
            Param::Noise(config) => Parameter::Driven(Box::new(NoiseEngine::build(config)?)),
        })
    }

    /// Value of the parameter at `point`
    #[inline]
    pub(crate) fn resolve(&self, point: &NoisePoint) -> f64 {
        match self {
            Parameter::Constant(value) => *value,
            Parameter::Driven(engine) => engine.value_at(point),
        }
    }
}

/// Deterministic layered noise evaluator
///
/// The same configuration always produces the same field: child layer seeds
/// are drawn from a ChaCha stream seeded with the configuration seed.
///
/// # Example
///
/// ```
/// use rust_biome_planet::noise::{NoiseConfig, NoiseEngine};
///
/// let config = NoiseConfig::new(42).with_range(0.0, 10.0).with_octaves(4);
/// let engine = NoiseEngine::new(&config).unwrap();
/// let h = engine.get(&[0.3, 0.1, -0.5]);
/// assert!((0.0..=10.0).contains(&h));
/// ```
#[derive(Debug, Clone)]
pub struct NoiseEngine {
    seed: u32,
    primitive: Primitive,
    layers: Vec<NoiseEngine>,
    warp_field: Option<Box<NoiseEngine>>,
    min: Parameter,
    max: Parameter,
    scale: Parameter,
    power: Parameter,
    gain: Parameter,
    lacunarity: Parameter,
    sharpness: Parameter,
    steps: Parameter,
    warp: Parameter,
    warp2: Parameter,
    shift: [f64; 4],
    tile_x: bool,
    tile_y: bool,
}

impl NoiseEngine {
    /// Validate `config` and build its evaluator
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when [`NoiseConfig::validate`] fails
    pub fn new(config: &NoiseConfig) -> Result<Self> {
        config.validate()?;
        Self::build(config)
    }

    fn build(config: &NoiseConfig) -> Result<Self> {
        let layers = if config.octaves > 0 {
            let mut seeds = ChaCha8Rng::seed_from_u64(config.seed as u64);
            (0..config.octaves)
                .map(|_| Self::build(&config.layer_config(seeds.gen())))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let warp_field = match &config.warp_noise {
            Some(warp) => Some(Box::new(Self::build(warp)?)),
            None => None,
        };

        Ok(Self {
            seed: config.seed,
            primitive: Primitive::new(config.seed),
            layers,
            warp_field,
            min: Parameter::build(&config.min)?,
            max: Parameter::build(&config.max)?,
            scale: Parameter::build(&config.scale)?,
            power: Parameter::build(&config.power)?,
            gain: Parameter::build(&config.gain)?,
            lacunarity: Parameter::build(&config.lacunarity)?,
            sharpness: Parameter::build(&config.sharpness)?,
            steps: Parameter::build(&config.steps)?,
            warp: Parameter::build(&config.warp)?,
            warp2: Parameter::build(&config.warp2)?,
            shift: config.shift,
            tile_x: config.tile_x,
            tile_y: config.tile_y,
        })
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of child layers
    pub fn octaves(&self) -> usize {
        self.layers.len()
    }

    /// Evaluate at 1 to 4 coordinates; the result lies in `[min, max]`
    pub fn get(&self, position: &[f64]) -> f64 {
        self.value_at(&NoisePoint::from_slice(position))
    }

    /// Evaluate at a 3-D position
    pub fn get_vec3(&self, position: Vec3) -> f64 {
        self.get(&[position.x as f64, position.y as f64, position.z as f64])
    }

    /// Shaped value mapped to [0, 1] instead of `[min, max]`
    pub fn get_unit(&self, position: &[f64]) -> f64 {
        let point = NoisePoint::from_slice(position);
        (self.shaped(&point) + 1.0) * 0.5
    }

    pub(crate) fn value_at(&self, point: &NoisePoint) -> f64 {
        let v = self.shaped(point);

        let a = self.min.resolve(point);
        let b = self.max.resolve(point);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        (lo + (v + 1.0) * 0.5 * (hi - lo)).clamp(lo, hi)
    }

    /// Raw value after power, sharpness and step shaping, in [-1, 1]
    fn shaped(&self, point: &NoisePoint) -> f64 {
        let mut v = self.raw(point).clamp(-1.0, 1.0);

        let power = self.power.resolve(point);
        if power > 0.0 && power != 1.0 {
            v = v.signum() * v.abs().powf(power);
        }

        let sharpness = self.sharpness.resolve(point).clamp(-1.0, 1.0);
        if sharpness > 0.0 {
            v += (v.signum() - v) * sharpness;
        } else if sharpness < 0.0 {
            let ridge = 1.0 - 2.0 * v.abs();
            v += (ridge - v) * -sharpness;
        }

        let steps = self.steps.resolve(point).round();
        if steps >= 2.0 {
            let band = ((v + 1.0) * 0.5 * steps).floor().min(steps - 1.0);
            v = band / (steps - 1.0) * 2.0 - 1.0;
        }

        v.clamp(-1.0, 1.0)
    }

    /// Unshaped value: a single primitive sample or the normalized layer sum
    fn raw(&self, point: &NoisePoint) -> f64 {
        if self.layers.is_empty() {
            return self.base(point);
        }

        let mut sum = 0.0;
        let mut norm = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;

        for layer in &self.layers {
            let running = point.scaled(frequency);
            sum += amplitude * layer.raw(&running);
            norm += f64::abs(amplitude);

            amplitude *= self.gain.resolve(&running);
            frequency *= self.lacunarity.resolve(&running);
        }

        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }

    fn base(&self, point: &NoisePoint) -> f64 {
        let mut q = point
            .shifted(&self.shift)
            .tiled(self.tile_x, self.tile_y)
            .scaled(self.scale.resolve(point));

        for strength in [self.warp.resolve(point), self.warp2.resolve(point)] {
            if strength != 0.0 {
                q = primitive::warp(q, strength, |probe| self.warp_sample(probe));
            }
        }

        self.primitive.sample(&q)
    }

    fn warp_sample(&self, probe: &NoisePoint) -> f64 {
        match &self.warp_field {
            Some(field) => field.raw(probe),
            None => self.primitive.sample(probe),
        }
    }
}
