//! Seeded fractal noise primitive in 2, 3 or 4 dimensions

use ::noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Octaves of the primitive's own fractal sum
const PRIMITIVE_OCTAVES: usize = 3;

/// Per-axis offsets that decorrelate the warp displacement components
const WARP_OFFSETS: [[f64; 4]; 4] = [
    [0.0, 0.0, 0.0, 0.0],
    [5.2, 1.3, 7.1, 2.9],
    [1.7, 9.2, 3.4, 6.6],
    [8.3, 2.8, 4.9, 1.1],
];

/// A position with 1 to 4 coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisePoint {
    coords: [f64; 4],
    dims: usize,
}

impl NoisePoint {
    /// Build from a slice; empty input reads as a 1-D origin and
    /// coordinates past the fourth are ignored
    pub fn from_slice(position: &[f64]) -> Self {
        let mut coords = [0.0; 4];
        for (c, v) in coords.iter_mut().zip(position) {
            *c = *v;
        }
        Self {
            coords,
            dims: position.len().clamp(1, 4),
        }
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords[..self.dims]
    }

    #[inline]
    pub fn scaled(mut self, k: f64) -> Self {
        for c in &mut self.coords[..self.dims] {
            *c *= k;
        }
        self
    }

    #[inline]
    pub fn shifted(mut self, offset: &[f64; 4]) -> Self {
        for (c, o) in self.coords[..self.dims].iter_mut().zip(offset) {
            *c += o;
        }
        self
    }

    /// Fold x and/or y onto circles so the field repeats with period 1
    ///
    /// Each fold turns one coordinate into two; a fold that would push the
    /// point past four dimensions is skipped.
    pub fn tiled(self, tile_x: bool, tile_y: bool) -> Self {
        let mut out = [0.0; 4];
        let mut len = 0;
        let mut extra = 0;

        for (i, &c) in self.coords().iter().enumerate() {
            let wants_fold = (i == 0 && tile_x) || (i == 1 && tile_y);
            if wants_fold && self.dims + extra < 4 {
                let angle = c * std::f64::consts::TAU;
                let r = 1.0 / std::f64::consts::TAU;
                out[len] = angle.cos() * r;
                out[len + 1] = angle.sin() * r;
                len += 2;
                extra += 1;
            } else {
                out[len] = c;
                len += 1;
            }
        }

        Self {
            coords: out,
            dims: len,
        }
    }
}

/// Seeded Perlin FBM sampled at the point's dimensionality
#[derive(Clone)]
pub struct Primitive {
    fbm: Fbm<Perlin>,
}

impl std::fmt::Debug for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitive")
            .field("octaves", &PRIMITIVE_OCTAVES)
            .finish()
    }
}

impl Primitive {
    pub fn new(seed: u32) -> Self {
        Self {
            fbm: Fbm::<Perlin>::new(seed).set_octaves(PRIMITIVE_OCTAVES),
        }
    }

    /// Sample in [-1, 1]
    pub fn sample(&self, p: &NoisePoint) -> f64 {
        let c = &p.coords;
        let value = match p.dims {
            1 => self.fbm.get([c[0], 0.0]),
            2 => self.fbm.get([c[0], c[1]]),
            3 => self.fbm.get([c[0], c[1], c[2]]),
            _ => self.fbm.get([c[0], c[1], c[2], c[3]]),
        };
        value.clamp(-1.0, 1.0)
    }
}

/// Displace every coordinate of `p` by `strength * field(p + offset_axis)`
pub fn warp<F>(p: NoisePoint, strength: f64, field: F) -> NoisePoint
where
    F: Fn(&NoisePoint) -> f64,
{
    let mut out = p;
    for axis in 0..p.dims {
        let probe = p.shifted(&WARP_OFFSETS[axis]);
        out.coords[axis] += strength * field(&probe);
    }
    out
}
