//! Subdivided base solids and the topology cache
//!
//! `detail` is the number of edge splits per base face: an icosahedron face
//! becomes `(detail + 1)^2` triangles and a cube face a `(detail + 1)^2` quad
//! grid. Vertices are shared between neighbouring faces.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::config::ShapeKind;

/// Shapes kept by a [`ShapeCache`] unless configured otherwise
pub const DEFAULT_SHAPE_CACHE_CAPACITY: usize = 8;

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .map(Vec3::normalize)
}

/// Identity of a lattice point on the icosahedron, shared across faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LatticeKey {
    Corner(u32),
    /// Lower corner, upper corner, steps away from the lower corner
    Edge(u32, u32, u32),
    Interior(usize, u32, u32),
}

impl LatticeKey {
    fn new(face: usize, weights: &[(u32, u32); 3], i: u32, j: u32) -> Self {
        let mut nonzero = weights.iter().filter(|(_, k)| *k > 0);
        match (nonzero.next(), nonzero.next(), nonzero.next()) {
            (Some(&(c, _)), None, None) => LatticeKey::Corner(c),
            (Some(&(c1, k1)), Some(&(c2, k2)), None) => {
                if c1 < c2 {
                    LatticeKey::Edge(c1, c2, k1)
                } else {
                    LatticeKey::Edge(c2, c1, k2)
                }
            }
            _ => LatticeKey::Interior(face, i, j),
        }
    }
}

/// A point on the surface of a base shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Point on the unit sphere or the unit cube surface
    pub point: Vec3,
    /// Unit direction from the center; the biome query coordinate
    pub direction: Vec3,
}

/// Undisplaced, shared-vertex topology of a subdivided solid
#[derive(Debug, Clone)]
pub struct BaseShape {
    kind: ShapeKind,
    detail: u32,
    points: Vec<Vec3>,
    directions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl BaseShape {
    pub fn new(kind: ShapeKind, detail: u32) -> Self {
        let (points, mut triangles) = match kind {
            ShapeKind::Sphere => icosphere(detail),
            ShapeKind::Box => cube(detail),
        };
        orient_outward(&points, &mut triangles);

        let directions = points.iter().map(|p| p.normalize()).collect();
        Self {
            kind,
            detail,
            points,
            directions,
            triangles,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn detail(&self) -> u32 {
        self.detail
    }

    /// Surface points, one per shared vertex
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Unit directions, parallel to [`Self::points`]
    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Area of the ideal surface: unit sphere or cube of half-size 1
    pub fn surface_area(&self) -> f32 {
        match self.kind {
            ShapeKind::Sphere => 4.0 * std::f32::consts::PI,
            ShapeKind::Box => 24.0,
        }
    }

    /// Project a unit direction onto the shape surface
    pub fn project(&self, direction: Vec3) -> Vec3 {
        match self.kind {
            ShapeKind::Sphere => direction,
            ShapeKind::Box => {
                let m = direction.abs().max_element();
                if m > 0.0 {
                    direction / m
                } else {
                    direction
                }
            }
        }
    }

    /// Uniformly distributed point on the surface
    pub fn sample_surface<R: Rng>(&self, rng: &mut R) -> SurfacePoint {
        let point = match self.kind {
            ShapeKind::Sphere => {
                let z: f32 = rng.gen_range(-1.0..=1.0);
                let theta: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
                let r = (1.0 - z * z).max(0.0).sqrt();
                Vec3::new(r * theta.cos(), r * theta.sin(), z)
            }
            ShapeKind::Box => {
                let face: usize = rng.gen_range(0..6);
                let u: f32 = rng.gen_range(-1.0..=1.0);
                let v: f32 = rng.gen_range(-1.0..=1.0);
                let sign = if face % 2 == 0 { 1.0 } else { -1.0 };
                match face / 2 {
                    0 => Vec3::new(sign, u, v),
                    1 => Vec3::new(u, sign, v),
                    _ => Vec3::new(u, v, sign),
                }
            }
        };
        SurfacePoint {
            point,
            direction: point.normalize(),
        }
    }
}

fn icosphere(detail: u32) -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let corners = icosahedron_corners();
    let n = detail + 1;
    let mut lookup: HashMap<LatticeKey, u32> = HashMap::new();
    let mut points: Vec<Vec3> = Vec::new();
    let mut triangles = Vec::with_capacity(20 * (n * n) as usize);

    for (face, tri) in ICOSAHEDRON_FACES.iter().enumerate() {
        let mut vertex = |i: u32, j: u32| -> u32 {
            let weights = [(tri[0], n - i - j), (tri[1], i), (tri[2], j)];
            let key = LatticeKey::new(face, &weights, i, j);
            *lookup.entry(key).or_insert_with(|| {
                let p = weights
                    .iter()
                    .fold(Vec3::ZERO, |acc, &(c, k)| acc + corners[c as usize] * k as f32);
                points.push(p.normalize());
                (points.len() - 1) as u32
            })
        };

        for i in 0..n {
            for j in 0..(n - i) {
                let a = vertex(i, j);
                let b = vertex(i + 1, j);
                let c = vertex(i, j + 1);
                triangles.push([a, b, c]);
                if i + j + 1 < n {
                    let d = vertex(i + 1, j + 1);
                    triangles.push([b, d, c]);
                }
            }
        }
    }

    (points, triangles)
}

fn cube(detail: u32) -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let n = detail + 1;
    let mut lookup: HashMap<[u32; 3], u32> = HashMap::new();
    let mut points: Vec<Vec3> = Vec::new();
    let mut triangles = Vec::with_capacity(12 * (n * n) as usize);

    let mut vertex = |lattice: [u32; 3]| -> u32 {
        *lookup.entry(lattice).or_insert_with(|| {
            let p = Vec3::from_array(lattice.map(|k| -1.0 + 2.0 * k as f32 / n as f32));
            points.push(p);
            (points.len() - 1) as u32
        })
    };

    for axis in 0..3 {
        let (u_axis, v_axis) = ((axis + 1) % 3, (axis + 2) % 3);
        for side in [0, n] {
            let at = |a: u32, b: u32| {
                let mut lattice = [0; 3];
                lattice[axis] = side;
                lattice[u_axis] = a;
                lattice[v_axis] = b;
                lattice
            };
            for a in 0..n {
                for b in 0..n {
                    let q0 = vertex(at(a, b));
                    let q1 = vertex(at(a + 1, b));
                    let q2 = vertex(at(a + 1, b + 1));
                    let q3 = vertex(at(a, b + 1));
                    triangles.push([q0, q1, q2]);
                    triangles.push([q0, q2, q3]);
                }
            }
        }
    }

    (points, triangles)
}

/// Flip triangles whose winding faces the center
fn orient_outward(points: &[Vec3], triangles: &mut [[u32; 3]]) {
    for tri in triangles.iter_mut() {
        let [a, b, c] = tri.map(|i| points[i as usize]);
        let normal = (b - a).cross(c - a);
        if normal.dot(a + b + c) < 0.0 {
            tri.swap(1, 2);
        }
    }
}

type ShapeKey = (ShapeKind, u32);

/// Least-recently-used cache of base shapes keyed by kind and detail
#[derive(Debug)]
pub struct ShapeCache {
    capacity: usize,
    entries: VecDeque<(ShapeKey, Arc<BaseShape>)>,
}

impl ShapeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Cached shape for `(kind, detail)`, marking it most recently used
    pub fn get(&mut self, kind: ShapeKind, detail: u32) -> Option<Arc<BaseShape>> {
        let key = (kind, detail);
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(pos)?;
        let shape = Arc::clone(&entry.1);
        self.entries.push_back(entry);
        Some(shape)
    }

    /// Store a built shape, evicting the least recently used beyond capacity
    ///
    /// If an equal key was inserted meanwhile, the cached shape wins and is
    /// returned instead of `shape`.
    pub fn insert(&mut self, shape: Arc<BaseShape>) -> Arc<BaseShape> {
        if let Some(existing) = self.get(shape.kind(), shape.detail()) {
            return existing;
        }
        self.entries.push_back(((shape.kind(), shape.detail()), Arc::clone(&shape)));
        while self.entries.len() > self.capacity {
            if let Some(((old_kind, old_detail), _)) = self.entries.pop_front() {
                log::debug!("evicted {:?} shape at detail {}", old_kind, old_detail);
            }
        }
        shape
    }

    /// Cached shape, building and inserting it on a miss
    pub fn get_or_build(&mut self, kind: ShapeKind, detail: u32) -> Arc<BaseShape> {
        match self.get(kind, detail) {
            Some(shape) => shape,
            None => self.insert(Arc::new(build_logged(kind, detail))),
        }
    }

    pub fn contains(&self, kind: ShapeKind, detail: u32) -> bool {
        self.entries.iter().any(|(k, _)| *k == (kind, detail))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Build a base shape and log its size
pub(crate) fn build_logged(kind: ShapeKind, detail: u32) -> BaseShape {
    let shape = BaseShape::new(kind, detail);
    log::debug!(
        "built {:?} shape at detail {}: {} vertices, {} triangles",
        kind,
        detail,
        shape.vertex_count(),
        shape.triangle_count()
    );
    shape
}

impl Default for ShapeCache {
    fn default() -> Self {
        Self::new(DEFAULT_SHAPE_CACHE_CAPACITY)
    }
}
