//! Point octree used as a minimum-spacing oracle during vegetation scatter
//!
//! Nodes live in a flat arena and refer to their children by index. A node
//! stores up to `capacity` points itself; the next insertion splits it into
//! eight octants (once) and forwards the point to the matching child. Points
//! already stored stay where they are, so every point lives in exactly one
//! node and there is no deletion.

mod aabb;

pub use aabb::Aabb;

use glam::Vec3;

/// Points a node holds before it subdivides
pub const DEFAULT_CAPACITY: usize = 4;

/// Depth past which leaves keep accepting points instead of splitting
///
/// Coincident points would otherwise split forever.
pub const MAX_DEPTH: u8 = 20;

/// Index of a node in the arena
pub type NodeIndex = usize;

#[derive(Debug, Clone)]
struct Node<T> {
    bounds: Aabb,
    depth: u8,
    points: Vec<(Vec3, T)>,
    children: Option<[NodeIndex; 8]>,
}

impl<T> Node<T> {
    fn new(bounds: Aabb, depth: u8, capacity: usize) -> Self {
        Self {
            bounds,
            depth,
            points: Vec::with_capacity(capacity),
            children: None,
        }
    }
}

/// Insertion-only point octree with an opaque payload per point
///
/// # Example
///
/// ```
/// use rust_biome_planet::spatial::{Aabb, PointOctree};
/// use glam::Vec3;
///
/// let mut index = PointOctree::new(Aabb::around(Vec3::ZERO, 1.0));
/// assert!(index.insert(Vec3::new(0.1, 0.0, 0.0), "rock"));
/// assert_eq!(index.query_radius(Vec3::ZERO, 0.2).len(), 1);
/// assert!(index.query_radius(Vec3::ONE, 0.2).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PointOctree<T> {
    nodes: Vec<Node<T>>,
    capacity: usize,
    len: usize,
}

impl<T> PointOctree<T> {
    /// Empty index over `bounds` with [`DEFAULT_CAPACITY`]
    pub fn new(bounds: Aabb) -> Self {
        Self::with_capacity(bounds, DEFAULT_CAPACITY)
    }

    /// Empty index with a custom per-node capacity (at least 1)
    pub fn with_capacity(bounds: Aabb, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            nodes: vec![Node::new(bounds, 0, capacity)],
            capacity,
            len: 0,
        }
    }

    /// Root bounds; points outside them are rejected by [`insert`](Self::insert)
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no point has been inserted
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of arena nodes (1 + 8 per subdivision)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a point with its payload
    ///
    /// # Arguments
    ///
    /// * `point` - Position to store
    /// * `payload` - Value returned alongside the point by queries
    ///
    /// # Returns
    ///
    /// `false` if `point` lies outside the root bounds; nothing is stored then
    pub fn insert(&mut self, point: Vec3, payload: T) -> bool {
        if !self.nodes[0].bounds.contains_point(point) {
            return false;
        }

        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            let children = node.children;

            if children.is_none() && (node.points.len() < self.capacity || node.depth >= MAX_DEPTH) {
                self.nodes[idx].points.push((point, payload));
                self.len += 1;
                return true;
            }

            let octant = node.bounds.octant_of(point);
            let children = match children {
                Some(children) => children,
                None => self.subdivide(idx),
            };
            idx = children[octant];
        }
    }

    fn subdivide(&mut self, idx: NodeIndex) -> [NodeIndex; 8] {
        let bounds = self.nodes[idx].bounds;
        let depth = self.nodes[idx].depth + 1;
        let first = self.nodes.len();

        for octant in 0..8 {
            self.nodes
                .push(Node::new(bounds.child_octant(octant), depth, self.capacity));
        }

        let children = std::array::from_fn(|i| first + i);
        self.nodes[idx].children = Some(children);
        children
    }

    /// All points inside `region`, with their payloads
    pub fn query_box(&self, region: &Aabb) -> Vec<(Vec3, &T)> {
        let mut found = Vec::new();
        self.visit_box(region, |point, payload| {
            found.push((point, payload));
        });
        found
    }

    /// All points within `radius` of `center`
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<(Vec3, &T)> {
        let r2 = radius * radius;
        let mut found = Vec::new();
        self.visit_box(&Aabb::around(center, radius), |point, payload| {
            if point.distance_squared(center) <= r2 {
                found.push((point, payload));
            }
        });
        found
    }

    /// Distance to the closest point within `radius`, if any
    pub fn nearest_distance(&self, center: Vec3, radius: f32) -> Option<f32> {
        let r2 = radius * radius;
        let mut best: Option<f32> = None;
        self.visit_box(&Aabb::around(center, radius), |point, _| {
            let d2 = point.distance_squared(center);
            if d2 <= r2 && best.map_or(true, |b| d2 < b) {
                best = Some(d2);
            }
        });
        best.map(f32::sqrt)
    }

    /// Whether any point lies strictly closer than `radius` to `center`
    pub fn any_within(&self, center: Vec3, radius: f32) -> bool {
        let r2 = radius * radius;
        let mut hit = false;
        self.visit_box(&Aabb::around(center, radius), |point, _| {
            hit |= point.distance_squared(center) < r2;
        });
        hit
    }

    fn visit_box<'a, F>(&'a self, region: &Aabb, mut visit: F)
    where
        F: FnMut(Vec3, &'a T),
    {
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(region) {
                continue;
            }
            for (point, payload) in &node.points {
                if region.contains_point(*point) {
                    visit(*point, payload);
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
    }
}
