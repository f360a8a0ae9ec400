//! Planet façade: turns worker output into renderable objects
//!
//! [`Planet`] owns the worker handle and the nodes it created in the host
//! renderer. Generation failures never leave the scene empty: the façade
//! falls back to a flat-tinted sphere and logs the error.

pub mod backend;
pub mod material;

pub use backend::{AssetLoader, RenderBackend};
pub use material::{
    material_for, CausticMaterial, MaterialStyle, MaterialUniforms, SimpleMaterial,
    SurfaceMaterial,
};

use std::time::Duration;

use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::biome::Biome;
use crate::color::Color;
use crate::config::PlanetRequest;
use crate::error::Result;
use crate::mesh::{fallback_mesh, PlanetMeshResult};
use crate::worker::PlanetWorker;

/// Sea wave cycles per second times 2π
pub const DEFAULT_WAVE_SPEED: f32 = 1.2;

/// Nodes making up one generated planet
#[derive(Debug, Clone)]
pub struct PlanetBody<N> {
    pub root: N,
    pub terrain: N,
    pub sea: Option<N>,
    pub atmosphere: Option<N>,
    pub vegetation: Vec<N>,
}

/// What one [`Planet::generate`] call produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationReport {
    pub request_id: u64,
    /// Generation failed and the fallback sphere is shown
    pub fell_back: bool,
    pub error: Option<String>,
    pub vegetation_instances: usize,
    /// Items whose models failed to load
    pub skipped_items: Vec<String>,
}

/// A generated planet living in a render backend
pub struct Planet<B: RenderBackend> {
    worker: PlanetWorker,
    body: Option<PlanetBody<B::Node>>,
    materials: Vec<(B::Node, Box<dyn SurfaceMaterial>)>,
    elapsed: f32,
    wave_speed: f32,
    timeout: Option<Duration>,
}

impl<B: RenderBackend> Planet<B> {
    /// Façade with its own worker
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn new() -> Self {
        Self::with_worker(PlanetWorker::spawn())
    }

    pub fn with_worker(worker: PlanetWorker) -> Self {
        Self {
            worker,
            body: None,
            materials: Vec::new(),
            elapsed: 0.0,
            wave_speed: DEFAULT_WAVE_SPEED,
            timeout: None,
        }
    }

    /// Treat generations slower than `timeout` as failed
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn set_wave_speed(&mut self, speed: f32) {
        self.wave_speed = speed;
    }

    pub fn body(&self) -> Option<&PlanetBody<B::Node>> {
        self.body.as_ref()
    }

    pub fn worker(&self) -> &PlanetWorker {
        &self.worker
    }

    /// Generate `request` and replace the current body with the result
    ///
    /// # Errors
    ///
    /// Only configuration errors (reported before any work starts) and a
    /// stopped worker are returned. Generation failures produce the fallback
    /// planet and are described in the report.
    pub async fn generate<A>(
        &mut self,
        request: PlanetRequest,
        backend: &mut B,
        assets: &mut A,
    ) -> Result<GenerationReport>
    where
        A: AssetLoader<B::Model>,
    {
        let pending = self.worker.request(request.clone())?;
        let response = match self.timeout {
            Some(limit) => pending.wait_timeout(limit).await,
            None => pending.wait().await,
        };

        let mut report = GenerationReport {
            request_id: response.request_id(),
            ..Default::default()
        };
        let mesh = match response.into_result() {
            Ok(mesh) => mesh,
            Err(e) => {
                log::warn!("planet generation failed, showing fallback: {}", e);
                report.fell_back = true;
                report.error = Some(e.to_string());
                fallback_mesh(fallback_color(&request))
            }
        };

        self.clear(backend);
        let mut body = self.build_body(&request, &mesh, backend);
        if !report.fell_back {
            self.place_vegetation(
                &request,
                &mesh,
                &body.root,
                backend,
                assets,
                &mut body.vegetation,
                &mut report,
            );
        }
        report.vegetation_instances = body.vegetation.len();
        self.body = Some(body);

        log::info!(
            "planet {} ready: {} vegetation instances{}",
            report.request_id,
            report.vegetation_instances,
            if report.fell_back { " (fallback)" } else { "" }
        );
        Ok(report)
    }

    /// Advance materials and the sea wave by `dt` seconds
    pub fn update(&mut self, backend: &mut B, dt: f32) {
        self.elapsed += dt;
        for (node, material) in &mut self.materials {
            material.update(dt);
            if material.is_animated() {
                backend.apply_material(node, material.as_ref());
            }
        }
        if let Some(sea) = self.body.as_ref().and_then(|b| b.sea.as_ref()) {
            backend.set_morph_weight(sea, self.morph_weight());
        }
    }

    /// Current sea blend weight in [0, 1]
    pub fn morph_weight(&self) -> f32 {
        0.5 + 0.5 * (self.elapsed * self.wave_speed).sin()
    }

    /// Remove the current body from the backend
    pub fn clear(&mut self, backend: &mut B) {
        if let Some(body) = self.body.take() {
            backend.remove(&body.root);
        }
        self.materials.clear();
    }

    fn build_body(
        &mut self,
        request: &PlanetRequest,
        mesh: &PlanetMeshResult,
        backend: &mut B,
    ) -> PlanetBody<B::Node> {
        let root = backend.create_group("planet");

        let terrain = backend.create_mesh("terrain", &mesh.terrain);
        backend.attach(&root, &terrain);
        self.add_material(backend, &terrain, request.material);

        let sea = if mesh.sea.base.is_empty() {
            None
        } else {
            let sea = backend.create_morph_mesh("sea", &mesh.sea);
            backend.attach(&root, &sea);
            self.add_material(backend, &sea, request.material);
            backend.set_morph_weight(&sea, self.morph_weight());
            Some(sea)
        };

        let atmosphere = request.atmosphere.enabled.then(|| {
            let shell = backend.create_atmosphere(request.atmosphere.height, request.atmosphere.color);
            backend.attach(&root, &shell);
            shell
        });

        PlanetBody {
            root,
            terrain,
            sea,
            atmosphere,
            vegetation: Vec::new(),
        }
    }

    fn add_material(&mut self, backend: &mut B, node: &B::Node, style: MaterialStyle) {
        let material = material_for(style);
        backend.apply_material(node, material.as_ref());
        self.materials.push((node.clone(), material));
    }

    #[allow(clippy::too_many_arguments)]
    fn place_vegetation<A>(
        &self,
        request: &PlanetRequest,
        mesh: &PlanetMeshResult,
        root: &B::Node,
        backend: &mut B,
        assets: &mut A,
        instances: &mut Vec<B::Node>,
        report: &mut GenerationReport,
    ) where
        A: AssetLoader<B::Model>,
    {
        let biome = match request.resolve_biome().and_then(|options| Biome::new(&options)) {
            Ok(biome) => biome,
            Err(e) => {
                log::warn!("cannot rebuild biome for vegetation placement: {}", e);
                return;
            }
        };
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(request.seed));

        for (name, points) in &mesh.vegetation {
            if points.is_empty() {
                continue;
            }
            let variants = match assets.load_variants(name) {
                Ok(variants) if !variants.is_empty() => variants,
                Ok(_) => {
                    log::debug!("no models for `{}`, skipping {} placements", name, points.len());
                    continue;
                }
                Err(e) => {
                    log::warn!("skipping vegetation `{}`: {}", name, e);
                    report.skipped_items.push(name.clone());
                    continue;
                }
            };
            let spec = biome.item_index(name).map(|i| &biome.vegetation()[i]);
            let raise = spec.and_then(|s| s.ground).map_or(0.0, |g| g.raise);

            for point in points {
                let point = Vec3::from_array(*point);
                let dir = point.normalize_or_zero();
                let yaw = rng.gen_range(0.0..std::f32::consts::TAU);
                let (translation, rotation) =
                    vegetation_transform(point, dir, biome.get_height(dir) + raise, yaw);
                let model = &variants[rng.gen_range(0..variants.len())];

                let node = backend.instantiate(model);
                backend.set_transform(&node, translation, rotation, 1.0);
                for (material, variant) in spec.map(|s| &s.materials).into_iter().flatten() {
                    let tint = (!variant.tints.is_empty())
                        .then(|| variant.tints[rng.gen_range(0..variant.tints.len())]);
                    backend.set_instance_material(&node, material, variant.texture.as_deref(), tint);
                }
                backend.attach(root, &node);
                instances.push(node);
            }
        }
    }
}

impl<B: RenderBackend> Default for Planet<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stand an instance upright on the surface: local +Y along `dir`, then a yaw
fn vegetation_transform(point: Vec3, dir: Vec3, height: f32, yaw: f32) -> (Vec3, Quat) {
    let translation = point + dir * height;
    let rotation = Quat::from_rotation_arc(Vec3::Y, dir) * Quat::from_rotation_y(yaw);
    (translation, rotation)
}

/// Land color at mid height, or white when the biome cannot be resolved
fn fallback_color(request: &PlanetRequest) -> Color {
    request
        .resolve_biome()
        .map(|options| options.land_tint())
        .unwrap_or(Color::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AtmosphereOptions, PlanetRequestBuilder};
    use crate::error::PlanetError;
    use crate::mesh::{GeometryBuffers, SeaGeometry};
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct MockBackend {
        next: usize,
        names: HashMap<usize, String>,
        parents: HashMap<usize, usize>,
        removed: Vec<usize>,
        morph_weights: Vec<f32>,
        materials: Vec<(usize, MaterialStyle)>,
        transforms: HashMap<usize, (Vec3, Quat)>,
        instance_materials: HashMap<usize, Vec<(String, Option<Color>)>>,
    }

    impl MockBackend {
        fn node(&mut self, name: &str) -> usize {
            self.next += 1;
            self.names.insert(self.next, name.to_string());
            self.next
        }

        fn children_named(&self, parent: usize, prefix: &str) -> usize {
            self.parents
                .iter()
                .filter(|(child, p)| **p == parent && self.names[*child].starts_with(prefix))
                .count()
        }
    }

    impl RenderBackend for MockBackend {
        type Node = usize;
        type Model = String;

        fn create_group(&mut self, name: &str) -> usize {
            self.node(name)
        }

        fn create_mesh(&mut self, name: &str, geometry: &GeometryBuffers) -> usize {
            assert!(geometry.is_consistent());
            self.node(name)
        }

        fn create_morph_mesh(&mut self, name: &str, sea: &SeaGeometry) -> usize {
            assert!(sea.is_consistent());
            self.node(name)
        }

        fn set_morph_weight(&mut self, _node: &usize, weight: f32) {
            self.morph_weights.push(weight);
        }

        fn apply_material(&mut self, node: &usize, material: &dyn SurfaceMaterial) {
            self.materials.push((*node, material.style()));
        }

        fn create_atmosphere(&mut self, _radius: f32, _color: Color) -> usize {
            self.node("atmosphere")
        }

        fn instantiate(&mut self, model: &String) -> usize {
            let name = format!("instance:{}", model);
            self.node(&name)
        }

        fn attach(&mut self, parent: &usize, child: &usize) {
            self.parents.insert(*child, *parent);
        }

        fn remove(&mut self, node: &usize) {
            self.removed.push(*node);
        }

        fn set_transform(&mut self, node: &usize, translation: Vec3, rotation: Quat, _scale: f32) {
            self.transforms.insert(*node, (translation, rotation));
        }

        fn set_instance_material(
            &mut self,
            node: &usize,
            material: &str,
            _texture: Option<&str>,
            tint: Option<Color>,
        ) {
            self.instance_materials
                .entry(*node)
                .or_default()
                .push((material.to_string(), tint));
        }
    }

    #[derive(Default)]
    struct MockAssets {
        failing: Vec<&'static str>,
    }

    impl AssetLoader<String> for MockAssets {
        fn load_variants(&mut self, item: &str) -> Result<Vec<String>> {
            if self.failing.contains(&item) {
                return Err(PlanetError::AssetLoad {
                    item: item.to_string(),
                    reason: "missing file".into(),
                });
            }
            Ok(vec![format!("{}-a", item), format!("{}-b", item)])
        }
    }

    fn request(detail: i32) -> PlanetRequest {
        PlanetRequestBuilder::new()
            .seed(21)
            .detail(detail)
            .unwrap()
            .biome_preset("forest")
            .unwrap()
            .atmosphere(AtmosphereOptions::new(1.15, Color::WHITE))
            .unwrap()
            .material(MaterialStyle::AnimatedCaustic)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_builds_body() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        let mut assets = MockAssets::default();

        let report = planet.generate(request(6), &mut backend, &mut assets).await.unwrap();
        assert!(!report.fell_back);
        assert!(report.vegetation_instances > 0);

        let body = planet.body().unwrap();
        assert!(body.sea.is_some());
        assert!(body.atmosphere.is_some());
        assert_eq!(body.vegetation.len(), report.vegetation_instances);
        assert_eq!(backend.children_named(body.root, "instance:"), report.vegetation_instances);
        assert!(backend
            .materials
            .iter()
            .all(|(_, style)| *style == MaterialStyle::AnimatedCaustic));
    }

    #[tokio::test]
    async fn test_vegetation_stands_upright() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        planet
            .generate(request(6), &mut backend, &mut MockAssets::default())
            .await
            .unwrap();

        for node in &planet.body().unwrap().vegetation {
            let (translation, rotation) = backend.transforms[node];
            let up = rotation * Vec3::Y;
            assert!(up.dot(translation.normalize()) > 0.999);
        }
    }

    #[tokio::test]
    async fn test_instances_get_variant_tints() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        planet
            .generate(request(6), &mut backend, &mut MockAssets::default())
            .await
            .unwrap();

        let leaves = [Color::from_hex(0x2e7d32), Color::from_hex(0x388e3c)];
        let mut trees = 0;
        for node in &planet.body().unwrap().vegetation {
            let name = &backend.names[node];
            let materials = backend.instance_materials.get(node);
            if name.starts_with("instance:tree") {
                trees += 1;
                let materials = materials.unwrap();
                assert_eq!(materials.len(), 1);
                assert_eq!(materials[0].0, "leaves");
                assert!(leaves.contains(&materials[0].1.unwrap()));
            } else if name.starts_with("instance:bush") {
                assert!(materials.is_none());
            }
        }
        assert!(trees > 0);
    }

    #[tokio::test]
    async fn test_asset_failure_skips_only_that_item() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        let mut assets = MockAssets {
            failing: vec!["rock"],
        };

        let report = planet.generate(request(6), &mut backend, &mut assets).await.unwrap();
        assert_eq!(report.skipped_items, vec!["rock".to_string()]);
        assert!(report.vegetation_instances > 0);
        assert!(backend.names.values().all(|n| !n.starts_with("instance:rock")));
        assert!(planet.body().unwrap().sea.is_some());
    }

    #[tokio::test]
    async fn test_invalid_config_is_returned() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        let mut bad = request(2);
        bad.detail = -1;

        let err = planet
            .generate(bad, &mut backend, &mut MockAssets::default())
            .await
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(planet.body().is_none());
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let mut planet: Planet<MockBackend> = Planet::new();
        planet.set_timeout(Some(Duration::from_nanos(1)));
        let mut backend = MockBackend::default();

        let report = planet
            .generate(request(32), &mut backend, &mut MockAssets::default())
            .await
            .unwrap();
        assert!(report.fell_back);
        assert!(report.error.is_some());

        let body = planet.body().unwrap();
        assert!(body.sea.is_none());
        assert!(body.vegetation.is_empty());
    }

    #[tokio::test]
    async fn test_update_drives_sea_weight() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        planet
            .generate(request(3), &mut backend, &mut MockAssets::default())
            .await
            .unwrap();

        planet.set_wave_speed(2.0);
        planet.update(&mut backend, 0.25);
        let expected = 0.5 + 0.5 * (0.25_f32 * 2.0).sin();
        let last = *backend.morph_weights.last().unwrap();
        assert!((last - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_regenerate_removes_previous_body() {
        let mut planet: Planet<MockBackend> = Planet::new();
        let mut backend = MockBackend::default();
        let mut assets = MockAssets::default();

        planet.generate(request(2), &mut backend, &mut assets).await.unwrap();
        let first_root = planet.body().unwrap().root;
        planet.generate(request(2), &mut backend, &mut assets).await.unwrap();

        assert_eq!(backend.removed, vec![first_root]);
        assert_ne!(planet.body().unwrap().root, first_root);
    }

    #[test]
    fn test_vegetation_transform() {
        let dir = Vec3::new(1.0, 1.0, 0.0).normalize();
        let (translation, rotation) = vegetation_transform(dir, dir, 0.1, 1.0);
        assert!((translation.length() - 1.1).abs() < 1e-5);
        assert!((rotation * Vec3::Y).distance(dir) < 1e-5);
    }
}
