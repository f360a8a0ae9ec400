//! Procedural biome planet meshes
//!
//! Generates small stylised planets (icosphere or box worlds) from a
//! declarative request: layered noise terrain colored by biome gradients, an
//! animated two-state sea shell, and vegetation scattered with a minimum
//! spacing. Output is engine-agnostic flat buffers; generation runs behind an
//! async worker boundary so it never blocks the render loop.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rust_biome_planet::*;
//!
//! // Describe the planet
//! let request = PlanetRequestBuilder::new()
//!     .seed(42)
//!     .shape(ShapeKind::Sphere)
//!     .detail(20).unwrap()
//!     .biome_preset("beach").unwrap()
//!     .build().unwrap();
//!
//! // Generate it synchronously
//! let mesh = MeshBuilder::new().build(&request).unwrap();
//! println!("Generated {} triangles", mesh.triangle_count());
//!
//! // Or through the background worker
//! # async fn run(request: PlanetRequest) -> Result<()> {
//! let worker = PlanetWorker::spawn();
//! let mesh = worker.request(request)?.wait().await.into_result()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `serde` (default): serialization for requests, results and worker
//!   messages, plus the JSON codec in [`worker::wire`]

// Modules
pub mod error;
pub mod config;
pub mod color;
pub mod noise;
pub mod spatial;
pub mod biome;
pub mod mesh;
pub mod worker;
pub mod planet;

// Re-export core types for convenience
pub use error::{PlanetError, Result};
pub use config::{
    AtmosphereOptions, BiomeSelection, MaterialStyle, PlanetRequest, PlanetRequestBuilder, ShapeKind,
    MAX_DETAIL,
};
pub use color::{Color, ColorGradient, ColorStop, Easing};
pub use noise::{NoiseConfig, NoiseEngine, Param};
pub use spatial::{Aabb, PointOctree};
pub use biome::{Biome, BiomeOptions, GroundDecoration, MaterialVariant, VegetationItemSpec};
pub use mesh::{fallback_mesh, GeometryBuffers, MeshBuilder, MorphTarget, PlanetMeshResult, SeaGeometry};
pub use worker::{handle_request, PendingPlanet, PlanetWorker, WorkerRequest, WorkerResponse};
pub use planet::{AssetLoader, Planet, PlanetBody, RenderBackend, SurfaceMaterial};

// Re-export glam types for convenience
pub use glam::{Quat, Vec3};
