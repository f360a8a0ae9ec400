//! Generate a planet through the background worker and print buffer stats.
//!
//! Usage: cargo run --release --bin planet_stats -- [OPTIONS]
//!
//! Options:
//!   --biome <NAME>     Preset biome (default: "beach")
//!   --shape <SHAPE>    sphere | box (default: sphere)
//!   --detail <N>       Edge splits per base face (default: 20)
//!   --seed <SEED>      Random seed (default: 12345)
//!   --timeout <SECS>   Give up and show the fallback after this long

use std::str::FromStr;
use std::time::{Duration, Instant};

use rust_biome_planet::biome::presets;
use rust_biome_planet::*;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let biome = parse_arg::<String>(&args, "--biome").unwrap_or_else(|| "beach".to_string());
    let shape = parse_arg::<String>(&args, "--shape").unwrap_or_else(|| "sphere".to_string());
    let detail = parse_arg::<i32>(&args, "--detail").unwrap_or(20);
    let seed = parse_arg::<u32>(&args, "--seed").unwrap_or(12345);
    let timeout = parse_arg::<f32>(&args, "--timeout").map(Duration::from_secs_f32);

    let request = match build_request(&biome, &shape, detail, seed) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("known biomes: {}", presets::names().join(", "));
            std::process::exit(2);
        }
    };

    println!("=== Planet Stats ===");
    println!("Biome:  {}", biome);
    println!("Shape:  {}", request.shape);
    println!("Detail: {}", request.detail);
    println!("Seed:   {}", request.seed);
    println!();

    let worker = PlanetWorker::spawn();
    let start = Instant::now();
    let pending = match worker.request(request.clone()) {
        Ok(pending) => pending,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    let response = match timeout {
        Some(limit) => pending.wait_timeout(limit).await,
        None => pending.wait().await,
    };
    let elapsed = start.elapsed();

    #[cfg(feature = "serde")]
    let encoded_len = worker::wire::encode_response(&response).map(|json| json.len()).ok();

    let (mesh, fell_back) = match response.into_result() {
        Ok(mesh) => (mesh, false),
        Err(e) => {
            log::warn!("{}; showing fallback", e);
            let tint = request
                .resolve_biome()
                .map(|b| b.land_tint())
                .unwrap_or(Color::WHITE);
            (fallback_mesh(tint), true)
        }
    };

    println!("Generated in {:.1?}{}", elapsed, if fell_back { " (fallback)" } else { "" });
    println!("  Terrain vertices:  {}", mesh.vertex_count());
    println!("  Terrain triangles: {}", mesh.triangle_count());
    println!("  Sea vertices:      {}", mesh.sea.base.vertex_count());
    println!("  Consistent:        {}", mesh.is_consistent());

    let (lo, hi) = radius_range(&mesh.terrain.positions);
    println!("  Terrain radius:    {:.4} .. {:.4}", lo, hi);

    println!("  Vegetation:");
    for (name, points) in &mesh.vegetation {
        println!("    {:<12} {}", name, points.len());
    }

    let floats = mesh.terrain.positions.len()
        + mesh.terrain.colors.len()
        + mesh.terrain.normals.len()
        + mesh.sea.base.positions.len() * 3
        + mesh.sea.morph_targets.iter().map(|m| m.positions.len() + m.normals.len()).sum::<usize>();
    println!("  Buffers:           {:.2} MB", (floats * 4) as f32 / 1024.0 / 1024.0);

    #[cfg(feature = "serde")]
    if let Some(len) = encoded_len {
        println!("  Wire size (JSON):  {:.2} MB", len as f32 / 1024.0 / 1024.0);
    }
}

fn build_request(biome: &str, shape: &str, detail: i32, seed: u32) -> Result<PlanetRequest> {
    PlanetRequestBuilder::new()
        .seed(seed)
        .shape(shape.parse()?)
        .detail(detail)?
        .biome_preset(biome)?
        .build()
}

fn radius_range(positions: &[f32]) -> (f32, f32) {
    positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]).length())
        .fold((f32::INFINITY, 0.0), |(lo, hi), r| (lo.min(r), hi.max(r)))
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
