//! World generator binary: generates a world, saves it and verifies the save.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>     JSON engine config (default: built-in defaults)
//!   --size <VOXELS>     World side length (default: from config)
//!   --seed <SEED>       Random seed (default: from config)
//!   --name <NAME>       World name / save file stem (default: from config)
//!   --mode <MODE>       flat | debug | landscape (default: from config)
//!   --heightmap <PATH>  Also write the landscape heightmap as a PNG
//!   --chunks            Also split the world into chunk files
//!   --jobs <N>          Max parallel chunk writes (default: rayon's choice)
//!
//! Output structure:
//!   <saves>/<name>.cbw              # Monolithic world save
//!   <saves>/<name>_chunks/          # With --chunks
//!     manifest.json                 # World metadata + chunk list
//!     z_0/chunk_0_0_0.cbc
//!     ...

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde_json::json;

use cubix::core::{EngineConfig, Error, Result, logging};
use cubix::generation::{GenerationMode, GenerationPipeline};
use cubix::streaming::disk_io;
use cubix::voxel::{Chunk, ChunkStore};

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("World generation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = parse_usize_arg(&args, "--size") {
        config.world_size = size;
        // Keep level and magnitude proportional unless a config file set them
        if parse_str_arg(&args, "--config").is_none() {
            let mode = config.generation.mode;
            let seed = config.generation.seed;
            config.generation = cubix::generation::GenerationConfig::for_world_size(size);
            config.generation.mode = mode;
            config.generation.seed = seed;
        }
    }
    if let Some(seed) = parse_u64_arg(&args, "--seed") {
        config.generation.seed = seed;
    }
    if let Some(name) = parse_str_arg(&args, "--name") {
        config.world_name = name;
    }
    if let Some(mode) = parse_str_arg(&args, "--mode") {
        config.generation.mode = mode.parse()?;
    }
    config.validate()?;

    let heightmap_path = parse_str_arg(&args, "--heightmap").map(PathBuf::from);
    let write_chunks = args.iter().any(|a| a == "--chunks");
    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            log::warn!("Could not configure thread pool: {}", e);
        }
    }

    let save_path = config.save_path();

    println!("=== Cubix World Generator ===");
    println!("World:  {}", config.world_name);
    println!("Size:   {}³ voxels, {}³ chunks", config.world_size, config.chunk_size);
    println!("Mode:   {:?}", config.generation.mode);
    println!("Seed:   {}", config.generation.seed);
    println!("Output: {}", save_path.display());
    println!();

    // Phase 1: Generate
    let pipeline = GenerationPipeline::new(config.generation.clone())?;
    let start = Instant::now();
    let world = match config.generation.mode {
        GenerationMode::Landscape => {
            let (world, heightmap) = pipeline.generate_landscape(config.world_size)?;
            if let Some(path) = &heightmap_path {
                match heightmap.save_png(path) {
                    Ok(()) => println!("Heightmap: {}", path.display()),
                    Err(e) => log::warn!("Failed to write heightmap {}: {}", path.display(), e),
                }
            }
            world
        }
        _ => {
            if heightmap_path.is_some() {
                log::warn!("--heightmap only applies to landscape mode");
            }
            pipeline.generate_world(config.world_size)?
        }
    };
    let solid = world.grid().count_solid();
    println!(
        "Generated: {} solid voxels ({:.1}%) in {:.2}s",
        solid,
        100.0 * solid as f64 / world.grid().len() as f64,
        start.elapsed().as_secs_f64()
    );

    // Phase 2: Save and verify
    let start = Instant::now();
    disk_io::save_world(&save_path, &world, config.chunk_size)?;
    let file_bytes = std::fs::metadata(&save_path)?.len();

    let (loaded, header) = disk_io::load_world(&save_path)?;
    if loaded.grid() != world.grid() {
        return Err(Error::Config(format!(
            "{} did not load back identically",
            save_path.display()
        )));
    }
    println!(
        "Saved:     {:.1} KB (v{}) in {:.2}s, round trip verified",
        file_bytes as f64 / 1024.0,
        header.version,
        start.elapsed().as_secs_f64()
    );

    // Phase 3: Optional chunk export
    if write_chunks {
        let store = ChunkStore::from_monolithic(&world, config.chunk_size)?;
        write_chunk_set(&config, &store)?;
    }

    println!();
    println!("=== Generation Complete ===");
    Ok(())
}

fn write_chunk_set(config: &EngineConfig, store: &ChunkStore) -> Result<()> {
    let chunk_dir = config.chunk_dir();
    std::fs::create_dir_all(&chunk_dir)?;

    let start = Instant::now();
    let chunks: Vec<&Chunk> = store.iter().map(|(_, chunk)| chunk).collect();
    let written = AtomicUsize::new(0);
    let total = chunks.len();

    chunks.par_iter().try_for_each(|chunk| {
        disk_io::save_chunk(&chunk_dir, chunk)?;
        let done = written.fetch_add(1, Ordering::Relaxed) + 1;
        if done % 100 == 0 || done == total {
            eprintln!("  [{}/{}] chunks written", done, total);
        }
        Ok::<_, Error>(())
    })?;

    let mut coords: Vec<_> = store.coords().collect();
    coords.sort();
    let manifest = json!({
        "name": config.world_name,
        "version": disk_io::FORMAT_VERSION,
        "seed": config.generation.seed,
        "mode": config.generation.mode,
        "world_size": config.world_size,
        "chunk_size": config.chunk_size,
        "chunk_count": coords.len(),
        "chunks": coords.iter().map(|c| json!({"x": c.x, "y": c.y, "z": c.z})).collect::<Vec<_>>(),
    });
    let manifest_text = serde_json::to_string_pretty(&manifest)
        .map_err(|e| Error::Config(format!("manifest: {}", e)))?;
    std::fs::write(chunk_dir.join("manifest.json"), manifest_text)?;

    println!(
        "Chunks:    {} non-empty of {} in {:.2}s -> {}",
        total,
        config.chunks_per_axis().pow(3),
        start.elapsed().as_secs_f64(),
        chunk_dir.display()
    );
    Ok(())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
