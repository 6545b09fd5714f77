use criterion::{criterion_group, criterion_main, Criterion, black_box};

use cubix::generation::{GenerationConfig, GenerationMode, GenerationPipeline};
use cubix::render::GpuBufferFactory;
use cubix::streaming::{disk_io, ChunkStreamer};
use cubix::voxel::{ChunkCoord, ChunkKey, ChunkStore};

use glam::Vec3;

/// Factory that only counts uploads
struct NullFactory(usize);

impl GpuBufferFactory for NullFactory {
    type Handle = usize;

    fn create_gpu_buffer(&mut self, bytes: &[u8]) -> usize {
        self.0 += bytes.len();
        self.0
    }
}

fn landscape(size: usize) -> GenerationPipeline {
    let config = GenerationConfig::for_world_size(size);
    GenerationPipeline::new(config).unwrap()
}

fn bench_landscape_64(c: &mut Criterion) {
    let pipeline = landscape(64);

    c.bench_function("landscape_generate_64", |b| {
        b.iter(|| pipeline.generate_landscape(black_box(64)).unwrap());
    });
}

fn bench_landscape_chunks_128(c: &mut Criterion) {
    let pipeline = landscape(128);
    let coords: Vec<ChunkCoord> = (0..4)
        .flat_map(|x| (0..4).flat_map(move |y| (0..4).map(move |z| ChunkCoord::new(x, y, z))))
        .collect();

    c.bench_function("landscape_chunks_128_by_32", |b| {
        b.iter(|| pipeline.generate_chunks(black_box(&coords), 32, 128).unwrap());
    });
}

fn bench_debug_infill_64(c: &mut Criterion) {
    let mut config = GenerationConfig::for_world_size(64);
    config.mode = GenerationMode::Debug;
    let pipeline = GenerationPipeline::new(config).unwrap();

    c.bench_function("debug_infill_64", |b| {
        b.iter(|| pipeline.generate_debug(black_box(64)).unwrap());
    });
}

fn bench_compress_world_64(c: &mut Criterion) {
    let (world, _) = landscape(64).generate_landscape(64).unwrap();

    c.bench_function("compress_world_64", |b| {
        b.iter(|| disk_io::compress_world(black_box(&world), 16).unwrap());
    });

    let data = disk_io::compress_world(&world, 16).unwrap();
    c.bench_function("decompress_world_64", |b| {
        b.iter(|| disk_io::decompress_world(black_box(&data)).unwrap());
    });
}

fn bench_streamer_ordered(c: &mut Criterion) {
    let mut store = ChunkStore::new(16).unwrap();
    landscape(128).populate(&mut store, 128).unwrap();
    let mut streamer = ChunkStreamer::new(store, NullFactory(0));
    streamer.sync();

    c.bench_function("streamer_ordered_moving_viewer", |b| {
        let mut frame = 0u32;
        b.iter(|| {
            frame += 1;
            let viewer = Vec3::new(
                64.0 + (frame as f32 * 0.1).sin() * 50.0,
                64.0 + (frame as f32 * 0.1).cos() * 50.0,
                80.0,
            );
            let order = streamer.ordered(black_box(viewer));
            black_box(order.len());
        });
    });
}

fn bench_chunk_key_pack_unpack(c: &mut Criterion) {
    let coord = ChunkCoord::new(5, 300, 10_000);

    c.bench_function("chunk_key_pack_unpack", |b| {
        b.iter(|| {
            let key = ChunkKey::pack(black_box(coord)).unwrap();
            black_box(key.unpack());
        });
    });
}

criterion_group!(
    benches,
    bench_landscape_64,
    bench_landscape_chunks_128,
    bench_debug_infill_64,
    bench_compress_world_64,
    bench_streamer_ordered,
    bench_chunk_key_pack_unpack,
);
criterion_main!(benches);
