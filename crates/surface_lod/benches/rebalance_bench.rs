//! Benchmarks for growing, churning and meshing a single planet surface.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{DVec3, Vec3};
use surface_lod::{CameraRay, Formation, Sphere3, Surface, SurfaceConfig};

const RADIUS: f64 = 6.4e6;

/// Camera 1 km above the surface, looking straight down.
fn camera_above(direction: Vec3) -> CameraRay {
  let direction = direction.normalize();
  CameraRay::new(direction * (RADIUS as f32 + 1000.0), -direction)
}

/// Surface with one planet, grown to `target` around `camera`.
fn grown_surface(target: usize, camera: CameraRay) -> Surface {
  let mut surface = Surface::new(SurfaceConfig::default());
  // Fresh surface, fresh id: cannot collide.
  surface.add_formation(Formation::sphere(DVec3::ZERO, RADIUS)).unwrap();
  surface.set_target_num_quaterna(target);
  surface.tick(camera);
  surface
}

/// Growing from the bare tetrahedron to the target in one tick.
fn bench_grow(c: &mut Criterion) {
  let mut group = c.benchmark_group("grow");
  let camera = camera_above(Vec3::Z);

  for target in [1024, 4096, 16384] {
    group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
      b.iter(|| black_box(grown_surface(target, camera)))
    });
  }

  group.finish();
}

/// Re-scoring and re-balancing after the camera moves a short distance.
fn bench_churn(c: &mut Criterion) {
  let start = camera_above(Vec3::Z);
  let moved = camera_above(Vec3::new(0.01, 0.0, 1.0));

  c.bench_function("churn (4096 quaterna, small move)", |b| {
    b.iter_batched(
      || grown_surface(4096, start),
      |mut surface| black_box(surface.tick(moved)),
      criterion::BatchSize::LargeInput,
    )
  });
}

/// A tick with nothing to do: scores only.
fn bench_steady_tick(c: &mut Criterion) {
  let camera = camera_above(Vec3::Z);
  let mut surface = grown_surface(4096, camera);

  c.bench_function("steady tick (4096 quaterna)", |b| {
    b.iter(|| black_box(surface.tick(camera)))
  });
}

fn bench_generate_mesh(c: &mut Criterion) {
  let mut group = c.benchmark_group("generate_mesh");
  let camera = camera_above(Vec3::Z);

  for target in [1024, 4096, 16384] {
    let surface = grown_surface(target, camera);
    group.bench_with_input(BenchmarkId::from_parameter(target), &surface, |b, surface| {
      b.iter(|| black_box(surface.generate_mesh(1)))
    });
  }

  group.finish();
}

fn bench_query(c: &mut Criterion) {
  let camera = camera_above(Vec3::Z);
  let surface = grown_surface(4096, camera);
  let probe = Sphere3::new(Vec3::Z * RADIUS as f32, 50.0);

  c.bench_function("sphere query (4096 quaterna)", |b| {
    b.iter(|| {
      let mut hits = 0usize;
      surface.for_each_intersection(black_box(&probe), |_| hits += 1);
      black_box(hits)
    })
  });
}

criterion_group!(
  benches,
  bench_grow,
  bench_churn,
  bench_steady_tick,
  bench_generate_mesh,
  bench_query,
);
criterion_main!(benches);
