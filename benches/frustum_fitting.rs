use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec3, Vec4};
use shadow_viewer::frustum::{fit_lrbt, fit_near_far};
use shadow_viewer::math::frustum_rh_gl;
use shadow_viewer::shadow::cheap_shadow_transform;

/// Deterministic pseudo-random vertex cloud in front of the camera
fn vertex_cloud(count: usize) -> Vec<Vec4> {
    (0..count)
        .map(|i| {
            let s = i as f32;
            Vec4::new(
                (s * 0.731).sin() * 8.0,
                (s * 0.127).cos() * 4.0,
                -2.0 - ((s * 0.313).sin().abs() * 18.0),
                1.0,
            )
        })
        .collect()
}

/// Benchmark: near/far fit over growing vertex counts
fn bench_fit_near_far(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_near_far");
    for count in [64, 1024, 16384] {
        let verts = vertex_cloud(count);
        let view = Mat4::from_rotation_x(1.2);
        group.bench_with_input(BenchmarkId::from_parameter(count), &verts, |b, verts| {
            b.iter(|| black_box(fit_near_far(black_box(&view), black_box(verts))))
        });
    }
    group.finish();
}

/// Benchmark: the full auto-fit pipeline producing a light projection
fn bench_full_frustum_fit(c: &mut Criterion) {
    let verts = vertex_cloud(1024);
    let view = Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2);

    c.bench_function("full_frustum_fit", |b| {
        b.iter(|| {
            let (near, far) = fit_near_far(black_box(&view), black_box(&verts));
            let (l, r, bo, t) = fit_lrbt(&view, &verts, near, far);
            black_box(frustum_rh_gl(l, r, bo, t, near, far))
        })
    });
}

/// Benchmark: planar shadow transform construction
fn bench_cheap_shadow_transform(c: &mut Criterion) {
    let plane = Vec4::new(0.0, 1.0, 0.0, 0.0);
    let light = Vec3::new(2.0, 9.0, -3.0);

    c.bench_function("cheap_shadow_transform", |b| {
        b.iter(|| black_box(cheap_shadow_transform(black_box(plane), black_box(light))))
    });
}

criterion_group!(
    benches,
    bench_fit_near_far,
    bench_full_frustum_fit,
    bench_cheap_shadow_transform
);
criterion_main!(benches);
