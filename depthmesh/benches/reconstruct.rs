use criterion::{
    BenchmarkId, Criterion, black_box, criterion_group, criterion_main,
};
use depthmesh::{
    config::ClipRange,
    mesh::Mesh,
    source::{DepthFrame, Pinhole, Rgb},
};

/// Builds a VGA frame of a sphere in front of a distant wall
///
/// The wall is beyond the far clip plane, so the sphere's silhouette exercises
/// the partial-quad path.
fn sphere_frame() -> DepthFrame {
    let (w, h) = (640, 480);
    let cam = Pinhole::default();
    let mut f = DepthFrame::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let u = (x as f32 - cam.cx) / 200.0;
            let v = (y as f32 - cam.cy) / 200.0;
            let r2 = u * u + v * v;
            let d = if r2 < 1.0 {
                650.0 - 100.0 * (1.0 - r2).sqrt()
            } else {
                2000.0
            };
            f.set(x, y, d, cam.unproject(x, y, d));
            let c = Rgb::new((x % 256) as u8, (y % 256) as u8, 128);
            f.set_color(x, y, c);
        }
    }
    f
}

pub fn reconstruct_vga(c: &mut Criterion) {
    let frame = &sphere_frame();
    let mut group = c.benchmark_group("reconstruct (640x480)");
    for (name, clip) in [
        ("sphere", ClipRange::new(500, 800)),
        ("full", ClipRange::new(500, 2000)),
    ] {
        group.bench_function(BenchmarkId::new("rebuild", name), move |b| {
            let mut mesh = Mesh::new();
            b.iter(|| {
                mesh.rebuild(frame, clip);
                black_box(mesh.vertex_count())
            })
        });
        group.bench_function(
            BenchmarkId::new("reconstruct", name),
            move |b| b.iter(|| black_box(depthmesh::reconstruct(frame, clip))),
        );
    }
}

pub fn normals_vga(c: &mut Criterion) {
    let clip = ClipRange::new(500, 2000);
    let mut mesh = depthmesh::reconstruct(&sphere_frame(), clip);
    let mut group = c.benchmark_group("normals (640x480)");
    for flip in [false, true] {
        let id = BenchmarkId::new("estimate_normals", flip);
        group.bench_function(id, |b| {
            b.iter(|| {
                mesh.estimate_normals(flip);
                black_box(mesh.normals.len())
            })
        });
    }
}

criterion_group!(benches, reconstruct_vga, normals_vga);
criterion_main!(benches);
