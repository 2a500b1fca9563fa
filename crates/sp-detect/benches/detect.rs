use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sp_core::Image;
use sp_detect::{
    ExtractorConfig, HessianBlobIntensity, HessianBlobMode, NonMaxExtractor, ScaleSpaceDetector,
};
use sp_pyr::GaussianScaleSpace;

fn build_blob_field(size: usize) -> Image<f32> {
    let mut data = vec![10.0f32; size * size];
    // Grid of blobs at mixed sizes.
    for (gx, gy, sigma) in [(1usize, 1usize, 2.0f32), (3, 1, 4.0), (1, 3, 3.0), (3, 3, 6.0)] {
        let cx = (gx * size / 4) as f32;
        let cy = (gy * size / 4) as f32;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                data[y * size + x] +=
                    100.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            }
        }
    }
    Image::from_vec(size, size, data).expect("valid image")
}

fn bench_scale_space_detect(c: &mut Criterion) {
    let img = build_blob_field(512);
    let mut ss = GaussianScaleSpace::new(&[1.0, 1.414, 2.0, 2.828, 4.0, 5.657, 8.0])
        .expect("valid config");
    ss.process(&img.as_view()).expect("build");

    let extractor = NonMaxExtractor::new(ExtractorConfig {
        threshold: 0.5,
        separation: 4,
        ..ExtractorConfig::default()
    })
    .expect("valid config");
    let mut det = ScaleSpaceDetector::new(
        HessianBlobIntensity::new(HessianBlobMode::Determinant),
        extractor,
    );

    c.bench_function("scale_space_detect_7_levels_512x512", |b| {
        b.iter(|| {
            let points = det.detect_scale_space(black_box(&ss)).expect("detect");
            black_box(points.len());
        });
    });
}

criterion_group!(benches, bench_scale_space_detect);
criterion_main!(benches);
