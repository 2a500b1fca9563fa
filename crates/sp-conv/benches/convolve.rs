use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sp_conv::{
    Parallelism, gaussian_f32, gaussian_i32, horizontal_f32, horizontal_u8_u8_div, vertical_f32,
    vertical_u8_u8_div,
};
use sp_core::{ConvolveMode, Image};

fn build_textured_f32(width: usize, height: usize) -> Image<f32> {
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let v = (x as f32 * 0.13).sin() * (y as f32 * 0.07).cos();
            data[y * width + x] = 128.0 + 100.0 * v;
        }
    }
    Image::from_vec(width, height, data).expect("valid image")
}

fn build_textured_u8(width: usize, height: usize) -> Image<u8> {
    let f = build_textured_f32(width, height);
    let data = f.data().iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect();
    Image::from_vec(width, height, data).expect("valid image")
}

fn bench_separable_f32(c: &mut Criterion) {
    let img = build_textured_f32(1280, 1024);
    let kernel = gaussian_f32(2.0, 5, true);
    let par = Parallelism::serial();
    let mut tmp = Image::new_fill(1280, 1024, 0.0f32);
    let mut out = Image::new_fill(1280, 1024, 0.0f32);

    c.bench_function("gaussian_blur_f32_1280x1024", |b| {
        b.iter(|| {
            horizontal_f32(
                black_box(&kernel),
                &img.as_view(),
                &mut tmp.as_view_mut(),
                ConvolveMode::Normalize,
                &par,
            )
            .expect("horizontal");
            vertical_f32(
                black_box(&kernel),
                &tmp.as_view(),
                &mut out.as_view_mut(),
                ConvolveMode::Normalize,
                &par,
            )
            .expect("vertical");
            black_box(out.data()[0]);
        });
    });
}

fn bench_blur_u8(c: &mut Criterion) {
    let img = build_textured_u8(1280, 1024);
    let kernel = gaussian_i32(2.0, 5);
    let divisor = kernel.sum();
    let par = Parallelism::serial();
    let mut tmp = Image::new_fill(1280, 1024, 0u8);
    let mut out = Image::new_fill(1280, 1024, 0u8);

    c.bench_function("gaussian_blur_u8_1280x1024", |b| {
        b.iter(|| {
            horizontal_u8_u8_div(
                black_box(&kernel),
                divisor,
                &img.as_view(),
                &mut tmp.as_view_mut(),
                ConvolveMode::Normalize,
                &par,
            )
            .expect("horizontal");
            vertical_u8_u8_div(
                black_box(&kernel),
                divisor,
                &tmp.as_view(),
                &mut out.as_view_mut(),
                ConvolveMode::Normalize,
                &par,
            )
            .expect("vertical");
            black_box(out.data()[0]);
        });
    });
}

criterion_group!(benches, bench_separable_f32, bench_blur_u8);
criterion_main!(benches);
