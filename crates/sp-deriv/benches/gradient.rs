use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sp_conv::Parallelism;
use sp_core::{ConvolveMode, Image};
use sp_deriv::{hessian_u8_i16, sobel_u8_i16};

fn build_textured_u8(width: usize, height: usize) -> Image<u8> {
    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let v = (x as f32 * 0.11).sin() * (y as f32 * 0.09).cos();
            data[y * width + x] = (128.0 + 100.0 * v) as u8;
        }
    }
    Image::from_vec(width, height, data).expect("valid image")
}

fn bench_sobel(c: &mut Criterion) {
    let img = build_textured_u8(1280, 1024);
    let par = Parallelism::serial();
    let mut dx = Image::new_fill(1280, 1024, 0i16);
    let mut dy = Image::new_fill(1280, 1024, 0i16);

    c.bench_function("sobel_u8_1280x1024", |b| {
        b.iter(|| {
            sobel_u8_i16(
                black_box(&img.as_view()),
                &mut dx.as_view_mut(),
                &mut dy.as_view_mut(),
                ConvolveMode::Extend,
                &par,
            )
            .expect("sobel");
            black_box(dx.data()[0]);
        });
    });
}

fn bench_hessian(c: &mut Criterion) {
    let img = build_textured_u8(1280, 1024);
    let par = Parallelism::serial();
    let mut dxx = Image::new_fill(1280, 1024, 0i16);
    let mut dyy = Image::new_fill(1280, 1024, 0i16);
    let mut dxy = Image::new_fill(1280, 1024, 0i16);

    c.bench_function("hessian_u8_1280x1024", |b| {
        b.iter(|| {
            hessian_u8_i16(
                black_box(&img.as_view()),
                &mut dxx.as_view_mut(),
                &mut dyy.as_view_mut(),
                &mut dxy.as_view_mut(),
                ConvolveMode::Extend,
                &par,
            )
            .expect("hessian");
            black_box(dxx.data()[0]);
        });
    });
}

criterion_group!(benches, bench_sobel, bench_hessian);
criterion_main!(benches);
