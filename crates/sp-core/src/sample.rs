use crate::border::extend_index;
use crate::image::ImageView;

/// Bilinear sample at pixel-center coordinates with edge replication.
///
/// Integer coordinates refer to pixel centers; the interpolation neighborhood
/// is the standard floor-based 2x2 block. Out-of-range taps clamp to the
/// nearest edge pixel.
pub fn sample_bilinear_f32(img: &ImageView<'_, f32>, x: f32, y: f32) -> f32 {
    assert!(
        img.width() > 0 && img.height() > 0,
        "cannot sample an empty image"
    );

    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let xa = extend_index(x0, img.width());
    let xb = extend_index(x0 + 1, img.width());
    let ya = extend_index(y0, img.height());
    let yb = extend_index(y0 + 1, img.height());

    // SAFETY: `extend_index` returns indices in `[0, len)` for non-empty
    // images.
    let (p00, p10, p01, p11) = unsafe {
        (
            *img.get_unchecked(xa, ya),
            *img.get_unchecked(xb, ya),
            *img.get_unchecked(xa, yb),
            *img.get_unchecked(xb, yb),
        )
    };

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}

#[cfg(test)]
mod tests {
    use super::sample_bilinear_f32;
    use crate::image::Image;

    #[test]
    fn bilinear_center_of_2x2() {
        let img = Image::from_vec(2, 2, vec![0.0f32, 10.0, 20.0, 30.0]).expect("valid image");
        let v = sample_bilinear_f32(&img.as_view(), 0.5, 0.5);
        assert!((v - 15.0).abs() < 1e-6);
    }

    #[test]
    fn bilinear_at_integer_coordinates_is_exact() {
        let img = Image::from_vec(3, 2, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid");
        let view = img.as_view();
        assert_eq!(sample_bilinear_f32(&view, 2.0, 1.0), 6.0);
        assert_eq!(sample_bilinear_f32(&view, 0.0, 0.0), 1.0);
    }

    #[test]
    fn bilinear_clamps_outside_the_image() {
        let img = Image::from_vec(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]).expect("valid image");
        let view = img.as_view();
        assert_eq!(sample_bilinear_f32(&view, -5.0, -5.0), 1.0);
        assert_eq!(sample_bilinear_f32(&view, 9.0, 9.0), 4.0);
    }
}
