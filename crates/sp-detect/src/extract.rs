//! Non-maximum suppression over an intensity map.

use sp_core::{Error, ImageView};

/// Pixel-aligned detection with its intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    pub strength: f32,
}

impl Corner {
    pub fn new(x: u32, y: u32, strength: f32) -> Self {
        Self { x, y, strength }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractorConfig {
    /// Minimum intensity for a point to qualify.
    pub threshold: f32,
    /// Exclusion radius: no two returned points lie within this many pixels
    /// of each other along either axis.
    pub separation: usize,
    /// Keep only the strongest N points; 0 keeps everything.
    pub max_features: usize,
    /// Whether ranked (best-N) selection is available.
    pub ranked: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            separation: 1,
            max_features: 0,
            ranked: true,
        }
    }
}

/// Extracts local maxima of an intensity map as a sparse corner list.
///
/// Equal-intensity ties inside one exclusion window are broken by row-major
/// scan order: the earlier pixel wins. This makes extraction deterministic
/// and guarantees the separation invariant even on plateaus.
#[derive(Debug)]
pub struct NonMaxExtractor {
    config: ExtractorConfig,
    excluded_mask: Vec<bool>,
    mask_dims: (usize, usize),
}

impl NonMaxExtractor {
    /// Validates the configuration eagerly; best-N needs ranked selection.
    pub fn new(config: ExtractorConfig) -> Result<Self, Error> {
        if config.max_features > 0 && !config.ranked {
            return Err(Error::UnsupportedConfig(
                "best-N selection requires a ranked extractor",
            ));
        }
        if !config.threshold.is_finite() {
            return Err(Error::UnsupportedConfig("threshold must be finite"));
        }
        Ok(Self {
            config,
            excluded_mask: Vec::new(),
            mask_dims: (0, 0),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.config.threshold = threshold;
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Finds qualifying local maxima of `intensity` and appends them to
    /// `out` (cleared on entry).
    ///
    /// When `candidates` is given, only those pixels are examined; the
    /// suppression window still reads the full map. Points in `excluded`
    /// are never returned.
    pub fn process(
        &mut self,
        intensity: &ImageView<'_, f32>,
        candidates: Option<&[Corner]>,
        excluded: Option<&[Corner]>,
        out: &mut Vec<Corner>,
    ) -> Result<(), Error> {
        out.clear();
        let (width, height) = intensity.dims();
        if width == 0 || height == 0 {
            return Ok(());
        }

        let use_mask = excluded.is_some_and(|e| !e.is_empty());
        if use_mask {
            self.prepare_mask(width, height, excluded.unwrap_or(&[]));
        }

        match candidates {
            Some(list) => {
                for c in list {
                    let (x, y) = (c.x as usize, c.y as usize);
                    if x >= width || y >= height {
                        continue;
                    }
                    self.consider(intensity, x, y, use_mask, out);
                }
            }
            None => {
                for y in 0..height {
                    for x in 0..width {
                        self.consider(intensity, x, y, use_mask, out);
                    }
                }
            }
        }

        if self.config.max_features > 0 && out.len() > self.config.max_features {
            // Descending strength; scan order resolves exact ties.
            out.sort_by(|a, b| {
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(core::cmp::Ordering::Equal)
                    .then_with(|| {
                        let ia = a.y as usize * width + a.x as usize;
                        let ib = b.y as usize * width + b.x as usize;
                        ia.cmp(&ib)
                    })
            });
            out.truncate(self.config.max_features);
        }
        Ok(())
    }

    fn prepare_mask(&mut self, width: usize, height: usize, excluded: &[Corner]) {
        if self.mask_dims != (width, height) {
            self.excluded_mask.clear();
            self.excluded_mask.resize(width * height, false);
            self.mask_dims = (width, height);
        } else {
            self.excluded_mask.fill(false);
        }
        for c in excluded {
            let (x, y) = (c.x as usize, c.y as usize);
            if x < width && y < height {
                self.excluded_mask[y * width + x] = true;
            }
        }
    }

    fn consider(
        &self,
        intensity: &ImageView<'_, f32>,
        x: usize,
        y: usize,
        use_mask: bool,
        out: &mut Vec<Corner>,
    ) {
        let (width, height) = intensity.dims();
        let v = intensity.row(y)[x];
        if v < self.config.threshold {
            return;
        }
        if use_mask && self.excluded_mask[y * width + x] {
            return;
        }

        let sep = self.config.separation as isize;
        let index = y * width + x;
        let y0 = (y as isize - sep).max(0) as usize;
        let y1 = ((y as isize + sep) as usize).min(height - 1);
        let x0 = (x as isize - sep).max(0) as usize;
        let x1 = ((x as isize + sep) as usize).min(width - 1);

        for ny in y0..=y1 {
            let row = intensity.row(ny);
            for (nx, &n) in row
                .iter()
                .enumerate()
                .take(x1 + 1)
                .skip(x0)
            {
                let nindex = ny * width + nx;
                if nindex == index {
                    continue;
                }
                if n > v || (n == v && nindex < index) {
                    return;
                }
            }
        }
        out.push(Corner::new(x as u32, y as u32, v));
    }
}

#[cfg(test)]
mod tests {
    use super::{Corner, ExtractorConfig, NonMaxExtractor};
    use sp_core::{Error, Image};

    fn map_with_peaks(peaks: &[(usize, usize, f32)]) -> Image<f32> {
        let mut img = Image::new_fill(16, 12, 0.0f32);
        for &(x, y, v) in peaks {
            *img.as_view_mut().get_mut(x, y).expect("in bounds") = v;
        }
        img
    }

    #[test]
    fn isolated_peaks_are_all_returned() {
        let img = map_with_peaks(&[(2, 2, 5.0), (10, 3, 7.0), (6, 9, 3.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 2,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out.len(), 3);
        assert!(out.contains(&Corner::new(10, 3, 7.0)));
    }

    #[test]
    fn returned_points_respect_the_separation_radius() {
        // Two peaks inside one window; only the stronger survives.
        let img = map_with_peaks(&[(5, 5, 4.0), (6, 6, 9.0), (13, 5, 2.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 2,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");

        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                let dx = a.x.abs_diff(b.x);
                let dy = a.y.abs_diff(b.y);
                assert!(dx > 2 || dy > 2, "{a:?} overlaps {b:?}");
            }
        }
        assert!(out.contains(&Corner::new(6, 6, 9.0)));
        assert!(!out.contains(&Corner::new(5, 5, 4.0)));
    }

    #[test]
    fn equal_plateau_keeps_the_earliest_pixel() {
        let img = map_with_peaks(&[(4, 4, 5.0), (5, 4, 5.0), (4, 5, 5.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 1,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out, vec![Corner::new(4, 4, 5.0)]);
    }

    #[test]
    fn threshold_is_mutable_after_construction() {
        let img = map_with_peaks(&[(3, 3, 2.0), (9, 9, 8.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 5.0,
            separation: 1,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out.len(), 1);

        ex.set_threshold(1.0);
        assert_eq!(ex.threshold(), 1.0);
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn excluded_points_are_never_returned() {
        let img = map_with_peaks(&[(3, 3, 6.0), (12, 8, 6.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 1,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(
            &img.as_view(),
            None,
            Some(&[Corner::new(3, 3, 6.0)]),
            &mut out,
        )
        .expect("extract");
        assert_eq!(out, vec![Corner::new(12, 8, 6.0)]);
    }

    #[test]
    fn candidate_list_restricts_the_scan() {
        let img = map_with_peaks(&[(3, 3, 6.0), (12, 8, 9.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 1,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(
            &img.as_view(),
            Some(&[Corner::new(3, 3, 0.0)]),
            None,
            &mut out,
        )
        .expect("extract");
        assert_eq!(out, vec![Corner::new(3, 3, 6.0)]);
    }

    #[test]
    fn best_n_keeps_the_strongest() {
        let img = map_with_peaks(&[(2, 2, 3.0), (8, 2, 9.0), (2, 8, 6.0), (12, 9, 1.5)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 1,
            max_features: 2,
            ranked: true,
        })
        .expect("valid config");

        let mut out = Vec::new();
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Corner::new(8, 2, 9.0));
        assert_eq!(out[1], Corner::new(2, 8, 6.0));
    }

    #[test]
    fn best_n_without_ranking_fails_at_configuration() {
        let err = NonMaxExtractor::new(ExtractorConfig {
            max_features: 5,
            ranked: false,
            ..ExtractorConfig::default()
        });
        assert!(matches!(err, Err(Error::UnsupportedConfig(_))));
    }

    #[test]
    fn output_is_cleared_on_entry() {
        let img = map_with_peaks(&[(5, 5, 4.0)]);
        let mut ex = NonMaxExtractor::new(ExtractorConfig {
            threshold: 1.0,
            separation: 1,
            ..ExtractorConfig::default()
        })
        .expect("valid config");

        let mut out = vec![Corner::new(0, 0, 99.0)];
        ex.process(&img.as_view(), None, None, &mut out).expect("extract");
        assert_eq!(out, vec![Corner::new(5, 5, 4.0)]);
    }
}
