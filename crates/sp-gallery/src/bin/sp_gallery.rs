use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{GrayImage, Rgb, RgbImage};
use serde::Serialize;

use sp_conv::{Parallelism, gaussian_f32};
use sp_core::{ConvolveMode, DynImage, Image};
use sp_deriv::{hessian_f32, sobel_f32};
use sp_detect::{
    Derivatives, ExtractorConfig, FeatureIntensity, HarrisIntensity, HessianBlobIntensity,
    HessianBlobMode, KltIntensity, LaplacianIntensity, NonMaxExtractor, ScalePoint,
    ScaleSpaceDetector,
};
use sp_pyr::{DiscretePyramid, GaussianScaleSpace};

#[derive(Parser, Debug)]
#[command(name = "sp_gallery")]
#[command(about = "Run scalepoint detectors on external images")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(name = "detect")]
    Detect(DetectArgs),
    #[command(name = "pyramid")]
    Pyramid(PyramidArgs),
    #[command(name = "intensity")]
    Intensity(IntensityArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, default_value = "docs/fig/raw")]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntensityKind {
    Harris,
    Klt,
    HessianDet,
    HessianTrace,
    Laplacian,
}

impl IntensityKind {
    fn name(self) -> &'static str {
        match self {
            Self::Harris => "harris",
            Self::Klt => "klt",
            Self::HessianDet => "hessian-det",
            Self::HessianTrace => "hessian-trace",
            Self::Laplacian => "laplacian",
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_enum, default_value_t = IntensityKind::HessianDet)]
    intensity: IntensityKind,
    #[arg(long, default_value_t = 7)]
    levels: usize,
    #[arg(long, default_value_t = 1.0)]
    base_sigma: f32,
    #[arg(long, default_value_t = 1.0)]
    threshold: f32,
    #[arg(long, default_value_t = 4)]
    separation: usize,
    #[arg(long, default_value_t = 0)]
    max_features: usize,
}

#[derive(Args, Debug, Clone)]
struct PyramidArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_delimiter = ',', default_values_t = [1u32, 2, 4, 8])]
    scales: Vec<u32>,
}

#[derive(Args, Debug, Clone)]
struct IntensityArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_enum, default_value_t = IntensityKind::Harris)]
    intensity: IntensityKind,
}

#[derive(Debug, Clone, Serialize)]
struct PointDto {
    x: f32,
    y: f32,
    scale: f32,
    strength: f32,
}

#[derive(Debug, Clone, Serialize)]
struct MetaDetect {
    intensity: &'static str,
    levels: usize,
    sigmas: Vec<f32>,
    threshold: f32,
    separation: usize,
    max_features: usize,
    count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct MetaPyramid {
    scales: Vec<u32>,
    layer_sizes: Vec<[usize; 2]>,
    policy: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct MetaIntensity {
    intensity: &'static str,
    width: usize,
    height: usize,
    min: f32,
    max: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Detect(args) => run_detect(args),
        Command::Pyramid(args) => run_pyramid(args),
        Command::Intensity(args) => run_intensity(args),
    }
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let case_dir = prepare_case(&args.common, "detect")?;
    let gray = load_input_u8(&args.common.input)?;
    let img = DynImage::U8(gray.clone())
        .to_f32()
        .context("converting input to f32")?;

    if args.levels < 3 {
        bail!("detection needs at least 3 scale levels, got {}", args.levels);
    }
    let sigmas: Vec<f32> = (0..args.levels)
        .map(|i| args.base_sigma * 2.0f32.sqrt().powi(i as i32))
        .collect();
    let mut ss = GaussianScaleSpace::new(&sigmas).context("building scale space")?;
    ss.process(&img.as_view()).context("processing scale space")?;

    let extractor = NonMaxExtractor::new(ExtractorConfig {
        threshold: args.threshold,
        separation: args.separation,
        max_features: args.max_features,
        ranked: true,
    })
    .context("configuring extractor")?;

    let points = match args.intensity {
        IntensityKind::Harris => {
            detect_points(HarrisIntensity::default(), extractor, &ss)?
        }
        IntensityKind::Klt => detect_points(KltIntensity::new(2), extractor, &ss)?,
        IntensityKind::HessianDet => detect_points(
            HessianBlobIntensity::new(HessianBlobMode::Determinant),
            extractor,
            &ss,
        )?,
        IntensityKind::HessianTrace => detect_points(
            HessianBlobIntensity::new(HessianBlobMode::Trace),
            extractor,
            &ss,
        )?,
        IntensityKind::Laplacian => {
            detect_points(LaplacianIntensity::new(), extractor, &ss)?
        }
    };

    let dtos: Vec<PointDto> = points
        .iter()
        .map(|p| PointDto {
            x: p.x,
            y: p.y,
            scale: p.scale,
            strength: p.strength,
        })
        .collect();
    write_json(case_dir.join("points.json"), &dtos)?;
    write_json(
        case_dir.join("meta.json"),
        &MetaDetect {
            intensity: args.intensity.name(),
            levels: args.levels,
            sigmas,
            threshold: args.threshold,
            separation: args.separation,
            max_features: args.max_features,
            count: points.len(),
        },
    )?;
    save_overlay(case_dir.join("overlay.png"), &gray, &points)?;

    Ok(())
}

fn detect_points<I: FeatureIntensity>(
    intensity: I,
    extractor: NonMaxExtractor,
    ss: &GaussianScaleSpace,
) -> Result<Vec<ScalePoint>> {
    let mut det = ScaleSpaceDetector::new(intensity, extractor);
    let points = det.detect_scale_space(ss).context("running detector")?;
    Ok(points.to_vec())
}

fn run_pyramid(args: PyramidArgs) -> Result<()> {
    let case_dir = prepare_case(&args.common, "pyramid")?;
    let gray = load_input_u8(&args.common.input)?;
    let img = DynImage::U8(gray).to_f32().context("converting input to f32")?;

    let mut pyr = DiscretePyramid::new(&args.scales, gaussian_f32(1.0, 2, true))
        .context("configuring pyramid")?;
    let layers = pyr.process(&img.as_view()).context("building pyramid")?;

    let mut sizes = Vec::new();
    for i in 0..layers.num_layers() {
        let layer = layers.layer(i);
        sizes.push([layer.width(), layer.height()]);
        let mut data = Vec::with_capacity(layer.width() * layer.height());
        for y in 0..layer.height() {
            data.extend_from_slice(layer.row(y));
        }
        let vis = f32_to_u8_vis(&data);
        save_luma_raw(
            case_dir.join(format!("layer_{i}.png")),
            layer.width(),
            layer.height(),
            vis,
        )?;
    }

    write_json(
        case_dir.join("meta.json"),
        &MetaPyramid {
            scales: args.scales,
            layer_sizes: sizes,
            policy: "separable blur + integer subsample, floor dimensions",
        },
    )?;

    Ok(())
}

fn run_intensity(args: IntensityArgs) -> Result<()> {
    let case_dir = prepare_case(&args.common, "intensity")?;
    let gray = load_input_u8(&args.common.input)?;
    let img = DynImage::U8(gray).to_f32().context("converting input to f32")?;
    let (width, height) = img.dims();
    let par = Parallelism::default();

    let mut dx = Image::new_fill(width, height, 0.0f32);
    let mut dy = Image::new_fill(width, height, 0.0f32);
    let mut dxx = Image::new_fill(width, height, 0.0f32);
    let mut dyy = Image::new_fill(width, height, 0.0f32);
    let mut dxy = Image::new_fill(width, height, 0.0f32);
    sobel_f32(
        &img.as_view(),
        &mut dx.as_view_mut(),
        &mut dy.as_view_mut(),
        ConvolveMode::Extend,
        &par,
    )
    .context("gradient")?;
    hessian_f32(
        &img.as_view(),
        &mut dxx.as_view_mut(),
        &mut dyy.as_view_mut(),
        &mut dxy.as_view_mut(),
        ConvolveMode::Extend,
        &par,
    )
    .context("hessian")?;

    let derivs = Derivatives {
        dx: Some(dx.as_view()),
        dy: Some(dy.as_view()),
        dxx: Some(dxx.as_view()),
        dyy: Some(dyy.as_view()),
        dxy: Some(dxy.as_view()),
    };

    let map: Image<f32> = match args.intensity {
        IntensityKind::Harris => intensity_map(HarrisIntensity::default(), &img, &derivs)?,
        IntensityKind::Klt => intensity_map(KltIntensity::new(2), &img, &derivs)?,
        IntensityKind::HessianDet => intensity_map(
            HessianBlobIntensity::new(HessianBlobMode::Determinant),
            &img,
            &derivs,
        )?,
        IntensityKind::HessianTrace => intensity_map(
            HessianBlobIntensity::new(HessianBlobMode::Trace),
            &img,
            &derivs,
        )?,
        IntensityKind::Laplacian => intensity_map(LaplacianIntensity::new(), &img, &derivs)?,
    };

    let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
    for &v in map.data() {
        min = min.min(v);
        max = max.max(v);
    }
    save_luma_raw(
        case_dir.join("intensity.png"),
        width,
        height,
        f32_to_u8_vis(map.data()),
    )?;
    write_json(
        case_dir.join("meta.json"),
        &MetaIntensity {
            intensity: args.intensity.name(),
            width,
            height,
            min,
            max,
        },
    )?;

    Ok(())
}

fn intensity_map<I: FeatureIntensity>(
    mut intensity: I,
    img: &Image<f32>,
    derivs: &Derivatives<'_>,
) -> Result<Image<f32>> {
    intensity
        .process(&img.as_view(), derivs)
        .context("computing intensity")?;
    let view = intensity.intensity();
    let mut data = Vec::with_capacity(view.width() * view.height());
    for y in 0..view.height() {
        data.extend_from_slice(view.row(y));
    }
    Image::from_vec(view.width(), view.height(), data).context("copying intensity map")
}

fn prepare_case(common: &CommonArgs, case_name: &str) -> Result<PathBuf> {
    if !common.input.is_file() {
        bail!("input file not found: {}", common.input.display());
    }
    let case_dir = common.out.join(case_name);
    fs::create_dir_all(&case_dir)
        .with_context(|| format!("creating output directory {}", case_dir.display()))?;
    Ok(case_dir)
}

fn load_input_u8(path: &Path) -> Result<Image<u8>> {
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let luma = dyn_img.to_luma8();
    let (w, h) = luma.dimensions();
    let data = luma.into_raw();

    Image::from_vec(w as usize, h as usize, data)
        .map_err(|e| anyhow::anyhow!("constructing image from {}: {e}", path.display()))
}

fn save_luma_raw(path: PathBuf, width: usize, height: usize, data: Vec<u8>) -> Result<()> {
    let gray = GrayImage::from_raw(width as u32, height as u32, data)
        .context("constructing GrayImage from raw bytes")?;
    gray.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn f32_to_u8_vis(data: &[f32]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut min_v = f32::INFINITY;
    let mut max_v = f32::NEG_INFINITY;
    for &v in data {
        if v < min_v {
            min_v = v;
        }
        if v > max_v {
            max_v = v;
        }
    }

    if (max_v - min_v).abs() < 1e-12 {
        return vec![0u8; data.len()];
    }

    let scale = 255.0 / (max_v - min_v);
    data.iter()
        .map(|&v| ((v - min_v) * scale).round().clamp(0.0, 255.0) as u8)
        .collect()
}

fn save_overlay(path: PathBuf, gray: &Image<u8>, points: &[ScalePoint]) -> Result<()> {
    let (width, height) = gray.dims();
    let mut rgb = RgbImage::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let v = gray.as_view().row(y)[x];
            rgb.put_pixel(x as u32, y as u32, Rgb([v, v, v]));
        }
    }

    let red = Rgb([255u8, 60, 60]);
    for p in points {
        // Circle of radius ~ scale plus a center dot.
        let r = p.scale.max(2.0);
        for i in 0..64 {
            let a = i as f32 * core::f32::consts::TAU / 64.0;
            let px = p.x + r * a.cos();
            let py = p.y + r * a.sin();
            if px >= 0.0 && py >= 0.0 && (px as usize) < width && (py as usize) < height {
                rgb.put_pixel(px as u32, py as u32, red);
            }
        }
        if (p.x as usize) < width && (p.y as usize) < height {
            rgb.put_pixel(p.x as u32, p.y as u32, red);
        }
    }

    rgb.save(&path)
        .with_context(|| format!("saving overlay {}", path.display()))
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}
