// Image resolution, decoding and the placeholder

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use ::image::imageops::FilterType;
use ::image::{DynamicImage, Rgb, RgbImage, Rgba};

use crate::error::AssetError;

/// Maps an image filename to its raw encoded bytes.
pub trait ImageResolver {
    fn resolve(&self, filename: &str) -> Result<Vec<u8>, AssetError>;
}

/// Images under a local directory or behind an `http(s)://` base URL.
#[derive(Debug, Clone)]
pub enum AssetRoot {
    Dir(PathBuf),
    Url(String),
}

impl AssetRoot {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            AssetRoot::Url(location.trim_end_matches('/').to_string())
        } else {
            AssetRoot::Dir(PathBuf::from(location))
        }
    }
}

impl ImageResolver for AssetRoot {
    fn resolve(&self, filename: &str) -> Result<Vec<u8>, AssetError> {
        if filename.is_empty() || filename.contains("..") {
            return Err(AssetError::NotFound(filename.to_string()));
        }
        match self {
            AssetRoot::Dir(dir) => {
                let path = dir.join(filename);
                if !path.is_file() {
                    return Err(AssetError::NotFound(path.display().to_string()));
                }
                std::fs::read(&path)
                    .map_err(|e| AssetError::FetchError(format!("{}: {}", path.display(), e)))
            }
            AssetRoot::Url(base) => {
                let url = format!("{}/{}", base, filename);
                let response = ureq::get(&url).call().map_err(|e| match e {
                    ureq::Error::Status(404, _) => AssetError::NotFound(url.clone()),
                    other => AssetError::FetchError(format!("{}: {}", url, other)),
                })?;

                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| AssetError::FetchError(format!("{}: {}", url, e)))?;
                Ok(bytes)
            }
        }
    }
}

/// In-memory filename => bytes table.
#[derive(Debug, Clone, Default)]
pub struct ImageMap {
    images: HashMap<String, Vec<u8>>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(filename.into(), bytes);
    }
}

impl ImageResolver for ImageMap {
    fn resolve(&self, filename: &str) -> Result<Vec<u8>, AssetError> {
        self.images
            .get(filename)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(filename.to_string()))
    }
}

/// A decoded raster, flattened onto white and ready to embed.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub pixels: RgbImage,
    pub is_placeholder: bool,
}

impl PreparedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.dimensions();
        h as f32 / w.max(1) as f32
    }
}

/// Decode `bytes`, cap the longest side at `max_dimension` pixels and flatten
/// any alpha onto white.
pub fn prepare_image(bytes: &[u8], max_dimension: u32) -> Result<PreparedImage, AssetError> {
    let decoded =
        ::image::load_from_memory(bytes).map_err(|e| AssetError::DecodeError(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(AssetError::DecodeError("image has no pixels".to_string()));
    }

    let scaled = if decoded.width().max(decoded.height()) > max_dimension {
        decoded.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        decoded
    };

    Ok(PreparedImage {
        pixels: flatten_on_white(&scaled),
        is_placeholder: false,
    })
}

/// Resolve then prepare; `None` on any failure, after logging it.
pub fn load_prepared(
    resolver: &dyn ImageResolver,
    filename: &str,
    max_dimension: u32,
) -> Option<PreparedImage> {
    let prepared = resolver
        .resolve(filename)
        .and_then(|bytes| prepare_image(&bytes, max_dimension));
    match prepared {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("{} ({})", e, filename);
            None
        }
    }
}

/// First candidate that resolves and decodes.
pub fn first_available(
    resolver: &dyn ImageResolver,
    candidates: &[String],
    max_dimension: u32,
) -> Option<PreparedImage> {
    candidates.iter().find_map(|name| {
        resolver
            .resolve(name)
            .and_then(|bytes| prepare_image(&bytes, max_dimension))
            .ok()
    })
}

/// Light grey 600x400 card with a basketball in the middle.
pub fn placeholder() -> PreparedImage {
    const WIDTH: u32 = 600;
    const HEIGHT: u32 = 400;
    let background = Rgb([0xf0, 0xf0, 0xf0]);
    let ball = Rgb([0xe0, 0x7b, 0x39]);
    let seam = Rgb([0x3c, 0x38, 0x41]);

    let (cx, cy, radius) = (WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0, 70.0_f32);
    let pixels = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > radius {
            background
        } else if dist > radius - 4.0 || dx.abs() < 2.0 || dy.abs() < 2.0 {
            seam
        } else {
            ball
        }
    });

    PreparedImage {
        pixels,
        is_placeholder: true,
    }
}

pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba_image = image.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();

    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, Rgb([out_r, out_g, out_b]));
    }
    rgb_image
}

/// Centre-crop to the `width:height` ratio, for full-bleed placement.
pub fn crop_to_aspect(image: &PreparedImage, width: f32, height: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    let target = width / height;
    let current = w as f32 / h as f32;
    let (crop_w, crop_h) = if current > target {
        (((h as f32) * target).round().max(1.0) as u32, h)
    } else {
        (w, ((w as f32) / target).round().max(1.0) as u32)
    };
    let x = (w - crop_w.min(w)) / 2;
    let y = (h - crop_h.min(h)) / 2;
    ::image::imageops::crop_imm(&image.pixels, x, y, crop_w.min(w), crop_h.min(h)).to_image()
}
