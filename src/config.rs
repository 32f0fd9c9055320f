use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

pub const CONFIG_FILE_NAME: &str = "drillbook.toml";

/// Every recognised page-layout option. All lengths are millimetres measured
/// from the top-left corner of the page; font sizes are points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// A4 by default
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    /// Where the first block on each content page starts
    pub top_offset_mm: f32,
    /// Space kept free above the bottom margin for the logo
    pub footer_reserved_mm: f32,

    pub image_column_width_mm: f32,
    pub column_gap_mm: f32,
    pub max_images_per_drill: usize,
    /// Longest side of an embedded raster, in pixels
    pub max_image_dimension_px: u32,
    pub max_image_height_mm: f32,
    pub image_spacing_mm: f32,

    pub block_padding_mm: f32,
    /// Distance of the separator line above the block it precedes
    pub separator_offset_mm: f32,

    pub title_font_size: f32,
    pub body_font_size: f32,
    pub small_font_size: f32,
    pub title_line_height_mm: f32,
    pub body_line_height_mm: f32,
    pub meta_line_height_mm: f32,
    pub tag_line_height_mm: f32,

    pub logo_width_mm: f32,
    pub logo_height_mm: f32,
    /// Gap between the logo's bottom edge and the bottom margin
    pub logo_bottom_offset_mm: f32,
    pub logo_candidates: Vec<String>,
    pub cover_candidates: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 15.0,
            top_offset_mm: 28.0,
            footer_reserved_mm: 20.0,
            image_column_width_mm: 38.0,
            column_gap_mm: 8.0,
            max_images_per_drill: 4,
            max_image_dimension_px: 1600,
            max_image_height_mm: 30.0,
            image_spacing_mm: 3.0,
            block_padding_mm: 10.0,
            separator_offset_mm: 5.0,
            title_font_size: 14.0,
            body_font_size: 10.0,
            small_font_size: 9.0,
            title_line_height_mm: 8.0,
            body_line_height_mm: 5.0,
            meta_line_height_mm: 6.0,
            tag_line_height_mm: 6.0,
            logo_width_mm: 28.0,
            logo_height_mm: 12.0,
            logo_bottom_offset_mm: 8.0,
            logo_candidates: to_strings(&[
                "basketdesselgem.png",
                "basket-desselgem.png",
                "basket_logo.png",
                "basket.png",
                "logo-basket.png",
            ]),
            cover_candidates: to_strings(&[
                "cover.jpg",
                "cover.png",
                "cover.jpeg",
                "basketdesselgem-cover.png",
                "basket-desselgem.png",
                "basketdesselgem.png",
                "basket_logo.png",
                "basket.png",
            ]),
        }
    }
}

impl LayoutConfig {
    pub fn content_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn text_column_x_mm(&self) -> f32 {
        self.margin_mm + self.image_column_width_mm + self.column_gap_mm
    }

    pub fn text_column_width_mm(&self) -> f32 {
        self.content_width_mm() - self.image_column_width_mm - self.column_gap_mm
    }

    /// Lowest point a block may reach.
    pub fn bottom_limit_mm(&self) -> f32 {
        self.page_height_mm - self.margin_mm - self.footer_reserved_mm
    }

    /// Height available to a block on an empty page.
    pub fn max_block_height_mm(&self) -> f32 {
        self.bottom_limit_mm() - self.top_offset_mm
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.text_column_width_mm() <= 10.0 {
            return Err(AppError::ConfigError(
                "page too narrow for the image column and margins".to_string(),
            ));
        }
        if self.max_block_height_mm() <= self.title_line_height_mm + self.meta_line_height_mm {
            return Err(AppError::ConfigError(
                "page too short for a single drill block".to_string(),
            ));
        }
        if self.max_images_per_drill == 0 {
            return Err(AppError::ConfigError(
                "max_images_per_drill must be at least 1".to_string(),
            ));
        }
        if self.max_image_dimension_px == 0 {
            return Err(AppError::ConfigError(
                "max_image_dimension_px must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application settings, read from `drillbook.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Drill catalog JSON file
    pub catalog: PathBuf,
    /// Image directory or `http(s)://` base URL
    pub images: String,
    /// Prefix for generated share links
    pub base_url: String,
    pub layout: LayoutConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("drills.json"),
            images: "images".to_string(),
            base_url: "http://localhost:3000".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| AppError::ConfigError(e.to_string()))?;
        settings.layout.validate()?;
        Ok(settings)
    }

    /// Read `explicit` if given (it must exist), else `<data_dir>/drillbook.toml`
    /// when present, else defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, AppError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded settings from {}", path.display());
        Self::from_toml(&content)
    }
}

/// `dirs::data_dir()/drillbook`, or `./.drillbook` on platforms without one.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("drillbook"))
        .unwrap_or_else(|| PathBuf::from(".drillbook"))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
