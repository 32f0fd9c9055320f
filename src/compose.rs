// Session PDF composer: resolve assets, plan the pages, draw them with printpdf

use std::collections::BTreeMap;
use std::io::BufWriter;

use ::image::{DynamicImage, Luma, RgbImage};
use chrono::NaiveDateTime;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Px,
    Rgb,
};
use qrcode::QrCode;

use crate::assets::{
    crop_to_aspect, first_available, load_prepared, placeholder, ImageResolver, PreparedImage,
};
use crate::catalog::{hex_to_rgb, TAG_PALETTE};
use crate::config::LayoutConfig;
use crate::error::CompositionError;
use crate::layout::{paginate, DocumentPlan, PageKind, PagePlan, PlacedBlock, TAG_GAP_MM};
use crate::metrics::{text_width_mm, Face};
use crate::model::DrillRecord;
use crate::share::slugify;

const COVER_TITLE_FONT_SIZE: f32 = 28.0;
const COVER_NAME_FONT_SIZE: f32 = 14.0;
const COVER_QR_SIZE_MM: f32 = 30.0;

/// Input for one composition.
#[derive(Debug, Clone)]
pub struct ComposeRequest<'a> {
    /// Running order; an empty slice composes nothing
    pub drills: &'a [DrillRecord],
    pub include_cover: bool,
    pub session_name: Option<&'a str>,
    /// Printed as a QR code on the cover page
    pub share_link: Option<&'a str>,
    /// Tag => `#rrggbb`; unknown tags use the first palette colour
    pub tag_colors: Option<&'a BTreeMap<String, &'static str>>,
    /// Used for the fallback filename
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ComposedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Images for one composition, fetched before layout starts.
pub struct ResolvedAssets {
    /// Per drill, in order; never empty (placeholder stands in)
    pub drill_images: Vec<Vec<PreparedImage>>,
    pub logo: Option<PreparedImage>,
    pub cover: Option<PreparedImage>,
}

impl ResolvedAssets {
    pub fn aspects(&self) -> Vec<Vec<f32>> {
        self.drill_images
            .iter()
            .map(|images| images.iter().map(PreparedImage::aspect).collect())
            .collect()
    }
}

pub struct Composer<'a> {
    config: &'a LayoutConfig,
    resolver: &'a dyn ImageResolver,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a LayoutConfig, resolver: &'a dyn ImageResolver) -> Self {
        Self { config, resolver }
    }

    /// Build the whole document in memory. `Ok(None)` for an empty drill list.
    /// Missing or broken images never fail the document.
    pub fn compose(
        &self,
        request: &ComposeRequest<'_>,
    ) -> Result<Option<ComposedPdf>, CompositionError> {
        if request.drills.is_empty() {
            log::info!("No drills to compose");
            return Ok(None);
        }

        let assets = self.resolve_assets(request.drills, request.include_cover);
        let plan = paginate(
            request.drills,
            &assets.aspects(),
            self.config,
            request.include_cover,
            assets.logo.is_some(),
        );

        let title = request.session_name.unwrap_or("Training");
        let mut renderer = PdfRenderer::new(title, self.config)?;
        for (index, page) in plan.pages.iter().enumerate() {
            let layer = renderer.page_layer(index);
            match page.kind {
                PageKind::Cover => renderer.draw_cover(&layer, request, assets.cover.as_ref())?,
                PageKind::Content => {
                    renderer.draw_content_page(&layer, page, request, &assets)
                }
            }
        }
        let bytes = renderer.finish()?;

        let filename = output_filename(request.session_name, request.timestamp);
        log::info!(
            "Composed {} ({} drills, {} pages, {} bytes)",
            filename,
            request.drills.len(),
            plan.page_count(),
            bytes.len()
        );
        Ok(Some(ComposedPdf {
            filename,
            bytes,
            page_count: plan.page_count(),
        }))
    }

    /// Page assignment only, without drawing.
    pub fn plan(&self, drills: &[DrillRecord], include_cover: bool) -> DocumentPlan {
        let assets = self.resolve_assets(drills, include_cover);
        paginate(
            drills,
            &assets.aspects(),
            self.config,
            include_cover,
            assets.logo.is_some(),
        )
    }

    pub fn resolve_assets(&self, drills: &[DrillRecord], include_cover: bool) -> ResolvedAssets {
        let max_px = self.config.max_image_dimension_px;
        let drill_images = drills
            .iter()
            .map(|drill| {
                if drill.images.is_empty() {
                    return vec![placeholder()];
                }
                drill
                    .images
                    .iter()
                    .take(self.config.max_images_per_drill)
                    .map(|name| {
                        load_prepared(self.resolver, name, max_px).unwrap_or_else(placeholder)
                    })
                    .collect()
            })
            .collect();

        let logo = first_available(self.resolver, &self.config.logo_candidates, max_px);
        if logo.is_none() {
            log::warn!("No logo found; pages will not be stamped");
        }
        let cover = if include_cover {
            first_available(self.resolver, &self.config.cover_candidates, max_px)
        } else {
            None
        };

        ResolvedAssets {
            drill_images,
            logo,
            cover,
        }
    }
}

/// `<slug>.pdf` for a named session, `training-<timestamp>.pdf` otherwise.
pub fn output_filename(session_name: Option<&str>, timestamp: NaiveDateTime) -> String {
    let slug = session_name.map(slugify).unwrap_or_default();
    if slug.is_empty() {
        format!("training-{}.pdf", timestamp.format("%Y%m%d-%H%M%S"))
    } else {
        format!("{}.pdf", slug)
    }
}

// ============================================================================
// Rendering
// ============================================================================

struct PdfRenderer<'a> {
    doc: PdfDocumentReference,
    first_layer: Option<PdfLayerReference>,
    font_regular: IndirectFontRef,
    font_bold: IndirectFontRef,
    config: &'a LayoutConfig,
}

impl<'a> PdfRenderer<'a> {
    fn new(title: &str, config: &'a LayoutConfig) -> Result<Self, CompositionError> {
        let (doc, page1, layer1) = PdfDocument::new(
            title,
            Mm(config.page_width_mm),
            Mm(config.page_height_mm),
            "Layer 1",
        );
        let first_layer = doc.get_page(page1).get_layer(layer1);

        let font_regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| CompositionError::FontError(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| CompositionError::FontError(e.to_string()))?;

        Ok(Self {
            doc,
            first_layer: Some(first_layer),
            font_regular,
            font_bold,
            config,
        })
    }

    /// The document starts with one page; every later index adds a page.
    fn page_layer(&mut self, index: usize) -> PdfLayerReference {
        if let Some(layer) = self.first_layer.take() {
            return layer;
        }
        let (page, layer) = self.doc.add_page(
            Mm(self.config.page_width_mm),
            Mm(self.config.page_height_mm),
            format!("Page {}", index + 1),
        );
        self.doc.get_page(page).get_layer(layer)
    }

    fn finish(self) -> Result<Vec<u8>, CompositionError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| CompositionError::PdfError(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| CompositionError::PdfError(e.to_string()))
    }

    /// Convert a distance from the top edge into PDF's bottom-up coordinate.
    fn y(&self, top_mm: f32) -> Mm {
        Mm(self.config.page_height_mm - top_mm)
    }

    // ------------------------------------------------------------------------
    // Cover
    // ------------------------------------------------------------------------

    fn draw_cover(
        &self,
        layer: &PdfLayerReference,
        request: &ComposeRequest<'_>,
        cover: Option<&PreparedImage>,
    ) -> Result<(), CompositionError> {
        let page_w = self.config.page_width_mm;
        let page_h = self.config.page_height_mm;

        match cover {
            Some(image) => {
                let cropped = crop_to_aspect(image, page_w, page_h);
                embed_rgb(layer, cropped, 0.0, 0.0, page_w, true);
            }
            None => {
                set_text_color(layer, 0.1, 0.1, 0.1);
                self.centered_text(layer, "Training", COVER_TITLE_FONT_SIZE, 80.0, Face::Bold);
                if let Some(name) = request.session_name {
                    let total: u32 = request.drills.iter().map(|d| d.duration_minutes).sum();
                    self.centered_text(layer, name, COVER_NAME_FONT_SIZE, 95.0, Face::Regular);
                    self.centered_text(
                        layer,
                        &format!("{} drills  |  {} min", request.drills.len(), total),
                        self.config.body_font_size,
                        103.0,
                        Face::Regular,
                    );
                }
            }
        }

        if let Some(link) = request.share_link {
            let qr = generate_qr_image(link)?;
            let x = page_w - self.config.margin_mm - COVER_QR_SIZE_MM;
            let bottom = self.config.margin_mm;
            embed_rgb(layer, qr.to_rgb8(), x, bottom, COVER_QR_SIZE_MM, false);
        }
        Ok(())
    }

    fn centered_text(
        &self,
        layer: &PdfLayerReference,
        text: &str,
        size: f32,
        baseline_mm: f32,
        face: Face,
    ) {
        let font = match face {
            Face::Regular => &self.font_regular,
            Face::Bold => &self.font_bold,
        };
        let width = text_width_mm(text, face, size);
        let x = ((self.config.page_width_mm - width) / 2.0).max(self.config.margin_mm);
        layer.use_text(text, size, Mm(x), self.y(baseline_mm), font);
    }

    // ------------------------------------------------------------------------
    // Content pages
    // ------------------------------------------------------------------------

    fn draw_content_page(
        &self,
        layer: &PdfLayerReference,
        page: &PagePlan,
        request: &ComposeRequest<'_>,
        assets: &ResolvedAssets,
    ) {
        let left = self.config.margin_mm;
        let right = self.config.page_width_mm - self.config.margin_mm;

        for separator in &page.separators_mm {
            layer.set_outline_color(Color::Rgb(Rgb::new(0.9, 0.9, 0.9, None)));
            layer.set_outline_thickness(0.3);
            self.draw_line(layer, left, *separator, right, *separator);
        }

        for block in &page.blocks {
            let drill = &request.drills[block.drill_index];
            let images = &assets.drill_images[block.drill_index];
            self.draw_image_stack(layer, block, images);
            self.draw_text_stack(layer, block, drill, request.tag_colors);
        }

        if page.logo {
            if let Some(logo) = &assets.logo {
                self.stamp_logo(layer, logo);
            }
        }
    }

    fn draw_image_stack(
        &self,
        layer: &PdfLayerReference,
        block: &PlacedBlock,
        images: &[PreparedImage],
    ) {
        let mut top = block.top_mm;
        for (slot, image) in block.layout.images.iter().zip(images) {
            let bottom = self.config.page_height_mm - (top + slot.height_mm);
            embed_rgb(layer, image.pixels.clone(), self.config.margin_mm, bottom, slot.width_mm, true);
            top += slot.height_mm + self.config.image_spacing_mm;
        }
    }

    fn draw_text_stack(
        &self,
        layer: &PdfLayerReference,
        block: &PlacedBlock,
        drill: &DrillRecord,
        tag_colors: Option<&BTreeMap<String, &'static str>>,
    ) {
        let cfg = self.config;
        let x = Mm(cfg.text_column_x_mm());
        let mut top = block.top_mm;

        set_text_color(layer, 0.1, 0.1, 0.1);
        for line in &block.layout.title_lines {
            let baseline = top + cfg.title_line_height_mm * 0.75;
            layer.use_text(line, cfg.title_font_size, x, self.y(baseline), &self.font_bold);
            top += cfg.title_line_height_mm;
        }

        set_text_color(layer, 0.4, 0.4, 0.4);
        let baseline = top + cfg.meta_line_height_mm * 0.7;
        layer.use_text(&block.layout.meta_line, cfg.small_font_size, x, self.y(baseline), &self.font_regular);
        top += cfg.meta_line_height_mm;

        set_text_color(layer, 0.1, 0.1, 0.1);
        for line in &block.layout.description_lines {
            let baseline = top + cfg.body_line_height_mm * 0.75;
            if !line.is_empty() {
                layer.use_text(line, cfg.body_font_size, x, self.y(baseline), &self.font_regular);
            }
            top += cfg.body_line_height_mm;
        }

        if !block.layout.tags.is_empty() {
            let baseline = top + cfg.tag_line_height_mm * 0.7;
            let mut tag_x = cfg.text_column_x_mm();
            for tag in &block.layout.tags {
                let hex = tag_colors
                    .and_then(|colors| colors.get(tag).copied())
                    .unwrap_or(TAG_PALETTE[0]);
                let (r, g, b) = hex_to_rgb(hex).unwrap_or((0.26, 0.4, 0.62));
                set_text_color(layer, r, g, b);
                layer.use_text(tag, cfg.small_font_size, Mm(tag_x), self.y(baseline), &self.font_bold);
                tag_x += text_width_mm(tag, Face::Bold, cfg.small_font_size) + TAG_GAP_MM;
            }
        }

        log::trace!(
            "Drew drill {} at {:.1}mm (height {:.1}mm)",
            drill.id,
            block.top_mm,
            block.layout.height_mm
        );
    }

    /// Logo fitted inside its box, anchored to the bottom-right corner.
    fn stamp_logo(&self, layer: &PdfLayerReference, logo: &PreparedImage) {
        let cfg = self.config;
        let max_width_mm = cfg.logo_width_mm;
        let max_height_mm = cfg.logo_height_mm;

        let (width_px, height_px) = logo.dimensions();
        let aspect_ratio = width_px as f32 / height_px.max(1) as f32;
        let (final_width_mm, final_height_mm) = if max_width_mm / max_height_mm > aspect_ratio {
            // Height-constrained
            (max_height_mm * aspect_ratio, max_height_mm)
        } else {
            // Width-constrained
            (max_width_mm, max_width_mm / aspect_ratio)
        };

        let right_edge = cfg.page_width_mm - cfg.margin_mm;
        let x = right_edge - final_width_mm;
        let bottom = cfg.margin_mm + cfg.logo_bottom_offset_mm + (max_height_mm - final_height_mm);
        embed_rgb(layer, logo.pixels.clone(), x, bottom, final_width_mm, true);
    }

    fn draw_line(&self, layer: &PdfLayerReference, x1: f32, top1: f32, x2: f32, top2: f32) {
        let points = vec![
            (Point::new(Mm(x1), self.y(top1)), false),
            (Point::new(Mm(x2), self.y(top2)), false),
        ];
        let line = Line {
            points,
            is_closed: false,
        };
        layer.add_line(line);
    }
}

// ============================================================================
// Drawing Utilities
// ============================================================================

fn set_text_color(layer: &PdfLayerReference, r: f32, g: f32, b: f32) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

/// Place `pixels` with its lower-left corner at (`x`, `bottom`) mm, scaled to
/// `width_mm` wide. Height follows from the pixel aspect ratio.
fn embed_rgb(
    layer: &PdfLayerReference,
    pixels: RgbImage,
    x: f32,
    bottom: f32,
    width_mm: f32,
    interpolate: bool,
) {
    let (width, height) = pixels.dimensions();
    let raw_pixels = pixels.into_raw();

    let image = Image::from(ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate,
        image_data: raw_pixels,
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / (mm / 25.4)
    let dpi = (width as f32) / (width_mm / 25.4);

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(bottom)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

fn generate_qr_image(link: &str) -> Result<DynamicImage, CompositionError> {
    let code =
        QrCode::new(link.as_bytes()).map_err(|e| CompositionError::QrError(e.to_string()))?;
    let image = code.render::<Luma<u8>>().build();
    Ok(DynamicImage::ImageLuma8(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_bytes;
    use crate::assets::ImageMap;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(18, 30, 5)
            .unwrap()
    }

    fn drill(id: u32, images: &[&str]) -> DrillRecord {
        DrillRecord {
            id,
            name: format!("Oefening {}", id),
            description: "Twee rijen aan de middenlijn\\nWissel na elke herhaling".into(),
            age_group: "U14".into(),
            duration_minutes: 10 + id,
            equipment: vec!["Ballen".into()],
            images: images.iter().map(|s| s.to_string()).collect(),
            tags: vec!["Opwarming".into(), "Afwerking".into()],
            intensity: Some(1),
        }
    }

    fn request<'a>(drills: &'a [DrillRecord], cover: bool) -> ComposeRequest<'a> {
        ComposeRequest {
            drills,
            include_cover: cover,
            session_name: Some("Dinsdag U14"),
            share_link: Some("http://localhost:3000/share/1-dinsdag-u14"),
            tag_colors: None,
            timestamp: timestamp(),
        }
    }

    #[test]
    fn empty_session_produces_nothing() {
        let config = LayoutConfig::default();
        let images = ImageMap::new();
        let composer = Composer::new(&config, &images);
        assert!(composer.compose(&request(&[], true)).unwrap().is_none());
    }

    #[test]
    fn missing_and_corrupt_images_fall_back_to_placeholder() {
        let config = LayoutConfig::default();
        let mut images = ImageMap::new();
        images.insert("ok.png", png_bytes(300, 150));
        images.insert("broken.png", b"garbage".to_vec());
        let composer = Composer::new(&config, &images);

        let drills = vec![drill(1, &["ok.png", "broken.png", "missing.jpg"]), drill(2, &[])];
        let assets = composer.resolve_assets(&drills, false);
        let first: Vec<bool> = assets.drill_images[0].iter().map(|i| i.is_placeholder).collect();
        assert_eq!(first, vec![false, true, true]);
        assert_eq!(assets.drill_images[1].len(), 1);
        assert!(assets.drill_images[1][0].is_placeholder);
        assert!(assets.logo.is_none());

        let pdf = composer.compose(&request(&drills, false)).unwrap().unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.page_count, 1);
        assert_eq!(pdf.filename, "dinsdag-u14.pdf");
    }

    #[test]
    fn image_list_is_capped_in_input_order() {
        let config = LayoutConfig::default();
        let mut images = ImageMap::new();
        for (i, name) in ["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"].iter().enumerate() {
            images.insert(*name, png_bytes(100, 50 + i as u32 * 10));
        }
        let composer = Composer::new(&config, &images);
        let drills = vec![drill(1, &["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"])];
        let assets = composer.resolve_assets(&drills, false);

        let heights: Vec<u32> = assets.drill_images[0].iter().map(|i| i.dimensions().1).collect();
        assert_eq!(heights, vec![50, 60, 70, 80]);
    }

    #[test]
    fn cover_adds_exactly_one_page() {
        let config = LayoutConfig::default();
        let mut images = ImageMap::new();
        images.insert("basket.png", png_bytes(120, 60));
        images.insert("cover.jpg", png_bytes(50, 80));
        let composer = Composer::new(&config, &images);
        let drills: Vec<DrillRecord> = (1..=14).map(|i| drill(i, &[])).collect();

        let without = composer.compose(&request(&drills, false)).unwrap().unwrap();
        let with = composer.compose(&request(&drills, true)).unwrap().unwrap();
        assert_eq!(with.page_count, without.page_count + 1);

        let plan = composer.plan(&drills, true);
        assert_eq!(plan.pages[0].kind, PageKind::Cover);
        assert!(plan.pages[1..].iter().all(|p| p.logo));
    }

    #[test]
    fn filename_falls_back_to_timestamp() {
        assert_eq!(output_filename(Some("Training - 05/03/25"), timestamp()), "training-050325.pdf");
        assert_eq!(output_filename(Some("!!!"), timestamp()), "training-20250304-183005.pdf");
        assert_eq!(output_filename(None, timestamp()), "training-20250304-183005.pdf");
        assert_eq!(output_filename(Some("Één tegen één"), timestamp()), "een-tegen-een.pdf");
    }
}
