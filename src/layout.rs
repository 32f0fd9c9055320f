// Block measurement and pagination
//
// Everything here is pure: given the drills, the layout config and the aspect
// ratios of the resolved images, the plan is fully determined. Rendering
// happens afterwards in `compose`.

use crate::config::LayoutConfig;
use crate::metrics::{ellipsize, text_width_mm, wrap_paragraph, Face};
use crate::model::DrillRecord;

/// Size of one image in the left column, stacked top to bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSlot {
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Everything needed to draw one drill, measured before any of it is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub title_lines: Vec<String>,
    pub meta_line: String,
    pub description_lines: Vec<String>,
    /// Tags that fit on the single tag line, in drill order
    pub tags: Vec<String>,
    pub images: Vec<ImageSlot>,
    pub image_height_mm: f32,
    pub text_height_mm: f32,
    pub height_mm: f32,
    /// Description was cut to keep the block on one page
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    /// Position in the input sequence
    pub drill_index: usize,
    /// Distance of the block's top edge from the top of the page
    pub top_mm: f32,
    pub layout: BlockLayout,
}

impl PlacedBlock {
    pub fn bottom_mm(&self) -> f32 {
        self.top_mm + self.layout.height_mm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Content,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub kind: PageKind,
    pub blocks: Vec<PlacedBlock>,
    /// Vertical positions of separator lines
    pub separators_mm: Vec<f32>,
    pub logo: bool,
}

impl PagePlan {
    fn new(kind: PageKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            separators_mm: Vec::new(),
            logo: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Drill indices in the order they appear, page by page.
    pub fn drill_order(&self) -> Vec<usize> {
        self.pages
            .iter()
            .flat_map(|p| p.blocks.iter().map(|b| b.drill_index))
            .collect()
    }
}

/// Where the next block goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub offset_mm: f32,
    pub page_index: usize,
}

/// Measure the block for `drill`, shown as item `number` (1-based).
///
/// `image_aspects` holds height/width of each image that will be drawn; pass
/// the placeholder's ratio when the drill has none.
pub fn measure_block(
    number: usize,
    drill: &DrillRecord,
    image_aspects: &[f32],
    config: &LayoutConfig,
) -> BlockLayout {
    let text_width = config.text_column_width_mm();
    let max_height = config.max_block_height_mm();

    let title = format!("{}. {}", number, drill.name);
    let mut title_lines = wrap_paragraph(&title, Face::Bold, config.title_font_size, text_width);

    let mut description_lines = Vec::new();
    if !drill.description.trim().is_empty() {
        for paragraph in drill.paragraphs() {
            description_lines.extend(wrap_paragraph(
                paragraph,
                Face::Regular,
                config.body_font_size,
                text_width,
            ));
        }
    }

    let tags = fit_tags(&drill.tags, config.small_font_size, text_width);

    let mut images: Vec<ImageSlot> = image_aspects
        .iter()
        .take(config.max_images_per_drill)
        .map(|aspect| image_slot(*aspect, config))
        .collect();
    // Never taller than an empty page can hold
    while images.len() > 1 && stack_height(&images, config) + config.block_padding_mm > max_height {
        images.pop();
    }
    let image_height_mm = stack_height(&images, config);

    let mut truncated = false;
    let tag_height = if tags.is_empty() { 0.0 } else { config.tag_line_height_mm };

    // Title, meta and tag lines alone must still fit an empty page
    let room_for_title =
        max_height - config.block_padding_mm - config.meta_line_height_mm - tag_height;
    let max_title_lines = (room_for_title / config.title_line_height_mm).floor().max(1.0) as usize;
    if title_lines.len() > max_title_lines {
        title_lines.truncate(max_title_lines);
        if let Some(last) = title_lines.last_mut() {
            *last = ellipsize(last, Face::Bold, config.title_font_size, text_width);
        }
        truncated = true;
    }

    let fixed_text = title_lines.len() as f32 * config.title_line_height_mm
        + config.meta_line_height_mm
        + tag_height;

    let room_for_description = max_height - config.block_padding_mm - fixed_text;
    let max_lines = (room_for_description / config.body_line_height_mm).floor().max(0.0) as usize;
    if description_lines.len() > max_lines {
        description_lines.truncate(max_lines);
        if let Some(last) = description_lines.last_mut() {
            *last = ellipsize(last, Face::Regular, config.body_font_size, text_width);
        }
        truncated = true;
    }

    let text_height_mm =
        fixed_text + description_lines.len() as f32 * config.body_line_height_mm;
    let height_mm = image_height_mm.max(text_height_mm) + config.block_padding_mm;

    BlockLayout {
        title_lines,
        meta_line: drill.meta_line(),
        description_lines,
        tags,
        images,
        image_height_mm,
        text_height_mm,
        height_mm,
        truncated,
    }
}

/// Assign every drill to a page. `image_aspects[i]` belongs to `drills[i]`.
///
/// A block never straddles two pages: when it would cross the bottom limit the
/// current page is closed (logo stamped) and the block starts a fresh one.
pub fn paginate(
    drills: &[DrillRecord],
    image_aspects: &[Vec<f32>],
    config: &LayoutConfig,
    include_cover: bool,
    has_logo: bool,
) -> DocumentPlan {
    let mut pages = Vec::new();
    if drills.is_empty() {
        return DocumentPlan { pages };
    }
    if include_cover {
        pages.push(PagePlan::new(PageKind::Cover));
    }

    let bottom_limit = config.bottom_limit_mm();
    let mut page = PagePlan::new(PageKind::Content);
    let mut cursor = PageCursor {
        offset_mm: config.top_offset_mm,
        page_index: pages.len(),
    };

    for (index, drill) in drills.iter().enumerate() {
        let aspects = image_aspects.get(index).map(Vec::as_slice).unwrap_or(&[]);
        let layout = measure_block(index + 1, drill, aspects, config);

        if !page.blocks.is_empty() && cursor.offset_mm + layout.height_mm > bottom_limit {
            log::debug!(
                "Page {} full at {:.1}mm; drill {} moves to the next page",
                cursor.page_index + 1,
                cursor.offset_mm,
                index + 1
            );
            page.logo = has_logo;
            pages.push(std::mem::replace(&mut page, PagePlan::new(PageKind::Content)));
            cursor = PageCursor {
                offset_mm: config.top_offset_mm,
                page_index: pages.len(),
            };
        }

        if !page.blocks.is_empty() {
            page.separators_mm
                .push(cursor.offset_mm - config.separator_offset_mm);
        }

        page.blocks.push(PlacedBlock {
            drill_index: index,
            top_mm: cursor.offset_mm,
            layout,
        });
        cursor.offset_mm += page.blocks.last().map(|b| b.layout.height_mm).unwrap_or(0.0);
    }

    page.logo = has_logo;
    pages.push(page);
    DocumentPlan { pages }
}

fn image_slot(aspect: f32, config: &LayoutConfig) -> ImageSlot {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    let natural = config.image_column_width_mm * aspect;
    if natural <= config.max_image_height_mm {
        ImageSlot {
            width_mm: config.image_column_width_mm,
            height_mm: natural,
        }
    } else {
        ImageSlot {
            width_mm: config.max_image_height_mm / aspect,
            height_mm: config.max_image_height_mm,
        }
    }
}

fn stack_height(images: &[ImageSlot], config: &LayoutConfig) -> f32 {
    let heights: f32 = images.iter().map(|s| s.height_mm).sum();
    let gaps = images.len().saturating_sub(1) as f32 * config.image_spacing_mm;
    heights + gaps
}

/// Tag gap on the tag line, in millimetres.
pub const TAG_GAP_MM: f32 = 4.0;

fn fit_tags(tags: &[String], size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let mut used = 0.0;
    let mut fitted = Vec::new();
    for tag in tags {
        let width = text_width_mm(tag, Face::Bold, size_pt);
        let needed = if fitted.is_empty() { width } else { used + TAG_GAP_MM + width };
        if needed > max_width_mm {
            break;
        }
        used = needed;
        fitted.push(tag.clone());
    }
    fitted
}
