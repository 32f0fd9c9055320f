// Drill catalog: loading, lookup, filtering, facets and tag colours

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::AppError;
use crate::model::DrillRecord;

/// Tag colour palette, assigned round-robin over the sorted tag list.
pub const TAG_PALETTE: [&str; 6] = [
    "#43669e", "#c05b4b", "#3c3841", "#6b8bb3", "#d47968", "#5a5762",
];

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    drills: Vec<DrillRecord>,
}

/// Criteria for narrowing the catalog. Every populated field must match.
#[derive(Debug, Clone, Default)]
pub struct DrillFilter {
    pub search: Option<String>,
    pub age_group: Option<String>,
    pub tags: Vec<String>,
    pub equipment: Option<String>,
    pub intensity: Option<u8>,
    pub max_duration: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Duration,
    Intensity,
}

/// Fields collected by the data-entry form before an id is assigned.
#[derive(Debug, Clone, Default)]
pub struct DrillDraft {
    pub name: String,
    pub description: String,
    pub age_group: String,
    pub duration_minutes: u32,
    pub equipment: Vec<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub intensity: Option<u8>,
}

impl Catalog {
    pub fn new(drills: Vec<DrillRecord>) -> Self {
        Self { drills }
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let drills: Vec<DrillRecord> = serde_json::from_str(json)
            .map_err(|e| AppError::CatalogError(format!("Invalid JSON: {}", e)))?;
        Ok(Self::new(drills))
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::CatalogError(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&content)?;
        log::debug!("Loaded {} drills from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.drills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drills.is_empty()
    }

    pub fn drills(&self) -> &[DrillRecord] {
        &self.drills
    }

    pub fn get(&self, id: u32) -> Option<&DrillRecord> {
        self.drills.iter().find(|d| d.id == id)
    }

    /// Look up ids in order. Unknown ids are skipped; duplicates are kept.
    pub fn resolve(&self, ids: &[u32]) -> Vec<DrillRecord> {
        ids.iter()
            .filter_map(|id| self.get(*id))
            .cloned()
            .collect()
    }

    pub fn filter(&self, filter: &DrillFilter) -> Vec<&DrillRecord> {
        self.drills.iter().filter(|d| filter.matches(d)).collect()
    }

    /// Filter then stable-sort.
    pub fn query(&self, filter: &DrillFilter, sort: SortKey, descending: bool) -> Vec<&DrillRecord> {
        let mut drills = self.filter(filter);
        drills.sort_by(|a, b| {
            let ordering = match sort {
                SortKey::Id => a.id.cmp(&b.id),
                SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortKey::Duration => a.duration_minutes.cmp(&b.duration_minutes),
                SortKey::Intensity => a.intensity.cmp(&b.intensity),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        drills
    }

    pub fn age_groups(&self) -> Vec<String> {
        unique_sorted(self.drills.iter().map(|d| d.age_group.as_str()))
    }

    pub fn equipment(&self) -> Vec<String> {
        unique_sorted(self.drills.iter().flat_map(|d| d.equipment.iter().map(String::as_str)))
    }

    pub fn tags(&self) -> Vec<String> {
        unique_sorted(self.drills.iter().flat_map(|d| d.tags.iter().map(String::as_str)))
    }

    pub fn next_id(&self) -> u32 {
        self.drills.iter().map(|d| d.id).max().unwrap_or(0) + 1
    }

    pub fn tag_colors(&self) -> BTreeMap<String, &'static str> {
        self.tags()
            .into_iter()
            .enumerate()
            .map(|(i, tag)| (tag, TAG_PALETTE[i % TAG_PALETTE.len()]))
            .collect()
    }

    pub fn new_drill(&self, draft: DrillDraft) -> DrillRecord {
        DrillRecord {
            id: self.next_id(),
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            age_group: draft.age_group.trim().to_string(),
            duration_minutes: draft.duration_minutes,
            equipment: trimmed(draft.equipment),
            images: trimmed(draft.images),
            tags: trimmed(draft.tags),
            intensity: Some(draft.intensity.unwrap_or(1)),
        }
    }
}

impl DrillFilter {
    pub fn matches(&self, drill: &DrillRecord) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = drill.name.to_lowercase().contains(&needle)
                || drill.description.to_lowercase().contains(&needle)
                || drill.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(age_group) = &self.age_group {
            if !drill.age_group.eq_ignore_ascii_case(age_group) {
                return false;
            }
        }
        if !self
            .tags
            .iter()
            .all(|wanted| drill.tags.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
        {
            return false;
        }
        if let Some(equipment) = &self.equipment {
            let needle = equipment.to_lowercase();
            if !drill.equipment.iter().any(|e| e.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        if let Some(intensity) = self.intensity {
            if drill.intensity != Some(intensity) {
                return false;
            }
        }
        if let Some(max) = self.max_duration {
            if drill.duration_minutes > max {
                return false;
            }
        }
        true
    }
}

/// Black or white text for a `#rrggbb` background, by YIQ brightness.
pub fn text_color_for(hex: &str) -> &'static str {
    let c = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        c.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(u32::from)
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => {
            let yiq = (r * 299 + g * 587 + b * 114) / 1000;
            if yiq >= 128 {
                "#000000"
            } else {
                "#ffffff"
            }
        }
        _ => "#000000",
    }
}

/// Parse `#rrggbb` into 0.0-1.0 channels.
pub fn hex_to_rgb(hex: &str) -> Option<(f32, f32, f32)> {
    let c = hex.trim_start_matches('#');
    if c.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(c.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(c.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(c.get(4..6)?, 16).ok()?;
    Some((r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
}

fn unique_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn trimmed(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::from_json(
            r#"[
                {"id":1,"name":"Layup lijn","description":"Twee rijen","ageGroup":"U12","duration":10,
                 "equipment":["Ballen"],"picture":["layup.png"],"tags":["Afwerking","Opwarming"],"intensity":1},
                {"id":2,"name":"Shell drill","description":"Verdedigen in vier","ageGroup":"U16","duration":20,
                 "equipment":["Kegels","Ballen"],"picture":[],"tags":["Verdediging"],"intensity":3},
                {"id":3,"name":"bal handling","description":"Dribbel circuit","ageGroup":"U12","duration":15,
                 "equipment":["Ballen","Kegels"],"picture":"dribble.jpg","tags":["Dribbel","Opwarming"],"intensity":2}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn search_covers_name_description_and_tags() {
        let catalog = sample();
        let by_name = DrillFilter { search: Some("SHELL".into()), ..Default::default() };
        assert_eq!(catalog.filter(&by_name).len(), 1);

        let by_tag = DrillFilter { search: Some("opwarm".into()), ..Default::default() };
        let ids: Vec<u32> = catalog.filter(&by_tag).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn combined_filters_must_all_match() {
        let catalog = sample();
        let filter = DrillFilter {
            age_group: Some("u12".into()),
            tags: vec!["Opwarming".into()],
            max_duration: Some(12),
            ..Default::default()
        };
        let ids: Vec<u32> = catalog.filter(&filter).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1]);

        let filter = DrillFilter { equipment: Some("kegel".into()), intensity: Some(3), ..Default::default() };
        let ids: Vec<u32> = catalog.filter(&filter).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn sorting_by_name_ignores_case() {
        let catalog = sample();
        let names: Vec<&str> = catalog
            .query(&DrillFilter::default(), SortKey::Name, false)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["bal handling", "Layup lijn", "Shell drill"]);

        let ids: Vec<u32> = catalog
            .query(&DrillFilter::default(), SortKey::Duration, true)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn resolve_keeps_order_and_duplicates() {
        let catalog = sample();
        let ids: Vec<u32> = catalog.resolve(&[3, 99, 1, 3]).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1, 3]);
    }

    #[test]
    fn facets_are_sorted_and_unique() {
        let catalog = sample();
        assert_eq!(catalog.age_groups(), vec!["U12", "U16"]);
        assert_eq!(catalog.equipment(), vec!["Ballen", "Kegels"]);
        assert_eq!(catalog.tags(), vec!["Afwerking", "Dribbel", "Opwarming", "Verdediging"]);
        assert_eq!(catalog.next_id(), 4);
    }

    #[test]
    fn tag_colors_cycle_through_palette() {
        let colors = sample().tag_colors();
        assert_eq!(colors["Afwerking"], "#43669e");
        assert_eq!(colors["Verdediging"], "#6b8bb3");
        assert_eq!(text_color_for("#43669e"), "#ffffff");
        assert_eq!(text_color_for("#f0f0f0"), "#000000");
    }

    #[test]
    fn new_drill_takes_next_id_and_trims() {
        let drill = sample().new_drill(DrillDraft {
            name: "  Closeout  ".into(),
            tags: vec![" Verdediging ".into(), "  ".into()],
            ..Default::default()
        });
        assert_eq!(drill.id, 4);
        assert_eq!(drill.name, "Closeout");
        assert_eq!(drill.tags, vec!["Verdediging"]);
        assert_eq!(drill.intensity, Some(1));
    }
}
