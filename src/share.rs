// Share links of the form <base>/share/<id>-<slug>

use unicode_normalization::UnicodeNormalization;

/// Lowercase ASCII slug: letters, digits and single hyphens. Accented letters
/// fold to their base letter.
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .nfkd()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for c in kept.trim().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug
}

pub fn share_link(base_url: &str, id: u64, name: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let slug = slugify(name);
    if slug.is_empty() {
        format!("{}/share/{}", base, id)
    } else {
        format!("{}/share/{}-{}", base, id, slug)
    }
}

/// Extract the session id from a share link, a `/share/...` path, an
/// `<id>-<slug>` segment or a bare id.
pub fn parse_share_id(text: &str) -> Option<u64> {
    let text = text.trim();
    let segment = match text.rfind("/share/") {
        Some(pos) => &text[pos + "/share/".len()..],
        None => text,
    };
    let segment = segment.split(['?', '#', '/']).next().unwrap_or(segment);
    segment.split('-').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_drops_punctuation_and_collapses_hyphens() {
        assert_eq!(slugify("Training - 21/10/26"), "training-211026");
        assert_eq!(slugify("  U12   Opwarming!! "), "u12-opwarming");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn slug_folds_accents() {
        assert_eq!(slugify("Één tegen één"), "een-tegen-een");
        assert_eq!(slugify("Coördinatie & reactie"), "coordinatie-reactie");
    }

    #[test]
    fn link_includes_slug_when_available() {
        assert_eq!(
            share_link("https://drills.example/", 1700000000000, "Dinsdag U14"),
            "https://drills.example/share/1700000000000-dinsdag-u14"
        );
        assert_eq!(share_link("http://localhost:3000", 42, "!!"), "http://localhost:3000/share/42");
    }

    #[test]
    fn parses_every_link_shape() {
        assert_eq!(parse_share_id("https://x.test/share/163456789-training-name"), Some(163456789));
        assert_eq!(parse_share_id("/share/42"), Some(42));
        assert_eq!(parse_share_id("42-dinsdag"), Some(42));
        assert_eq!(parse_share_id("1700000000000"), Some(1700000000000));
        assert_eq!(parse_share_id("https://x.test/share/7-a?utm=1"), Some(7));
        assert_eq!(parse_share_id("training"), None);
    }
}
