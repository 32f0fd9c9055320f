use serde::{Deserialize, Deserializer, Serialize};

/// One training exercise from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub age_group: String,
    #[serde(rename = "duration", default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub equipment: Vec<String>,
    /// Image filenames. The catalog calls this `picture` and allows a bare string.
    #[serde(
        rename = "picture",
        alias = "images",
        default,
        deserialize_with = "one_or_many"
    )]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
}

impl DrillRecord {
    /// Description split into paragraphs on real newlines and literal `\n` markers.
    pub fn paragraphs(&self) -> Vec<&str> {
        self.description
            .split('\n')
            .flat_map(|line| line.split("\\n"))
            .map(|p| p.trim_end_matches('\r'))
            .collect()
    }

    /// `"15 min  |  U12  |  Ballen, Kegels"`
    pub fn meta_line(&self) -> String {
        let mut parts = vec![format!("{} min", self.duration_minutes)];
        if !self.age_group.is_empty() {
            parts.push(self.age_group.clone());
        }
        if !self.equipment.is_empty() {
            parts.push(self.equipment.join(", "));
        }
        parts.join("  |  ")
    }
}

/// A named, ordered selection of drills saved for later reuse or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: u64,
    pub name: String,
    /// Running order of the training; the same drill may appear more than once.
    #[serde(default)]
    pub drills: Vec<u32>,
    pub created_at: String,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_accepts_string_or_array() {
        let single: DrillRecord =
            serde_json::from_str(r#"{"id":1,"name":"Layup","picture":"layup.png"}"#).unwrap();
        assert_eq!(single.images, vec!["layup.png"]);

        let many: DrillRecord = serde_json::from_str(
            r#"{"id":2,"name":"Shell","picture":["a.png","b.jpg"],"duration":12}"#,
        )
        .unwrap();
        assert_eq!(many.images, vec!["a.png", "b.jpg"]);
        assert_eq!(many.duration_minutes, 12);

        let none: DrillRecord = serde_json::from_str(r#"{"id":3,"name":"Run"}"#).unwrap();
        assert!(none.images.is_empty());
        assert_eq!(none.intensity, None);
    }

    #[test]
    fn paragraphs_split_on_literal_markers() {
        let drill = DrillRecord {
            id: 1,
            name: "Shell".into(),
            description: "Opstelling\\nRotatie\nAfsluiten".into(),
            age_group: String::new(),
            duration_minutes: 10,
            equipment: vec![],
            images: vec![],
            tags: vec![],
            intensity: None,
        };
        assert_eq!(drill.paragraphs(), vec!["Opstelling", "Rotatie", "Afsluiten"]);
    }

    #[test]
    fn session_uses_camel_case_fields() {
        let json = r#"{"id":1700000000000,"name":"Dinsdag","drills":[3,1,3],"createdAt":"2025-01-01T10:00:00Z"}"#;
        let session: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(session.drills, vec![3, 1, 3]);
        assert_eq!(session.created_at, "2025-01-01T10:00:00Z");
    }
}
