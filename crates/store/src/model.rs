use serde::{Deserialize, Serialize};
use swatch::{default_palette, DisplayPalette, PartialPalette};

/// A gallery entry as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub eyebrow: String,
    pub header: String,
    pub subtitle: String,
    pub cover_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color4: Option<String>,
}

impl Project {
    pub fn from_draft(id: impl Into<String>, draft: ProjectDraft) -> Self {
        Self {
            id: id.into(),
            eyebrow: draft.eyebrow,
            header: draft.header,
            subtitle: draft.subtitle,
            cover_url: draft.cover_url,
            color1: draft.color1,
            color2: draft.color2,
            color3: draft.color3,
            color4: draft.color4,
        }
    }

    pub fn colors(&self) -> PartialPalette {
        PartialPalette::from_stops([
            self.color1.clone(),
            self.color2.clone(),
            self.color3.clone(),
            self.color4.clone(),
        ])
    }

    /// The project's own palette when all four colors are set. A set but
    /// unreadable color falls back to the matching default stop.
    pub fn explicit_palette(&self) -> Option<DisplayPalette> {
        let colors = self.colors();
        colors
            .is_complete()
            .then(|| colors.merge(&default_palette()))
    }

    /// Editable copy of the record. Unset colors stay unset so a cover-driven
    /// project keeps using its cover.
    pub fn to_draft(&self) -> ProjectDraft {
        ProjectDraft {
            eyebrow: self.eyebrow.clone(),
            header: self.header.clone(),
            subtitle: self.subtitle.clone(),
            cover_url: self.cover_url.clone(),
            color1: self.color1.clone(),
            color2: self.color2.clone(),
            color3: self.color3.clone(),
            color4: self.color4.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("field '{0}' must not be empty")]
    MissingField(&'static str),
    #[error("color {0} is not a valid hex color")]
    InvalidColor(usize),
}

/// Create/update payload for [`Project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub eyebrow: String,
    pub header: String,
    pub subtitle: String,
    pub cover_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color4: Option<String>,
}

impl ProjectDraft {
    /// Blank form with the default palette preselected.
    pub fn with_default_colors() -> Self {
        Self::default().with_palette(&default_palette())
    }

    pub fn with_palette(mut self, palette: &DisplayPalette) -> Self {
        let [c1, c2, c3, c4] = palette.to_hex_strings();
        self.color1 = Some(c1);
        self.color2 = Some(c2);
        self.color3 = Some(c3);
        self.color4 = Some(c4);
        self
    }

    /// Clears all four colors; the palette then comes from the cover image.
    pub fn without_colors(mut self) -> Self {
        self.color1 = None;
        self.color2 = None;
        self.color3 = None;
        self.color4 = None;
        self
    }

    pub fn colors(&self) -> PartialPalette {
        PartialPalette::from_stops([
            self.color1.clone(),
            self.color2.clone(),
            self.color3.clone(),
            self.color4.clone(),
        ])
    }

    /// Checks the text fields only; colors stay optional.
    pub fn validate(&self) -> Result<(), DraftError> {
        let fields = [
            ("eyebrow", &self.eyebrow),
            ("header", &self.header),
            ("subtitle", &self.subtitle),
            ("coverUrl", &self.cover_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DraftError::MissingField(name));
            }
        }
        Ok(())
    }

    /// Text fields plus every color that is set. Unset colors are fine.
    pub fn validate_with_colors(&self) -> Result<(), DraftError> {
        self.validate()?;
        for (index, stop) in self.colors().stops().into_iter().enumerate() {
            if let Some(stop) = stop {
                swatch::Srgb8::parse_hex(stop)
                    .map_err(|_| DraftError::InvalidColor(index + 1))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProjectDraft {
        ProjectDraft {
            eyebrow: "Case study".into(),
            header: "Harbor".into(),
            subtitle: "Tidal data viz".into(),
            cover_url: "https://example.com/harbor.png".into(),
            ..ProjectDraft::default()
        }
    }

    #[test]
    fn explicit_palette_requires_all_four_colors() {
        let mut project = Project::from_draft("1", draft());
        assert!(project.explicit_palette().is_none());

        project.color1 = Some("#111111".into());
        project.color2 = Some("#222222".into());
        project.color3 = Some("#333333".into());
        assert!(project.explicit_palette().is_none());

        project.color4 = Some("#444444".into());
        let palette = project.explicit_palette().unwrap();
        assert_eq!(
            palette.to_hex_strings(),
            ["#111111", "#222222", "#333333", "#444444"]
        );
    }

    #[test]
    fn blank_color_does_not_count_as_explicit() {
        let mut project = Project::from_draft("1", draft().with_palette(&default_palette()));
        project.color2 = Some("   ".into());
        assert!(project.explicit_palette().is_none());
    }

    #[test]
    fn to_draft_keeps_unset_colors_unset() {
        let project = Project::from_draft("1", draft());
        let edit = project.to_draft();
        assert_eq!(edit.color1, None);
        assert_eq!(edit.header, "Harbor");
        assert!(Project::from_draft("1", edit).explicit_palette().is_none());

        let mut partial = Project::from_draft("2", draft());
        partial.color3 = Some("#abcdef".into());
        let edit = partial.to_draft();
        assert_eq!(edit.color1, None);
        assert_eq!(edit.color3.as_deref(), Some("#abcdef"));
    }

    #[test]
    fn validation_reports_first_missing_field() {
        let mut incomplete = draft();
        incomplete.subtitle = " ".into();
        assert_eq!(incomplete.validate(), Err(DraftError::MissingField("subtitle")));
        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn color_validation_only_rejects_malformed_stops() {
        assert_eq!(draft().validate_with_colors(), Ok(()));

        let mut with_colors = draft().with_palette(&default_palette());
        assert_eq!(with_colors.validate_with_colors(), Ok(()));

        with_colors.color4 = Some("blue".into());
        assert_eq!(with_colors.validate_with_colors(), Err(DraftError::InvalidColor(4)));

        let cleared = with_colors.without_colors();
        assert_eq!(cleared.colors(), PartialPalette::default());
        assert_eq!(cleared.validate_with_colors(), Ok(()));
    }

    #[test]
    fn serializes_with_camel_case_cover_url() {
        let project = Project::from_draft("42", draft());
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["coverUrl"], "https://example.com/harbor.png");
        assert!(json.get("color1").is_none());
    }
}
