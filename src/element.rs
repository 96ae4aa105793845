//! Screenplay element model.
//!
//! Elements arrive already parsed and ordered from the document collaborator. They are
//! never mutated during a processing pass.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifier used when a document carries neither an explicit id nor a filename.
pub const UNNAMED_SCREENPLAY: &str = "unnamed-screenplay";

/// Closed set of screenplay element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementType {
    SceneHeading,
    Action,
    Character,
    Parenthetical,
    Dialogue,
    Transition,
    Lyrics,
    Centered,
    Comment,
    Boneyard,
    Synopsis,
    /// Outline section; `depth` is the number of leading `#` markers.
    SectionHeading { depth: u8 },
    PageBreak,
}

impl ElementType {
    /// Whether an element of this kind can ever be read aloud.
    pub fn is_speakable(&self) -> bool {
        match self {
            ElementType::Parenthetical
            | ElementType::Transition
            | ElementType::Comment
            | ElementType::Boneyard
            | ElementType::Synopsis
            | ElementType::SectionHeading { .. }
            | ElementType::PageBreak => false,
            ElementType::SceneHeading
            | ElementType::Action
            | ElementType::Character
            | ElementType::Dialogue
            | ElementType::Lyrics
            | ElementType::Centered => true,
        }
    }

    /// Human readable label, stored on generated items as the source element type.
    pub fn label(&self) -> &'static str {
        match self {
            ElementType::SceneHeading => "Scene Heading",
            ElementType::Action => "Action",
            ElementType::Character => "Character",
            ElementType::Parenthetical => "Parenthetical",
            ElementType::Dialogue => "Dialogue",
            ElementType::Transition => "Transition",
            ElementType::Lyrics => "Lyrics",
            ElementType::Centered => "Centered",
            ElementType::Comment => "Comment",
            ElementType::Boneyard => "Boneyard",
            ElementType::Synopsis => "Synopsis",
            ElementType::SectionHeading { .. } => "Section Heading",
            ElementType::PageBreak => "Page Break",
        }
    }
}

/// Structured location of a scene heading, e.g. `INT` / `COFFEE SHOP` / `DAY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLocation {
    pub lighting_code: String,
    pub scene_name: String,
    pub time_of_day: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenplayElement {
    pub id: String,
    pub element_type: ElementType,
    pub element_text: String,
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Only populated for scene headings.
    #[serde(default)]
    pub location: Option<SceneLocation>,
}

impl ScreenplayElement {
    pub fn new(element_type: ElementType, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            element_type,
            element_text: text.into(),
            scene_id: None,
            location: None,
        }
    }

    pub fn with_scene_id(mut self, scene_id: impl Into<String>) -> Self {
        self.scene_id = Some(scene_id.into());
        self
    }

    pub fn with_location(mut self, location: SceneLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_type(&self, element_type: &ElementType) -> bool {
        &self.element_type == element_type
    }
}

/// One screenplay as handed over by the document collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenplayDocument {
    #[serde(default)]
    pub screenplay_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Raw source text the elements were derived from. Not read by the pipeline.
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub elements: Vec<ScreenplayElement>,
}

impl ScreenplayDocument {
    pub fn new(elements: Vec<ScreenplayElement>) -> Self {
        Self {
            elements,
            ..Default::default()
        }
    }

    /// Stable id used as foreign key on every generated item.
    ///
    /// Explicit id first, then the filename stem, then [`UNNAMED_SCREENPLAY`].
    pub fn screenplay_id(&self) -> String {
        if let Some(id) = self.screenplay_id.as_deref().filter(|s| !s.trim().is_empty()) {
            return id.to_string();
        }
        self.filename
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| UNNAMED_SCREENPLAY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_heading_is_never_speakable_whatever_its_depth() {
        assert!(!ElementType::SectionHeading { depth: 1 }.is_speakable());
        assert!(!ElementType::SectionHeading { depth: 3 }.is_speakable());
        assert_eq!(ElementType::SectionHeading { depth: 2 }.label(), "Section Heading");
    }

    #[test]
    fn screenplay_id_prefers_explicit_then_filename_then_sentinel() {
        let mut doc = ScreenplayDocument::default();
        assert_eq!(doc.screenplay_id(), UNNAMED_SCREENPLAY);

        doc.filename = Some("drafts/coffee_shop.fountain".to_string());
        assert_eq!(doc.screenplay_id(), "coffee_shop");

        doc.screenplay_id = Some("sp-42".to_string());
        assert_eq!(doc.screenplay_id(), "sp-42");
    }

    #[test]
    fn element_type_roundtrips_through_tagged_json() {
        let json = r#"{"kind":"section_heading","depth":2}"#;
        let parsed: ElementType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, ElementType::SectionHeading { depth: 2 });
    }
}
