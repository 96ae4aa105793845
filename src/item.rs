//! Speakable items: the output of the pipeline, keyed for a downstream audio generator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse styling hint for speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneHint {
    Narrative,
    Character,
    Emphasis,
    Parenthetical,
}

/// Audio lifecycle of an item. This crate only ever writes `TextGenerated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    TextGenerated,
    AudioQueued,
    AudioGenerating,
    AudioComplete,
    AudioFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakableItem {
    pub id: Uuid,
    /// Position of the source element; a dialogue block uses its character cue.
    pub order_index: usize,
    pub screenplay_id: String,
    pub source_element_id: String,
    pub source_element_type: String,
    pub scene_id: Option<String>,
    pub speakable_text: String,
    pub character_name: Option<String>,
    pub raw_character_name: Option<String>,
    pub rule_version: String,
    pub includes_character_announcement: bool,
    pub tone_hint: ToneHint,
    #[serde(default)]
    pub status: ItemStatus,
}

impl SpeakableItem {
    /// Narrative item with no speaker attached.
    pub fn narrative(
        order_index: usize,
        screenplay_id: &str,
        source_element_id: &str,
        source_element_type: &str,
        scene_id: Option<String>,
        speakable_text: String,
        rule_version: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_index,
            screenplay_id: screenplay_id.to_string(),
            source_element_id: source_element_id.to_string(),
            source_element_type: source_element_type.to_string(),
            scene_id,
            speakable_text,
            character_name: None,
            raw_character_name: None,
            rule_version: rule_version.to_string(),
            includes_character_announcement: false,
            tone_hint: ToneHint::Narrative,
            status: ItemStatus::TextGenerated,
        }
    }
}
