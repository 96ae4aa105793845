//! Speech logic rules: how individual screenplay elements become speakable items.
//!
//! Rule sets are versioned strategies behind the [`SpeechRules`] trait. The version string
//! is stamped on every item so regenerated output can be told apart from older output.
//! Only `RulesV1` ("1.0") exists today; new versions are added as new implementors and a
//! new [`RuleVersion`] variant rather than branches inside an existing rule set.

use crate::element::{ElementType, ScreenplayElement};
use crate::error::RulesError;
use crate::item::{ItemStatus, SpeakableItem, ToneHint};
use crate::normalizer::CharacterNormalizer;
use crate::scene::SceneContext;
use tracing::{debug, warn};
use uuid::Uuid;

/// Items produced from one dialogue block and how many elements it spanned.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueBlock {
    pub items: Vec<SpeakableItem>,
    pub consumed: usize,
}

/// A versioned element-to-item strategy.
pub trait SpeechRules: Send + Sync {
    fn rule_version(&self) -> &str;

    /// Narrative item announcing a scene.
    fn process_scene_heading(
        &self,
        element: &ScreenplayElement,
        order_index: usize,
        screenplay_id: &str,
    ) -> Option<SpeakableItem>;

    /// Consume a character cue, an optional parenthetical and the dialogue lines after it.
    ///
    /// Always consumes at least one element, so callers can advance by `consumed`
    /// without risking a stall on malformed input.
    fn process_dialogue_block(
        &self,
        start_index: usize,
        elements: &[ScreenplayElement],
        screenplay_id: &str,
        scene: &mut SceneContext,
    ) -> DialogueBlock;

    /// Any element that is neither a scene heading nor part of a dialogue block.
    fn process_single_element(
        &self,
        element: &ScreenplayElement,
        order_index: usize,
        screenplay_id: &str,
    ) -> Option<SpeakableItem>;
}

/// Known rule set versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVersion {
    V1,
}

impl RuleVersion {
    pub fn parse(version: &str) -> Result<Self, RulesError> {
        match version.trim() {
            "1.0" | "1" | "v1" => Ok(RuleVersion::V1),
            other => {
                warn!(version = other, "[RULES] Unknown rule version requested");
                Err(RulesError::UnknownVersion(other.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleVersion::V1 => "1.0",
        }
    }

    pub fn build(&self, normalizer: CharacterNormalizer) -> Box<dyn SpeechRules> {
        match self {
            RuleVersion::V1 => Box::new(RulesV1::new(normalizer)),
        }
    }
}

/// Parse `version` and construct the matching rule set.
pub fn build_rules(
    version: &str,
    normalizer: CharacterNormalizer,
) -> Result<Box<dyn SpeechRules>, RulesError> {
    Ok(RuleVersion::parse(version)?.build(normalizer))
}

/// Rule set "1.0": scene headings, dialogue blocks with first-in-scene announcements, and
/// action lines. Everything else is silent.
#[derive(Debug, Clone, Default)]
pub struct RulesV1 {
    normalizer: CharacterNormalizer,
}

impl RulesV1 {
    pub fn new(normalizer: CharacterNormalizer) -> Self {
        Self { normalizer }
    }

    fn scene_heading_text(element: &ScreenplayElement) -> String {
        match &element.location {
            Some(location) => {
                let lighting = match location.lighting_code.as_str() {
                    "INT" => "Interior",
                    "EXT" => "Exterior",
                    other => other,
                };
                format!(
                    "{}. {}. {}.",
                    lighting, location.scene_name, location.time_of_day
                )
            }
            None => element
                .element_text
                .replace("INT.", "Interior.")
                .replace("EXT.", "Exterior."),
        }
    }
}

impl SpeechRules for RulesV1 {
    fn rule_version(&self) -> &str {
        RuleVersion::V1.as_str()
    }

    fn process_scene_heading(
        &self,
        element: &ScreenplayElement,
        order_index: usize,
        screenplay_id: &str,
    ) -> Option<SpeakableItem> {
        Some(SpeakableItem::narrative(
            order_index,
            screenplay_id,
            &element.id,
            element.element_type.label(),
            element.scene_id.clone(),
            Self::scene_heading_text(element),
            self.rule_version(),
        ))
    }

    fn process_dialogue_block(
        &self,
        start_index: usize,
        elements: &[ScreenplayElement],
        screenplay_id: &str,
        scene: &mut SceneContext,
    ) -> DialogueBlock {
        let character = match elements.get(start_index) {
            Some(el) if el.is_type(&ElementType::Character) => el,
            _ => {
                debug!(index = start_index, "[RULES] Dialogue block does not start at a character cue, skipping");
                return DialogueBlock {
                    items: Vec::new(),
                    consumed: 1,
                };
            }
        };

        let raw_name = character.element_text.trim();
        let normalized = self.normalizer.normalize(&character.element_text);
        let mut index = start_index + 1;

        if elements
            .get(index)
            .is_some_and(|el| el.is_type(&ElementType::Parenthetical))
        {
            index += 1;
        }

        let mut lines: Vec<&str> = Vec::new();
        while let Some(el) = elements.get(index) {
            if !el.is_type(&ElementType::Dialogue) {
                break;
            }
            lines.push(el.element_text.as_str());
            index += 1;
        }

        let consumed = index - start_index;
        if lines.is_empty() {
            debug!(index = start_index, character = %normalized, "[RULES] Character cue without dialogue, skipping");
            return DialogueBlock {
                items: Vec::new(),
                consumed,
            };
        }

        let joined = lines.join(" ");
        let first_time_in_scene = !scene.has_character_spoken(&normalized);
        let speakable_text = if first_time_in_scene {
            format!("{} says: {}", raw_name, joined)
        } else {
            joined
        };

        let item = SpeakableItem {
            id: Uuid::new_v4(),
            order_index: start_index,
            screenplay_id: screenplay_id.to_string(),
            source_element_id: character.id.clone(),
            source_element_type: character.element_type.label().to_string(),
            scene_id: character.scene_id.clone().or_else(|| {
                Some(scene.scene_id())
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            }),
            speakable_text,
            character_name: Some(normalized.clone()),
            raw_character_name: Some(raw_name.to_string()),
            rule_version: self.rule_version().to_string(),
            includes_character_announcement: first_time_in_scene,
            tone_hint: ToneHint::Character,
            status: ItemStatus::TextGenerated,
        };

        scene.mark_character_spoken(&normalized);

        DialogueBlock {
            items: vec![item],
            consumed,
        }
    }

    fn process_single_element(
        &self,
        element: &ScreenplayElement,
        order_index: usize,
        screenplay_id: &str,
    ) -> Option<SpeakableItem> {
        if !element.element_type.is_speakable() {
            return None;
        }
        match element.element_type {
            ElementType::Action => Some(SpeakableItem::narrative(
                order_index,
                screenplay_id,
                &element.id,
                element.element_type.label(),
                element.scene_id.clone(),
                element.element_text.clone(),
                self.rule_version(),
            )),
            // Reserved for later rule versions.
            _ => None,
        }
    }
}
