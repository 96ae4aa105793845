//! Screenplay-to-speech processing: one ordered pass over a document's elements.
//!
//! The pass is exposed as an iterator of [`SpeechStep`]s (one per scene heading, dialogue
//! block or single element) so long-running callers can interleave cancellation checks and
//! checkpoints. [`ScreenplaySpeechProcessor::process`] runs the whole pass and commits once.

use tracing::{debug, error, info};

use crate::contract::ItemStore;
use crate::element::{ElementType, ScreenplayDocument, ScreenplayElement};
use crate::error::{PersistenceError, RulesError};
use crate::item::SpeakableItem;
use crate::normalizer::CharacterNormalizer;
use crate::rules::{build_rules, SpeechRules};
use crate::scene::SceneContext;

pub struct ScreenplaySpeechProcessor {
    rules: Box<dyn SpeechRules>,
}

impl ScreenplaySpeechProcessor {
    pub fn new(rules: Box<dyn SpeechRules>) -> Self {
        Self { rules }
    }

    /// Processor for a rule version string such as `"1.0"`.
    pub fn for_version(version: &str, normalizer: CharacterNormalizer) -> Result<Self, RulesError> {
        Ok(Self::new(build_rules(version, normalizer)?))
    }

    pub fn rule_version(&self) -> &str {
        self.rules.rule_version()
    }

    /// Start an incremental pass over `elements`.
    pub fn pass<'a>(
        &'a self,
        elements: &'a [ScreenplayElement],
        screenplay_id: &'a str,
    ) -> SpeechPass<'a> {
        SpeechPass {
            rules: self.rules.as_ref(),
            elements,
            screenplay_id,
            index: 0,
            scene: SceneContext::default(),
        }
    }

    /// Every item of `document`, in source order, without persisting anything.
    pub fn generate(&self, document: &ScreenplayDocument) -> Vec<SpeakableItem> {
        let screenplay_id = document.screenplay_id();
        self.pass(&document.elements, &screenplay_id)
            .flat_map(|step| step.items)
            .collect()
    }

    /// Full pass followed by a single commit to `store`. Returns the number of items committed.
    pub async fn process(
        &self,
        document: &ScreenplayDocument,
        store: &dyn ItemStore,
    ) -> Result<usize, PersistenceError> {
        let screenplay_id = document.screenplay_id();
        info!(
            screenplay_id = %screenplay_id,
            elements = document.elements.len(),
            rule_version = self.rule_version(),
            "[PROCESS] Starting speech pass"
        );

        let items = self.generate(document);
        let produced = items.len();
        for item in items {
            store.insert(item);
        }

        match store.save().await {
            Ok(committed) => {
                info!(screenplay_id = %screenplay_id, produced, committed, "[PROCESS] Speech pass committed");
                Ok(produced)
            }
            Err(e) => {
                let dropped = store.discard_pending();
                error!(screenplay_id = %screenplay_id, error = %e, dropped, "[PROCESS][ERROR] Commit failed");
                Err(e)
            }
        }
    }
}

/// Items emitted for the elements starting at `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechStep {
    pub index: usize,
    pub consumed: usize,
    pub items: Vec<SpeakableItem>,
}

/// Cursor over one document. Owns the current scene's speaker state.
pub struct SpeechPass<'a> {
    rules: &'a dyn SpeechRules,
    elements: &'a [ScreenplayElement],
    screenplay_id: &'a str,
    index: usize,
    scene: SceneContext,
}

impl SpeechPass<'_> {
    /// Index of the next element to process.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.elements.len()
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }
}

impl Iterator for SpeechPass<'_> {
    type Item = SpeechStep;

    fn next(&mut self) -> Option<SpeechStep> {
        let index = self.index;
        let elements = self.elements;
        let element = elements.get(index)?;

        let (mut items, consumed) = match element.element_type {
            ElementType::SceneHeading => {
                let scene_id = element
                    .scene_id
                    .clone()
                    .unwrap_or_else(|| format!("unknown-{}", index));
                debug!(index, scene_id = %scene_id, "[PROCESS] Scene boundary");
                self.scene = SceneContext::new(scene_id);
                let item = self
                    .rules
                    .process_scene_heading(element, index, self.screenplay_id);
                (item.into_iter().collect(), 1)
            }
            ElementType::Character => {
                let block = self.rules.process_dialogue_block(
                    index,
                    elements,
                    self.screenplay_id,
                    &mut self.scene,
                );
                (block.items, block.consumed.max(1))
            }
            _ => {
                let item = self
                    .rules
                    .process_single_element(element, index, self.screenplay_id);
                (item.into_iter().collect(), 1)
            }
        };

        let scene_id = self.scene.scene_id();
        if !scene_id.is_empty() {
            for item in items.iter_mut().filter(|i| i.scene_id.is_none()) {
                item.scene_id = Some(scene_id.to_string());
            }
        }

        self.index += consumed;
        Some(SpeechStep {
            index,
            consumed,
            items,
        })
    }
}
