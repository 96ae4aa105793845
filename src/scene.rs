use std::collections::HashSet;

/// Speaker tracking for one scene. A fresh context is created at every scene heading.
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    scene_id: String,
    spoken: HashSet<String>,
    last_speaker: Option<String>,
}

impl SceneContext {
    pub fn new(scene_id: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            spoken: HashSet::new(),
            last_speaker: None,
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn last_speaker(&self) -> Option<&str> {
        self.last_speaker.as_deref()
    }

    pub fn mark_character_spoken(&mut self, name: &str) {
        self.spoken.insert(name.to_string());
        self.last_speaker = Some(name.to_string());
    }

    pub fn has_character_spoken(&self, name: &str) -> bool {
        self.spoken.contains(name)
    }
}
