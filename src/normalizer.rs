//! Character name canonicalisation.
//!
//! `"JOHN (V.O.)"`, `"John (CONT'D)"` and `" john "` all normalise to `"john"`, so speaker
//! tracking treats them as one character.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// A single (...) group plus the whitespace leading into it.
fn parenthetical() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\s*\([^()]*\)").expect("parenthetical pattern is a valid constant")
    })
}

#[derive(Debug, Clone)]
pub struct CharacterNormalizer {
    aliases: HashMap<String, String>,
}

impl Default for CharacterNormalizer {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl CharacterNormalizer {
    /// `aliases` maps an exact raw spelling, as it appears in the screenplay, to the name to use.
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Canonical form of a raw character cue.
    ///
    /// Alias lookup happens on the untouched raw string and its value is returned verbatim.
    pub fn normalize(&self, raw_name: &str) -> String {
        if let Some(alias) = self.aliases.get(raw_name) {
            debug!(raw = raw_name, alias = %alias, "[NORMALIZE] Alias matched");
            return alias.clone();
        }
        parenthetical()
            .replace_all(raw_name, "")
            .trim()
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_extension_suffixes_and_lowercases() {
        let n = CharacterNormalizer::default();
        assert_eq!(n.normalize("JOHN (V.O.)"), "john");
        assert_eq!(n.normalize("  SARAH (O.S.) (CONT'D) "), "sarah");
        assert_eq!(n.normalize("MARY JANE"), "mary jane");
    }

    #[test]
    fn only_parenthetical_yields_empty_name() {
        let n = CharacterNormalizer::default();
        assert_eq!(n.normalize("(V.O.)"), "");
    }

    #[test]
    fn normalized_names_are_fixed_points() {
        let n = CharacterNormalizer::default();
        for name in ["john", "mary jane", "dr. smith", ""] {
            let once = n.normalize(name);
            assert_eq!(once, name);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn alias_table_matches_raw_spelling_only() {
        let mut aliases = HashMap::new();
        aliases.insert("DR. SMITH".to_string(), "smith".to_string());
        let n = CharacterNormalizer::new(aliases);

        assert_eq!(n.normalize("DR. SMITH"), "smith");
        // Suffixed or re-cased spellings do not hit the alias entry.
        assert_eq!(n.normalize("DR. SMITH (V.O.)"), "dr. smith");
        assert_eq!(n.normalize("Dr. Smith"), "dr. smith");
        assert_eq!(n.normalize("DR. SMITH "), "dr. smith");
    }

    #[test]
    fn alias_value_is_returned_verbatim() {
        let mut aliases = HashMap::new();
        aliases.insert("BOB".to_string(), "Robert".to_string());
        let n = CharacterNormalizer::new(aliases);
        assert_eq!(n.normalize("BOB"), "Robert");
    }
}
