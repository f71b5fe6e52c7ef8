use std::collections::HashSet;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::{Captures, Regex};

use super::messenger::CustomEmoji;

static EMOJI_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a?:[^:<>\s]+:\d+>").expect("emoji pattern is valid"));

/// Custom emojis the bot can render. Tokens of any other custom emoji are
/// stripped from composed text, since recipients would see them as raw
/// markup.
#[derive(Default)]
pub struct EmojiCatalog {
    known: RwLock<HashSet<String>>,
}

impl EmojiCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, emoji: &CustomEmoji) {
        self.write().insert(emoji.token());
    }

    /// Catalogs every emoji token found in `text`.
    pub fn add_from_text(&self, text: &str) {
        let mut known = self.write();
        for token in EMOJI_TOKEN.find_iter(text) {
            known.insert(token.as_str().to_string());
        }
    }

    pub fn replace_all(&self, emojis: &[CustomEmoji]) {
        let mut known = self.write();
        known.clear();
        known.extend(emojis.iter().map(CustomEmoji::token));
    }

    pub fn contains(&self, token: &str) -> bool {
        self.read().contains(token)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sanitize(&self, text: &str) -> String {
        let known = self.read();
        EMOJI_TOKEN
            .replace_all(text, |caps: &Captures<'_>| {
                if known.contains(&caps[0]) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.known.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.known.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emoji(id: u64, name: &str, animated: bool) -> CustomEmoji {
        CustomEmoji {
            id,
            name: name.to_string(),
            animated,
        }
    }

    #[test]
    fn sanitize_keeps_known_and_strips_foreign_emojis() {
        let catalog = EmojiCatalog::new();
        catalog.add(&emoji(1, "wave", false));
        catalog.add(&emoji(2, "party", true));

        let text = "hi <:wave:1> <a:party:2> <:stranger:99>!";
        assert_eq!(catalog.sanitize(text), "hi <:wave:1> <a:party:2> !");
    }

    #[test]
    fn tokens_found_in_text_become_known() {
        let catalog = EmojiCatalog::new();
        catalog.add_from_text("copy <a:dance:42> and <:ok:7>");
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("<a:dance:42>"));
        assert_eq!(catalog.sanitize("<:ok:7>"), "<:ok:7>");
    }

    #[test]
    fn replace_all_drops_previous_catalog() {
        let catalog = EmojiCatalog::new();
        catalog.add(&emoji(1, "old", false));
        catalog.replace_all(&[emoji(2, "new", false)]);
        assert!(!catalog.contains("<:old:1>"));
        assert!(catalog.contains("<:new:2>"));
    }
}
