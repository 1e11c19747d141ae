use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::types::IconResult;

/// Word to pictogram table. Multi-word keys are kept for completeness but a
/// single-token lookup never reaches them.
static ICON_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("help", "🆘"),
        ("love", "❤️"),
        ("thank you", "🙏"),
        ("yes", "✅"),
        ("no", "❌"),
        ("idea", "💡"),
        ("happy", "😊"),
        ("sad", "😢"),
        ("home", "🏠"),
        ("house", "🏠"),
        ("school", "🏫"),
        ("hospital", "🏥"),
        ("clinic", "🏥"),
        ("pharmacy", "💊"),
        ("shop", "🛒"),
        ("store", "🛒"),
        ("market", "🛒"),
        ("restroom", "🚽"),
        ("toilet", "🚽"),
        ("bank", "🏦"),
        ("post office", "🏤"),
        ("family", "👨‍👩‍👧"),
        ("doctor", "🧑‍⚕️"),
        ("nurse", "🧑‍⚕️"),
        ("teacher", "🧑‍🏫"),
        ("call", "📞"),
        ("phone", "📞"),
        ("talk", "🗣️"),
        ("eat", "🍔"),
        ("food", "🍔"),
        ("drink", "💧"),
        ("water", "💧"),
        ("read", "📖"),
        ("write", "✍️"),
        ("sleep", "😴"),
        ("money", "💰"),
        ("car", "🚗"),
        ("bus", "🚌"),
        ("medicine", "💊"),
        ("pill", "💊"),
        ("book", "📖"),
        ("time", "⏰"),
        ("clock", "⏰"),
        ("today", "📅"),
        ("day", "☀️"),
        ("night", "🌙"),
    ])
});

pub fn icon_for(word: &str) -> Option<&'static str> {
    ICON_MAP.get(word).copied()
}

/// Lowercase, drop every character that is neither a word character nor
/// whitespace, then split on whitespace.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Map free text to pictograms. Each token is tried as-is, then with all
/// trailing `s` removed; a matched word contributes its icon once.
pub fn text_to_icon(text: &str) -> IconResult {
    let mut icons = Vec::new();
    let mut found_words: Vec<String> = Vec::new();

    for token in tokenize(text) {
        let matched = if icon_for(&token).is_some() {
            token.as_str()
        } else {
            token.trim_end_matches('s')
        };

        let Some(icon) = icon_for(matched) else {
            continue;
        };
        if found_words.iter().any(|w| w == matched) {
            continue;
        }
        icons.push(icon);
        found_words.push(matched.to_string());
    }

    IconResult {
        icons: icons.join(" "),
        found_words,
    }
}
