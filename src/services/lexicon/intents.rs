use crate::core::types::Intent;

/// Intents in priority order with their trigger phrases
const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::FindHospital,
        &["hospital", "clinic", "doctor", "emergency room", "medical"],
    ),
    (
        Intent::CallFamily,
        &["call my family", "phone home", "contact family"],
    ),
    (
        Intent::ReadNews,
        &["read the news", "what are the headlines", "news update"],
    ),
    (Intent::OpenTranslator, &["translate", "translator"]),
    (
        Intent::GoHome,
        &["go home", "back to main screen", "dashboard"],
    ),
];

/// First intent with any phrase contained in the lowercased command
pub fn recognize_intent(command: &str) -> Intent {
    let command = command.to_lowercase();

    INTENT_TABLE
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| command.contains(phrase)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_substring_matches() {
        assert_eq!(recognize_intent("I need to find a hospital"), Intent::FindHospital);
        assert_eq!(recognize_intent("Please CALL MY FAMILY"), Intent::CallFamily);
        assert_eq!(recognize_intent("what are the headlines today"), Intent::ReadNews);
        assert_eq!(recognize_intent("open the translator"), Intent::OpenTranslator);
        assert_eq!(recognize_intent("take me back to main screen"), Intent::GoHome);
    }

    #[test]
    fn test_earlier_intent_wins() {
        // Both "doctor" and "phone home" appear; hospital is first in the table.
        assert_eq!(
            recognize_intent("phone home and ask the doctor"),
            Intent::FindHospital
        );
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(recognize_intent(""), Intent::None);
        assert_eq!(recognize_intent("play some music"), Intent::None);
    }
}
