// Shared domain types for the gateway

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::LoadError;

/// Source language of every translation model; requests targeting it are identity.
pub const SOURCE_LANGUAGE: &str = "en";

/// Supported translation targets. Each key owns exactly one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKey {
    Kn,
    Hi,
    Ta,
    Te,
}

impl LanguageKey {
    pub const ALL: [LanguageKey; 4] = [
        LanguageKey::Kn,
        LanguageKey::Hi,
        LanguageKey::Ta,
        LanguageKey::Te,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LanguageKey::Kn => "kn",
            LanguageKey::Hi => "hi",
            LanguageKey::Ta => "ta",
            LanguageKey::Te => "te",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageKey::Kn => "Kannada",
            LanguageKey::Hi => "Hindi",
            LanguageKey::Ta => "Tamil",
            LanguageKey::Te => "Telugu",
        }
    }

    /// Hosted model id of the English -> target MarianMT checkpoint
    pub fn model_id(&self) -> &'static str {
        match self {
            LanguageKey::Kn => "Helsinki-NLP/opus-mt-en-kn",
            LanguageKey::Hi => "Helsinki-NLP/opus-mt-en-hi",
            LanguageKey::Ta => "Helsinki-NLP/opus-mt-en-ta",
            LanguageKey::Te => "Helsinki-NLP/opus-mt-en-te",
        }
    }
}

impl fmt::Display for LanguageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LanguageKey {
    type Err = LoadError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        LanguageKey::ALL
            .iter()
            .copied()
            .find(|key| key.code() == code)
            .ok_or_else(|| LoadError::UnsupportedLanguage(code.to_string()))
    }
}

/// Normalized translation target of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    /// Same as the source language: no model needed
    Source,
    Model(LanguageKey),
}

impl TargetLanguage {
    /// Resolve a raw `target_lang` value. Absent means English, and only the
    /// primary subtag is considered (`en-US` -> `en`).
    pub fn resolve(raw: Option<&str>) -> Result<Self, LoadError> {
        let raw = raw.unwrap_or(SOURCE_LANGUAGE);
        let primary = raw.split('-').next().unwrap_or_default();

        if primary == SOURCE_LANGUAGE {
            return Ok(TargetLanguage::Source);
        }
        primary.parse().map(TargetLanguage::Model)
    }
}

/// Decoded image in canonical RGB form
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalImage {
    pub pixels: RgbImage,
}

impl CanonicalImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Discrete output of the gesture classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureLabel {
    Hello,
    Yes,
    No,
    /// Hand present but no known gesture
    None,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::Hello => "Hello",
            GestureLabel::Yes => "Yes",
            GestureLabel::No => "No",
            GestureLabel::None => "None",
        }
    }
}

/// Voice command intents, in matching priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FindHospital,
    CallFamily,
    ReadNews,
    OpenTranslator,
    GoHome,
    None,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FindHospital => "find_hospital",
            Intent::CallFamily => "call_family",
            Intent::ReadNews => "read_news",
            Intent::OpenTranslator => "open_translator",
            Intent::GoHome => "go_home",
            Intent::None => "none",
        }
    }
}

/// Request kinds accepted by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    Caption { image_data: String },
    ExtractText { image_data: String },
    Translate { text: String, target_lang: Option<String> },
    TextToIcon { text: String },
    RecognizeIntent { command: String },
    SignToSpeech { image_data: String },
}

impl GatewayRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            GatewayRequest::Caption { .. } => RequestKind::Caption,
            GatewayRequest::ExtractText { .. } => RequestKind::ExtractText,
            GatewayRequest::Translate { .. } => RequestKind::Translate,
            GatewayRequest::TextToIcon { .. } => RequestKind::TextToIcon,
            GatewayRequest::RecognizeIntent { .. } => RequestKind::RecognizeIntent,
            GatewayRequest::SignToSpeech { .. } => RequestKind::SignToSpeech,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Caption,
    ExtractText,
    Translate,
    TextToIcon,
    RecognizeIntent,
    SignToSpeech,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Caption => "caption",
            RequestKind::ExtractText => "extract_text",
            RequestKind::Translate => "translate",
            RequestKind::TextToIcon => "text_to_icon",
            RequestKind::RecognizeIntent => "recognize_intent",
            RequestKind::SignToSpeech => "sign_to_speech",
        }
    }
}

/// Icons found in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconResult {
    /// Space-separated icons, one per distinct matched word
    pub icons: String,
    pub found_words: Vec<String>,
}

/// Gateway responses; serialized untagged so each variant is its own JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GatewayResponse {
    Caption { caption: String },
    Text { text: String },
    Translation { translated_text: String },
    Icons(IconResult),
    Intent { intent: Intent },
    Sign { word: String },
}
