pub mod icons;
pub mod intents;

pub use icons::{icon_for, text_to_icon};
pub use intents::recognize_intent;
