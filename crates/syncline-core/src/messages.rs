// ── User-facing message catalogue ──
//
// Stores and handlers never hard-code the text they surface; they ask a
// `Localize` implementation for a template by key and fill in named
// `{placeholder}` arguments.

use std::borrow::Cow;

use strum::{Display, EnumIter, IntoStaticStr};

/// Identifies a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    /// An entity with an empty key was submitted. Args: `label`.
    EntityEmpty,
    /// The entity is already in the collection. Args: `Label`, `key`.
    EntityExists,
    /// The entity is not in the collection. Args: `Label`, `key`.
    EntityNotFound,
    /// The status stream dropped.
    ServerDisconnected,
}

/// Source of message templates.
pub trait Localize: Send + Sync {
    /// The raw template for `key`.
    fn template(&self, key: MessageKey) -> Cow<'_, str>;

    /// The template for `key` with every `{name}` replaced by its argument.
    fn message(&self, key: MessageKey, args: &[(&str, &str)]) -> String {
        let mut text = self.template(key).into_owned();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

/// Built-in English catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct English;

impl Localize for English {
    fn template(&self, key: MessageKey) -> Cow<'_, str> {
        Cow::Borrowed(match key {
            MessageKey::EntityEmpty => "Cannot add an empty {label}.",
            MessageKey::EntityExists => "{Label} '{key}' already exists.",
            MessageKey::EntityNotFound => "{Label} '{key}' not found.",
            MessageKey::ServerDisconnected => "Lost connection to the server.",
        })
    }
}

/// Upper-case the first character (`"pattern"` -> `"Pattern"`).
pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn fills_named_placeholders() {
        let text = English.message(
            MessageKey::EntityExists,
            &[("Label", "Pattern"), ("key", "*.mkv")],
        );
        assert_eq!(text, "Pattern '*.mkv' already exists.");
    }

    #[test]
    fn every_key_has_a_template() {
        for key in MessageKey::iter() {
            assert!(!English.template(key).is_empty(), "missing template for {key}");
        }
    }

    #[test]
    fn capitalize_handles_empty_and_ascii() {
        assert_eq!(capitalize("pattern"), "Pattern");
        assert_eq!(capitalize(""), "");
    }
}
