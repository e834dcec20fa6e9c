use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Language tag, normalised to upper case ("CN", "EN", "ZH-TW", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locale(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid language tag '{0}'")]
pub struct LocaleError(pub String);

impl Locale {
    pub const DEFAULT_TAG: &'static str = "CN";

    pub fn new(tag: &str) -> Result<Self, LocaleError> {
        let trimmed = tag.trim();
        let valid = !trimmed.is_empty()
            && trimmed.starts_with(|c: char| c.is_ascii_alphabetic())
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(LocaleError(tag.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Reads a stored language preference. Anything unusable falls back to
    /// the default locale.
    pub fn from_preference(raw: &str) -> Self {
        Self::new(raw).unwrap_or_default()
    }

    pub fn cn() -> Self {
        Self("CN".to_string())
    }

    pub fn en() -> Self {
        Self("EN".to_string())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }

    /// Primary subtag, e.g. "EN" for "EN-GB".
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(Self::DEFAULT_TAG.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Locale::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<Locale, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locale: Locale, text: impl Into<String>) -> Self {
        self.0.insert(locale, text.into());
        self
    }

    pub fn get(&self, locale: &Locale) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// Exact match, then the default locale, then whatever entry exists.
    pub fn resolve(&self, locale: &Locale) -> &str {
        self.get(locale)
            .or_else(|| self.get(&Locale::default()))
            .or_else(|| self.0.values().next().map(String::as_str))
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.0.values().all(|text| text.trim().is_empty())
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.0.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_normalised() {
        assert_eq!(Locale::new(" en ").expect("valid").tag(), "EN");
        assert_eq!(Locale::new("zh-tw").expect("valid").language(), "ZH");
        assert!(Locale::new("").is_err());
        assert!(Locale::new("e n").is_err());
        assert!(Locale::new("-EN").is_err());
    }

    #[test]
    fn preference_falls_back_to_default() {
        assert_eq!(Locale::from_preference("EN"), Locale::en());
        assert_eq!(Locale::from_preference(""), Locale::cn());
        assert_eq!(Locale::from_preference("%%"), Locale::cn());
    }

    #[test]
    fn localized_text_resolution_order() {
        let text = LocalizedText::new()
            .with(Locale::cn(), "中产")
            .with(Locale::en(), "Middle Class");
        assert_eq!(text.resolve(&Locale::en()), "Middle Class");
        assert_eq!(text.resolve(&Locale::new("FR").expect("valid")), "中产");

        let only_english = LocalizedText::new().with(Locale::en(), "Wealthy");
        assert_eq!(only_english.resolve(&Locale::cn()), "Wealthy");
        assert_eq!(LocalizedText::new().resolve(&Locale::cn()), "");
    }

    #[test]
    fn localized_text_reads_open_locale_maps() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"CN":"富人","EN":"Wealthy","de":"Wohlhabend"}"#)
                .expect("valid json");
        let german = Locale::new("DE").expect("valid");
        assert_eq!(text.get(&german), Some("Wohlhabend"));
        assert_eq!(text.locales().count(), 3);
        assert!(!text.is_blank());
    }
}
