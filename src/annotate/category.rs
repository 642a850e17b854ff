use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const DEFAULT_KEY: &str = "0";
pub const DEFAULT_TEXT: &str = "Custom";
pub const DEFAULT_COLOR: &str = "#ffffff";
/// Keys run "0".."9", one per hotkey.
pub const MAX_CATEGORIES: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub key: String,
    pub text: String,
    pub color: String,
}

/// Outcome of removing a category: the removed entry and every key that moved.
#[derive(Clone, Debug, PartialEq)]
pub struct Removal {
    pub removed: LabelConfig,
    pub rekeyed: Vec<(String, String)>,
}

/// Ordered category list. Index 0 is the reserved default category; the key
/// of every entry is its index.
#[derive(Clone, Debug, PartialEq)]
pub struct Categories {
    configs: Vec<LabelConfig>,
    active: usize,
}

impl Default for Categories {
    fn default() -> Self {
        Self::new()
    }
}

impl Categories {
    pub fn new() -> Self {
        Self {
            configs: vec![LabelConfig {
                key: DEFAULT_KEY.into(),
                text: DEFAULT_TEXT.into(),
                color: DEFAULT_COLOR.into(),
            }],
            active: 0,
        }
    }

    /// Build from `(text, color)` pairs, dropping anything past the hotkey limit.
    pub fn with_definitions<I, S>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut categories = Self::new();
        for (text, color) in definitions {
            let text = text.into();
            if let Err(err) = categories.add(text.clone(), color.into()) {
                log::warn!("Skipping category {:?}: {}", text, err);
            }
        }
        categories
    }

    pub fn all(&self) -> &[LabelConfig] {
        &self.configs
    }

    pub fn get(&self, key: &str) -> Option<&LabelConfig> {
        self.configs.iter().find(|c| c.key == key)
    }

    pub fn default_config(&self) -> &LabelConfig {
        &self.configs[0]
    }

    /// Look up `key`, treating unknown keys as the default category.
    pub fn resolve(&self, key: &str) -> &LabelConfig {
        self.get(key).unwrap_or_else(|| self.default_config())
    }

    pub fn active(&self) -> &LabelConfig {
        &self.configs[self.active]
    }

    pub fn set_active(&mut self, key: &str) -> Result<()> {
        let idx = self.index_of(key)?;
        self.active = idx;
        Ok(())
    }

    /// Non-default category whose text equals `text`, ignoring case and surrounding whitespace.
    pub fn match_text(&self, text: &str) -> Option<&LabelConfig> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.configs[1..]
            .iter()
            .find(|c| c.text.trim().to_lowercase() == needle)
    }

    pub fn add(&mut self, text: String, color: String) -> Result<&LabelConfig> {
        if self.configs.len() >= MAX_CATEGORIES {
            return Err(EngineError::CategoryLimit(MAX_CATEGORIES));
        }
        let key = self.configs.len().to_string();
        self.configs.push(LabelConfig { key, text, color });
        Ok(&self.configs[self.configs.len() - 1])
    }

    /// Replace the text and color of `key`, returning the previous entry.
    pub fn update(&mut self, key: &str, text: String, color: String) -> Result<LabelConfig> {
        let idx = self.index_of(key)?;
        let entry = &mut self.configs[idx];
        let previous = entry.clone();
        if idx != 0 {
            entry.text = text;
        }
        entry.color = color;
        Ok(previous)
    }

    /// Remove `key` and shift later keys down so they stay contiguous.
    pub fn remove(&mut self, key: &str) -> Result<Removal> {
        let idx = self.index_of(key)?;
        if idx == 0 {
            return Err(EngineError::InvalidConfig(
                "the default category cannot be deleted".into(),
            ));
        }

        let removed = self.configs.remove(idx);
        let mut rekeyed = Vec::new();
        for (i, config) in self.configs.iter_mut().enumerate().skip(idx) {
            let new_key = i.to_string();
            rekeyed.push((std::mem::replace(&mut config.key, new_key.clone()), new_key));
        }

        if self.active == idx {
            self.active = 0;
        } else if self.active > idx {
            self.active -= 1;
        }

        Ok(Removal { removed, rekeyed })
    }

    fn index_of(&self, key: &str) -> Result<usize> {
        self.configs
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| EngineError::UnknownCategory(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Categories {
        Categories::with_definitions([("Song", "#ff0000"), ("Call", "#00ff00"), ("Noise", "#0000ff")])
    }

    #[test]
    fn keys_follow_position() {
        let cats = sample();
        let keys: Vec<&str> = cats.all().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["0", "1", "2", "3"]);
        assert_eq!(cats.default_config().text, DEFAULT_TEXT);
    }

    #[test]
    fn limit_is_ten() {
        let mut cats = Categories::new();
        for i in 1..MAX_CATEGORIES {
            cats.add(format!("c{i}"), "#123456".into()).unwrap();
        }
        assert!(matches!(
            cats.add("extra".into(), "#000000".into()),
            Err(EngineError::CategoryLimit(10))
        ));
    }

    #[test]
    fn remove_reindexes_contiguously() {
        let mut cats = sample();
        cats.set_active("3").unwrap();
        let removal = cats.remove("1").unwrap();
        assert_eq!(removal.removed.text, "Song");
        assert_eq!(
            removal.rekeyed,
            vec![("2".to_string(), "1".to_string()), ("3".to_string(), "2".to_string())]
        );
        assert_eq!(cats.get("1").unwrap().text, "Call");
        assert_eq!(cats.get("2").unwrap().text, "Noise");
        assert!(cats.get("3").is_none());
        assert_eq!(cats.active().text, "Noise");
    }

    #[test]
    fn default_is_not_removable() {
        let mut cats = sample();
        assert!(cats.remove("0").is_err());
        assert!(matches!(cats.remove("7"), Err(EngineError::UnknownCategory(_))));
    }

    #[test]
    fn removing_active_falls_back_to_default() {
        let mut cats = sample();
        cats.set_active("2").unwrap();
        cats.remove("2").unwrap();
        assert_eq!(cats.active().key, DEFAULT_KEY);
    }

    #[test]
    fn text_match_ignores_case() {
        let cats = sample();
        assert_eq!(cats.match_text("  cALL ").map(|c| c.key.as_str()), Some("2"));
        assert!(cats.match_text("custom").is_none());
        assert!(cats.match_text("").is_none());
    }

    #[test]
    fn unknown_keys_resolve_to_default() {
        let cats = sample();
        assert_eq!(cats.resolve("9").key, DEFAULT_KEY);
        assert_eq!(cats.resolve("1").text, "Song");
    }
}
