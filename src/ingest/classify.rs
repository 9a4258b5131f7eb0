//! Keyword-based category inference for rows without a category.

use crate::config::ClassifierConfig;
use crate::models::Category;

/// Assigns a category from free text (object name, type, material).
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    // checked in order; first hit wins
    rules: Vec<(Category, Vec<String>)>,
}

impl KeywordClassifier {
    /// Classify a piece of text. Falls back to [`Category::Other`].
    pub fn classify(&self, text: &str) -> Category {
        let lowered = text.to_lowercase();

        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map_or(Category::Other, |(category, _)| *category)
    }
}

impl From<&ClassifierConfig> for KeywordClassifier {
    fn from(config: &ClassifierConfig) -> Self {
        let lower = |words: &[String]| words.iter().map(|w| w.to_lowercase()).collect();

        Self {
            rules: vec![
                (Category::ReligiousIdentity, lower(&config.religious_identity)),
                (Category::NationalArt, lower(&config.national_art)),
                (
                    Category::ArchaeologicalHeritage,
                    lower(&config.archaeological_heritage),
                ),
                (Category::MilitaryHistory, lower(&config.military_history)),
            ],
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}
