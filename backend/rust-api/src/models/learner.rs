use serde::{Deserialize, Serialize};

use super::exercise::{CefrLevel, Language};

/// Language the learner is currently practicing, with their level in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLanguage {
    pub language: Language,
    pub level: CefrLevel,
}

/// Authenticated caller as supplied by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerContext {
    pub user_id: String,
    pub native_language: Language,
    pub active_language: Option<ActiveLanguage>,
}

impl LearnerContext {
    pub fn new(
        user_id: impl Into<String>,
        native_language: Language,
        active_language: Option<ActiveLanguage>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            native_language,
            active_language,
        }
    }

    /// (native, active) pair, when an active learning language is selected.
    pub fn language_pair(&self) -> Option<LanguagePair> {
        self.active_language.map(|active| LanguagePair {
            native: self.native_language,
            active: active.language,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub native: Language,
    pub active: Language,
}
