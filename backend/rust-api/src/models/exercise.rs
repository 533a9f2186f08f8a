use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Answer options of a multiple choice exercise, keyed by letter ("A", "B", ...).
pub type ExerciseOptions = BTreeMap<String, String>;

/// Languages in ISO 639-1 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uk,
    En,
    De,
}

const LANGUAGE_NAMES: &[(Language, &str)] = &[
    (Language::Uk, "Ukrainian"),
    (Language::En, "English"),
    (Language::De, "German"),
];

impl Language {
    pub const ALL: [Language; 3] = [Language::Uk, Language::En, Language::De];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Uk => "uk",
            Language::En => "en",
            Language::De => "de",
        }
    }

    /// Full English name of the language, e.g. "Ukrainian".
    pub fn full_name(&self) -> &'static str {
        lookup(LANGUAGE_NAMES, self).unwrap_or("Unknown")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CEFR proficiency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

const LEVEL_DESCRIPTIONS: &[(CefrLevel, &str)] = &[
    (CefrLevel::A1, "Beginner"),
    (CefrLevel::A2, "Elementary"),
    (CefrLevel::B1, "Intermediate"),
    (CefrLevel::B2, "Upper Intermediate"),
    (CefrLevel::C1, "Advanced"),
    (CefrLevel::C2, "Proficient"),
];

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }

    pub fn description(&self) -> &'static str {
        lookup(LEVEL_DESCRIPTIONS, self).unwrap_or("Unknown")
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    SentenceTranslation,
    MultipleChoice,
    FillBlank,
}

const TYPE_INSTRUCTIONS: &[(ExerciseType, &str)] = &[
    (
        ExerciseType::SentenceTranslation,
        "Translate the following text",
    ),
    (
        ExerciseType::MultipleChoice,
        "Choose the correct answer from the options below",
    ),
    (
        ExerciseType::FillBlank,
        "Fill in the blank with the correct word",
    ),
];

const TYPE_DISPLAY_NAMES: &[(ExerciseType, &str)] = &[
    (ExerciseType::SentenceTranslation, "Sentence translation"),
    (ExerciseType::MultipleChoice, "Multiple choice"),
    (ExerciseType::FillBlank, "Fill in the blank"),
];

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [
        ExerciseType::SentenceTranslation,
        ExerciseType::MultipleChoice,
        ExerciseType::FillBlank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::SentenceTranslation => "sentence_translation",
            ExerciseType::MultipleChoice => "multiple_choice",
            ExerciseType::FillBlank => "fill_blank",
        }
    }

    /// Instruction shown to the learner above the question.
    pub fn instruction(&self) -> &'static str {
        lookup(TYPE_INSTRUCTIONS, self).unwrap_or("")
    }

    pub fn display_name(&self) -> &'static str {
        lookup(TYPE_DISPLAY_NAMES, self).unwrap_or("")
    }

    /// Sentence translation is matched in both directions of the language pair,
    /// the other types only with the question in the learning language.
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, ExerciseType::SentenceTranslation)
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lookup<K: PartialEq, V: Copy>(table: &[(K, V)], key: &K) -> Option<V> {
    table
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| *value)
}

/// Returns the variants of `all` that have no entry in `table`.
pub(crate) fn missing_entries<K: PartialEq + Copy, V>(all: &[K], table: &[(K, V)]) -> Vec<K> {
    all.iter()
        .filter(|variant| !table.iter().any(|(key, _)| key == *variant))
        .copied()
        .collect()
}

/// Checks that every per-variant table covers every variant.
pub fn validate_exercise_tables() -> Result<(), String> {
    let mut problems = Vec::new();

    let missing = missing_entries(&Language::ALL, LANGUAGE_NAMES);
    if !missing.is_empty() {
        problems.push(format!("Language names missing for {:?}", missing));
    }
    let missing = missing_entries(&CefrLevel::ALL, LEVEL_DESCRIPTIONS);
    if !missing.is_empty() {
        problems.push(format!("Level descriptions missing for {:?}", missing));
    }
    let missing = missing_entries(&ExerciseType::ALL, TYPE_INSTRUCTIONS);
    if !missing.is_empty() {
        problems.push(format!("Exercise instructions missing for {:?}", missing));
    }
    let missing = missing_entries(&ExerciseType::ALL, TYPE_DISPLAY_NAMES);
    if !missing.is_empty() {
        problems.push(format!("Exercise display names missing for {:?}", missing));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

/// Immutable practice content, owned by the content-management service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "_id")]
    pub id: i64,
    pub topic: String,
    pub level: CefrLevel,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub question_text: String,
    pub question_language: Language,
    pub correct_answer: String,
    pub answer_language: Language,
    pub translation: Option<String>,
    pub translation_language: Option<Language>,
    pub options: Option<ExerciseOptions>,
    pub is_active: bool,
}

impl Exercise {
    /// Checks the content invariants that depend on the exercise type.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Exercise topic must not be empty".to_string());
        }
        if self.correct_answer.trim().is_empty() {
            return Err("Exercise correct answer must not be empty".to_string());
        }

        match (&self.exercise_type, &self.options) {
            (ExerciseType::MultipleChoice, None) => {
                return Err("'options' is required when exercise type is 'multiple_choice'".into())
            }
            (ExerciseType::MultipleChoice, Some(options)) if options.len() < 2 => {
                return Err("'multiple_choice' exercise needs at least two options".into())
            }
            (other, Some(_)) if *other != ExerciseType::MultipleChoice => {
                return Err(format!("Exercise type '{}' should not have options", other))
            }
            _ => {}
        }

        if self.translation.is_some() != self.translation_language.is_some() {
            return Err(
                "'translation' and 'translation_language' must be provided together".to_string(),
            );
        }

        match self.exercise_type {
            ExerciseType::SentenceTranslation if self.translation.is_some() => Err(
                "Translation not needed for 'sentence_translation': the answer is the translation"
                    .to_string(),
            ),
            ExerciseType::FillBlank | ExerciseType::MultipleChoice
                if self.translation.is_none() =>
            {
                Err(format!(
                    "Translation required for '{}' exercises",
                    self.exercise_type
                ))
            }
            _ => Ok(()),
        }
    }

    /// True when the exercise can be practiced by someone with this language pair.
    pub fn matches_language_pair(&self, native: Language, active: Language) -> bool {
        if self.exercise_type.is_bidirectional() {
            (self.question_language == native && self.answer_language == active)
                || (self.question_language == active && self.answer_language == native)
        } else {
            self.question_language == active && self.translation_language == Some(native)
        }
    }

    /// Letter of the option whose text equals the correct answer.
    pub fn correct_option_key(&self) -> Option<String> {
        correct_option_key(self.exercise_type, self.options.as_ref(), &self.correct_answer)
    }
}

/// Option key holding `correct_answer` for multiple choice exercises. `None` for
/// other types or when no option matches.
pub fn correct_option_key(
    exercise_type: ExerciseType,
    options: Option<&ExerciseOptions>,
    correct_answer: &str,
) -> Option<String> {
    if exercise_type != ExerciseType::MultipleChoice {
        return None;
    }
    options?
        .iter()
        .find(|(_, value)| value.as_str() == correct_answer)
        .map(|(key, _)| key.clone())
}

/// What the learner sees: no correct answer, no translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub topic: String,
    pub level: CefrLevel,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub question_text: String,
    pub options: Option<ExerciseOptions>,
    pub instruction: String,
}

impl From<&Exercise> for Question {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id,
            topic: exercise.topic.clone(),
            level: exercise.level,
            exercise_type: exercise.exercise_type,
            question_text: exercise.question_text.clone(),
            options: exercise.options.clone(),
            instruction: exercise.exercise_type.instruction().to_string(),
        }
    }
}

/// Query of `GET /api/v1/exercises/next`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NextExerciseQuery {
    #[validate(length(min = 1, max = 100, message = "topic must be 1-100 characters"))]
    pub topic: String,
    /// Overrides the level of the active learning language.
    pub difficulty: Option<CefrLevel>,
    /// Exercise the learner just saw; never returned again by this call.
    pub exclude_id: Option<i64>,
}

impl NextExerciseQuery {
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            difficulty: None,
            exclude_id: None,
        }
    }
}
