//! Static reference data for clients: languages, CEFR levels, exercise types.

use axum::Json;
use serde::Serialize;

use crate::models::{CefrLevel, ExerciseType, Language};

#[derive(Debug, Serialize)]
pub struct LanguageEntry {
    pub code: Language,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LevelEntry {
    pub level: CefrLevel,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ExerciseTypeEntry {
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub display_name: &'static str,
    pub instruction: &'static str,
}

/// GET /api/v1/catalog/languages
pub async fn list_languages() -> Json<Vec<LanguageEntry>> {
    Json(
        Language::ALL
            .iter()
            .map(|language| LanguageEntry {
                code: *language,
                name: language.full_name(),
            })
            .collect(),
    )
}

/// GET /api/v1/catalog/levels
pub async fn list_levels() -> Json<Vec<LevelEntry>> {
    Json(
        CefrLevel::ALL
            .iter()
            .map(|level| LevelEntry {
                level: *level,
                description: level.description(),
            })
            .collect(),
    )
}

/// GET /api/v1/catalog/exercise-types
pub async fn list_exercise_types() -> Json<Vec<ExerciseTypeEntry>> {
    Json(
        ExerciseType::ALL
            .iter()
            .map(|exercise_type| ExerciseTypeEntry {
                exercise_type: *exercise_type,
                display_name: exercise_type.display_name(),
                instruction: exercise_type.instruction(),
            })
            .collect(),
    )
}
