pub mod attempt;
pub mod exercise;
pub mod learner;
pub mod statistics;

pub use attempt::{
    Attempt, AttemptStatus, AttemptView, ExerciseSummary, GradedResult, HistoryParams, HistoryQuery,
    SortOrder, SubmitAnswerRequest,
};
pub use exercise::{
    CefrLevel, Exercise, ExerciseOptions, ExerciseType, Language, NextExerciseQuery, Question,
};
pub use learner::{ActiveLanguage, LanguagePair, LearnerContext};
pub use statistics::{
    LevelPerformance, Overview, Performance, Period, TopicPerformance, TopicStatus,
};
