use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::exercise::CefrLevel;

/// Reporting window for statistics and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "3m")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub fn days(&self) -> Option<i64> {
        match self {
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::Quarter => Some(90),
            Period::Year => Some(365),
            Period::All => None,
        }
    }

    /// Start of the window ending at `now`; `None` means unbounded.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|days| now - Duration::days(days))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_exercises: u64,
    pub total_answered: u64,
    pub accuracy: f64,
    pub total_study_hours: f64,
    pub current_streak_days: u32,
    pub is_today_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPerformance {
    pub level: CefrLevel,
    pub total_answered: u64,
    pub accuracy: f64,
    pub mastered: bool,
    pub in_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Mastered,
    Good,
    Learning,
    NeedsPractice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub total_answered: u64,
    pub accuracy: f64,
    pub status: TopicStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub levels: Vec<LevelPerformance>,
    pub topics: Vec<TopicPerformance>,
    pub top_topics: Vec<TopicPerformance>,
    pub weak_topics: Vec<TopicPerformance>,
}
