//! Overview and performance aggregates over a learner's attempt history.
//!
//! The aggregation functions are pure and take the reference date explicitly;
//! [`StatisticsService`] only fetches the history and supplies the clock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::metrics::STATISTICS_REQUESTS_TOTAL;
use crate::models::{
    AttemptStatus, AttemptView, CefrLevel, HistoryQuery, Language, LevelPerformance, Overview,
    Performance, Period, TopicPerformance, TopicStatus,
};
use crate::store::Store;

use super::ServiceError;

const LEVEL_MASTERY_ACCURACY: f64 = 80.0;
const LEVEL_MASTERY_ANSWERED: u64 = 100;
const LEVEL_IN_PROGRESS_ANSWERED: u64 = 10;
const WEAK_TOPIC_MIN_ANSWERED: u64 = 20;
const WEAK_TOPIC_MAX_ACCURACY: f64 = 60.0;
const TOPIC_RANKING_SIZE: usize = 5;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Answered (non-skip) count and unrounded accuracy percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    answered: u64,
    correct: u64,
}

impl Tally {
    fn add(&mut self, status: AttemptStatus) {
        if status.is_answered() {
            self.answered += 1;
        }
        if status == AttemptStatus::Correct {
            self.correct += 1;
        }
    }

    fn accuracy(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64 * 100.0
        }
    }
}

/// Consecutive practice days ending today, or yesterday when nothing was done today.
pub fn current_streak<I>(completed: I, today: NaiveDate) -> (u32, bool)
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let days: BTreeSet<NaiveDate> = completed.into_iter().map(|at| at.date_naive()).collect();
    let Some(latest) = days.iter().next_back().copied() else {
        return (0, false);
    };

    let is_today_completed = latest == today;
    let mut expected = if is_today_completed {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    for day in days.iter().rev() {
        if *day != expected {
            break;
        }
        streak += 1;
        expected -= Duration::days(1);
    }
    (streak, is_today_completed)
}

pub fn overview(history: &[AttemptView], today: NaiveDate) -> Overview {
    let mut tally = Tally::default();
    let mut total_seconds: i64 = 0;
    for view in history {
        tally.add(view.status);
        total_seconds = total_seconds.saturating_add(view.time_spent_seconds);
    }
    let (current_streak_days, is_today_completed) =
        current_streak(history.iter().map(|view| view.completed_at), today);

    Overview {
        total_exercises: history.len() as u64,
        total_answered: tally.answered,
        accuracy: round1(tally.accuracy()),
        total_study_hours: round1(total_seconds as f64 / 3600.0),
        current_streak_days,
        is_today_completed,
    }
}

pub fn topic_status(accuracy: f64) -> TopicStatus {
    if accuracy >= 85.0 {
        TopicStatus::Mastered
    } else if accuracy >= 70.0 {
        TopicStatus::Good
    } else if accuracy >= 50.0 {
        TopicStatus::Learning
    } else {
        TopicStatus::NeedsPractice
    }
}

pub fn performance(history: &[AttemptView]) -> Performance {
    let mut by_level: BTreeMap<CefrLevel, Tally> = BTreeMap::new();
    let mut by_topic: BTreeMap<String, Tally> = BTreeMap::new();
    for view in history {
        by_level
            .entry(view.exercise.level)
            .or_default()
            .add(view.status);
        by_topic
            .entry(view.exercise.topic.clone())
            .or_default()
            .add(view.status);
    }

    let levels = CefrLevel::ALL
        .iter()
        .map(|level| {
            let tally = by_level.get(level).copied().unwrap_or_default();
            let accuracy = tally.accuracy();
            let mastered =
                accuracy >= LEVEL_MASTERY_ACCURACY && tally.answered >= LEVEL_MASTERY_ANSWERED;
            LevelPerformance {
                level: *level,
                total_answered: tally.answered,
                accuracy: round1(accuracy),
                mastered,
                in_progress: tally.answered > LEVEL_IN_PROGRESS_ANSWERED && !mastered,
            }
        })
        .collect();

    // (performance, raw accuracy) so rankings and thresholds ignore rounding
    let scored: Vec<(TopicPerformance, f64)> = by_topic
        .into_iter()
        .map(|(topic, tally)| {
            let accuracy = tally.accuracy();
            let entry = TopicPerformance {
                topic,
                total_answered: tally.answered,
                accuracy: round1(accuracy),
                status: topic_status(accuracy),
            };
            (entry, accuracy)
        })
        .collect();

    let mut ranked: Vec<&(TopicPerformance, f64)> = scored
        .iter()
        .filter(|(entry, _)| entry.total_answered > 0)
        .collect();
    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then(b.0.total_answered.cmp(&a.0.total_answered))
            .then(a.0.topic.cmp(&b.0.topic))
    });
    let top_topics = ranked
        .iter()
        .take(TOPIC_RANKING_SIZE)
        .map(|(entry, _)| entry.clone())
        .collect();

    let mut weak: Vec<&(TopicPerformance, f64)> = scored
        .iter()
        .filter(|(entry, accuracy)| {
            entry.total_answered >= WEAK_TOPIC_MIN_ANSWERED && *accuracy <= WEAK_TOPIC_MAX_ACCURACY
        })
        .collect();
    weak.sort_by(|a, b| {
        a.1.total_cmp(&b.1)
            .then(b.0.total_answered.cmp(&a.0.total_answered))
            .then(a.0.topic.cmp(&b.0.topic))
    });
    let weak_topics = weak
        .iter()
        .take(TOPIC_RANKING_SIZE)
        .map(|(entry, _)| entry.clone())
        .collect();

    Performance {
        levels,
        topics: scored.into_iter().map(|(entry, _)| entry).collect(),
        top_topics,
        weak_topics,
    }
}

pub struct StatisticsService {
    store: Arc<dyn Store>,
    history_limit: usize,
}

impl StatisticsService {
    pub fn new(store: Arc<dyn Store>, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
        }
    }

    async fn history(
        &self,
        user_id: &str,
        language: Option<Language>,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptView>, ServiceError> {
        let mut query = HistoryQuery::for_user(user_id, self.history_limit);
        query.language = language;
        query.from = period.start(now);
        let history = self.store.find_attempts(&query).await?;
        if history.len() == self.history_limit {
            tracing::warn!(
                "Statistics history truncated at {} rows: user={}",
                self.history_limit,
                user_id
            );
        }
        Ok(history)
    }

    pub async fn get_overview(
        &self,
        user_id: &str,
        language: Option<Language>,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<Overview, ServiceError> {
        STATISTICS_REQUESTS_TOTAL
            .with_label_values(&["overview", period_label(period)])
            .inc();
        let history = self.history(user_id, language, period, now).await?;
        tracing::debug!(
            "Computing overview: user={}, rows={}",
            user_id,
            history.len()
        );
        Ok(overview(&history, now.date_naive()))
    }

    pub async fn get_performance(
        &self,
        user_id: &str,
        language: Option<Language>,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<Performance, ServiceError> {
        STATISTICS_REQUESTS_TOTAL
            .with_label_values(&["performance", period_label(period)])
            .inc();
        let history = self.history(user_id, language, period, now).await?;
        tracing::debug!(
            "Computing performance: user={}, rows={}",
            user_id,
            history.len()
        );
        Ok(performance(&history))
    }
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::Week => "7d",
        Period::Month => "30d",
        Period::Quarter => "3m",
        Period::Year => "1y",
        Period::All => "all",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::fixtures::translation;
    use crate::models::{Attempt, ExerciseSummary};
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
    }

    fn at(days_ago: i64, hour: u32) -> DateTime<Utc> {
        let date = today() - Duration::days(days_ago);
        Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
    }

    fn view(topic: &str, level: CefrLevel, status: AttemptStatus, seconds: i64) -> AttemptView {
        let exercise = translation(1, topic, level);
        AttemptView::new(
            Attempt {
                id: "a".to_string(),
                user_id: "u-1".to_string(),
                exercise_id: 1,
                answer: status.is_answered().then(|| "x".to_string()),
                status,
                time_spent_seconds: seconds,
                completed_at: at(0, 10),
            },
            ExerciseSummary::from(&exercise),
        )
    }

    fn views(topic: &str, level: CefrLevel, correct: usize, incorrect: usize) -> Vec<AttemptView> {
        let mut rows = vec![view(topic, level, AttemptStatus::Correct, 10); correct];
        rows.extend(vec![view(topic, level, AttemptStatus::Incorrect, 10); incorrect]);
        rows
    }

    #[test]
    fn streak_counts_back_from_today() {
        let (days, today_done) = current_streak([at(0, 9), at(1, 22), at(2, 1)], today());
        assert_eq!((days, today_done), (3, true));
    }

    #[test]
    fn streak_keeps_one_day_of_grace() {
        let (days, today_done) = current_streak([at(1, 9), at(2, 9)], today());
        assert_eq!((days, today_done), (2, false));
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let (days, today_done) = current_streak([at(1, 9), at(3, 9)], today());
        assert_eq!((days, today_done), (1, false));
    }

    #[test]
    fn streak_is_zero_after_two_idle_days() {
        assert_eq!(current_streak([at(2, 9), at(3, 9)], today()), (0, false));
        assert_eq!(current_streak(Vec::new(), today()), (0, false));
    }

    #[test]
    fn streak_ignores_multiple_attempts_per_day() {
        let (days, _) = current_streak([at(0, 1), at(0, 23), at(1, 5), at(1, 6)], today());
        assert_eq!(days, 2);
    }

    #[test]
    fn overview_counts_skips_but_not_in_accuracy() {
        let mut history = views("Articles", CefrLevel::A1, 4, 3);
        history.extend(vec![view("Articles", CefrLevel::A1, AttemptStatus::Skip, 10); 3]);

        let result = overview(&history, today());
        assert_eq!(result.total_exercises, 10);
        assert_eq!(result.total_answered, 7);
        assert_eq!(result.accuracy, 57.1);
        assert_eq!(result.current_streak_days, 1);
        assert!(result.is_today_completed);
    }

    #[test]
    fn overview_of_empty_history_is_zeroed() {
        let result = overview(&[], today());
        assert_eq!(result.total_exercises, 0);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.total_study_hours, 0.0);
        assert!(!result.is_today_completed);
    }

    #[test]
    fn study_hours_are_rounded_to_one_decimal() {
        let history = vec![view("Articles", CefrLevel::A1, AttemptStatus::Correct, 5400)];
        assert_eq!(overview(&history, today()).total_study_hours, 1.5);
    }

    #[test]
    fn huge_stored_durations_do_not_overflow_study_hours() {
        let history = vec![view("Articles", CefrLevel::A1, AttemptStatus::Correct, i64::MAX); 2];
        let result = overview(&history, today());
        assert!(result.total_study_hours > 0.0);
    }

    #[test]
    fn skip_only_day_extends_the_streak() {
        let mut skipped_yesterday = view("Articles", CefrLevel::A1, AttemptStatus::Skip, 3);
        skipped_yesterday.completed_at = at(1, 18);
        let history = vec![
            view("Articles", CefrLevel::A1, AttemptStatus::Correct, 10),
            skipped_yesterday,
        ];

        let result = overview(&history, today());
        assert_eq!(result.current_streak_days, 2);
        assert!(result.is_today_completed);
    }

    #[test]
    fn topic_with_high_accuracy_is_mastered_and_never_weak() {
        let history = views("Articles", CefrLevel::A1, 23, 2);
        let result = performance(&history);

        let articles = &result.topics[0];
        assert_eq!(articles.total_answered, 25);
        assert_eq!(articles.accuracy, 92.0);
        assert_eq!(articles.status, TopicStatus::Mastered);
        assert_eq!(result.top_topics[0].topic, "Articles");
        assert!(result.weak_topics.is_empty());
    }

    #[test]
    fn level_mastery_needs_volume_and_accuracy() {
        let history = views("Present perfect", CefrLevel::B1, 81, 19);
        let result = performance(&history);

        let b1 = result
            .levels
            .iter()
            .find(|level| level.level == CefrLevel::B1)
            .unwrap();
        assert_eq!(b1.total_answered, 100);
        assert_eq!(b1.accuracy, 81.0);
        assert!(b1.mastered);
        assert!(!b1.in_progress);

        let a1 = &result.levels[0];
        assert_eq!(a1.total_answered, 0);
        assert!(!a1.mastered && !a1.in_progress);
        assert_eq!(result.levels.len(), 6);
    }

    #[test]
    fn level_with_few_answers_is_in_progress() {
        let history = views("Articles", CefrLevel::A2, 11, 0);
        let a2 = performance(&history).levels[1].clone();
        assert!(!a2.mastered);
        assert!(a2.in_progress);
    }

    #[test]
    fn weak_topics_are_sorted_ascending_and_capped() {
        let mut history = Vec::new();
        for (index, correct) in [12, 2, 8, 10, 4, 6].iter().enumerate() {
            let topic = format!("Topic {}", index);
            history.extend(views(&topic, CefrLevel::A1, *correct, 20 - correct));
        }
        // too few answers to be weak
        history.extend(views("Small", CefrLevel::A1, 0, 5));

        let result = performance(&history);
        let weak: Vec<&str> = result
            .weak_topics
            .iter()
            .map(|topic| topic.topic.as_str())
            .collect();
        assert_eq!(
            weak,
            vec!["Topic 1", "Topic 4", "Topic 5", "Topic 2", "Topic 3"]
        );
        assert_eq!(result.top_topics.len(), 5);
        assert_eq!(result.top_topics[0].topic, "Topic 0");
    }

    #[test]
    fn skipped_only_topic_is_listed_but_not_ranked() {
        let history = vec![view("Idioms", CefrLevel::C1, AttemptStatus::Skip, 4)];
        let result = performance(&history);
        assert_eq!(result.topics.len(), 1);
        assert_eq!(result.topics[0].status, TopicStatus::NeedsPractice);
        assert!(result.top_topics.is_empty());
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(topic_status(85.0), TopicStatus::Mastered);
        assert_eq!(topic_status(84.9), TopicStatus::Good);
        assert_eq!(topic_status(70.0), TopicStatus::Good);
        assert_eq!(topic_status(50.0), TopicStatus::Learning);
        assert_eq!(topic_status(49.9), TopicStatus::NeedsPractice);
    }
}
