use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, Bson, DateTime as BsonDateTime, Document},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::{ExclusionCutoff, ExerciseCriteria, Store};
use crate::metrics::track_db_operation;
use crate::models::{
    Attempt, AttemptStatus, AttemptView, Exercise, ExerciseSummary, ExerciseType, HistoryQuery,
    LanguagePair, SortOrder,
};
use crate::utils::retry::{retry_read, RetryPolicy};
use crate::utils::time::{bson_to_chrono, chrono_to_bson};

const EXERCISES: &str = "exercises";
const ATTEMPTS: &str = "attempts";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttemptDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    exercise_id: i64,
    answer: Option<String>,
    status: AttemptStatus,
    time_spent_seconds: i64,
    completed_at: BsonDateTime,
}

impl From<&Attempt> for AttemptDocument {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id.clone(),
            user_id: attempt.user_id.clone(),
            exercise_id: attempt.exercise_id,
            answer: attempt.answer.clone(),
            status: attempt.status,
            time_spent_seconds: attempt.time_spent_seconds,
            completed_at: chrono_to_bson(attempt.completed_at),
        }
    }
}

/// Attempt document after `$lookup` + `$unwind` of its exercise.
#[derive(Debug, Clone, Deserialize)]
struct JoinedAttemptDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    exercise_id: i64,
    answer: Option<String>,
    status: AttemptStatus,
    time_spent_seconds: i64,
    completed_at: BsonDateTime,
    exercise: Exercise,
}

impl From<JoinedAttemptDocument> for AttemptView {
    fn from(joined: JoinedAttemptDocument) -> Self {
        let summary = ExerciseSummary::from(&joined.exercise);
        let attempt = Attempt {
            id: joined.id,
            user_id: joined.user_id,
            exercise_id: joined.exercise_id,
            answer: joined.answer,
            status: joined.status,
            time_spent_seconds: joined.time_spent_seconds,
            completed_at: bson_to_chrono(joined.completed_at),
        };
        AttemptView::new(attempt, summary)
    }
}

pub struct MongoStore {
    db: Database,
    retry: RetryPolicy,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn exercises(&self) -> Collection<Exercise> {
        self.db.collection(EXERCISES)
    }

    fn attempts(&self) -> Collection<AttemptDocument> {
        self.db.collection(ATTEMPTS)
    }

    /// Creates the indexes backing selection, exclusion and history reads.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let selection = IndexModel::builder()
            .keys(doc! { "is_active": 1, "topic": 1, "level": 1, "type": 1 })
            .options(
                IndexOptions::builder()
                    .name("exercise_selection".to_string())
                    .build(),
            )
            .build();
        self.exercises()
            .create_index(selection)
            .await
            .context("Failed to create exercise selection index")?;

        let history = IndexModel::builder()
            .keys(doc! { "user_id": 1, "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("attempt_history".to_string())
                    .build(),
            )
            .build();
        self.attempts()
            .create_index(history)
            .await
            .context("Failed to create attempt history index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn aggregate_exercises(&self, pipeline: Vec<Document>) -> Result<Vec<Exercise>> {
        let collection = self.exercises();
        let mut cursor = collection
            .aggregate(pipeline)
            .await
            .context("Failed to aggregate exercises")?;

        let mut rows = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .context("Exercise cursor error")?
        {
            let exercise: Exercise =
                from_document(document).context("Failed to decode exercise document")?;
            if let Err(reason) = exercise.validate() {
                tracing::warn!("Exercise {} has inconsistent content: {}", exercise.id, reason);
            }
            rows.push(exercise);
        }
        Ok(rows)
    }

    async fn aggregate_attempts(&self, pipeline: Vec<Document>) -> Result<Vec<AttemptView>> {
        let collection = self.attempts();
        let mut cursor = collection
            .aggregate(pipeline)
            .await
            .context("Failed to aggregate attempts")?;

        let mut rows = Vec::new();
        while let Some(document) = cursor.try_next().await.context("Attempt cursor error")? {
            let joined: JoinedAttemptDocument =
                from_document(document).context("Failed to decode attempt document")?;
            rows.push(AttemptView::from(joined));
        }
        Ok(rows)
    }
}

/// Mongo rendition of `Exercise::matches_language_pair`.
fn language_pair_filter(pair: LanguagePair) -> Document {
    let native = pair.native.as_str();
    let active = pair.active.as_str();
    doc! {
        "$or": [
            {
                "type": ExerciseType::SentenceTranslation.as_str(),
                "$or": [
                    { "question_language": native, "answer_language": active },
                    { "question_language": active, "answer_language": native },
                ]
            },
            {
                "type": {
                    "$in": [
                        ExerciseType::MultipleChoice.as_str(),
                        ExerciseType::FillBlank.as_str(),
                    ]
                },
                "question_language": active,
                "translation_language": native,
            }
        ]
    }
}

fn selection_filter(criteria: &ExerciseCriteria) -> Document {
    let mut filter = language_pair_filter(criteria.pair);
    filter.insert("is_active", true);
    filter.insert("topic", criteria.topic.as_str());
    filter.insert("level", criteria.level.as_str());
    if !criteria.excluded_ids.is_empty() {
        let mut excluded: Vec<i64> = criteria.excluded_ids.iter().copied().collect();
        excluded.sort_unstable();
        filter.insert("_id", doc! { "$nin": excluded });
    }
    filter
}

fn exclusion_filter(user_id: &str, cutoffs: &[ExclusionCutoff]) -> Document {
    let windows: Vec<Document> = cutoffs
        .iter()
        .map(|cutoff| {
            doc! {
                "status": cutoff.status.as_str(),
                "completed_at": { "$gt": chrono_to_bson(cutoff.since) },
            }
        })
        .collect();
    doc! { "user_id": user_id, "$or": windows }
}

fn history_pipeline(query: &HistoryQuery) -> Vec<Document> {
    let mut attempt_match = doc! { "user_id": query.user_id.as_str() };
    if let Some(status) = query.status {
        attempt_match.insert("status", status.as_str());
    }
    let mut range = Document::new();
    if let Some(from) = query.from {
        range.insert("$gte", chrono_to_bson(from));
    }
    if let Some(to) = query.to {
        range.insert("$lte", chrono_to_bson(to));
    }
    if !range.is_empty() {
        attempt_match.insert("completed_at", range);
    }

    let mut exercise_match = Document::new();
    if let Some(level) = query.level {
        exercise_match.insert("exercise.level", level.as_str());
    }
    if let Some(language) = query.language {
        exercise_match.insert(
            "$or",
            vec![
                doc! { "exercise.question_language": language.as_str() },
                doc! { "exercise.answer_language": language.as_str() },
            ],
        );
    }

    let direction = match query.order {
        SortOrder::Asc => 1,
        SortOrder::Desc => -1,
    };

    let mut pipeline = vec![doc! { "$match": attempt_match }];
    pipeline.extend(join_exercise_stages());
    if !exercise_match.is_empty() {
        pipeline.push(doc! { "$match": exercise_match });
    }
    pipeline.push(doc! { "$sort": { "completed_at": direction, "_id": direction } });
    pipeline.push(doc! { "$skip": i64::try_from(query.offset).unwrap_or(i64::MAX) });
    pipeline.push(doc! { "$limit": i64::try_from(query.limit).unwrap_or(i64::MAX) });
    pipeline
}

fn join_exercise_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": EXERCISES,
                "localField": "exercise_id",
                "foreignField": "_id",
                "as": "exercise",
            }
        },
        doc! { "$unwind": "$exercise" },
    ]
}

fn bson_to_id(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int64(id) => Some(*id),
        Bson::Int32(id) => Some(i64::from(*id)),
        _ => None,
    }
}

#[async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn list_topics(&self, pair: LanguagePair) -> Result<Vec<String>> {
        let mut filter = language_pair_filter(pair);
        filter.insert("is_active", true);

        let values = track_db_operation("distinct", EXERCISES, async {
            retry_read("list_topics", &self.retry, || async {
                self.exercises()
                    .distinct("topic", filter.clone())
                    .await
                    .context("Failed to list topics")
            })
            .await
        })
        .await?;

        let mut topics: Vec<String> = values
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        topics.sort();
        Ok(topics)
    }

    async fn sample_exercise(&self, criteria: &ExerciseCriteria) -> Result<Option<Exercise>> {
        let pipeline = vec![
            doc! { "$match": selection_filter(criteria) },
            doc! { "$sample": { "size": 1 } },
        ];

        let mut rows = track_db_operation("sample", EXERCISES, async {
            retry_read("sample_exercise", &self.retry, || {
                self.aggregate_exercises(pipeline.clone())
            })
            .await
        })
        .await?;
        Ok(rows.pop())
    }

    async fn find_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        track_db_operation("find_one", EXERCISES, async {
            retry_read("find_exercise", &self.retry, || async {
                self.exercises()
                    .find_one(doc! { "_id": id })
                    .await
                    .with_context(|| format!("Failed to load exercise {}", id))
            })
            .await
        })
        .await
    }

    async fn excluded_exercise_ids(
        &self,
        user_id: &str,
        cutoffs: &[ExclusionCutoff],
    ) -> Result<HashSet<i64>> {
        if cutoffs.is_empty() {
            return Ok(HashSet::new());
        }
        let filter = exclusion_filter(user_id, cutoffs);

        let values = track_db_operation("distinct", ATTEMPTS, async {
            retry_read("excluded_exercise_ids", &self.retry, || async {
                self.attempts()
                    .distinct("exercise_id", filter.clone())
                    .await
                    .context("Failed to query excluded exercises")
            })
            .await
        })
        .await?;

        Ok(values.iter().filter_map(bson_to_id).collect())
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        attempt
            .check_consistency()
            .map_err(|reason| anyhow::anyhow!("Refusing to store attempt {}: {}", attempt.id, reason))?;
        let document = AttemptDocument::from(attempt);
        track_db_operation("insert_one", ATTEMPTS, async {
            self.attempts()
                .insert_one(&document)
                .await
                .with_context(|| format!("Failed to insert attempt {}", attempt.id))?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            "Attempt stored: id={}, user={}, exercise={}, status={}",
            attempt.id,
            attempt.user_id,
            attempt.exercise_id,
            attempt.status.as_str()
        );
        Ok(())
    }

    async fn find_attempts(&self, query: &HistoryQuery) -> Result<Vec<AttemptView>> {
        let pipeline = history_pipeline(query);
        track_db_operation("aggregate", ATTEMPTS, async {
            retry_read("find_attempts", &self.retry, || {
                self.aggregate_attempts(pipeline.clone())
            })
            .await
        })
        .await
    }

    async fn find_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Option<AttemptView>> {
        let mut pipeline = vec![doc! { "$match": { "_id": attempt_id, "user_id": user_id } }];
        pipeline.extend(join_exercise_stages());
        pipeline.push(doc! { "$limit": 1 });

        let mut rows = track_db_operation("aggregate", ATTEMPTS, async {
            retry_read("find_attempt", &self.retry, || {
                self.aggregate_attempts(pipeline.clone())
            })
            .await
        })
        .await?;
        Ok(rows.pop())
    }
}
