#![allow(async_fn_in_trait)]

use std::{borrow::Cow, error::Error};

use chrono::Utc;
use rand::seq::SliceRandom;
use sqlx::postgres::PgPool;

use super::model::{LeaderboardEntry, Question, UserStats};

/// How many questions a single quiz session holds at most.
pub const SESSION_SIZE: usize = 10;

type StoreError = Box<dyn Error + Send + Sync>;

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect<'a>(connection_string: Cow<'a, str>) -> Self {
        let pool = PgPool::connect(&connection_string)
            .await
            .expect("Failed to connect to database");
        Self { pool }
    }

    pub async fn run_migrations(&self) {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .expect("Failed to run migrations");
    }
}

/// Catalog loader: a bounded random draw from the question bank.
pub trait LoadQuestions {
    async fn load_questions(&self) -> Result<Vec<Question>, StoreError>;
}

/// Durable per-user "next question" index.
pub trait QuizProgress {
    async fn question_index(&self, user_id: i64) -> Result<u32, StoreError>;

    async fn set_question_index(&self, user_id: i64, index: u32) -> Result<(), StoreError>;
}

/// Durable per-user aggregates and the leaderboard view over them.
pub trait PlayerStats {
    async fn save_result(
        &self,
        user_id: i64,
        username: &str,
        score: u32,
    ) -> Result<(), StoreError>;

    async fn player_stats(&self, user_id: i64) -> Result<Option<UserStats>, StoreError>;

    async fn top_players(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    question_id: i64,
    question: String,
    options: String,
    correct_option: i32,
}

impl LoadQuestions for Connection {
    async fn load_questions(&self) -> Result<Vec<Question>, StoreError> {
        let all_ids: Vec<i64> = sqlx::query_scalar("SELECT question_id FROM quiz_data")
            .fetch_all(&self.pool)
            .await?;

        if all_ids.is_empty() {
            return Ok(Vec::new());
        }

        let selected = sample_question_ids(all_ids);
        log::debug!("Selected question ids {:?}", selected);

        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT question_id, question, options, correct_option FROM quiz_data WHERE question_id = ANY($1)",
        )
        .bind(&selected)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                Question::from_stored(
                    row.question_id,
                    row.question,
                    &row.options,
                    row.correct_option as i64,
                )
            })
            .collect())
    }
}

fn sample_question_ids(ids: Vec<i64>) -> Vec<i64> {
    if ids.len() <= SESSION_SIZE {
        return ids;
    }

    let mut rng = rand::thread_rng();
    ids.choose_multiple(&mut rng, SESSION_SIZE).copied().collect()
}

impl QuizProgress for Connection {
    async fn question_index(&self, user_id: i64) -> Result<u32, StoreError> {
        let index: Option<i32> =
            sqlx::query_scalar("SELECT question_index FROM quiz_state WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(index.unwrap_or(0) as u32)
    }

    async fn set_question_index(&self, user_id: i64, index: u32) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quiz_state (user_id, question_index) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET question_index = EXCLUDED.question_index",
        )
        .bind(user_id)
        .bind(index as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl PlayerStats for Connection {
    async fn save_result(
        &self,
        user_id: i64,
        username: &str,
        score: u32,
    ) -> Result<(), StoreError> {
        log::debug!("Saving result {} for user {}", score, user_id);

        // Single statement so the total_played/all_score increments are
        // applied exactly once even under concurrent completions.
        sqlx::query(
            "INSERT INTO user_stats (user_id, username, last_score, total_played, all_score, last_played) \
             VALUES ($1, $2, $3, 1, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                username = EXCLUDED.username, \
                last_score = EXCLUDED.last_score, \
                total_played = user_stats.total_played + 1, \
                all_score = user_stats.all_score + EXCLUDED.last_score, \
                last_played = EXCLUDED.last_played",
        )
        .bind(user_id)
        .bind(username)
        .bind(score as i32)
        .bind(score as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn player_stats(&self, user_id: i64) -> Result<Option<UserStats>, StoreError> {
        let stats: Option<UserStats> = sqlx::query_as(
            "SELECT last_score, total_played, last_played, all_score FROM user_stats WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn top_players(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let entries: Vec<LeaderboardEntry> = sqlx::query_as(
            "SELECT username, last_score, total_played, last_played, all_score \
             FROM user_stats ORDER BY all_score DESC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
