use chrono::{DateTime, Utc};
use sqlx::{
    Row, Sqlite,
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::env;

use crate::error::{AppError, AppResult};
use crate::models::{Poll, Profile, Role, Vote};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new() -> AppResult<Self> {
        let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:pollbox.db".to_string());
        Self::connect(&db_url).await
    }

    pub async fn connect(db_url: &str) -> AppResult<Self> {
        // In-memory databases exist as soon as they are opened.
        if !db_url.contains("mode=memory") && !db_url.contains(":memory:") {
            if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
                Sqlite::create_database(db_url)
                    .await
                    .map_err(|e| AppError::Database(format!("failed to create database: {}", e)))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Options live in a JSON array column so the stored order is the
        // display order.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                options TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (created_by) REFERENCES profiles(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One vote per (poll, user) is enforced here, not in handler code.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                poll_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                selected_option TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (poll_id, user_id),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES profiles(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create_profile(&self, profile: &Profile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, role, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(&profile.password_hash)
        .bind(profile.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_profile(&self, profile_id: &str) -> AppResult<Profile> {
        let row = sqlx::query(
            r#"
            SELECT id, email, role, password_hash, created_at
            FROM profiles
            WHERE id = ?
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("profile not found".to_string()))?;

        profile_from_row(&row)
    }

    pub async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, role, password_hash, created_at
            FROM profiles
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    pub async fn create_poll(&self, poll: &Poll) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO polls (id, title, description, options, start_time, end_time, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(serde_json::to_string(&poll.options)?)
        .bind(poll.start_time.to_rfc3339())
        .bind(poll.end_time.to_rfc3339())
        .bind(&poll.created_by)
        .bind(poll.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_poll(&self, poll_id: &str) -> AppResult<Poll> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, options, start_time, end_time, created_by, created_at
            FROM polls
            WHERE id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("poll not found".to_string()))?;

        poll_from_row(&row)
    }

    pub async fn list_polls(&self) -> AppResult<Vec<Poll>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, options, start_time, end_time, created_by, created_at
            FROM polls
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(poll_from_row).collect()
    }

    pub async fn get_poll_votes(&self, poll_id: &str) -> AppResult<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, poll_id, user_id, selected_option, created_at
            FROM votes
            WHERE poll_id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    pub async fn get_user_vote(&self, poll_id: &str, user_id: &str) -> AppResult<Option<Vote>> {
        let row = sqlx::query(
            r#"
            SELECT id, poll_id, user_id, selected_option, created_at
            FROM votes
            WHERE poll_id = ? AND user_id = ?
            "#,
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(vote_from_row).transpose()
    }

    /// Insert a vote. A second vote by the same user on the same poll trips
    /// the unique index and surfaces as a conflict, so concurrent
    /// double-submits cannot both land.
    pub async fn insert_vote(&self, vote: &Vote) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO votes (id, poll_id, user_id, selected_option, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.poll_id)
        .bind(&vote.user_id)
        .bind(&vote.selected_option)
        .bind(vote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "a vote has already been recorded for this poll".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_timestamp(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("failed to parse {}: {}", field, e)))
}

fn parse_role(value: &str) -> AppResult<Role> {
    match value {
        "admin" => Ok(Role::Admin),
        "voter" => Ok(Role::Voter),
        other => Err(AppError::Database(format!("unknown role: {}", other))),
    }
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Profile> {
    Ok(Profile {
        id: row.get::<String, _>("id"),
        email: row.get::<String, _>("email"),
        role: parse_role(&row.get::<String, _>("role"))?,
        password_hash: row.get::<String, _>("password_hash"),
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
    })
}

fn poll_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Poll> {
    let options: Vec<String> = serde_json::from_str(&row.get::<String, _>("options"))
        .map_err(|e| AppError::Database(format!("failed to parse options: {}", e)))?;

    Ok(Poll {
        id: row.get::<String, _>("id"),
        title: row.get::<String, _>("title"),
        description: row.get::<Option<String>, _>("description"),
        options,
        start_time: parse_timestamp("start_time", &row.get::<String, _>("start_time"))?,
        end_time: parse_timestamp("end_time", &row.get::<String, _>("end_time"))?,
        created_by: row.get::<String, _>("created_by"),
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
    })
}

fn vote_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Vote> {
    Ok(Vote {
        id: row.get::<String, _>("id"),
        poll_id: row.get::<String, _>("poll_id"),
        user_id: row.get::<String, _>("user_id"),
        selected_option: row.get::<String, _>("selected_option"),
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
    })
}
