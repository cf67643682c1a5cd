//! Editor-session context: one row per development session, plus insights
//! captured while working.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::Serialize;

use crate::error::{EngramError, Result};
use crate::store::{self, SqlitePool, SqlitePooledConn};

mod schema;
use schema::{project_insights, project_sessions};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/projects");

#[derive(Debug, Clone, Serialize)]
pub struct InsightItem {
    pub id: String,
    pub insight_type: Option<String>,
    pub content: String,
    pub related_files: Option<Vec<String>>,
    pub importance_level: i32,
    pub source_conversation_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Queryable)]
struct InsightRow {
    id: String,
    insight_type: Option<String>,
    content: String,
    related_files: Option<String>,
    importance_level: i32,
    source_conversation_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = project_sessions)]
struct NewProjectSession<'a> {
    id: &'a str,
    started_at: i64,
    workspace_path: &'a str,
    active_files: Option<&'a str>,
    git_branch: Option<&'a str>,
    summary: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = project_insights)]
struct NewInsight<'a> {
    id: &'a str,
    insight_type: Option<&'a str>,
    content: &'a str,
    related_files: Option<&'a str>,
    importance_level: i32,
    source_conversation_id: Option<&'a str>,
    created_at: i64,
    updated_at: i64,
}

pub struct ProjectStore {
    pool: SqlitePool,
}

impl ProjectStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = store::open_pool(sqlite_path.as_ref(), MIGRATIONS).await?;
        Ok(Self { pool })
    }

    pub async fn save_session(
        &self,
        workspace_path: &str,
        active_files: Option<&[String]>,
        git_branch: Option<&str>,
        summary: Option<&str>,
    ) -> Result<String> {
        let files_json = match active_files {
            Some(files) => Some(serde_json::to_string(files)?),
            None => None,
        };
        let id = store::new_id();
        let mut conn = self.conn().await?;
        diesel::insert_into(project_sessions::table)
            .values(&NewProjectSession {
                id: &id,
                started_at: store::now_ts(),
                workspace_path,
                active_files: files_json.as_deref(),
                git_branch,
                summary,
            })
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(id)
    }

    pub async fn store_insight(
        &self,
        content: &str,
        insight_type: Option<&str>,
        related_files: Option<&[String]>,
        importance_level: i32,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        let files_json = match related_files {
            Some(files) => Some(serde_json::to_string(files)?),
            None => None,
        };
        let id = store::new_id();
        let now = store::now_ts();
        let mut conn = self.conn().await?;
        diesel::insert_into(project_insights::table)
            .values(&NewInsight {
                id: &id,
                insight_type,
                content,
                related_files: files_json.as_deref(),
                importance_level,
                source_conversation_id,
                created_at: now,
                updated_at: now,
            })
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(id)
    }

    pub async fn recent_insights(
        &self,
        limit: usize,
        insight_type: Option<&str>,
    ) -> Result<Vec<InsightItem>> {
        let mut conn = self.conn().await?;
        let mut query = project_insights::table
            .order(project_insights::created_at.desc())
            .into_boxed();
        if let Some(value) = insight_type {
            query = query.filter(project_insights::insight_type.eq(value));
        }
        let rows: Vec<InsightRow> = query
            .limit(limit.max(1) as i64)
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        rows.into_iter().map(map_insight).collect()
    }

    pub async fn session_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        project_sessions::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    pub async fn insight_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        project_insights::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        store::checkout(&self.pool).await
    }
}

fn map_insight(row: InsightRow) -> Result<InsightItem> {
    let related_files = match row.related_files {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    };
    Ok(InsightItem {
        id: row.id,
        insight_type: row.insight_type,
        content: row.content,
        related_files,
        importance_level: row.importance_level,
        source_conversation_id: row.source_conversation_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
