//! Curated long-term memories. A memory's identity is the triple
//! (content, type, source conversation); inserting the same triple twice
//! returns the original id instead of a second row.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::Serialize;

use crate::error::{EngramError, Result};
use crate::store::{self, SqlitePool, SqlitePooledConn};

mod schema;
use schema::memories;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/memories");

pub const DEFAULT_IMPORTANCE: i32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub memory_type: Option<String>,
    pub importance_level: i32,
    pub tags: Option<Vec<String>>,
    pub source_conversation_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Queryable)]
struct MemoryRow {
    id: String,
    content: String,
    memory_type: Option<String>,
    importance_level: i32,
    tags: Option<String>,
    source_conversation_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = memories)]
struct NewMemory<'a> {
    id: &'a str,
    content: &'a str,
    memory_type: Option<&'a str>,
    importance_level: i32,
    tags: Option<&'a str>,
    source_conversation_id: Option<&'a str>,
    created_at: i64,
    updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = memories)]
struct MemoryChanges<'a> {
    content: Option<&'a str>,
    importance_level: Option<i32>,
    tags: Option<&'a str>,
    updated_at: i64,
}

pub struct MemoryStore {
    pool: SqlitePool,
}

impl MemoryStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = store::open_pool(sqlite_path.as_ref(), MIGRATIONS).await?;
        Ok(Self { pool })
    }

    /// Create a memory, or return the id of the identical one already
    /// stored. The conditional insert rides on the unique identity index,
    /// so concurrent writers cannot double-insert.
    pub async fn create_memory(
        &self,
        content: &str,
        memory_type: Option<&str>,
        importance_level: i32,
        tags: Option<&[String]>,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        let tags_json = match tags {
            Some(tags) => Some(serde_json::to_string(tags)?),
            None => None,
        };
        let id = store::new_id();
        let now = store::now_ts();

        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(memories::table)
            .values(&NewMemory {
                id: &id,
                content,
                memory_type,
                importance_level,
                tags: tags_json.as_deref(),
                source_conversation_id,
                created_at: now,
                updated_at: now,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        if inserted > 0 {
            return Ok(id);
        }

        let mut query = memories::table
            .filter(memories::content.eq(content))
            .into_boxed();
        query = match memory_type {
            Some(value) => query.filter(memories::memory_type.eq(value)),
            None => query.filter(memories::memory_type.is_null()),
        };
        query = match source_conversation_id {
            Some(value) => query.filter(memories::source_conversation_id.eq(value)),
            None => query.filter(memories::source_conversation_id.is_null()),
        };
        query
            .select(memories::id)
            .first(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    /// Update fields on an existing memory and bump its updated stamp.
    /// Returns false when the id is unknown.
    pub async fn update_memory(
        &self,
        id: &str,
        content: Option<&str>,
        importance_level: Option<i32>,
        tags: Option<&[String]>,
    ) -> Result<bool> {
        let tags_json = match tags {
            Some(tags) => Some(serde_json::to_string(tags)?),
            None => None,
        };
        let mut conn = self.conn().await?;
        let updated = diesel::update(memories::table.filter(memories::id.eq(id)))
            .set(&MemoryChanges {
                content,
                importance_level,
                tags: tags_json.as_deref(),
                updated_at: store::now_ts(),
            })
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(updated > 0)
    }

    /// Case-insensitive substring search over memory content, most important
    /// first, newest breaking ties.
    pub async fn search_memories(
        &self,
        query: &str,
        limit: usize,
        memory_type: Option<&str>,
        min_importance: Option<i32>,
        max_importance: Option<i32>,
    ) -> Result<Vec<MemoryItem>> {
        let pattern = format!("%{}%", query.trim());
        let mut select = memories::table
            .filter(memories::content.like(pattern))
            .into_boxed();
        if let Some(value) = memory_type {
            select = select.filter(memories::memory_type.eq(value));
        }
        if let Some(min) = min_importance {
            select = select.filter(memories::importance_level.ge(min));
        }
        if let Some(max) = max_importance {
            select = select.filter(memories::importance_level.le(max));
        }

        let mut conn = self.conn().await?;
        let rows: Vec<MemoryRow> = select
            .order((
                memories::importance_level.desc(),
                memories::created_at.desc(),
            ))
            .limit(limit.max(1) as i64)
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        rows.into_iter().map(map_row).collect()
    }

    pub async fn memory_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        memories::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    /// Memories at importance 7 or above, surfaced in the health summary.
    pub async fn high_importance_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        memories::table
            .filter(memories::importance_level.ge(7))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        store::checkout(&self.pool).await
    }
}

fn map_row(row: MemoryRow) -> Result<MemoryItem> {
    let tags = match row.tags {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    };
    Ok(MemoryItem {
        id: row.id,
        content: row.content,
        memory_type: row.memory_type,
        importance_level: row.importance_level,
        tags,
        source_conversation_id: row.source_conversation_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
