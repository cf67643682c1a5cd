//! Dialogue turn storage: sessions group conversations, conversations group
//! messages. Replayed turns are detected by content within a recency window
//! rather than rejected by the schema.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::Serialize;
use serde_json::Value;

use crate::error::{EngramError, Result};
use crate::store::{self, SqlitePool, SqlitePooledConn};

mod schema;
use schema::{conversations, messages, sessions};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/conversations");

/// Messages with identical content, role, and session inside this window
/// count as replays of the same turn.
const DEDUP_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub message_id: String,
    /// Absent when the write was deduplicated.
    pub conversation_id: Option<String>,
    pub session_id: String,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageItem {
    pub id: String,
    pub conversation_id: String,
    pub session_id: String,
    pub timestamp: i64,
    pub role: String,
    pub content: String,
    pub metadata: Option<Value>,
}

#[derive(Queryable)]
struct MessageRow {
    id: String,
    conversation_id: String,
    timestamp: i64,
    role: String,
    content: String,
    metadata: Option<String>,
    session_id: String,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
struct NewSession<'a> {
    id: &'a str,
    started_at: i64,
    context: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = conversations)]
struct NewConversation<'a> {
    id: &'a str,
    session_id: &'a str,
    started_at: i64,
    title: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessage<'a> {
    id: &'a str,
    conversation_id: &'a str,
    timestamp: i64,
    role: &'a str,
    content: &'a str,
    metadata: Option<&'a str>,
}

pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = store::open_pool(sqlite_path.as_ref(), MIGRATIONS).await?;
        Ok(Self { pool })
    }

    /// Store one dialogue turn, auto-creating the session and conversation
    /// when the caller does not name them. Returns the existing message id
    /// with `duplicate = true` when the same turn was stored in this session
    /// within the last hour.
    pub async fn store_message(
        &self,
        content: &str,
        role: &str,
        session_id: Option<&str>,
        conversation_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<StoredMessage> {
        self.store_message_at(
            content,
            role,
            session_id,
            conversation_id,
            metadata,
            store::now_ts(),
        )
        .await
    }

    async fn store_message_at(
        &self,
        content: &str,
        role: &str,
        session_id: Option<&str>,
        conversation_id: Option<&str>,
        metadata: Option<&Value>,
        now: i64,
    ) -> Result<StoredMessage> {
        let metadata = match metadata {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        let mut conn = self.conn().await?;
        conn.transaction::<_, EngramError, _>(|conn| {
            async move {
                if let Some(session_id) = session_id {
                    let existing: Option<String> = messages::table
                        .inner_join(conversations::table)
                        .filter(conversations::session_id.eq(session_id))
                        .filter(messages::role.eq(role))
                        .filter(messages::content.eq(content))
                        .filter(messages::timestamp.gt(now - DEDUP_WINDOW_SECS))
                        .select(messages::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if let Some(message_id) = existing {
                        return Ok(StoredMessage {
                            message_id,
                            conversation_id: None,
                            session_id: session_id.to_string(),
                            duplicate: true,
                        });
                    }
                }

                // Adopt caller-named sessions and conversations, creating the
                // row when it does not exist yet so the reference constraints
                // hold.
                let session_id = match session_id {
                    Some(id) => {
                        let known: Option<String> = sessions::table
                            .filter(sessions::id.eq(id))
                            .select(sessions::id)
                            .first(conn)
                            .await
                            .optional()?;
                        if known.is_none() {
                            diesel::insert_into(sessions::table)
                                .values(&NewSession {
                                    id,
                                    started_at: now,
                                    context: None,
                                })
                                .execute(conn)
                                .await?;
                        }
                        id.to_string()
                    }
                    None => {
                        let id = store::new_id();
                        diesel::insert_into(sessions::table)
                            .values(&NewSession {
                                id: &id,
                                started_at: now,
                                context: Some("auto-created"),
                            })
                            .execute(conn)
                            .await?;
                        id
                    }
                };

                let conversation_id = match conversation_id {
                    Some(id) => {
                        let known: Option<String> = conversations::table
                            .filter(conversations::id.eq(id))
                            .select(conversations::id)
                            .first(conn)
                            .await
                            .optional()?;
                        if known.is_none() {
                            diesel::insert_into(conversations::table)
                                .values(&NewConversation {
                                    id,
                                    session_id: &session_id,
                                    started_at: now,
                                    title: None,
                                })
                                .execute(conn)
                                .await?;
                        }
                        id.to_string()
                    }
                    None => {
                        let id = store::new_id();
                        diesel::insert_into(conversations::table)
                            .values(&NewConversation {
                                id: &id,
                                session_id: &session_id,
                                started_at: now,
                                title: None,
                            })
                            .execute(conn)
                            .await?;
                        id
                    }
                };

                let message_id = store::new_id();
                diesel::insert_into(messages::table)
                    .values(&NewMessage {
                        id: &message_id,
                        conversation_id: &conversation_id,
                        timestamp: now,
                        role,
                        content,
                        metadata: metadata.as_deref(),
                    })
                    .execute(conn)
                    .await?;

                Ok(StoredMessage {
                    message_id,
                    conversation_id: Some(conversation_id),
                    session_id,
                    duplicate: false,
                })
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn recent_messages(
        &self,
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<MessageItem>> {
        let mut conn = self.conn().await?;
        let mut query = messages::table
            .inner_join(conversations::table)
            .select((
                messages::id,
                messages::conversation_id,
                messages::timestamp,
                messages::role,
                messages::content,
                messages::metadata,
                conversations::session_id,
            ))
            .order(messages::timestamp.desc())
            .into_boxed();

        if let Some(session_id) = session_id {
            query = query.filter(conversations::session_id.eq(session_id));
        }
        if limit > 0 {
            query = query.limit(limit as i64);
        }

        let rows: Vec<MessageRow> = query
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        rows.into_iter().map(map_row).collect()
    }

    pub async fn message_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        messages::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    pub async fn session_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        sessions::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        store::checkout(&self.pool).await
    }
}

fn map_row(row: MessageRow) -> Result<MessageItem> {
    let metadata = match row.metadata {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    };
    Ok(MessageItem {
        id: row.id,
        conversation_id: row.conversation_id,
        session_id: row.session_id,
        timestamp: row.timestamp,
        role: row.role,
        content: row.content,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::now_ts;

    async fn temp_store() -> (tempfile::TempDir, ConversationStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.db");
        let store = ConversationStore::new(path.to_string_lossy().as_ref())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn replay_outside_window_is_not_a_duplicate() {
        let (_dir, store) = temp_store().await;
        let now = now_ts();

        let first = store
            .store_message_at("hi", "user", None, None, None, now - 2 * DEDUP_WINDOW_SECS)
            .await
            .unwrap();
        assert!(!first.duplicate);

        let second = store
            .store_message_at(
                "hi",
                "user",
                Some(&first.session_id),
                None,
                None,
                now,
            )
            .await
            .unwrap();
        assert!(!second.duplicate);
        assert_ne!(first.message_id, second.message_id);

        let third = store
            .store_message("hi", "user", Some(&first.session_id), None, None)
            .await
            .unwrap();
        assert!(third.duplicate);
        assert_eq!(third.message_id, second.message_id);
        assert!(third.conversation_id.is_none());
    }
}
