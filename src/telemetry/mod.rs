//! Tool-invocation telemetry: an append-only call log plus per-day usage
//! counters. The daily counter update is a single upsert, so
//! `call_count == success_count + failure_count` holds even when calls for
//! the same tool land concurrently.

use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::Serialize;
use serde_json::Value;

use crate::error::{EngramError, Result};
use crate::store::{self, SqlitePool, SqlitePooledConn};

mod schema;
use schema::{tool_calls, tool_usage_stats};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/telemetry");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failure,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Failure => "failure",
        }
    }
}

/// One call about to be recorded.
pub struct ToolCallEntry<'a> {
    pub tool_name: &'a str,
    pub parameters: &'a Value,
    pub result: Option<&'a Value>,
    pub status: CallStatus,
    pub execution_time_ms: Option<i64>,
    pub error_message: Option<&'a str>,
    pub client_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub timestamp: i64,
    pub client_id: Option<String>,
    pub tool_name: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub status: String,
    pub execution_time_ms: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct UsageStat {
    pub tool_name: String,
    pub date: String,
    pub call_count: i32,
    pub success_count: i32,
    pub failure_count: i32,
}

#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct ToolStatusCount {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub tool_name: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub status: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct ToolTotal {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub tool_name: String,
    #[diesel(sql_type = BigInt)]
    pub total_calls: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub recent_calls: Vec<ToolStatusCount>,
    pub daily_stats: Vec<UsageStat>,
    pub most_used_tools: Vec<ToolTotal>,
    pub period_days: i64,
}

#[derive(Queryable)]
struct ToolCallRow {
    id: String,
    timestamp: i64,
    client_id: Option<String>,
    tool_name: String,
    parameters: String,
    result: Option<String>,
    status: String,
    execution_time_ms: Option<i64>,
    error_message: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = tool_calls)]
struct NewToolCall<'a> {
    id: &'a str,
    timestamp: i64,
    client_id: Option<&'a str>,
    tool_name: &'a str,
    parameters: &'a str,
    result: Option<&'a str>,
    status: &'a str,
    execution_time_ms: Option<i64>,
    error_message: Option<&'a str>,
}

pub struct ToolCallStore {
    pool: SqlitePool,
}

impl ToolCallStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = store::open_pool(sqlite_path.as_ref(), MIGRATIONS).await?;
        Ok(Self { pool })
    }

    /// Append exactly one call record and fold it into today's counters.
    /// Records are never updated or deleted afterwards.
    pub async fn log_tool_call(&self, entry: ToolCallEntry<'_>) -> Result<String> {
        let parameters = serde_json::to_string(entry.parameters)?;
        let result = match entry.result {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        let id = store::new_id();

        let mut conn = self.conn().await?;
        diesel::insert_into(tool_calls::table)
            .values(&NewToolCall {
                id: &id,
                timestamp: store::now_ts(),
                client_id: entry.client_id,
                tool_name: entry.tool_name,
                parameters: &parameters,
                result: result.as_deref(),
                status: entry.status.as_str(),
                execution_time_ms: entry.execution_time_ms,
                error_message: entry.error_message,
            })
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;

        let (success_inc, failure_inc) = match entry.status {
            CallStatus::Success => (1, 0),
            CallStatus::Failure => (0, 1),
        };
        diesel::insert_into(tool_usage_stats::table)
            .values((
                tool_usage_stats::tool_name.eq(entry.tool_name),
                tool_usage_stats::date.eq(store::today()),
                tool_usage_stats::call_count.eq(1),
                tool_usage_stats::success_count.eq(success_inc),
                tool_usage_stats::failure_count.eq(failure_inc),
            ))
            .on_conflict((tool_usage_stats::tool_name, tool_usage_stats::date))
            .do_update()
            .set((
                tool_usage_stats::call_count.eq(tool_usage_stats::call_count + 1),
                tool_usage_stats::success_count.eq(tool_usage_stats::success_count + success_inc),
                tool_usage_stats::failure_count.eq(tool_usage_stats::failure_count + failure_inc),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;

        Ok(id)
    }

    /// Usage over the trailing `days`: per-(tool, status) counts, the raw
    /// daily counter rows, and the ten busiest tools, each busiest-first.
    pub async fn usage_summary(&self, days: i64) -> Result<UsageSummary> {
        let cutoff = store::now_ts() - days * 86_400;
        let mut conn = self.conn().await?;

        let recent_calls: Vec<ToolStatusCount> = diesel::sql_query(
            "SELECT tool_name, status, COUNT(*) as count FROM tool_calls \
             WHERE timestamp >= ?1 GROUP BY tool_name, status ORDER BY count DESC",
        )
        .bind::<BigInt, _>(cutoff)
        .load(&mut conn)
        .await
        .map_err(|e| EngramError::Storage(e.to_string()))?;

        let daily_stats: Vec<UsageStat> = tool_usage_stats::table
            .filter(tool_usage_stats::date.ge(store::day_floor(days)))
            .order((
                tool_usage_stats::date.desc(),
                tool_usage_stats::call_count.desc(),
            ))
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;

        let most_used_tools: Vec<ToolTotal> = diesel::sql_query(
            "SELECT tool_name, COUNT(*) as total_calls FROM tool_calls \
             WHERE timestamp >= ?1 GROUP BY tool_name ORDER BY total_calls DESC LIMIT 10",
        )
        .bind::<BigInt, _>(cutoff)
        .load(&mut conn)
        .await
        .map_err(|e| EngramError::Storage(e.to_string()))?;

        Ok(UsageSummary {
            recent_calls,
            daily_stats,
            most_used_tools,
            period_days: days,
        })
    }

    /// Most recent call records, newest first, optionally narrowed to one
    /// tool.
    pub async fn call_history(
        &self,
        tool_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ToolCallRecord>> {
        let mut conn = self.conn().await?;
        let mut query = tool_calls::table
            .order(tool_calls::timestamp.desc())
            .into_boxed();
        if let Some(name) = tool_name {
            query = query.filter(tool_calls::tool_name.eq(name));
        }
        let rows: Vec<ToolCallRow> = query
            .limit(limit.max(1) as i64)
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        rows.into_iter().map(map_record).collect()
    }

    pub async fn call_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        tool_calls::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        store::checkout(&self.pool).await
    }
}

fn map_record(row: ToolCallRow) -> Result<ToolCallRecord> {
    let parameters = serde_json::from_str(&row.parameters)?;
    let result = match row.result {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    };
    Ok(ToolCallRecord {
        id: row.id,
        timestamp: row.timestamp,
        client_id: row.client_id,
        tool_name: row.tool_name,
        parameters,
        result,
        status: row.status,
        execution_time_ms: row.execution_time_ms,
        error_message: row.error_message,
    })
}
