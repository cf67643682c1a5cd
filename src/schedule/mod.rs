//! Appointments and reminders. Schedule datetimes are caller-supplied
//! ISO-8601 text; the `YYYY-MM-DDTHH:MM:SS` shape orders correctly under
//! plain string comparison, which is what the range queries rely on.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use serde::Serialize;

use crate::error::{EngramError, Result};
use crate::store::{self, SqlitePool, SqlitePooledConn};

mod schema;
use schema::{appointments, reminders};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/schedule");

pub const DEFAULT_PRIORITY: i32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentItem {
    pub id: String,
    pub title: String,
    pub scheduled_at: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub source_conversation_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderItem {
    pub id: String,
    pub content: String,
    pub due_at: String,
    pub priority_level: i32,
    pub completed: bool,
    pub source_conversation_id: Option<String>,
    pub created_at: i64,
}

#[derive(Queryable)]
struct AppointmentRow {
    id: String,
    title: String,
    scheduled_at: String,
    description: Option<String>,
    location: Option<String>,
    source_conversation_id: Option<String>,
    created_at: i64,
}

#[derive(Queryable)]
struct ReminderRow {
    id: String,
    content: String,
    due_at: String,
    priority_level: i32,
    completed: bool,
    source_conversation_id: Option<String>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = appointments)]
struct NewAppointment<'a> {
    id: &'a str,
    title: &'a str,
    scheduled_at: &'a str,
    description: Option<&'a str>,
    location: Option<&'a str>,
    source_conversation_id: Option<&'a str>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = reminders)]
struct NewReminder<'a> {
    id: &'a str,
    content: &'a str,
    due_at: &'a str,
    priority_level: i32,
    completed: bool,
    source_conversation_id: Option<&'a str>,
    created_at: i64,
}

pub struct ScheduleStore {
    pool: SqlitePool,
}

impl ScheduleStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = store::open_pool(sqlite_path.as_ref(), MIGRATIONS).await?;
        Ok(Self { pool })
    }

    /// Create an appointment, or return the id of the identical one already
    /// on the books (same title, datetime, location, and source).
    pub async fn create_appointment(
        &self,
        title: &str,
        scheduled_at: &str,
        description: Option<&str>,
        location: Option<&str>,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        let id = store::new_id();
        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(appointments::table)
            .values(&NewAppointment {
                id: &id,
                title,
                scheduled_at,
                description,
                location,
                source_conversation_id,
                created_at: store::now_ts(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        if inserted > 0 {
            return Ok(id);
        }

        let mut query = appointments::table
            .filter(appointments::title.eq(title))
            .filter(appointments::scheduled_at.eq(scheduled_at))
            .into_boxed();
        query = match location {
            Some(value) => query.filter(appointments::location.eq(value)),
            None => query.filter(appointments::location.is_null()),
        };
        query = match source_conversation_id {
            Some(value) => query.filter(appointments::source_conversation_id.eq(value)),
            None => query.filter(appointments::source_conversation_id.is_null()),
        };
        query
            .select(appointments::id)
            .first(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    /// Create a reminder, or return the id of the identical one (same
    /// content, due datetime, and source).
    pub async fn create_reminder(
        &self,
        content: &str,
        due_at: &str,
        priority_level: i32,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        let id = store::new_id();
        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(reminders::table)
            .values(&NewReminder {
                id: &id,
                content,
                due_at,
                priority_level,
                completed: false,
                source_conversation_id,
                created_at: store::now_ts(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        if inserted > 0 {
            return Ok(id);
        }

        let mut query = reminders::table
            .filter(reminders::content.eq(content))
            .filter(reminders::due_at.eq(due_at))
            .into_boxed();
        query = match source_conversation_id {
            Some(value) => query.filter(reminders::source_conversation_id.eq(value)),
            None => query.filter(reminders::source_conversation_id.is_null()),
        };
        query
            .select(reminders::id)
            .first(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    /// The only mutation `completed` ever sees. Returns false when the id is
    /// unknown.
    pub async fn complete_reminder(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(reminders::table.filter(reminders::id.eq(id)))
            .set(reminders::completed.eq(true))
            .execute(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(updated > 0)
    }

    /// Appointments scheduled between now and `days_ahead` days out,
    /// soonest first.
    pub async fn upcoming_appointments(&self, days_ahead: i64) -> Result<Vec<AppointmentItem>> {
        let mut conn = self.conn().await?;
        let rows: Vec<AppointmentRow> = appointments::table
            .filter(appointments::scheduled_at.ge(store::datetime_now()))
            .filter(appointments::scheduled_at.le(store::datetime_in_days(days_ahead)))
            .order(appointments::scheduled_at.asc())
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(map_appointment).collect())
    }

    /// All uncompleted reminders, soonest due first.
    pub async fn active_reminders(&self) -> Result<Vec<ReminderItem>> {
        let mut conn = self.conn().await?;
        let rows: Vec<ReminderRow> = reminders::table
            .filter(reminders::completed.eq(false))
            .order(reminders::due_at.asc())
            .load(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(map_reminder).collect())
    }

    pub async fn appointment_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        appointments::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    pub async fn reminder_count(&self) -> Result<i64> {
        let mut conn = self.conn().await?;
        reminders::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| EngramError::Storage(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        store::checkout(&self.pool).await
    }
}

fn map_appointment(row: AppointmentRow) -> AppointmentItem {
    AppointmentItem {
        id: row.id,
        title: row.title,
        scheduled_at: row.scheduled_at,
        description: row.description,
        location: row.location,
        source_conversation_id: row.source_conversation_id,
        created_at: row.created_at,
    }
}

fn map_reminder(row: ReminderRow) -> ReminderItem {
    ReminderItem {
        id: row.id,
        content: row.content,
        due_at: row.due_at,
        priority_level: row.priority_level,
        completed: row.completed,
        source_conversation_id: row.source_conversation_id,
        created_at: row.created_at,
    }
}
