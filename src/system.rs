//! The coordinator: one instance of each domain store under a shared data
//! directory, with one forwarding method per supported operation. Writes in
//! different stores are independent; there is no cross-store transaction.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::StorageConfig;
use crate::conversations::{ConversationStore, MessageItem, StoredMessage};
use crate::error::Result;
use crate::memories::{MemoryItem, MemoryStore};
use crate::projects::{InsightItem, ProjectStore};
use crate::schedule::{AppointmentItem, ReminderItem, ScheduleStore};
use crate::store;
use crate::telemetry::{ToolCallEntry, ToolCallRecord, ToolCallStore, UsageSummary};

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOverview {
    pub appointments: Vec<AppointmentItem>,
    pub active_reminders: Vec<ReminderItem>,
    pub period_days: i64,
}

pub struct MemorySystem {
    storage: StorageConfig,
    conversations: ConversationStore,
    memories: MemoryStore,
    schedule: ScheduleStore,
    projects: ProjectStore,
    telemetry: ToolCallStore,
}

impl MemorySystem {
    pub async fn open(storage: StorageConfig) -> Result<Self> {
        let conversations = ConversationStore::new(storage.conversations()).await?;
        let memories = MemoryStore::new(storage.memories()).await?;
        let schedule = ScheduleStore::new(storage.schedule()).await?;
        let projects = ProjectStore::new(storage.projects()).await?;
        let telemetry = ToolCallStore::new(storage.telemetry()).await?;
        Ok(Self {
            storage,
            conversations,
            memories,
            schedule,
            projects,
            telemetry,
        })
    }

    pub async fn store_conversation(
        &self,
        content: &str,
        role: &str,
        session_id: Option<&str>,
        conversation_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<StoredMessage> {
        self.conversations
            .store_message(content, role, session_id, conversation_id, metadata)
            .await
    }

    pub async fn recent_context(
        &self,
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<MessageItem>> {
        self.conversations.recent_messages(limit, session_id).await
    }

    pub async fn create_memory(
        &self,
        content: &str,
        memory_type: Option<&str>,
        importance_level: i32,
        tags: Option<&[String]>,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        self.memories
            .create_memory(
                content,
                memory_type,
                importance_level,
                tags,
                source_conversation_id,
            )
            .await
    }

    pub async fn update_memory(
        &self,
        id: &str,
        content: Option<&str>,
        importance_level: Option<i32>,
        tags: Option<&[String]>,
    ) -> Result<bool> {
        self.memories
            .update_memory(id, content, importance_level, tags)
            .await
    }

    pub async fn search_memories(
        &self,
        query: &str,
        limit: usize,
        memory_type: Option<&str>,
        min_importance: Option<i32>,
        max_importance: Option<i32>,
    ) -> Result<Vec<MemoryItem>> {
        self.memories
            .search_memories(query, limit, memory_type, min_importance, max_importance)
            .await
    }

    pub async fn create_appointment(
        &self,
        title: &str,
        scheduled_at: &str,
        description: Option<&str>,
        location: Option<&str>,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        self.schedule
            .create_appointment(
                title,
                scheduled_at,
                description,
                location,
                source_conversation_id,
            )
            .await
    }

    pub async fn create_reminder(
        &self,
        content: &str,
        due_at: &str,
        priority_level: i32,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        self.schedule
            .create_reminder(content, due_at, priority_level, source_conversation_id)
            .await
    }

    pub async fn complete_reminder(&self, id: &str) -> Result<bool> {
        self.schedule.complete_reminder(id).await
    }

    pub async fn upcoming_schedule(&self, days_ahead: i64) -> Result<ScheduleOverview> {
        let appointments = self.schedule.upcoming_appointments(days_ahead).await?;
        let active_reminders = self.schedule.active_reminders().await?;
        Ok(ScheduleOverview {
            appointments,
            active_reminders,
            period_days: days_ahead,
        })
    }

    pub async fn save_development_session(
        &self,
        workspace_path: &str,
        active_files: Option<&[String]>,
        git_branch: Option<&str>,
        summary: Option<&str>,
    ) -> Result<String> {
        self.projects
            .save_session(workspace_path, active_files, git_branch, summary)
            .await
    }

    pub async fn store_project_insight(
        &self,
        content: &str,
        insight_type: Option<&str>,
        related_files: Option<&[String]>,
        importance_level: i32,
        source_conversation_id: Option<&str>,
    ) -> Result<String> {
        self.projects
            .store_insight(
                content,
                insight_type,
                related_files,
                importance_level,
                source_conversation_id,
            )
            .await
    }

    pub async fn recent_insights(
        &self,
        limit: usize,
        insight_type: Option<&str>,
    ) -> Result<Vec<InsightItem>> {
        self.projects.recent_insights(limit, insight_type).await
    }

    pub async fn log_tool_call(&self, entry: ToolCallEntry<'_>) -> Result<String> {
        self.telemetry.log_tool_call(entry).await
    }

    pub async fn tool_usage_summary(&self, days: i64) -> Result<UsageSummary> {
        self.telemetry.usage_summary(days).await
    }

    pub async fn tool_call_history(
        &self,
        tool_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ToolCallRecord>> {
        self.telemetry.call_history(tool_name, limit).await
    }

    /// Per-database row counts and paths, the shape clients poll to see
    /// whether the stores are reachable.
    pub async fn system_health(&self) -> Result<Value> {
        Ok(json!({
            "status": "healthy",
            "timestamp": store::datetime_now(),
            "databases": {
                "conversations": {
                    "status": "healthy",
                    "message_count": self.conversations.message_count().await?,
                    "session_count": self.conversations.session_count().await?,
                    "path": self.storage.conversations(),
                },
                "memories": {
                    "status": "healthy",
                    "memory_count": self.memories.memory_count().await?,
                    "high_importance_count": self.memories.high_importance_count().await?,
                    "path": self.storage.memories(),
                },
                "schedule": {
                    "status": "healthy",
                    "appointment_count": self.schedule.appointment_count().await?,
                    "reminder_count": self.schedule.reminder_count().await?,
                    "path": self.storage.schedule(),
                },
                "projects": {
                    "status": "healthy",
                    "session_count": self.projects.session_count().await?,
                    "insight_count": self.projects.insight_count().await?,
                    "path": self.storage.projects(),
                },
                "tool_calls": {
                    "status": "healthy",
                    "total_tool_calls": self.telemetry.call_count().await?,
                    "path": self.storage.telemetry(),
                },
            },
        }))
    }
}
