//! Boundary between external callers and the memory system. A request names
//! a tool and carries a parameter map; the response is always a well-formed
//! envelope. Every executed operation is recorded through the telemetry
//! store, success or failure alike; a failure while recording is logged and
//! dropped so it can never displace the primary outcome.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{EngramError, Result};
use crate::memories::DEFAULT_IMPORTANCE;
use crate::schedule::DEFAULT_PRIORITY;
use crate::system::MemorySystem;
use crate::telemetry::{CallStatus, ToolCallEntry};

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse {
    Success { result: Value },
    Error { error: String },
}

/// The closed set of operations this system answers to. Adding a tool means
/// adding a variant, and the compiler walks every match that must learn
/// about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateMemory,
    UpdateMemory,
    SearchMemories,
    StoreConversation,
    GetRecentContext,
    CreateAppointment,
    CreateReminder,
    CompleteReminder,
    GetUpcomingSchedule,
    SaveDevelopmentSession,
    StoreProjectInsight,
    GetToolUsageSummary,
    GetToolCallHistory,
    GetSystemHealth,
}

impl ToolName {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "create_memory" | "store_memory" => Self::CreateMemory,
            "update_memory" => Self::UpdateMemory,
            "search_memories" => Self::SearchMemories,
            "store_conversation" => Self::StoreConversation,
            "get_recent_context" => Self::GetRecentContext,
            "create_appointment" => Self::CreateAppointment,
            "create_reminder" => Self::CreateReminder,
            "complete_reminder" => Self::CompleteReminder,
            "get_upcoming_schedule" => Self::GetUpcomingSchedule,
            "save_development_session" => Self::SaveDevelopmentSession,
            "store_project_insight" => Self::StoreProjectInsight,
            "get_tool_usage_summary" => Self::GetToolUsageSummary,
            "get_tool_call_history" => Self::GetToolCallHistory,
            "get_system_health" => Self::GetSystemHealth,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMemory => "create_memory",
            Self::UpdateMemory => "update_memory",
            Self::SearchMemories => "search_memories",
            Self::StoreConversation => "store_conversation",
            Self::GetRecentContext => "get_recent_context",
            Self::CreateAppointment => "create_appointment",
            Self::CreateReminder => "create_reminder",
            Self::CompleteReminder => "complete_reminder",
            Self::GetUpcomingSchedule => "get_upcoming_schedule",
            Self::SaveDevelopmentSession => "save_development_session",
            Self::StoreProjectInsight => "store_project_insight",
            Self::GetToolUsageSummary => "get_tool_usage_summary",
            Self::GetToolCallHistory => "get_tool_call_history",
            Self::GetSystemHealth => "get_system_health",
        }
    }
}

pub struct Dispatcher {
    system: Arc<MemorySystem>,
}

impl Dispatcher {
    pub fn new(system: Arc<MemorySystem>) -> Self {
        Self { system }
    }

    /// Run one request to completion. Unknown tool names are answered
    /// directly and never reach the telemetry log, since no operation ran.
    pub async fn dispatch(&self, request: &ToolRequest) -> ToolResponse {
        let Some(tool) = ToolName::parse(&request.tool) else {
            return ToolResponse::Error {
                error: format!("Unknown tool: {}", request.tool),
            };
        };

        let started = Instant::now();
        let outcome = self.execute(tool, &request.parameters).await;
        let elapsed_ms = started.elapsed().as_millis() as i64;
        let client_id = request.client_id.as_deref();

        match outcome {
            Ok(result) => {
                self.record(ToolCallEntry {
                    tool_name: tool.as_str(),
                    parameters: &request.parameters,
                    result: Some(&result),
                    status: CallStatus::Success,
                    execution_time_ms: Some(elapsed_ms),
                    error_message: None,
                    client_id,
                })
                .await;
                ToolResponse::Success { result }
            }
            Err(err) => {
                let message = err.to_string();
                self.record(ToolCallEntry {
                    tool_name: tool.as_str(),
                    parameters: &request.parameters,
                    result: None,
                    status: CallStatus::Failure,
                    execution_time_ms: Some(elapsed_ms),
                    error_message: Some(&message),
                    client_id,
                })
                .await;
                ToolResponse::Error { error: message }
            }
        }
    }

    async fn record(&self, entry: ToolCallEntry<'_>) {
        let tool_name = entry.tool_name;
        if let Err(err) = self.system.log_tool_call(entry).await {
            warn!(tool = tool_name, error = %err, "failed to record tool call");
        }
    }

    async fn execute(&self, tool: ToolName, params: &Value) -> Result<Value> {
        match tool {
            ToolName::CreateMemory => {
                let content = optional_str(params, "content")
                    .or_else(|| optional_str(params, "memory_content"))
                    .ok_or_else(|| EngramError::Runtime("Missing content".to_string()))?;
                let tags = string_list(params, "tags");
                let id = self
                    .system
                    .create_memory(
                        content,
                        optional_str(params, "memory_type"),
                        optional_i32(params, "importance_level").unwrap_or(DEFAULT_IMPORTANCE),
                        tags.as_deref(),
                        optional_str(params, "source_conversation_id"),
                    )
                    .await?;
                Ok(json!({ "memory_id": id }))
            }
            ToolName::UpdateMemory => {
                let id = required_str(params, "memory_id")?;
                let tags = string_list(params, "tags");
                let updated = self
                    .system
                    .update_memory(
                        id,
                        optional_str(params, "content"),
                        optional_i32(params, "importance_level"),
                        tags.as_deref(),
                    )
                    .await?;
                Ok(json!({ "memory_id": id, "updated": updated }))
            }
            ToolName::SearchMemories => {
                let query = required_str(params, "query")?;
                let results = self
                    .system
                    .search_memories(
                        query,
                        optional_usize(params, "limit").unwrap_or(10),
                        optional_str(params, "memory_type"),
                        optional_i32(params, "min_importance"),
                        optional_i32(params, "max_importance"),
                    )
                    .await?;
                Ok(json!({
                    "query": query,
                    "count": results.len(),
                    "results": results,
                }))
            }
            ToolName::StoreConversation => {
                let content = optional_str(params, "user_message")
                    .or_else(|| optional_str(params, "content"))
                    .ok_or_else(|| EngramError::Runtime("Missing user_message".to_string()))?;
                let metadata = params.get("metadata").filter(|v| !v.is_null());
                let stored = self
                    .system
                    .store_conversation(
                        content,
                        "user",
                        optional_str(params, "session_id"),
                        None,
                        metadata,
                    )
                    .await?;
                if let Some(reply) = optional_str(params, "assistant_response") {
                    self.system
                        .store_conversation(
                            reply,
                            "assistant",
                            Some(&stored.session_id),
                            stored.conversation_id.as_deref(),
                            metadata,
                        )
                        .await?;
                }
                Ok(serde_json::to_value(stored)?)
            }
            ToolName::GetRecentContext => {
                let messages = self
                    .system
                    .recent_context(
                        optional_usize(params, "limit").unwrap_or(5),
                        optional_str(params, "session_id"),
                    )
                    .await?;
                Ok(json!({
                    "count": messages.len(),
                    "messages": messages,
                }))
            }
            ToolName::CreateAppointment => {
                let id = self
                    .system
                    .create_appointment(
                        required_str(params, "title")?,
                        required_str(params, "scheduled_datetime")?,
                        optional_str(params, "description"),
                        optional_str(params, "location"),
                        optional_str(params, "source_conversation_id"),
                    )
                    .await?;
                Ok(json!({ "appointment_id": id }))
            }
            ToolName::CreateReminder => {
                let id = self
                    .system
                    .create_reminder(
                        required_str(params, "content")?,
                        required_str(params, "due_datetime")?,
                        optional_i32(params, "priority_level").unwrap_or(DEFAULT_PRIORITY),
                        optional_str(params, "source_conversation_id"),
                    )
                    .await?;
                Ok(json!({ "reminder_id": id }))
            }
            ToolName::CompleteReminder => {
                let id = required_str(params, "reminder_id")?;
                let completed = self.system.complete_reminder(id).await?;
                Ok(json!({ "reminder_id": id, "completed": completed }))
            }
            ToolName::GetUpcomingSchedule => {
                let overview = self
                    .system
                    .upcoming_schedule(optional_i64(params, "days_ahead").unwrap_or(7))
                    .await?;
                Ok(serde_json::to_value(overview)?)
            }
            ToolName::SaveDevelopmentSession => {
                let files = string_list(params, "active_files");
                let id = self
                    .system
                    .save_development_session(
                        required_str(params, "workspace_path")?,
                        files.as_deref(),
                        optional_str(params, "git_branch"),
                        optional_str(params, "session_summary"),
                    )
                    .await?;
                Ok(json!({ "session_id": id }))
            }
            ToolName::StoreProjectInsight => {
                let files = string_list(params, "related_files");
                let id = self
                    .system
                    .store_project_insight(
                        required_str(params, "content")?,
                        optional_str(params, "insight_type"),
                        files.as_deref(),
                        optional_i32(params, "importance_level").unwrap_or(DEFAULT_IMPORTANCE),
                        optional_str(params, "source_conversation_id"),
                    )
                    .await?;
                Ok(json!({ "insight_id": id }))
            }
            ToolName::GetToolUsageSummary => {
                let summary = self
                    .system
                    .tool_usage_summary(optional_i64(params, "days").unwrap_or(7))
                    .await?;
                Ok(serde_json::to_value(summary)?)
            }
            ToolName::GetToolCallHistory => {
                let history = self
                    .system
                    .tool_call_history(
                        optional_str(params, "tool_name"),
                        optional_usize(params, "limit").unwrap_or(50),
                    )
                    .await?;
                Ok(json!({ "history": history }))
            }
            ToolName::GetSystemHealth => self.system.system_health().await,
        }
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    optional_str(params, key).ok_or_else(|| EngramError::Runtime(format!("Missing {key}")))
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn optional_i64(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

fn optional_i32(params: &Value, key: &str) -> Option<i32> {
    optional_i64(params, key).map(|v| v as i32)
}

fn optional_usize(params: &Value, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

fn string_list(params: &Value, key: &str) -> Option<Vec<String>> {
    params.get(key).and_then(|v| v.as_array()).map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(|s| s.to_string()))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for name in [
            "create_memory",
            "update_memory",
            "search_memories",
            "store_conversation",
            "get_recent_context",
            "create_appointment",
            "create_reminder",
            "complete_reminder",
            "get_upcoming_schedule",
            "save_development_session",
            "store_project_insight",
            "get_tool_usage_summary",
            "get_tool_call_history",
            "get_system_health",
        ] {
            let tool = ToolName::parse(name).unwrap();
            assert_eq!(tool.as_str(), name);
        }
        assert_eq!(
            ToolName::parse("store_memory"),
            Some(ToolName::CreateMemory)
        );
        assert!(ToolName::parse("not_a_tool").is_none());
    }
}
