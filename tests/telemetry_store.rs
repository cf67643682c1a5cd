use serde_json::json;

use engram::telemetry::{CallStatus, ToolCallEntry};

mod common;

fn entry<'a>(tool_name: &'a str, status: CallStatus, params: &'a serde_json::Value) -> ToolCallEntry<'a> {
    ToolCallEntry {
        tool_name,
        parameters: params,
        result: None,
        status,
        execution_time_ms: Some(3),
        error_message: None,
        client_id: Some("test-client"),
    }
}

#[tokio::test]
async fn daily_counters_stay_consistent_with_the_log() {
    let (_dir, system) = common::temp_system().await;
    let params = json!({"query": "x"});

    for _ in 0..4 {
        system
            .log_tool_call(entry("search_memories", CallStatus::Success, &params))
            .await
            .unwrap();
    }
    system
        .log_tool_call(entry("search_memories", CallStatus::Failure, &params))
        .await
        .unwrap();

    let summary = system.tool_usage_summary(7).await.unwrap();
    let stat = summary
        .daily_stats
        .iter()
        .find(|s| s.tool_name == "search_memories")
        .unwrap();
    assert_eq!(stat.call_count, 5);
    assert_eq!(stat.success_count, 4);
    assert_eq!(stat.failure_count, 1);
    assert_eq!(stat.call_count, stat.success_count + stat.failure_count);
}

#[tokio::test]
async fn history_is_limited_filtered_and_newest_first() {
    let (_dir, system) = common::temp_system().await;
    let params = json!({});

    for _ in 0..6 {
        system
            .log_tool_call(entry("create_memory", CallStatus::Success, &params))
            .await
            .unwrap();
    }
    system
        .log_tool_call(entry("get_system_health", CallStatus::Success, &params))
        .await
        .unwrap();

    let history = system.tool_call_history(None, 4).await.unwrap();
    assert_eq!(history.len(), 4);
    for pair in history.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }

    let filtered = system
        .tool_call_history(Some("get_system_health"), 50)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].client_id.as_deref(), Some("test-client"));
}

#[tokio::test]
async fn summary_views_rank_by_volume() {
    let (_dir, system) = common::temp_system().await;
    let params = json!({});

    for _ in 0..3 {
        system
            .log_tool_call(entry("busy_tool", CallStatus::Success, &params))
            .await
            .unwrap();
    }
    system
        .log_tool_call(entry("quiet_tool", CallStatus::Failure, &params))
        .await
        .unwrap();

    let summary = system.tool_usage_summary(7).await.unwrap();
    assert_eq!(summary.period_days, 7);

    assert_eq!(summary.most_used_tools[0].tool_name, "busy_tool");
    assert_eq!(summary.most_used_tools[0].total_calls, 3);

    let busy = summary
        .recent_calls
        .iter()
        .find(|c| c.tool_name == "busy_tool")
        .unwrap();
    assert_eq!(busy.status, "success");
    assert_eq!(busy.count, 3);
    let quiet = summary
        .recent_calls
        .iter()
        .find(|c| c.tool_name == "quiet_tool")
        .unwrap();
    assert_eq!(quiet.status, "failure");
    assert_eq!(quiet.count, 1);
}

#[tokio::test]
async fn records_round_trip_their_payloads() {
    let (_dir, system) = common::temp_system().await;
    let params = json!({"content": "note", "tags": ["a"]});
    let result = json!({"memory_id": "m-1"});

    system
        .log_tool_call(ToolCallEntry {
            tool_name: "create_memory",
            parameters: &params,
            result: Some(&result),
            status: CallStatus::Success,
            execution_time_ms: Some(12),
            error_message: None,
            client_id: None,
        })
        .await
        .unwrap();

    let history = system.tool_call_history(None, 1).await.unwrap();
    assert_eq!(history[0].parameters, params);
    assert_eq!(history[0].result, Some(result));
    assert_eq!(history[0].status, "success");
    assert_eq!(history[0].execution_time_ms, Some(12));
}
