use serde_json::json;

mod common;

#[tokio::test]
async fn same_turn_in_same_session_is_deduplicated() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .store_conversation("hi there", "user", None, None, None)
        .await
        .unwrap();
    assert!(!first.duplicate);
    assert!(first.conversation_id.is_some());

    let second = system
        .store_conversation("hi there", "user", Some(&first.session_id), None, None)
        .await
        .unwrap();
    assert!(second.duplicate);
    assert_eq!(second.message_id, first.message_id);
    assert!(second.conversation_id.is_none());
    assert_eq!(second.session_id, first.session_id);
}

#[tokio::test]
async fn different_sessions_do_not_share_duplicates() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .store_conversation("hello", "user", None, None, None)
        .await
        .unwrap();
    let second = system
        .store_conversation("hello", "user", None, None, None)
        .await
        .unwrap();
    assert!(!second.duplicate);
    assert_ne!(first.message_id, second.message_id);
    assert_ne!(first.session_id, second.session_id);
}

#[tokio::test]
async fn recent_context_filters_by_session_and_limits() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .store_conversation("one", "user", None, None, Some(&json!({"channel": "cli"})))
        .await
        .unwrap();
    system
        .store_conversation("two", "assistant", Some(&first.session_id), None, None)
        .await
        .unwrap();
    system
        .store_conversation("elsewhere", "user", None, None, None)
        .await
        .unwrap();

    let session_messages = system
        .recent_context(10, Some(&first.session_id))
        .await
        .unwrap();
    assert_eq!(session_messages.len(), 2);
    assert!(session_messages
        .iter()
        .all(|m| m.session_id == first.session_id));

    let with_metadata = session_messages
        .iter()
        .find(|m| m.content == "one")
        .unwrap();
    assert_eq!(with_metadata.metadata, Some(json!({"channel": "cli"})));

    let all = system.recent_context(2, None).await.unwrap();
    assert_eq!(all.len(), 2);
}
