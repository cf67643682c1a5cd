mod common;

#[tokio::test]
async fn identical_memories_collapse_to_one_row() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .create_memory("prefers tabs over spaces", Some("preference"), 5, None, None)
        .await
        .unwrap();
    let second = system
        .create_memory("prefers tabs over spaces", Some("preference"), 5, None, None)
        .await
        .unwrap();
    assert_eq!(first, second);

    let matches = system
        .search_memories("tabs over spaces", 10, None, None, None)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, first);
}

#[tokio::test]
async fn absent_type_and_source_still_deduplicate() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .create_memory("remember the milk", None, 5, None, None)
        .await
        .unwrap();
    let second = system
        .create_memory("remember the milk", None, 5, None, None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn different_source_conversation_is_a_different_memory() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .create_memory("likes jazz", Some("preference"), 5, None, Some("conv-a"))
        .await
        .unwrap();
    let second = system
        .create_memory("likes jazz", Some("preference"), 5, None, Some("conv-b"))
        .await
        .unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn update_preserves_identity_and_bumps_stamp() {
    let (_dir, system) = common::temp_system().await;

    let id = system
        .create_memory("draft note", Some("note"), 3, None, None)
        .await
        .unwrap();
    let before = system
        .search_memories("draft note", 1, None, None, None)
        .await
        .unwrap()[0]
        .clone();

    let updated = system
        .update_memory(&id, None, Some(9), Some(&["urgent".to_string()]))
        .await
        .unwrap();
    assert!(updated);

    let after = system
        .search_memories("draft note", 1, None, None, None)
        .await
        .unwrap()[0]
        .clone();
    assert_eq!(after.id, id);
    assert_eq!(after.importance_level, 9);
    assert_eq!(after.tags, Some(vec!["urgent".to_string()]));
    assert!(after.updated_at >= before.updated_at);

    assert!(!system
        .update_memory("no-such-id", Some("x"), None, None)
        .await
        .unwrap());
}

#[tokio::test]
async fn search_honors_type_and_importance_filters() {
    let (_dir, system) = common::temp_system().await;

    system
        .create_memory("the deploy key lives in vault", Some("ops"), 8, None, None)
        .await
        .unwrap();
    system
        .create_memory("the deploy dashboard is flaky", Some("note"), 3, None, None)
        .await
        .unwrap();

    let important = system
        .search_memories("deploy", 10, None, Some(5), None)
        .await
        .unwrap();
    assert_eq!(important.len(), 1);
    assert_eq!(important[0].memory_type.as_deref(), Some("ops"));

    let notes = system
        .search_memories("deploy", 10, Some("note"), None, None)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].importance_level, 3);

    let ordered = system
        .search_memories("deploy", 10, None, None, None)
        .await
        .unwrap();
    assert_eq!(ordered.len(), 2);
    assert!(ordered[0].importance_level >= ordered[1].importance_level);
}
