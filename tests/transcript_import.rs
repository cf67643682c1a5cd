use std::fs;

use engram::ingest;

mod common;

#[tokio::test]
async fn text_transcript_lands_in_one_conversation() {
    let (dir, system) = common::temp_system().await;
    let path = dir.path().join("chat.txt");
    fs::write(
        &path,
        "User: what's on my calendar?\nAssistant: nothing today.\nUser: good.\n",
    )
    .unwrap();

    let stored = ingest::import_transcript(&system, &path, None).await.unwrap();
    assert_eq!(stored, 3);

    let messages = system.recent_context(10, None).await.unwrap();
    assert_eq!(messages.len(), 3);
    let conversation_id = &messages[0].conversation_id;
    assert!(messages
        .iter()
        .all(|m| &m.conversation_id == conversation_id));
    assert!(messages
        .iter()
        .all(|m| m.metadata.as_ref().unwrap()["source_file"]
            .as_str()
            .unwrap()
            .ends_with("chat.txt")));
}

#[tokio::test]
async fn reimport_into_the_same_session_stores_nothing() {
    let (dir, system) = common::temp_system().await;
    let path = dir.path().join("chat.md");
    fs::write(&path, "User: ping\nAssistant: pong\n").unwrap();

    let stored = ingest::import_transcript(&system, &path, None).await.unwrap();
    assert_eq!(stored, 2);
    let session_id = system.recent_context(1, None).await.unwrap()[0]
        .session_id
        .clone();

    let again = ingest::import_transcript(&system, &path, Some(&session_id))
        .await
        .unwrap();
    assert_eq!(again, 0);
    assert_eq!(system.recent_context(10, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn json_transcript_and_unknown_extensions() {
    let (dir, system) = common::temp_system().await;
    let path = dir.path().join("export.json");
    fs::write(
        &path,
        r#"[{"role":"user","content":"hey"},{"role":"assistant","content":"hey yourself"}]"#,
    )
    .unwrap();

    let stored = ingest::import_transcript(&system, &path, None).await.unwrap();
    assert_eq!(stored, 2);

    let bad = dir.path().join("export.csv");
    fs::write(&bad, "a,b\n").unwrap();
    assert!(ingest::import_transcript(&system, &bad, None).await.is_err());
}
