mod common;

#[tokio::test]
async fn repeated_appointment_returns_the_original_id() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .create_appointment("Dentist", "2099-03-01T10:00:00", None, None, None)
        .await
        .unwrap();
    let second = system
        .create_appointment("Dentist", "2099-03-01T10:00:00", None, None, None)
        .await
        .unwrap();
    assert_eq!(first, second);

    let health = system.system_health().await.unwrap();
    assert_eq!(health["databases"]["schedule"]["appointment_count"], 1);
}

#[tokio::test]
async fn location_and_source_are_part_of_appointment_identity() {
    let (_dir, system) = common::temp_system().await;

    let downtown = system
        .create_appointment(
            "Standup",
            "2099-03-01T09:00:00",
            None,
            Some("downtown office"),
            None,
        )
        .await
        .unwrap();
    let remote = system
        .create_appointment("Standup", "2099-03-01T09:00:00", None, None, None)
        .await
        .unwrap();
    assert_ne!(downtown, remote);
}

#[tokio::test]
async fn upcoming_appointments_are_windowed_and_sorted() {
    let (_dir, system) = common::temp_system().await;

    system
        .create_appointment("too far out", "2099-01-01T08:00:00", None, None, None)
        .await
        .unwrap();
    system
        .create_appointment("long past", "2001-01-01T08:00:00", None, None, None)
        .await
        .unwrap();

    let overview = system.upcoming_schedule(7).await.unwrap();
    assert!(overview.appointments.is_empty());
    assert_eq!(overview.period_days, 7);
}

#[tokio::test]
async fn reminders_deduplicate_and_complete_once() {
    let (_dir, system) = common::temp_system().await;

    let first = system
        .create_reminder("water the plants", "2099-05-01T08:00:00", 5, None)
        .await
        .unwrap();
    let second = system
        .create_reminder("water the plants", "2099-05-01T08:00:00", 5, None)
        .await
        .unwrap();
    assert_eq!(first, second);

    let active = system.upcoming_schedule(7).await.unwrap().active_reminders;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].priority_level, 5);
    assert!(!active[0].completed);

    assert!(system.complete_reminder(&first).await.unwrap());
    let active = system.upcoming_schedule(7).await.unwrap().active_reminders;
    assert!(active.is_empty());

    assert!(!system.complete_reminder("no-such-id").await.unwrap());
}

#[tokio::test]
async fn active_reminders_sort_by_due_datetime() {
    let (_dir, system) = common::temp_system().await;

    system
        .create_reminder("later", "2099-06-01T08:00:00", 5, None)
        .await
        .unwrap();
    system
        .create_reminder("sooner", "2099-05-01T08:00:00", 5, None)
        .await
        .unwrap();

    let active = system.upcoming_schedule(7).await.unwrap().active_reminders;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].content, "sooner");
    assert_eq!(active[1].content, "later");
}
