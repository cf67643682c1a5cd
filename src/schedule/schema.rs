diesel::table! {
    appointments (id) {
        id -> Text,
        title -> Text,
        scheduled_at -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        source_conversation_id -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    reminders (id) {
        id -> Text,
        content -> Text,
        due_at -> Text,
        priority_level -> Integer,
        completed -> Bool,
        source_conversation_id -> Nullable<Text>,
        created_at -> BigInt,
    }
}
