diesel::table! {
    sessions (id) {
        id -> Text,
        started_at -> BigInt,
        context -> Nullable<Text>,
    }
}

diesel::table! {
    conversations (id) {
        id -> Text,
        session_id -> Text,
        started_at -> BigInt,
        title -> Nullable<Text>,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        conversation_id -> Text,
        timestamp -> BigInt,
        role -> Text,
        content -> Text,
        metadata -> Nullable<Text>,
    }
}

diesel::joinable!(conversations -> sessions (session_id));
diesel::joinable!(messages -> conversations (conversation_id));
diesel::allow_tables_to_appear_in_same_query!(sessions, conversations, messages);
