diesel::table! {
    memories (id) {
        id -> Text,
        content -> Text,
        memory_type -> Nullable<Text>,
        importance_level -> Integer,
        tags -> Nullable<Text>,
        source_conversation_id -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}
