diesel::table! {
    project_sessions (id) {
        id -> Text,
        started_at -> BigInt,
        workspace_path -> Text,
        active_files -> Nullable<Text>,
        git_branch -> Nullable<Text>,
        summary -> Nullable<Text>,
    }
}

diesel::table! {
    project_insights (id) {
        id -> Text,
        insight_type -> Nullable<Text>,
        content -> Text,
        related_files -> Nullable<Text>,
        importance_level -> Integer,
        source_conversation_id -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}
