diesel::table! {
    tool_calls (id) {
        id -> Text,
        timestamp -> BigInt,
        client_id -> Nullable<Text>,
        tool_name -> Text,
        parameters -> Text,
        result -> Nullable<Text>,
        status -> Text,
        execution_time_ms -> Nullable<BigInt>,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    tool_usage_stats (tool_name, date) {
        tool_name -> Text,
        date -> Text,
        call_count -> Integer,
        success_count -> Integer,
        failure_count -> Integer,
    }
}
