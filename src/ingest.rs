//! Transcript import. Parses exported conversation files — plain text with
//! `user:` / `assistant:` role markers, or a JSON array of message objects —
//! and replays each turn through the conversation store. Importing into the
//! same session twice is deduplicated by the store's recency window.

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use crate::error::{EngramError, Result};
use crate::system::MemorySystem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTurn {
    pub role: String,
    pub content: String,
}

const USER_MARKERS: [&str; 3] = ["user:", "human:", "me:"];
const ASSISTANT_MARKERS: [&str; 3] = ["assistant:", "ai:", "bot:"];

/// Parse a text transcript. Role-marker lines start a new turn; everything
/// else continues the current one. Text before the first marker is treated
/// as a user turn.
pub fn parse_text_transcript(content: &str) -> Vec<ParsedTurn> {
    let mut turns = Vec::new();
    let mut role = "user";
    let mut block: Vec<&str> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lowered = line.to_lowercase();
        let marker = if USER_MARKERS.iter().any(|m| lowered.starts_with(m)) {
            Some("user")
        } else if ASSISTANT_MARKERS.iter().any(|m| lowered.starts_with(m)) {
            Some("assistant")
        } else {
            None
        };

        match marker {
            Some(next_role) => {
                flush(&mut turns, role, &mut block);
                role = next_role;
                if let Some((_, rest)) = line.split_once(':') {
                    let rest = rest.trim();
                    if !rest.is_empty() {
                        block.push(rest);
                    }
                }
            }
            None => block.push(line),
        }
    }
    flush(&mut turns, role, &mut block);
    turns
}

fn flush(turns: &mut Vec<ParsedTurn>, role: &str, block: &mut Vec<&str>) {
    if block.is_empty() {
        return;
    }
    turns.push(ParsedTurn {
        role: role.to_string(),
        content: block.join("\n"),
    });
    block.clear();
}

/// Parse a JSON export: an array of objects carrying `content` and an
/// optional `role` (defaulting to user). Entries without content are
/// skipped.
pub fn parse_message_array(content: &str) -> Result<Vec<ParsedTurn>> {
    let value: Value = serde_json::from_str(content)?;
    let Some(items) = value.as_array() else {
        return Err(EngramError::Runtime(
            "Transcript JSON must be an array of messages".to_string(),
        ));
    };
    Ok(items
        .iter()
        .filter_map(|item| {
            let content = item.get("content").and_then(|v| v.as_str())?;
            let role = item
                .get("role")
                .and_then(|v| v.as_str())
                .unwrap_or("user");
            Some(ParsedTurn {
                role: role.to_string(),
                content: content.to_string(),
            })
        })
        .collect())
}

/// Import a transcript file, storing every parsed turn in one conversation.
/// Passing the session id of an earlier import replays into that session,
/// where the store's duplicate window suppresses turns it has already seen.
/// Returns the number of newly stored messages.
pub async fn import_transcript(
    system: &MemorySystem,
    path: &Path,
    session_id: Option<&str>,
) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngramError::Runtime(format!("{}: {e}", path.display())))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let turns = match extension.as_str() {
        "json" => parse_message_array(&raw)?,
        "txt" | "md" | "log" => parse_text_transcript(&raw),
        other => {
            return Err(EngramError::Runtime(format!(
                "Unsupported transcript format: .{other}"
            )))
        }
    };

    let metadata = json!({ "source_file": path.display().to_string() });
    let mut session_id = session_id.map(|s| s.to_string());
    let mut conversation_id: Option<String> = None;
    let mut stored = 0usize;

    for turn in &turns {
        let result = system
            .store_conversation(
                &turn.content,
                &turn.role,
                session_id.as_deref(),
                conversation_id.as_deref(),
                Some(&metadata),
            )
            .await?;
        if !result.duplicate {
            stored += 1;
            conversation_id = result.conversation_id.clone();
        }
        session_id = Some(result.session_id);
    }

    info!(
        path = %path.display(),
        parsed = turns.len(),
        stored,
        "imported transcript"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_transcript_splits_on_role_markers() {
        let turns = parse_text_transcript(
            "User: hello there\nsome continuation\nAssistant: hi!\nME: and another",
        );
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[0].content, "hello there\nsome continuation");
        assert_eq!(turns[1].role, "assistant");
        assert_eq!(turns[1].content, "hi!");
        assert_eq!(turns[2].role, "user");
        assert_eq!(turns[2].content, "and another");
    }

    #[test]
    fn unmarked_text_defaults_to_one_user_turn() {
        let turns = parse_text_transcript("just a note\nacross two lines");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, "user");
    }

    #[test]
    fn message_array_skips_entries_without_content() {
        let turns = parse_message_array(
            r#"[{"role":"user","content":"a"},{"role":"assistant"},{"content":"b"}]"#,
        )
        .unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, "user");
        assert!(parse_message_array("{\"not\":\"an array\"}").is_err());
    }
}
