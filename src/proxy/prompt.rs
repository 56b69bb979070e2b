//! System prompt extraction for the audit trail.

use serde_json::Value;

/// Pull the system prompt out of a chat-completion style request body.
///
/// Returns the `content` of the first entry in a list-valued `messages`
/// field whose `role` is `"system"`. Any shape mismatch (body is not an
/// object, `messages` missing or not a list, entries malformed, content not
/// a string) yields `None`. Never panics, never mutates the input.
pub fn extract_system_prompt(body: &Value) -> Option<String> {
    let messages = body.get("messages")?.as_array()?;
    messages
        .iter()
        .find(|msg| msg.get("role").and_then(Value::as_str) == Some("system"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
