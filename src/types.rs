use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Empty assistant message, filled in as chunks arrive.
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_role_lowercase_and_rfc3339_timestamp() {
        let msg = ChatMessage::user("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
        let ts = value["timestamp"].as_str().unwrap();
        assert!(ts.contains('T'), "expected RFC 3339 timestamp, got {ts}");
    }

    #[test]
    fn messages_get_distinct_ids() {
        let a = ChatMessage::assistant();
        let b = ChatMessage::assistant();
        assert_ne!(a.id, b.id);
        assert!(a.content.is_empty());
    }
}
