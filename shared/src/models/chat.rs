use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: ObjectId,
    pub text: String,
    pub created_at: DateTime,
}

/// Message history between exactly two users. One document per unordered
/// pair; `participants` is stored sorted so lookups are order-independent.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Conversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub participants: Vec<ObjectId>,
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wire_field_names() {
        let message = ChatMessage {
            sender_id: ObjectId::new(),
            text: "hello".into(),
            created_at: DateTime::now(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("senderId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["text"], "hello");
    }
}
