use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Client-to-server chat events. Wire shape:
/// `{"event": "joinChat", "data": {...}}`.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChatClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinChat {
        sender_name: String,
        user_id: ObjectId,
        target_user_id: ObjectId,
    },

    #[serde(rename_all = "camelCase")]
    SendMessage {
        sender_first_name: String,
        sender_last_name: String,
        user_id: ObjectId,
        target_user_id: ObjectId,
        text: String,
    },
}

/// Server-to-client chat events, same envelope.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChatServerMessage {
    #[serde(rename_all = "camelCase")]
    MessageReceived {
        sender_first_name: String,
        sender_last_name: String,
        text: String,
    },

    /// Delivery acknowledgment sent only to the emitting connection when
    /// the message could not be persisted.
    MessageFailed { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_camel_case_envelope() {
        let join = ChatClientMessage::JoinChat {
            sender_name: "Ana".into(),
            user_id: ObjectId::new(),
            target_user_id: ObjectId::new(),
        };

        let json = serde_json::to_value(&join).unwrap();
        assert_eq!(json["event"], "joinChat");
        assert!(json["data"].get("senderName").is_some());
        assert!(json["data"].get("userId").is_some());
        assert!(json["data"].get("targetUserId").is_some());

        let back: ChatClientMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(back, ChatClientMessage::JoinChat { .. }));
    }

    #[test]
    fn delivery_event_shape() {
        let delivered = ChatServerMessage::MessageReceived {
            sender_first_name: "Ana".into(),
            sender_last_name: "Horvat".into(),
            text: "hello".into(),
        };

        let json = serde_json::to_value(&delivered).unwrap();
        assert_eq!(json["event"], "messageReceived");
        assert_eq!(json["data"]["senderFirstName"], "Ana");
        assert_eq!(json["data"]["text"], "hello");
    }
}
