use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "on hold")]
    OnHold,
    #[serde(rename = "closed")]
    Closed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::OnHold => "on hold",
            TripStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pending request to join a trip, embedded in the trip document.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct JoinRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub when: DateTime,
    #[serde(rename = "where")]
    pub destination: String,
    pub slots: u32,
    pub status: TripStatus,
    pub created_by: ObjectId,
    pub requests: Vec<JoinRequest>,
    pub participants: Vec<ObjectId>,
}

impl Trip {
    /// Every slot taken. Accepting past this point would overbook.
    pub fn is_full(&self) -> bool {
        self.participants.len() as u32 >= self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_values() {
        assert_eq!(serde_json::to_string(&TripStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&TripStatus::OnHold).unwrap(), "\"on hold\"");
        assert_eq!(serde_json::to_string(&TripStatus::Closed).unwrap(), "\"closed\"");

        assert!(serde_json::from_str::<TripStatus>("\"paused\"").is_err());
    }

    #[test]
    fn trip_uses_original_field_names() {
        let trip = Trip {
            id: None,
            title: "Plitvice hike".into(),
            description: "Two days around the lakes".into(),
            when: DateTime::now(),
            destination: "Plitvice".into(),
            slots: 4,
            status: TripStatus::Active,
            created_by: ObjectId::new(),
            requests: vec![],
            participants: vec![],
        };

        let json = serde_json::to_value(&trip).unwrap();
        assert!(json.get("createdBy").is_some());
        assert!(json.get("where").is_some());
        assert!(json.get("destination").is_none());
    }

    #[test]
    fn full_when_participants_reach_slots() {
        let mut trip = Trip {
            id: None,
            title: String::new(),
            description: String::new(),
            when: DateTime::now(),
            destination: String::new(),
            slots: 2,
            status: TripStatus::Active,
            created_by: ObjectId::new(),
            requests: vec![],
            participants: vec![ObjectId::new()],
        };

        assert!(!trip.is_full());
        trip.participants.push(ObjectId::new());
        assert!(trip.is_full());
    }
}
