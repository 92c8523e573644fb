use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::{
    trip::{JoinRequest, TripStatus},
    user::{UserPublic, UserSafe},
};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub title: String,
    pub description: String,
    pub when: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "where")]
    pub destination: String,
    pub slots: u32,
}

/// Partial update. Omitted fields keep their stored value.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TripStatus>,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TripStatus,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum RequestDecision {
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "rejected")]
    Rejected,
}

impl std::fmt::Display for RequestDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RequestDecision::Accepted => "accepted",
            RequestDecision::Rejected => "rejected",
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct ManageRequest {
    pub status: RequestDecision,
}

/// Discovery result: the trip, its creator's full profile in place of the
/// raw reference, and the computed degree distance.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredTrip {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub when: DateTime,
    #[serde(rename = "where")]
    pub destination: String,
    pub slots: u32,
    pub status: TripStatus,
    pub requests: Vec<JoinRequest>,
    pub participants: Vec<ObjectId>,
    pub created_by: UserSafe,
    pub distance: f64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: UserPublic,
}

/// Trip with requester and participant references resolved to display
/// fields, as returned by the "mine" and single-trip reads.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedTrip {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub when: DateTime,
    #[serde(rename = "where")]
    pub destination: String,
    pub slots: u32,
    pub status: TripStatus,
    pub created_by: Option<UserPublic>,
    pub requests: Vec<PopulatedRequest>,
    pub participants: Vec<UserPublic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_values() {
        assert_eq!(
            serde_json::to_string(&RequestDecision::Accepted).unwrap(),
            "\"accepted\""
        );
        assert_eq!(
            serde_json::to_string(&RequestDecision::Rejected).unwrap(),
            "\"rejected\""
        );

        assert!(serde_json::from_str::<ManageRequest>(r#"{"status":"maybe"}"#).is_err());
    }

    #[test]
    fn update_request_tolerates_missing_fields() {
        let update: UpdateRequest = serde_json::from_str(r#"{"title":"New title"}"#).unwrap();

        assert_eq!(update.title.as_deref(), Some("New title"));
        assert!(update.slots.is_none());
        assert!(update.status.is_none());
    }
}
