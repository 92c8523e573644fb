use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Geographic coordinate. Either component may be missing on profiles
/// that never shared a location, so both are optional independently.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl GeoPoint {
    /// Both coordinates, or `None` if either is absent.
    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// User shape safe to hand to clients (no password hash).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserSafe {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl From<User> for UserSafe {
    fn from(value: User) -> Self {
        UserSafe {
            id: value.id.expect("converting create payload into safe"),
            email: value.email,
            firstname: value.firstname,
            lastname: value.lastname,
            role: value.role,
            location: value.location,
        }
    }
}

/// Minimal identity used when resolving request/participant lists.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserPublic {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lat_lng_requires_both_components() {
        let full = GeoPoint {
            lat: Some(45.0),
            lng: Some(15.0),
        };
        assert_eq!(full.lat_lng(), Some((45.0, 15.0)));

        let partial = GeoPoint {
            lat: Some(45.0),
            lng: None,
        };
        assert_eq!(partial.lat_lng(), None);
    }

    #[test]
    fn user_safe_drops_password_hash() {
        let user = User {
            id: Some(ObjectId::new()),
            email: "ana@example.com".into(),
            password_hash: "$2b$10$abc".into(),
            firstname: "Ana".into(),
            lastname: "Horvat".into(),
            role: "traveller".into(),
            location: None,
        };

        let safe = UserSafe::from(user);
        let json = serde_json::to_value(&safe).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["firstname"], "Ana");
    }
}
