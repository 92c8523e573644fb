use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::user::{GeoPoint, UserSafe};

fn default_role() -> String {
    String::from("traveller")
}

#[derive(Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub location: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserSafe,
    pub token: String,
}

/// Authenticated-user snapshot carried in the JWT and handed to every
/// protected handler through request extensions.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthUser {
    pub id: ObjectId,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    pub location: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub user: AuthUser,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_defaults_to_traveller() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{
                "email": "ana@example.com",
                "password": "hunter2",
                "firstname": "Ana",
                "lastname": "Horvat",
                "location": {"lat": 45.8, "lng": 15.9}
            }"#,
        )
        .unwrap();

        assert_eq!(request.role, "traveller");
        assert_eq!(request.location.unwrap().lat, Some(45.8));
    }
}
