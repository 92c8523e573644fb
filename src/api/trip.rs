use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::Deserialize;
use serde_json::json;

use shared::{
    api::{
        trip::{
            CreateRequest, DiscoveredTrip, ManageRequest, PopulatedRequest, PopulatedTrip,
            RequestDecision, UpdateRequest, UpdateStatusRequest,
        },
        user::Claims,
    },
    models::{
        trip::{JoinRequest, Trip, TripStatus},
        user::UserPublic,
    },
};

use crate::{error::ApiError, mongodb::MongoDatabase};

const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Flat-earth approximation: 1 degree ~ 111 km. Good enough for the short
/// distances discovery targets; increasingly wrong near the poles and the
/// date line. Kept over a geodesic formula so the set of returned trips
/// matches the original behavior.
const KM_PER_DEGREE: f64 = 111.0;

fn degree_threshold(radius_km: f64) -> f64 {
    radius_km / KM_PER_DEGREE
}

fn parse_trip_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::NotFound("Trip not found"))
}

async fn create(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    request: web::Json<CreateRequest>,
) -> Result<impl Responder, ApiError> {
    let collection = db.database.collection::<Trip>("trips");

    let mut trip = Trip {
        id: None,
        title: request.title.clone(),
        description: request.description.clone(),
        when: DateTime::from_millis(request.when.timestamp_millis()),
        destination: request.destination.clone(),
        slots: request.slots,
        status: TripStatus::Active,
        created_by: user.user.id,
        requests: Vec::new(),
        participants: Vec::new(),
    };

    let inserted = collection.insert_one(&trip).await?;
    trip.id = inserted.inserted_id.as_object_id();

    Ok(HttpResponse::Created().json(trip))
}

#[derive(Deserialize)]
struct DiscoverQuery {
    radius: Option<f64>,
}

/// Proximity discovery: open trips by nearby travellers, annotated with
/// the creator's profile and the computed degree distance.
async fn discover(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    query: web::Query<DiscoverQuery>,
) -> Result<impl Responder, ApiError> {
    let radius_km = query.radius.unwrap_or(DEFAULT_RADIUS_KM);
    let max_degree_diff = degree_threshold(radius_km);

    let (user_lat, user_lng) = user
        .user
        .location
        .as_ref()
        .and_then(|location| location.lat_lng())
        .ok_or(ApiError::BadRequest("User location not available"))?;

    let pipeline = vec![
        doc! {
            "$lookup": {
                "from": "users",
                "localField": "createdBy",
                "foreignField": "_id",
                "as": "creator",
            }
        },
        doc! { "$unwind": "$creator" },
        doc! {
            "$match": {
                "creator.role": "traveller",
                "creator._id": { "$ne": user.user.id },
            }
        },
        // Euclidean distance in degrees between the two coordinates.
        doc! {
            "$addFields": {
                "distance": {
                    "$sqrt": {
                        "$add": [
                            { "$pow": [{ "$subtract": ["$creator.location.lat", user_lat] }, 2] },
                            { "$pow": [{ "$subtract": ["$creator.location.lng", user_lng] }, 2] },
                        ]
                    }
                }
            }
        },
        doc! {
            "$match": {
                "distance": { "$lte": max_degree_diff }
            }
        },
        doc! {
            "$project": {
                "title": 1,
                "description": 1,
                "when": 1,
                "where": 1,
                "slots": 1,
                "status": 1,
                "requests": 1,
                "participants": 1,
                "createdBy": "$creator",
                "distance": 1,
            }
        },
    ];

    let trips = db
        .database
        .collection::<Trip>("trips")
        .aggregate(pipeline)
        .await?
        .with_type::<DiscoveredTrip>()
        .try_collect::<Vec<_>>()
        .await?;

    Ok(web::Json(json!({
        "trips": trips,
        "message": "Trips fetched successfully",
    })))
}

/// Resolve the user references on a trip to display fields.
fn populate(trip: Trip, users: &HashMap<ObjectId, UserPublic>) -> PopulatedTrip {
    PopulatedTrip {
        id: trip.id.expect("trip loaded from the collection has an id"),
        title: trip.title,
        description: trip.description,
        when: trip.when,
        destination: trip.destination,
        slots: trip.slots,
        status: trip.status,
        created_by: users.get(&trip.created_by).cloned(),
        requests: trip
            .requests
            .into_iter()
            .filter_map(|request| {
                Some(PopulatedRequest {
                    id: request.id,
                    user: users.get(&request.user).cloned()?,
                })
            })
            .collect(),
        participants: trip
            .participants
            .into_iter()
            .filter_map(|id| users.get(&id).cloned())
            .collect(),
    }
}

async fn fetch_users(
    db: &web::Data<MongoDatabase>,
    mut ids: Vec<ObjectId>,
) -> Result<HashMap<ObjectId, UserPublic>, ApiError> {
    ids.sort();
    ids.dedup();

    let users = db
        .database
        .collection::<UserPublic>("users")
        .find(doc! { "_id": { "$in": ids } })
        .projection(doc! { "firstname": 1, "lastname": 1, "email": 1 })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

async fn mine(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
) -> Result<impl Responder, ApiError> {
    let trips = db
        .database
        .collection::<Trip>("trips")
        .find(doc! { "createdBy": user.user.id })
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    let mut ids = vec![user.user.id];
    for trip in &trips {
        ids.extend(trip.requests.iter().map(|request| request.user));
        ids.extend(trip.participants.iter().copied());
    }

    let users = fetch_users(&db, ids).await?;
    let trips = trips
        .into_iter()
        .map(|trip| populate(trip, &users))
        .collect::<Vec<_>>();

    Ok(web::Json(json!({
        "trips": trips,
        "message": "Trips fetched successfully",
    })))
}

async fn get_by_id(
    db: web::Data<MongoDatabase>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let trip_id = parse_trip_id(&path)?;

    let trip = db
        .database
        .collection::<Trip>("trips")
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    let mut ids = vec![trip.created_by];
    ids.extend(trip.requests.iter().map(|request| request.user));
    ids.extend(trip.participants.iter().copied());

    let users = fetch_users(&db, ids).await?;

    Ok(web::Json(populate(trip, &users)))
}

async fn update(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateRequest>,
) -> Result<impl Responder, ApiError> {
    let trip_id = parse_trip_id(&path)?;
    let collection = db.database.collection::<Trip>("trips");

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    if trip.created_by != user.user.id {
        return Err(ApiError::Forbidden("Not authorized"));
    }

    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.clone());
    }
    if let Some(description) = &request.description {
        set.insert("description", description.clone());
    }
    if let Some(when) = request.when {
        set.insert("when", DateTime::from_millis(when.timestamp_millis()));
    }
    if let Some(destination) = &request.destination {
        set.insert("where", destination.clone());
    }
    if let Some(slots) = request.slots {
        set.insert("slots", slots);
    }
    if let Some(status) = request.status {
        set.insert("status", status.as_str());
    }

    if !set.is_empty() {
        collection
            .update_one(doc! { "_id": trip_id }, doc! { "$set": set })
            .await?;
    }

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    Ok(web::Json(trip))
}

async fn delete(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let trip_id = parse_trip_id(&path)?;
    let collection = db.database.collection::<Trip>("trips");

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    if trip.created_by != user.user.id {
        return Err(ApiError::Forbidden("Not authorized"));
    }

    collection.delete_one(doc! { "_id": trip_id }).await?;

    Ok(web::Json(json!({
        "message": "Trip deleted successfully"
    })))
}

async fn send_join_request(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let trip_id = parse_trip_id(&path)?;
    let collection = db.database.collection::<Trip>("trips");

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    if trip
        .requests
        .iter()
        .any(|request| request.user == user.user.id)
    {
        return Err(ApiError::Conflict(
            "You have already requested to join this trip",
        ));
    }

    collection
        .update_one(
            doc! { "_id": trip_id },
            doc! {
                "$push": {
                    "requests": {
                        "_id": ObjectId::new(),
                        "user": user.user.id,
                    }
                }
            },
        )
        .await?;

    Ok(web::Json(json!({
        "message": "Join request sent successfully"
    })))
}

/// Checks the accept path cannot run for a requester who is already in, or
/// for a trip with no free seats.
fn validate_accept(trip: &Trip, request: &JoinRequest) -> Result<(), ApiError> {
    if trip.participants.contains(&request.user) {
        return Err(ApiError::Conflict("User already a participant"));
    }

    if trip.is_full() {
        return Err(ApiError::Conflict("Trip is already full"));
    }

    Ok(())
}

async fn manage_join_request(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    request: web::Json<ManageRequest>,
) -> Result<impl Responder, ApiError> {
    let (raw_trip_id, raw_request_id) = path.into_inner();
    let trip_id = parse_trip_id(&raw_trip_id)?;
    let request_id = ObjectId::parse_str(&raw_request_id)
        .map_err(|_| ApiError::NotFound("Join request not found"))?;

    let collection = db.database.collection::<Trip>("trips");

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    if trip.created_by != user.user.id {
        return Err(ApiError::Forbidden("Not authorized to manage requests"));
    }

    let join_request = trip
        .requests
        .iter()
        .find(|candidate| candidate.id == request_id)
        .ok_or(ApiError::NotFound("Join request not found"))?;

    match request.status {
        RequestDecision::Accepted => {
            validate_accept(&trip, join_request)?;

            // Guarded write: the participant is only appended while a seat
            // is still free, so two concurrent accepts cannot overbook.
            let updated = collection
                .update_one(
                    doc! {
                        "_id": trip_id,
                        "participants": { "$ne": join_request.user },
                        "$expr": { "$lt": [{ "$size": "$participants" }, "$slots"] },
                    },
                    doc! {
                        "$push": { "participants": join_request.user },
                        "$pull": { "requests": { "_id": request_id } },
                    },
                )
                .await?;

            if updated.modified_count == 0 {
                return Err(ApiError::Conflict("Trip is already full"));
            }

            // Close the trip once the last seat is taken.
            collection
                .update_one(
                    doc! {
                        "_id": trip_id,
                        "$expr": { "$gte": [{ "$size": "$participants" }, "$slots"] },
                    },
                    doc! { "$set": { "status": TripStatus::Closed.as_str() } },
                )
                .await?;
        }

        RequestDecision::Rejected => {
            collection
                .update_one(
                    doc! { "_id": trip_id },
                    doc! { "$pull": { "requests": { "_id": request_id } } },
                )
                .await?;
        }
    }

    Ok(web::Json(json!({
        "message": format!("Join request {} successfully", request.status)
    })))
}

async fn update_status(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateStatusRequest>,
) -> Result<impl Responder, ApiError> {
    let trip_id = parse_trip_id(&path)?;
    let collection = db.database.collection::<Trip>("trips");

    let trip = collection
        .find_one(doc! { "_id": trip_id })
        .await?
        .ok_or(ApiError::NotFound("Trip not found"))?;

    if trip.created_by != user.user.id {
        return Err(ApiError::Forbidden("Not authorized"));
    }

    // No transition graph: any of the three values may follow any other,
    // including reopening a closed trip. Matches the original behavior.
    collection
        .update_one(
            doc! { "_id": trip_id },
            doc! { "$set": { "status": request.status.as_str() } },
        )
        .await?;

    Ok(web::Json(json!({
        "message": format!("Trip status updated to {}", request.status)
    })))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(discover))
        .route("/mine", web::get().to(mine))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::delete().to(delete))
        .route("/{id}/requests", web::post().to(send_join_request))
        .route(
            "/{trip_id}/requests/{request_id}",
            web::patch().to(manage_join_request),
        )
        .route("/{id}/status", web::patch().to(update_status));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with(slots: u32, participants: Vec<ObjectId>) -> Trip {
        Trip {
            id: Some(ObjectId::new()),
            title: "Velebit traverse".into(),
            description: String::new(),
            when: DateTime::now(),
            destination: "Velebit".into(),
            slots,
            status: TripStatus::Active,
            created_by: ObjectId::new(),
            requests: Vec::new(),
            participants,
        }
    }

    fn request_from(user: ObjectId) -> JoinRequest {
        JoinRequest {
            id: ObjectId::new(),
            user,
        }
    }

    #[test]
    fn default_radius_threshold() {
        let threshold = degree_threshold(DEFAULT_RADIUS_KM);
        assert!((threshold - 50.0 / 111.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_scales_linearly_with_radius() {
        assert!((degree_threshold(111.0) - 1.0).abs() < 1e-12);
        assert_eq!(degree_threshold(0.0), 0.0);
    }

    #[test]
    fn accept_rejected_when_trip_full() {
        let trip = trip_with(1, vec![ObjectId::new()]);
        let request = request_from(ObjectId::new());

        match validate_accept(&trip, &request) {
            Err(ApiError::Conflict(message)) => assert_eq!(message, "Trip is already full"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn accept_rejected_for_existing_participant() {
        let participant = ObjectId::new();
        let trip = trip_with(3, vec![participant]);
        let request = request_from(participant);

        match validate_accept(&trip, &request) {
            Err(ApiError::Conflict(message)) => assert_eq!(message, "User already a participant"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn accept_allowed_while_seats_remain() {
        let trip = trip_with(2, vec![ObjectId::new()]);
        let request = request_from(ObjectId::new());

        assert!(validate_accept(&trip, &request).is_ok());
    }

    #[test]
    fn last_seat_scenario() {
        // slots=1, no participants, one pending request: accept passes
        // validation and the trip is full afterwards, so the guarded
        // status update flips it to closed.
        let requester = ObjectId::new();
        let mut trip = trip_with(1, Vec::new());
        trip.requests.push(request_from(requester));

        let request = trip.requests[0].clone();
        assert!(validate_accept(&trip, &request).is_ok());

        trip.participants.push(requester);
        trip.requests.clear();
        assert!(trip.is_full());

        // A later request from someone else can no longer be accepted.
        let second = request_from(ObjectId::new());
        match validate_accept(&trip, &second) {
            Err(ApiError::Conflict(message)) => assert_eq!(message, "Trip is already full"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn malformed_trip_id_does_not_resolve() {
        assert!(matches!(
            parse_trip_id("not-an-object-id"),
            Err(ApiError::NotFound(_))
        ));
    }
}
