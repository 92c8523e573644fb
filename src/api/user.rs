use actix_web::{web, HttpResponse, Responder};
use bcrypt::{hash, verify};
use mongodb::bson::doc;

use shared::{
    api::user::{AuthResponse, AuthUser, Claims, LoginRequest, RegisterRequest},
    models::user::{User, UserSafe},
};

use crate::{error::ApiError, jwt::JwtSignService, mongodb::MongoDatabase};

const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

fn claims_for(user: &UserSafe) -> Claims {
    Claims {
        user: AuthUser {
            id: user.id,
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            role: user.role.clone(),
            location: user.location.clone(),
        },
        exp: (chrono::Utc::now().timestamp() + TOKEN_TTL_SECS) as usize,
    }
}

async fn register(
    db: web::Data<MongoDatabase>,
    jwt: web::Data<JwtSignService>,
    request: web::Json<RegisterRequest>,
) -> Result<impl Responder, ApiError> {
    let collection = db.database.collection::<User>("users");

    let exists = collection
        .find_one(doc! {
            "email": &request.email
        })
        .await?;

    if exists.is_some() {
        return Err(ApiError::BadRequest("email already exists"));
    }

    let password = request.password.clone();
    let password_hash = web::block(|| hash(password, 10))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    let mut user = User {
        id: None,
        email: request.email.clone(),
        password_hash,
        firstname: request.firstname.clone(),
        lastname: request.lastname.clone(),
        role: request.role.clone(),
        location: request.location.clone(),
    };

    let inserted = collection.insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    let user = UserSafe::from(user);
    let claims = claims_for(&user);
    let token = jwt.sign(&claims).map_err(anyhow::Error::from)?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

async fn login(
    db: web::Data<MongoDatabase>,
    jwt: web::Data<JwtSignService>,
    request: web::Json<LoginRequest>,
) -> Result<impl Responder, ApiError> {
    let collection = db.database.collection::<User>("users");

    let user = collection
        .find_one(doc! {
            "email": &request.email
        })
        .await?
        .ok_or(ApiError::BadRequest("Invalid email or password"))?;

    let password = request.password.clone();
    let stored_hash = user.password_hash.clone();
    let valid = web::block(move || verify(password, &stored_hash))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    if !valid {
        return Err(ApiError::BadRequest("Invalid email or password"));
    }

    let user = UserSafe::from(user);
    let claims = claims_for(&user);
    let token = jwt.sign(&claims).map_err(anyhow::Error::from)?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login));
}
