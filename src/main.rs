use actix_cors::Cors;
use api::websocket::ChatServer;
use dotenv::dotenv;
use jwt::{JwtAuth, JwtSignService};
use mongodb::MongoDatabase;
use shared::api::user::Claims;
use std::env;

use actix_web::{http, web, App, HttpResponse, HttpServer};
use serde_json::json;
use tokio::{task::spawn, try_join};

mod api;
mod error;
mod jwt;
mod mongodb;
mod room;

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to Travel buddy server"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    tracing::info!("PORT: {}", env::var("PORT").unwrap_or("-".to_string()));
    tracing::info!("HOST: {}", env::var("HOST").unwrap_or("-".to_string()));

    let mongo_database = MongoDatabase::init()
        .await
        .expect("Failed to initialize MongoDB client");

    let jwt_service = JwtSignService::init().expect("Failed to initialize JWT service");

    let jwt_auth = JwtAuth::<Claims>::init().expect("failed to auth init");

    let (chat_server, chat_handle) = ChatServer::new();
    let chat_handle = web::Data::new(chat_handle);

    let chat_fut = spawn(chat_server.run());

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or("0.0.0.0".to_string()),
        env::var("PORT").unwrap_or("3030".to_string())
    );

    let http_fut = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .send_wildcard()
            .allowed_methods(["POST", "GET", "PUT", "PATCH", "DELETE"])
            .allowed_headers([
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(mongo_database.to_owned())
            .app_data(jwt_service.to_owned())
            .app_data(chat_handle.clone())
            .route("/", web::get().to(index))
            .service(web::scope("/api/trips").wrap(jwt_auth.to_owned()).configure(api::trip::config))
            .service(web::scope("/api/chat").wrap(jwt_auth.to_owned()).configure(api::chat::config))
            .service(web::scope("/api").configure(api::user::config))
            .service(
                web::scope("/ws")
                    .wrap(jwt_auth.to_owned())
                    .configure(api::websocket::config),
            )
    })
    .bind(&addr)?
    .run();

    tracing::info!("binding on {}", addr);

    try_join!(http_fut, async move { chat_fut.await.unwrap() })?;

    Ok(())
}
