use std::env;

use actix_web::web;
use mongodb::{options::ClientOptions, Client, Database};

#[derive(Clone)]
pub struct MongoDatabase {
    pub database: Database,
}

impl MongoDatabase {
    pub async fn init() -> anyhow::Result<web::Data<Self>> {
        let url = env::var("MONGODB_URL").unwrap_or("mongodb://localhost:27017".to_string());

        let client_options = ClientOptions::parse(url).await?;
        let client = Client::with_options(client_options)?;

        Ok(web::Data::new(MongoDatabase {
            database: client.database("travelbuddy"),
        }))
    }
}
