use actix_web::{web, Responder};
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime};

use shared::{
    api::user::Claims,
    models::chat::{ChatMessage, Conversation},
};

use crate::{error::ApiError, mongodb::MongoDatabase, room};

/// Append one message to the conversation between the two users, creating
/// the conversation on first contact. The participant pair is stored in
/// canonical order, so the upsert filter matches regardless of which side
/// sends first.
pub async fn append_message(
    db: &web::Data<MongoDatabase>,
    sender: ObjectId,
    target: ObjectId,
    text: &str,
) -> anyhow::Result<()> {
    let collection = db.database.collection::<Conversation>("chats");
    let (first, second) = room::sort_pair(sender, target);

    let message = ChatMessage {
        sender_id: sender,
        text: text.to_string(),
        created_at: DateTime::now(),
    };

    collection
        .update_one(
            doc! { "participants": [first, second] },
            doc! { "$push": { "messages": to_bson(&message)? } },
        )
        .upsert(true)
        .await?;

    Ok(())
}

/// Conversation history between the caller and the target user. Returns an
/// empty conversation when the two have never chatted.
async fn history(
    db: web::Data<MongoDatabase>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let target = ObjectId::parse_str(path.as_str())
        .map_err(|_| ApiError::NotFound("User not found"))?;

    let (first, second) = room::sort_pair(user.user.id, target);

    let conversation = db
        .database
        .collection::<Conversation>("chats")
        .find_one(doc! { "participants": { "$all": [first, second] } })
        .await?
        .unwrap_or(Conversation {
            id: None,
            participants: vec![first, second],
            messages: Vec::new(),
        });

    Ok(web::Json(conversation))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/{target_id}", web::get().to(history));
}
