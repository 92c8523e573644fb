pub mod chat;
pub mod trip;
pub mod user;
pub mod websocket;
