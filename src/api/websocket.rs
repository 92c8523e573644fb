use std::{
    collections::HashMap,
    io,
    pin::pin,
    time::{Duration, Instant},
};

use actix_web::{web, HttpRequest, Responder};
use actix_ws::{self, AggregatedMessage};
use futures_util::{
    future::{select, Either},
    StreamExt as _,
};
use shared::api::{
    user::Claims,
    websocket::{ChatClientMessage, ChatServerMessage},
};
use uuid::Uuid;

use crate::{mongodb::MongoDatabase, room};
use tokio::{
    sync::{mpsc, oneshot},
    time::interval,
};

use super::chat;

type ConnId = Uuid;
type RoomId = String;

enum Command {
    Join {
        room: RoomId,
        conn: ConnId,
        conn_tx: mpsc::UnboundedSender<ChatServerMessage>,
        res_tx: oneshot::Sender<()>,
    },

    Broadcast {
        room: RoomId,
        msg: ChatServerMessage,
        res_tx: oneshot::Sender<()>,
    },

    Disconnect {
        conn: ConnId,
    },
}

/// Room membership owner. Runs as a single task; all mutation goes through
/// the command channel, so no lock is held across await points.
pub struct ChatServer {
    rooms: HashMap<RoomId, HashMap<ConnId, mpsc::UnboundedSender<ChatServerMessage>>>,

    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl ChatServer {
    pub fn new() -> (Self, ChatServerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        (
            Self {
                rooms: HashMap::new(),
                cmd_rx,
            },
            ChatServerHandle { cmd_tx },
        )
    }

    /// Idempotent: re-joining a room the connection is already in just
    /// overwrites its own entry.
    fn join(&mut self, room: RoomId, conn: ConnId, tx: mpsc::UnboundedSender<ChatServerMessage>) {
        self.rooms.entry(room).or_default().insert(conn, tx);
    }

    fn broadcast(&self, room: &str, msg: ChatServerMessage) {
        if let Some(conns) = self.rooms.get(room) {
            for connection in conns.values() {
                let _ = connection.send(msg.clone());
            }
        }
    }

    fn disconnect(&mut self, conn: ConnId) {
        for conns in self.rooms.values_mut() {
            conns.remove(&conn);
        }

        self.rooms.retain(|_, conns| !conns.is_empty());
    }

    pub async fn run(mut self) -> io::Result<()> {
        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                Command::Join {
                    room,
                    conn,
                    conn_tx,
                    res_tx,
                } => {
                    self.join(room, conn, conn_tx);
                    let _ = res_tx.send(());
                }

                Command::Broadcast { room, msg, res_tx } => {
                    self.broadcast(&room, msg);
                    let _ = res_tx.send(());
                }

                Command::Disconnect { conn } => {
                    self.disconnect(conn);
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct ChatServerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl ChatServerHandle {
    pub async fn join(
        &self,
        room: RoomId,
        conn: ConnId,
        conn_tx: mpsc::UnboundedSender<ChatServerMessage>,
    ) {
        let (res_tx, res_rx) = oneshot::channel();

        self.cmd_tx
            .send(Command::Join {
                room,
                conn,
                conn_tx,
                res_tx,
            })
            .unwrap();

        res_rx.await.unwrap();
    }

    pub async fn broadcast(&self, room: RoomId, msg: ChatServerMessage) {
        let (res_tx, res_rx) = oneshot::channel();

        self.cmd_tx
            .send(Command::Broadcast { room, msg, res_tx })
            .unwrap();

        res_rx.await.unwrap();
    }

    pub fn disconnect(&self, conn: ConnId) {
        self.cmd_tx.send(Command::Disconnect { conn }).unwrap();
    }
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

async fn handle_event(
    event: ChatClientMessage,
    conn_id: ConnId,
    conn_tx: &mpsc::UnboundedSender<ChatServerMessage>,
    chat_server: &web::Data<ChatServerHandle>,
    db: &web::Data<MongoDatabase>,
) {
    match event {
        ChatClientMessage::JoinChat {
            sender_name,
            user_id,
            target_user_id,
        } => {
            let room = room::room_id(user_id, target_user_id);
            tracing::info!("{} joined room {}", sender_name, room);

            chat_server.join(room, conn_id, conn_tx.clone()).await;
        }

        ChatClientMessage::SendMessage {
            sender_first_name,
            sender_last_name,
            user_id,
            target_user_id,
            text,
        } => {
            // TODO: check that user_id and target_user_id are friends
            // before accepting the message
            let room = room::room_id(user_id, target_user_id);

            match chat::append_message(db, user_id, target_user_id, &text).await {
                Ok(()) => {
                    chat_server
                        .broadcast(
                            room,
                            ChatServerMessage::MessageReceived {
                                sender_first_name,
                                sender_last_name,
                                text,
                            },
                        )
                        .await;
                }

                Err(err) => {
                    tracing::error!("failed to persist chat message: {err}");

                    let _ = conn_tx.send(ChatServerMessage::MessageFailed {
                        message: "message could not be saved".to_string(),
                    });
                }
            }
        }
    }
}

async fn websocket(
    req: HttpRequest,
    body: web::Payload,
    user: web::ReqData<Claims>,
    chat_server: web::Data<ChatServerHandle>,
    db: web::Data<MongoDatabase>,
) -> actix_web::Result<impl Responder> {
    let (res, mut session, msg_stream) = actix_ws::handle(&req, body)?;

    actix_web::rt::spawn(async move {
        let conn_id = Uuid::new_v4();
        tracing::debug!("websocket {} opened by {}", conn_id, user.user.id);

        let mut last_heartbeat = Instant::now();
        let mut interval = interval(HEARTBEAT_INTERVAL);

        let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();

        let msg_stream_f = msg_stream
            .max_frame_size(128 * 1024)
            .aggregate_continuations()
            .max_continuation_size(2 * 1024 * 1024);

        let mut msg_stream = pin!(msg_stream_f);

        let close_reason = loop {
            let tick = pin!(interval.tick());
            let msg_rx = pin!(conn_rx.recv());

            let messages = pin!(select(msg_stream.next(), msg_rx));

            match select(messages, tick).await {
                // events received from the client
                Either::Left((Either::Left((Some(Ok(msg)), _)), _)) => match msg {
                    AggregatedMessage::Ping(bytes) => {
                        last_heartbeat = Instant::now();

                        let _ = session.pong(&bytes).await;
                    }

                    AggregatedMessage::Pong(_) => {
                        last_heartbeat = Instant::now();
                    }

                    AggregatedMessage::Close(reason) => break reason,

                    AggregatedMessage::Text(payload) => {
                        last_heartbeat = Instant::now();

                        if let Ok(event) =
                            serde_json::from_str::<ChatClientMessage>(payload.to_string().as_str())
                        {
                            handle_event(event, conn_id, &conn_tx, &chat_server, &db).await;
                        }
                    }

                    AggregatedMessage::Binary(_) => {
                        last_heartbeat = Instant::now();
                    }
                },

                // ws stream error
                Either::Left((Either::Left((Some(Err(_err)), _)), _)) => {
                    break None;
                }

                // ws stream end
                Either::Left((Either::Left((None, _)), _)) => break None,

                // room broadcasts destined for this connection
                Either::Left((Either::Right((Some(ws_msg), _)), _)) => {
                    if let Ok(notif) = serde_json::to_string(&ws_msg) {
                        let _ = session.text(notif).await;
                    }
                }

                Either::Left((Either::Right((None, _)), _)) => unreachable!(
                    "all connection message senders were dropped; chat server may have panicked"
                ),

                Either::Right((_inst, _)) => {
                    if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
                        break None;
                    }

                    let _ = session.ping(b"").await;
                }
            }
        };

        chat_server.disconnect(conn_id);

        let _ = session.close(close_reason).await;
    });

    Ok(res)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(websocket));
}
