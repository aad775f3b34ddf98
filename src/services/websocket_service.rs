use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::ws::{ClientMessage, ServerMessage};
use crate::services::{catalog_service, join_service, score_service, ws_events};
use crate::state::{ClientConnection, ConnectionId, SharedState};

/// Handle the full lifecycle for an individual client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection = Uuid::new_v4();
    state.clients().insert(
        connection,
        ClientConnection {
            id: connection,
            tx: outbound_tx.clone(),
        },
    );
    info!(connection = %connection, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(inbound) => dispatch(&state, connection, inbound).await,
                Err(err) => {
                    warn!(
                        connection = %connection,
                        error = %err,
                        "failed to parse or validate client message"
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %connection, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection, error = %err, "websocket error");
                break;
            }
        }
    }

    state.clients().remove(&connection);
    join_service::handle_disconnect(&state, connection).await;
    info!(connection = %connection, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one decoded inbound message to the service that owns it.
async fn dispatch(state: &SharedState, connection: ConnectionId, message: ClientMessage) {
    match message {
        ClientMessage::JoinRoom(request) => {
            join_service::handle_join(state, connection, request).await;
        }
        ClientMessage::SubmitAnswer { room_code, answer } => {
            score_service::submit_answer(state, connection, &room_code, &answer).await;
        }
        ClientMessage::RequestEvents => {
            ws_events::send_catalog(state, &connection).await;
        }
        ClientMessage::RequestEventQuestions { event_id } => {
            let questions = match catalog_service::questions_digest(state, event_id.clone()).await {
                Ok(questions) => questions,
                Err(err) => {
                    warn!(
                        event = %event_id,
                        error = %err,
                        "question digest unavailable; sending empty list"
                    );
                    Vec::new()
                }
            };
            ws_events::send_to_connection(
                state,
                &connection,
                &ServerMessage::EventQuestions {
                    event_id,
                    questions,
                },
            );
        }
        ClientMessage::CheckGameStatus => {
            join_service::handle_status_poll(state, connection).await;
        }
        ClientMessage::RequestRoomCode => {
            join_service::handle_room_code_poll(state, connection).await;
        }
        ClientMessage::Unknown => {
            warn!(connection = %connection, "ignoring unknown message type");
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
