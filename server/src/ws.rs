//! WebSocket transport. Each socket gets a writer task draining its outbox
//! and a reader task feeding the event queue; neither touches game state.

use crate::event_queue::EventQueue;
use crate::session::Session;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub queue: EventQueue<Session>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx_out, mut rx_out) = mpsc::unbounded_channel::<String>();

    let my_id = Uuid::new_v4();
    tracing::info!(connection_id = %my_id, "Socket opened");
    state.queue.enqueue(move |s: &mut Session| s.on_open(my_id, tx_out));

    // ends when the session drops the outbox or the peer stops reading
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx_out.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let queue = state.queue.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(t)) => {
                    queue.enqueue(move |s: &mut Session| s.on_message(my_id, &t));
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(connection_id = %my_id, error = %e, "Socket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(connection_id = %my_id, "Socket closed");
    state.queue.enqueue(move |s: &mut Session| s.on_close(my_id));
}
