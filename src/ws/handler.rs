//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnectionId, MatchHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, Seat, ServerMsg};

/// Direct replies queued for a single connection
const DIRECT_QUEUE: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();
    let lobby = state.lobby.clone();

    // Subscribe before joining so no snapshot slips between the ack and the stream
    let snapshot_rx = lobby.subscribe();

    let ack = match lobby.join(connection_id).await {
        Ok(ack) => ack,
        Err(e) => {
            error!(connection_id = %connection_id, error = %e, "Failed to join match");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::Error {
                    code: "match_unavailable".to_string(),
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    info!(connection_id = %connection_id, seat = ?ack.seat, "Seat assigned");

    let init = ServerMsg::Init {
        role: ack.seat,
        id: connection_id,
    };
    if let Err(e) = send_msg(&mut ws_sink, &init).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send init");
        let _ = lobby.leave(connection_id).await;
        return;
    }
    if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::GameState(ack.snapshot)).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send initial state");
        let _ = lobby.leave(connection_id).await;
        return;
    }

    run_session(
        connection_id,
        ack.seat,
        &lobby,
        ws_sink,
        ws_stream,
        snapshot_rx,
    )
    .await;

    // Cleanup on disconnect
    if let Err(e) = lobby.leave(connection_id).await {
        debug!(connection_id = %connection_id, error = %e, "Leave not delivered");
    }

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    seat: Seat,
    lobby: &MatchHandle,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();
    let (direct_tx, direct_rx) = mpsc::channel::<ServerMsg>(DIRECT_QUEUE);

    let writer_handle = tokio::spawn(write_loop(connection_id, ws_sink, snapshot_rx, direct_rx));

    // Reader loop: WebSocket -> match task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::SpawnUnit { unit_type, x, y }) => {
                    if seat.role().is_none() {
                        debug!(connection_id = %connection_id, "Spectator spawn ignored");
                        continue;
                    }
                    if !rate_limiter.check_spawn() {
                        warn!(connection_id = %connection_id, "Rate limited spawn message");
                        continue;
                    }
                    if lobby
                        .spawn_unit(connection_id, unit_type, x, y)
                        .await
                        .is_err()
                    {
                        debug!(connection_id = %connection_id, "Command channel closed");
                        break;
                    }
                }
                Ok(ClientMsg::Ping { t }) => {
                    if direct_tx.send(ServerMsg::Pong { t }).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Forward match broadcasts and direct replies to the socket
async fn write_loop(
    connection_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
    mut direct_rx: mpsc::Receiver<ServerMsg>,
) {
    loop {
        let msg = tokio::select! {
            direct = direct_rx.recv() => match direct {
                Some(msg) => msg,
                None => break,
            },
            received = snapshot_rx.recv() => match received {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} snapshots", n
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Snapshot channel closed");
                    break;
                }
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
