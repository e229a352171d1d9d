//! WebSocket handler.
//!
//! Responsibilities:
//! - Pre-upgrade: handshake defender, channel name validation
//! - Upgrade HTTP -> WS with the configured frame size limit
//! - Session: one writer task draining the client's outbound queue, and the
//!   session loop feeding inbound messages to the broker
//! - Always leave the channel on the way out

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        ConnectInfo, Path, State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use syncrelay_core::error::{Result, SyncRelayError};

use crate::app_state::AppState;
use crate::error::error_response;
use crate::realtime::core::LeaveGuard;
use crate::realtime::{Broker, Client, ClientReader};

/// Channel names come straight from the URL path.
pub fn validate_channel_name(name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(SyncRelayError::BadRequest("channel name must not be empty".into()));
    }
    if name.len() > max_len {
        return Err(SyncRelayError::BadRequest(format!(
            "channel name longer than {max_len} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(SyncRelayError::BadRequest(
            "channel name must not contain control characters".into(),
        ));
    }
    Ok(())
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    Path(channel): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = app.handshake().check(peer.ip()).await {
        tracing::debug!(%peer, error = %e, "handshake rejected");
        return error_response(&e);
    }
    if let Err(e) = validate_channel_name(&channel, app.cfg().limits.max_channel_name_len) {
        return error_response(&e);
    }

    let max = app.cfg().limits.max_frame_bytes;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| run_session(app, channel, socket))
}

async fn run_session(app: AppState, channel: String, socket: WebSocket) {
    let (client, out_rx) = Client::with_queue(channel, app.cfg().gateway.outbound_queue);
    let client = Arc::new(client);
    let span = tracing::info_span!("session", channel = %client.channel(), client = %client.id());

    async move {
        let (ws_tx, ws_rx) = socket.split();
        let writer = tokio::spawn(write_loop(ws_tx, out_rx).in_current_span());
        let reader = ClientReader::new(client.id(), ws_rx);

        match drive_session(app.broker().clone(), Arc::clone(&client), reader).await {
            Ok(()) | Err(SyncRelayError::ConnectionClosed) => tracing::info!("session closed"),
            Err(e) => tracing::info!(error = %e, "session ended"),
        }

        client.close();
        // The registry drops its handle once the leave is applied; the writer
        // then sees the queue close even if the Close frame did not fit.
        drop(client);
        let _ = writer.await;
    }
    .instrument(span)
    .await
}

/// Join, relay every inbound message until the connection fails, leave.
///
/// The leave is submitted on every exit path, including a failed join or a
/// broker that went away mid-session.
pub async fn drive_session<S, E>(
    broker: Broker,
    client: Arc<Client>,
    mut reader: ClientReader<S>,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<WsMessage, E>> + Unpin,
    E: Display,
{
    let guard = LeaveGuard::new(broker.clone(), client.channel(), client.id());

    let outcome = broker.join(Arc::clone(&client)).await?;
    tracing::info!(founder = outcome.founder, members = outcome.members, "joined");

    let result = loop {
        match reader.receive().await {
            Ok(msg) => {
                if let Err(e) = broker.publish(client.id(), client.channel(), msg).await {
                    break Err(e);
                }
            }
            Err(e) => break Err(e),
        }
    };

    if reader.noise() > 0 {
        tracing::debug!(noise = reader.noise(), "malformed frames dropped during session");
    }
    if let Err(e) = guard.leave().await {
        tracing::debug!(error = %e, "leave not submitted");
    } else {
        tracing::info!("left");
    }
    result
}

async fn write_loop(mut ws_tx: SplitSink<WebSocket, WsMessage>, mut out_rx: mpsc::Receiver<WsMessage>) {
    while let Some(msg) = out_rx.recv().await {
        let closing = matches!(msg, WsMessage::Close(_));
        if ws_tx.send(msg).await.is_err() {
            break;
        }
        if closing {
            break;
        }
    }
    // Dropping `out_rx` makes further sends fail with ConnectionClosed.
    let _ = ws_tx.close().await;
}
