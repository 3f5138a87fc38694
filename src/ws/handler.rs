//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::input::RawInput;
use crate::game::session::{CharacterProfile, MatchSelection};
use crate::game::{GameMatch, MatchCanceller, MatchExit};
use crate::http::AppError;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{codes, ClientMsg, ServerMsg};

const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub player_id: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let player_id = require_player_id(query.player_id)?;
    info!(player_id = %player_id, "WebSocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, player_id, state)))
}

fn require_player_id(player_id: Option<String>) -> Result<String, AppError> {
    player_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("player_id is required".to_string()))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: String, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_CHANNEL_CAPACITY);

    // Writer task: everything bound for the client goes through one queue
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut connection = Connection::new(connection_id, player_id, state, out_tx);
    connection
        .send(ServerMsg::Welcome {
            connection_id,
            server_time: unix_millis(),
        })
        .await;

    // Reader loop: WebSocket -> connection
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received ping/pong frame");
            }
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

    // A running match is cancelled with the connection
    connection.leave("disconnected");
    drop(connection);
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

struct ActiveMatch {
    id: Uuid,
    input_tx: mpsc::Sender<RawInput>,
    canceller: MatchCanceller,
    task: JoinHandle<MatchExit>,
}

/// One client's view of the server: at most one match at a time
struct Connection {
    connection_id: Uuid,
    player_id: String,
    state: AppState,
    out_tx: mpsc::Sender<ServerMsg>,
    limiter: ConnectionRateLimiter,
    active: Option<ActiveMatch>,
}

impl Connection {
    fn new(connection_id: Uuid, player_id: String, state: AppState, out_tx: mpsc::Sender<ServerMsg>) -> Self {
        let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
        Self {
            connection_id,
            player_id,
            state,
            out_tx,
            limiter,
            active: None,
        }
    }

    async fn send(&self, msg: ServerMsg) {
        if self.out_tx.send(msg).await.is_err() {
            debug!(connection_id = %self.connection_id, "Outbound channel closed");
        }
    }

    async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMsg>(text) {
            Ok(msg) => self.handle(msg).await,
            Err(e) => {
                warn!(connection_id = %self.connection_id, error = %e, "Failed to parse client message");
                self.send(ServerMsg::error(codes::BAD_MESSAGE, e.to_string())).await;
            }
        }
    }

    async fn handle(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::StartMatch { character, map_id } => self.start_match(character, map_id).await,
            ClientMsg::Ping { t } => self.send(ServerMsg::Pong { t }).await,
            ClientMsg::LeaveMatch => self.leave("left"),
            other => {
                if let Some(event) = other.into_raw_input() {
                    self.forward_input(event);
                }
            }
        }
    }

    fn in_match(&self) -> bool {
        self.active.as_ref().is_some_and(|m| !m.task.is_finished())
    }

    async fn start_match(&mut self, character: Option<CharacterProfile>, map_id: Option<String>) {
        if self.in_match() {
            self.send(ServerMsg::error(
                codes::MATCH_IN_PROGRESS,
                "A match is already running on this connection",
            ))
            .await;
            return;
        }

        let selection = match MatchSelection::validate(&self.player_id, character, map_id) {
            Ok(selection) => selection,
            Err(e) => {
                info!(connection_id = %self.connection_id, reason = %e, "Match selection rejected");
                self.send(ServerMsg::error(codes::SELECTION_REQUIRED, e.to_string())).await;
                return;
            }
        };

        let (game, handle, canceller) = GameMatch::new(
            selection,
            self.state.reporter.clone(),
            self.state.match_config(),
            rand::random(),
        );

        let events = handle.subscribe();
        let input_tx = handle.input_tx.clone();
        let id = game.id();

        tokio::spawn(forward_events(events, self.out_tx.clone(), self.connection_id));
        let task = game.spawn(self.state.match_registry.clone(), handle);

        info!(connection_id = %self.connection_id, match_id = %id, "Match launched");
        self.active = Some(ActiveMatch {
            id,
            input_tx,
            canceller,
            task,
        });
    }

    fn forward_input(&self, event: RawInput) {
        let Some(active) = self.active.as_ref() else {
            debug!(connection_id = %self.connection_id, "Input outside a match, ignoring");
            return;
        };

        if !self.limiter.check_input() {
            warn!(connection_id = %self.connection_id, "Rate limited input event");
            return;
        }

        match active.input_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(match_id = %active.id, "Input queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(match_id = %active.id, "Match no longer takes input");
            }
        }
    }

    /// Cancel the running match, if any
    fn leave(&mut self, reason: &str) {
        if let Some(active) = self.active.take() {
            if !active.task.is_finished() {
                info!(connection_id = %self.connection_id, match_id = %active.id, reason, "Cancelling match");
            }
            active.canceller.cancel();
        }
    }
}

/// Relay match events to the connection's outbound queue
async fn forward_events(
    mut events: broadcast::Receiver<ServerMsg>,
    out_tx: mpsc::Sender<ServerMsg>,
    connection_id: Uuid,
) {
    loop {
        match events.recv().await {
            Ok(msg) => {
                if out_tx.send(msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    connection_id = %connection_id,
                    lagged_count = n,
                    "Client lagged, skipping {} frames", n
                );
                // Continue - don't disconnect for lag
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(connection_id = %connection_id, "Match event channel closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::game::reporter::testing::ScriptedBackend;
    use crate::game::session::{test_character, Rewards};
    use std::sync::Arc;
    use std::time::Duration;

    fn state() -> AppState {
        let config = Config::from_lookup(|key| match key {
            "ARENA_API_URL" => Some("http://localhost:8001/api".to_string()),
            _ => None,
        })
        .expect("config");
        let backend = Arc::new(ScriptedBackend::new("s-1", Rewards::default()));
        AppState::with_backend(config, backend)
    }

    fn connection() -> (Connection, mpsc::Receiver<ServerMsg>) {
        let (out_tx, out_rx) = mpsc::channel(1024);
        (Connection::new(Uuid::new_v4(), "p1".into(), state(), out_tx), out_rx)
    }

    fn start(map_id: Option<&str>) -> ClientMsg {
        ClientMsg::StartMatch {
            character: Some(test_character()),
            map_id: map_id.map(str::to_string),
        }
    }

    async fn next_error(rx: &mut mpsc::Receiver<ServerMsg>) -> String {
        loop {
            match rx.recv().await.expect("connection open") {
                ServerMsg::Error { code, .. } => return code,
                _ => continue,
            }
        }
    }

    #[test]
    fn player_id_must_be_present() {
        assert!(require_player_id(None).is_err());
        assert!(require_player_id(Some("  ".into())).is_err());
        assert_eq!(require_player_id(Some(" p1 ".into())).expect("valid"), "p1");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_selection_creates_nothing() {
        let (mut conn, mut rx) = connection();

        conn.handle(start(None)).await;
        assert_eq!(next_error(&mut rx).await, codes::SELECTION_REQUIRED);

        conn.handle(ClientMsg::StartMatch {
            character: None,
            map_id: Some("minecraft".into()),
        })
        .await;
        assert_eq!(next_error(&mut rx).await, codes::SELECTION_REQUIRED);

        tokio::task::yield_now().await;
        assert!(conn.active.is_none());
        assert_eq!(conn.state.match_registry.active_matches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_match_per_connection() {
        let (mut conn, mut rx) = connection();

        conn.handle(start(Some("minecraft"))).await;
        assert!(matches!(
            rx.recv().await,
            Some(ServerMsg::MatchStarted { field_width, .. }) if field_width == 1200.0
        ));
        assert_eq!(conn.state.match_registry.active_matches(), 1);

        conn.handle(start(Some("discord"))).await;
        assert_eq!(next_error(&mut rx).await, codes::MATCH_IN_PROGRESS);

        conn.handle(ClientMsg::LeaveMatch).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(conn.state.match_registry.active_matches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ping_gets_pong() {
        let (mut conn, mut rx) = connection();
        conn.handle(ClientMsg::Ping { t: 77 }).await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::Pong { t: 77 })));
    }

    #[tokio::test(start_paused = true)]
    async fn garbage_is_reported_not_fatal() {
        let (mut conn, mut rx) = connection();
        conn.handle_text("{not json").await;
        assert_eq!(next_error(&mut rx).await, codes::BAD_MESSAGE);

        conn.handle_text(r#"{"type":"ping","t":1}"#).await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::Pong { t: 1 })));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_connection_cancels_its_match() {
        let (mut conn, mut rx) = connection();
        conn.handle(start(Some("minecraft"))).await;
        assert!(matches!(rx.recv().await, Some(ServerMsg::MatchStarted { .. })));

        let registry = conn.state.match_registry.clone();
        drop(conn);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.active_matches(), 0);
    }
}
