//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::input::RawInput;
use crate::game::session::{CharacterProfile, MatchHandoff};
use crate::game::snapshot::FrameSnapshot;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start a single-player match with the picks from the selection screens
    StartMatch {
        #[serde(default)]
        character: Option<CharacterProfile>,
        #[serde(default)]
        map_id: Option<String>,
    },

    KeyDown {
        key: String,
    },

    KeyUp {
        key: String,
    },

    /// Pointer position in rendering-surface pixels
    PointerMove {
        x: f32,
        y: f32,
        surface_width: f32,
        surface_height: f32,
    },

    PointerClick,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Abandon the current match
    LeaveMatch,
}

impl ClientMsg {
    /// Gameplay input destined for the match task, if this is one
    pub fn into_raw_input(self) -> Option<RawInput> {
        match self {
            ClientMsg::KeyDown { key } => Some(RawInput::KeyDown(key)),
            ClientMsg::KeyUp { key } => Some(RawInput::KeyUp(key)),
            ClientMsg::PointerMove {
                x,
                y,
                surface_width,
                surface_height,
            } => Some(RawInput::PointerMove {
                x,
                y,
                surface_width,
                surface_height,
            }),
            ClientMsg::PointerClick => Some(RawInput::PointerClick),
            ClientMsg::StartMatch { .. } | ClientMsg::Ping { .. } | ClientMsg::LeaveMatch => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    MatchStarted {
        match_id: Uuid,
        field_width: f32,
        field_height: f32,
    },

    /// The backend accepted the match; it will be reported when it ends
    SessionOpened {
        session_id: String,
    },

    /// Per-tick frame
    Snapshot {
        frame: Box<FrameSnapshot>,
    },

    /// Sent once, after the presentation delay
    MatchResult {
        result: MatchHandoff,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Error codes sent in [`ServerMsg::Error`]
pub mod codes {
    pub const SELECTION_REQUIRED: &str = "selection_required";
    pub const MATCH_IN_PROGRESS: &str = "match_in_progress";
    pub const BAD_MESSAGE: &str = "bad_message";
}
