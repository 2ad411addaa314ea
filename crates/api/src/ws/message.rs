//! JSON text frames exchanged on a chat connection.

use axum::extract::ws::Message;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Frame sent by a client. Only `type: "msg"` is understood.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Client-side id for de-duplication; not interpreted by the server.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sent_at: Option<String>,
}

/// Why an inbound text frame was not a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundError {
    BadJson,
    UnknownType,
}

impl InboundError {
    pub fn detail(self) -> &'static str {
        match self {
            Self::BadJson => "bad json",
            Self::UnknownType => "unknown message type",
        }
    }
}

impl ClientMessage {
    /// Parse a text frame into a chat message.
    pub fn parse(raw: &str) -> Result<Self, InboundError> {
        let msg: Self = serde_json::from_str(raw).map_err(|_| InboundError::BadJson)?;
        if msg.kind != "msg" {
            return Err(InboundError::UnknownType);
        }
        Ok(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMessageKind {
    Msg,
    Err,
    Sys,
}

/// Frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: ServerMessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// RFC 3339 server time.
    pub at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServerMessage {
    fn new(kind: ServerMessageKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            text: None,
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            detail: None,
        }
    }

    pub fn chat(from: &str, to: &str, text: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            text: Some(text.to_string()),
            ..Self::new(ServerMessageKind::Msg)
        }
    }

    pub fn system(from: &str, to: &str, text: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            text: Some(text.to_string()),
            ..Self::new(ServerMessageKind::Sys)
        }
    }

    pub fn error(detail: &str) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(ServerMessageKind::Err)
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode server frame");
                None
            }
        }
    }
}
