//! Sendbird frame payloads
//!
//! Builders for the frames the client sends and the parsed form of `SYEV`
//! channel events.

use crate::domain::Channel;
use chatsockets::{Frame, Opcode};
use serde_json::{json, Value};

/// Current Unix time in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Keepalive answer echoing the probe's `id`
pub fn pong_frame(id: Value, now_ms: i64) -> Frame {
    Frame::new(
        Opcode::Pong,
        json!({
            "id": id,
            "ts": now_ms,
            "sts": now_ms,
        }),
    )
}

/// Text message to `channel_url`, tagged with `req_id`
pub fn message_frame(channel_url: &str, text: &str, req_id: u64) -> Frame {
    Frame::new(
        Opcode::Mesg,
        json!({
            "channel_url": channel_url,
            "message": text,
            "data": "",
            "mention_type": "users",
            "mentioned_user_ids": [],
            "req_id": req_id.to_string(),
        }),
    )
}

/// `SYEV` category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelUpdateKind {
    /// 10020
    Invite,
    /// 10000
    UserJoin,
    /// 10001
    UserExit,
    Other(i64),
}

impl ChannelUpdateKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            10020 => Self::Invite,
            10000 => Self::UserJoin,
            10001 => Self::UserExit,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Invite => 10020,
            Self::UserJoin => 10000,
            Self::UserExit => 10001,
            Self::Other(code) => code,
        }
    }
}

/// One `SYEV` frame, routed by category and then discarded
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    pub kind: ChannelUpdateKind,
    pub channel: Channel,
    pub raw: Value,
}

impl ChannelUpdate {
    /// Needs `cat` and `channel_url`
    pub fn from_payload(raw: Value) -> Option<Self> {
        let code = raw.get("cat").and_then(Value::as_i64)?;
        let channel = Channel::new(raw.get("channel_url").and_then(Value::as_str)?);

        Some(Self {
            kind: ChannelUpdateKind::from_code(code),
            channel,
            raw,
        })
    }

    /// Acting user of a join/exit event (`data.user_id`)
    pub fn acting_user_id(&self) -> Option<&str> {
        self.raw.pointer("/data/user_id").and_then(Value::as_str)
    }
}
