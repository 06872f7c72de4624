//! Immutable views over backend JSON
//!
//! Each object is an identifier plus the JSON it was built from. Accessors
//! read from that payload and return `None` (or an empty string for text)
//! when a field is missing; nothing here talks to the network.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

fn str_at<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

/// Ids arrive as strings from iFunny and as numbers from Sendbird
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: String,
    data: Value,
}

impl User {
    /// User known only by id
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_data(id, Value::Null)
    }

    pub fn from_data(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `nick` for iFunny payloads, `nickname`/`name` for Sendbird ones
    pub fn nick(&self) -> Option<&str> {
        str_at(&self.data, "nick")
            .or_else(|| str_at(&self.data, "nickname"))
            .or_else(|| str_at(&self.data, "name"))
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    channel_url: String,
    data: Value,
}

impl Channel {
    pub fn new(channel_url: impl Into<String>) -> Self {
        Self::from_data(channel_url, Value::Null)
    }

    pub fn from_data(channel_url: impl Into<String>, data: Value) -> Self {
        Self {
            channel_url: channel_url.into(),
            data,
        }
    }

    /// Build from a Sendbird channel object (needs `channel_url`)
    pub fn from_payload(data: Value) -> Option<Self> {
        let url = str_at(&data, "channel_url")?.to_string();
        Some(Self::from_data(url, data))
    }

    pub fn url(&self) -> &str {
        &self.channel_url
    }

    pub fn name(&self) -> Option<&str> {
        str_at(&self.data, "name")
    }

    pub fn member_count(&self) -> Option<u64> {
        self.data.get("member_count").and_then(Value::as_u64)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Chat message received over the socket
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: String,
    channel: Channel,
    data: Value,
    pub(crate) invoked: bool,
}

impl Message {
    /// Build from a `MESG` payload (needs `msg_id` and `channel_url`)
    pub fn from_payload(data: Value) -> Option<Self> {
        let id = data.get("msg_id").and_then(id_string)?;
        let channel = Channel::new(str_at(&data, "channel_url")?);

        Some(Self {
            id,
            channel,
            data,
            invoked: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn channel_url(&self) -> &str {
        self.channel.url()
    }

    pub fn content(&self) -> &str {
        str_at(&self.data, "message").unwrap_or_default()
    }

    /// Sender; Sendbird puts the iFunny id in `guest_id`
    pub fn author(&self) -> Option<User> {
        let user = self.data.get("user")?;
        let id = user
            .get("guest_id")
            .and_then(id_string)
            .or_else(|| user.get("user_id").and_then(id_string))?;
        Some(User::from_data(id, user.clone()))
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.data.get("ts").and_then(Value::as_i64)?;
        Utc.timestamp_millis_opt(ts).single()
    }

    /// Whether a command was run for this message
    pub fn invoked(&self) -> bool {
        self.invoked
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    id: String,
    data: Value,
}

impl Notification {
    /// Build from an item of `/news/my` (needs `id`)
    pub fn from_payload(data: Value) -> Option<Self> {
        let id = data.get("id").and_then(id_string)?;
        Some(Self { id, data })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Notification type, e.g. `smile` or `comment`
    pub fn kind(&self) -> Option<&str> {
        str_at(&self.data, "type")
    }

    pub fn text(&self) -> Option<&str> {
        str_at(&self.data, "text")
    }

    pub fn user(&self) -> Option<User> {
        let user = self.data.get("user")?;
        let id = user.get("id").and_then(id_string)?;
        Some(User::from_data(id, user.clone()))
    }

    /// `date` is in seconds
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.data.get("date").and_then(Value::as_i64)?;
        Utc.timestamp_opt(secs, 0).single()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Invitation carried by a `SYEV` frame with category 10020
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInvite {
    channel: Channel,
    inviter: Option<User>,
    invitees: Vec<User>,
    data: Value,
}

impl ChannelInvite {
    pub fn from_update(channel: Channel, data: Value) -> Self {
        let event = data.get("data");

        let inviter = event
            .and_then(|d| d.get("inviter"))
            .and_then(|u| {
                let id = u.get("user_id").and_then(id_string)?;
                Some(User::from_data(id, u.clone()))
            });

        let invitees = event
            .and_then(|d| d.get("invitees"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|u| {
                        let id = u.get("user_id").and_then(id_string)?;
                        Some(User::from_data(id, u.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            channel,
            inviter,
            invitees,
            data,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn inviter(&self) -> Option<&User> {
        self.inviter.as_ref()
    }

    pub fn invitees(&self) -> &[User] {
        &self.invitees
    }

    pub fn is_invited(&self, user_id: &str) -> bool {
        self.invitees.iter().any(|u| u.id() == user_id)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}
